//! Headless capture: WAV, CSV and JSON artifacts from a sample run.

use std::error::Error;
use std::fs;
use std::io::Write;
use std::path::Path;

use awg_core::NUM_CHANNELS;
use serde::Serialize;

/// Save samples as a 3-channel 16-bit PCM WAV file.
pub fn save_wav(
    samples: &[[i16; NUM_CHANNELS]],
    sample_rate: u32,
    path: &Path,
) -> Result<(), Box<dyn Error>> {
    let spec = hound::WavSpec {
        channels: NUM_CHANNELS as u16,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for frame in samples {
        for &sample in frame {
            writer.write_sample(sample)?;
        }
    }
    writer.finalize()?;
    Ok(())
}

/// Save samples as CSV: one row per cycle, one column per channel.
pub fn save_csv(samples: &[[i16; NUM_CHANNELS]], path: &Path) -> Result<(), Box<dyn Error>> {
    let mut out = std::io::BufWriter::new(fs::File::create(path)?);
    writeln!(out, "cycle,ch0,ch1,ch2")?;
    for (cycle, frame) in samples.iter().enumerate() {
        writeln!(out, "{cycle},{},{},{}", frame[0], frame[1], frame[2])?;
    }
    out.flush()?;
    Ok(())
}

/// Per-channel summary of a run.
#[derive(Debug, Serialize)]
pub struct ChannelReport {
    pub min: i16,
    pub max: i16,
    /// Cycle index of the first nonzero sample, if any.
    pub first_active: Option<usize>,
}

/// Whole-run summary.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub cycles: usize,
    pub sample_rate_hz: u32,
    pub channels: Vec<ChannelReport>,
}

impl RunReport {
    #[must_use]
    pub fn from_samples(samples: &[[i16; NUM_CHANNELS]], sample_rate_hz: u32) -> Self {
        let channels = (0..NUM_CHANNELS)
            .map(|ch| {
                let series = samples.iter().map(|frame| frame[ch]);
                ChannelReport {
                    min: series.clone().min().unwrap_or(0),
                    max: series.clone().max().unwrap_or(0),
                    first_active: samples.iter().position(|frame| frame[ch] != 0),
                }
            })
            .collect();
        Self {
            cycles: samples.len(),
            sample_rate_hz,
            channels,
        }
    }
}

/// Save the JSON run report.
pub fn save_report(report: &RunReport, path: &Path) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json)?;
    Ok(())
}
