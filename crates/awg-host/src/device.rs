//! Wire framing and the device driver.
//!
//! Everything the board hears goes through here: opcode pairs (escape +
//! code), and memory write messages (device word, start, end, payload)
//! with every escape byte in the payload doubled. The driver also carries
//! the unit conversions from physical quantities (seconds, volts,
//! radians, hertz) into tick/DAC/phase units, quantizing values *before*
//! the spline fit so knot samples reproduce exactly on the device.

use std::io::Write;

use awg_core::{BASE_CLOCK_HZ, ESCAPE, MEM_DEPTHS, NUM_CHANNELS};

use crate::channel::HostChannel;
use crate::segment::LineOptions;
use crate::{HostError, MAX_OUT_VOLTS, MAX_VAL};

/// Boards addressable on one bus.
pub const NUM_BOARDS: usize = 3;

/// Control opcodes, written as `escape, code << 1 | !enable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Reset,
    Trigger,
    Arm,
    Dcm,
    Start,
}

impl Command {
    fn code(self) -> u8 {
        match self {
            Self::Reset => 0,
            Self::Trigger => 1,
            Self::Arm => 2,
            Self::Dcm => 3,
            Self::Start => 4,
        }
    }
}

/// Waveform compilation options, defaulted the way the CLI uses them.
#[derive(Debug, Clone, Copy)]
pub struct WaveformOptions {
    /// Spline order 0–3; capped by the point count.
    pub order: usize,
    /// Time-dilation exponent.
    pub shift: u8,
    /// First line waits for a trigger.
    pub trigger: bool,
    /// Last line returns to the jump table.
    pub end: bool,
    /// Mute the DAC clock during the last line.
    pub silence: bool,
    /// Append a holding line at the final value.
    pub stop: bool,
    /// Clear the DDS phase accumulator at the first line.
    pub clear: bool,
    /// Last line waits for a trigger after executing.
    pub wait: bool,
    /// AUX TTL level across the segment.
    pub aux: bool,
}

impl Default for WaveformOptions {
    fn default() -> Self {
        Self {
            order: 3,
            shift: 0,
            trigger: true,
            end: true,
            silence: false,
            stop: true,
            clear: true,
            wait: false,
            aux: false,
        }
    }
}

/// Host-side driver for a chain of AWG boards.
pub struct Device<W: Write> {
    out: W,
    /// One host channel per (board, dac) pair.
    pub channels: Vec<HostChannel>,
    /// Sample clock the device is configured for.
    pub freq: f64,
}

impl<W: Write> Device<W> {
    #[must_use]
    pub fn new(out: W) -> Self {
        let channels = (0..NUM_BOARDS * NUM_CHANNELS)
            .map(|ch| HostChannel::new(MEM_DEPTHS[ch % NUM_CHANNELS]))
            .collect();
        Self {
            out,
            channels,
            freq: f64::from(BASE_CLOCK_HZ),
        }
    }

    /// Consume the driver, returning the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Write a raw zero byte: terminates a dangling escape after an
    /// interrupted upload, harmless otherwise (resynchronizes framing
    /// before a reset).
    pub fn flush_escape(&mut self) -> Result<(), HostError> {
        self.out.write_all(&[0x00])?;
        Ok(())
    }

    /// Issue a control opcode.
    pub fn cmd(&mut self, command: Command, enable: bool) -> Result<(), HostError> {
        let byte = (command.code() << 1) | u8::from(!enable);
        self.out.write_all(&[ESCAPE, byte])?;
        Ok(())
    }

    /// Write `data` into a channel's memory at `start`, escape-framed.
    pub fn write_mem(&mut self, channel: usize, data: &[u8], start: u16) -> Result<(), HostError> {
        if channel >= self.channels.len() {
            return Err(HostError::BadIndex(channel));
        }
        if data.is_empty() {
            return Ok(());
        }
        let (board, dac) = (channel / NUM_CHANNELS, channel % NUM_CHANNELS);
        let words = data.len() / 2;
        let mut message = Vec::with_capacity(6 + data.len());
        message.extend_from_slice(&(((board as u16) << 4) | dac as u16).to_le_bytes());
        message.extend_from_slice(&start.to_le_bytes());
        let end = start.wrapping_add(words as u16).wrapping_sub(1);
        message.extend_from_slice(&end.to_le_bytes());
        message.extend_from_slice(data);

        // Escape-double the whole message
        let mut escaped = Vec::with_capacity(message.len() + 8);
        for byte in message {
            if byte == ESCAPE {
                escaped.push(ESCAPE);
            }
            escaped.push(byte);
        }
        self.out.write_all(&escaped)?;
        Ok(())
    }

    /// Serialize one channel's segments and upload the image.
    pub fn write_channel(
        &mut self,
        channel: usize,
        entry: Option<&[Option<usize>]>,
    ) -> Result<(), HostError> {
        let image = self
            .channels
            .get_mut(channel)
            .ok_or(HostError::BadIndex(channel))?
            .serialize(entry)?;
        self.write_mem(channel, &image, 0)
    }

    /// Upload every channel that has segments.
    pub fn write_all(&mut self) -> Result<(), HostError> {
        for channel in 0..self.channels.len() {
            if !self.channels[channel].segments.is_empty() {
                self.write_channel(channel, None)?;
            }
        }
        Ok(())
    }

    /// Compile a waveform into a new segment on `channel`.
    ///
    /// `t` in seconds, `v` in volts (clipped to ±10 V full scale),
    /// optional `p` in radians and `f` in hertz (selecting the DDS
    /// engine). Returns the segment index for the jump-table map.
    pub fn build_segment(
        &mut self,
        channel: usize,
        t: &[f64],
        v: &[f64],
        p: Option<&[f64]>,
        f: Option<&[f64]>,
        opts: &WaveformOptions,
    ) -> Result<usize, HostError> {
        if channel >= self.channels.len() {
            return Err(HostError::BadIndex(channel));
        }
        if t.len() != v.len() {
            return Err(HostError::LengthMismatch {
                times: t.len(),
                values: v.len(),
            });
        }
        for track in [p, f].into_iter().flatten() {
            if track.len() != t.len() {
                return Err(HostError::LengthMismatch {
                    times: t.len(),
                    values: track.len(),
                });
            }
        }

        let tick_scale = self.freq / f64::from(1u32 << opts.shift);
        let ticks: Vec<f64> = t.iter().map(|&s| s * tick_scale).collect();

        // Quantize to DAC units before fitting: the line loads then
        // reproduce the knot values bit-exactly
        let quantize = |volts: f64| -> f64 {
            let clipped = (volts / MAX_OUT_VOLTS).clamp(-1.0, 1.0);
            (clipped * MAX_VAL).round().clamp(-32768.0, 32767.0)
        };
        let mut units: Vec<f64> = v.iter().map(|&volts| quantize(volts)).collect();

        let first = LineOptions {
            trigger: opts.trigger,
            clear: opts.clear,
            aux: opts.aux,
            ..LineOptions::default()
        };
        let mid = LineOptions {
            aux: opts.aux,
            ..LineOptions::default()
        };
        let last = LineOptions {
            silence: opts.silence,
            end: opts.end,
            wait: opts.wait,
            aux: opts.aux,
            ..LineOptions::default()
        };

        let order = opts.order.min(t.len().saturating_sub(1));
        let freq = self.freq;
        let host_channel = &mut self.channels[channel];
        let index = host_channel.new_segment();
        let segment = &mut host_channel.segments[index];

        if p.is_none() && f.is_none() {
            segment.bias(&ticks, &units, order, opts.shift, &first, &mid, &last, opts.stop)?;
        } else {
            let gain = crate::cordic_gain();
            for unit in &mut units {
                *unit = (*unit / gain).round();
            }
            let phase: Option<Vec<f64>> = p.map(|p| {
                p.iter()
                    .map(|&radians| (radians / std::f64::consts::PI * MAX_VAL).round())
                    .collect()
            });
            let tuning: Option<Vec<f64>> = f.map(|f| {
                f.iter().map(|&hz| (hz / freq * MAX_VAL).round()).collect()
            });
            segment.dds(
                &ticks,
                &units,
                phase.as_deref(),
                tuning.as_deref(),
                order,
                opts.shift,
                &first,
                &mid,
                &last,
                opts.stop,
            )?;
        }
        Ok(index)
    }
}
