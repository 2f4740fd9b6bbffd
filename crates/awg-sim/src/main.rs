//! Headless AWG board runner.
//!
//! Plays a wire-byte dump (as produced by `run --dump`) through the
//! simulated board and writes the resulting DAC samples as WAV, CSV or a
//! JSON summary report.

use std::path::PathBuf;
use std::process;

use awg_sim::capture::{self, RunReport};
use awg_sim::{Awg, AwgConfig};

struct CliArgs {
    input: Option<PathBuf>,
    cycles: usize,
    frame: u8,
    trigger: bool,
    wav: Option<PathBuf>,
    csv: Option<PathBuf>,
    json: Option<PathBuf>,
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        input: None,
        cycles: 6000,
        frame: 0,
        trigger: false,
        wav: None,
        csv: None,
        json: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--input" => {
                i += 1;
                cli.input = args.get(i).map(PathBuf::from);
            }
            "--cycles" => {
                i += 1;
                if let Some(s) = args.get(i) {
                    cli.cycles = s.parse().unwrap_or(6000);
                }
            }
            "--frame" => {
                i += 1;
                if let Some(s) = args.get(i) {
                    cli.frame = s.parse().unwrap_or(0);
                }
            }
            "--trigger" => {
                cli.trigger = true;
            }
            "--wav" => {
                i += 1;
                cli.wav = args.get(i).map(PathBuf::from);
            }
            "--csv" => {
                i += 1;
                cli.csv = args.get(i).map(PathBuf::from);
            }
            "--json" => {
                i += 1;
                cli.json = args.get(i).map(PathBuf::from);
            }
            "--help" | "-h" => {
                eprintln!("Usage: awg-sim --input FILE [OPTIONS]");
                eprintln!();
                eprintln!("Options:");
                eprintln!("  --input <file>   Wire-byte dump to play");
                eprintln!("  --cycles <n>     Clock cycles to run [default: 6000]");
                eprintln!("  --frame <n>      External frame select (0-7) [default: 0]");
                eprintln!("  --trigger        Hold the external trigger pad high");
                eprintln!("  --wav <file>     Write samples as 3-channel WAV");
                eprintln!("  --csv <file>     Write samples as CSV");
                eprintln!("  --json <file>    Write a JSON run report");
                process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

fn main() {
    let cli = parse_args();

    let Some(input) = cli.input else {
        eprintln!("awg-sim: --input is required (see --help)");
        process::exit(1);
    };
    let bytes = match std::fs::read(&input) {
        Ok(bytes) => bytes,
        Err(err) => {
            eprintln!("awg-sim: cannot read {}: {err}", input.display());
            process::exit(1);
        }
    };

    let mut awg = Awg::new(&AwgConfig::default());
    awg.set_frame(cli.frame);
    awg.set_trigger(cli.trigger);
    awg.feed(&bytes);
    let samples = awg.run(cli.cycles);

    if awg.pending_input() > 0 {
        eprintln!(
            "awg-sim: warning: {} input bytes left unconsumed after {} cycles",
            awg.pending_input(),
            cli.cycles
        );
    }

    let report = RunReport::from_samples(&samples, awg.sample_rate_hz());
    for (ch, channel) in report.channels.iter().enumerate() {
        eprintln!(
            "ch{ch}: min {} max {} first-active {:?}",
            channel.min, channel.max, channel.first_active
        );
    }

    let result = (|| -> Result<(), Box<dyn std::error::Error>> {
        if let Some(path) = &cli.wav {
            capture::save_wav(&samples, awg.sample_rate_hz(), path)?;
        }
        if let Some(path) = &cli.csv {
            capture::save_csv(&samples, path)?;
        }
        if let Some(path) = &cli.json {
            capture::save_report(&report, path)?;
        }
        Ok(())
    })();

    if let Err(err) = result {
        eprintln!("awg-sim: {err}");
        process::exit(1);
    }
}
