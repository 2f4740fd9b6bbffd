//! Waveform upload frontend.
//!
//! Evaluates times and voltages, compiles the spline memory image for one
//! channel/frame, and writes the wire bytes to a serial device node or a
//! dump file, bracketed by the usual command sequence (optional reset and
//! clock-doubler select, start off, upload, start on, arm, free-run
//! trigger).

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::process;

use awg_core::{DCM_CLOCK_HZ, NUM_FRAMES};
use awg_host::{Command, Device, HostError, WaveformOptions, expr};

struct CliArgs {
    serial: Option<PathBuf>,
    dump: Option<PathBuf>,
    channel: usize,
    frame: usize,
    times: String,
    voltages: String,
    order: usize,
    shift: u8,
    reset: bool,
    multiplier: bool,
    disarm: bool,
    free: bool,
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        serial: None,
        dump: None,
        channel: 0,
        frame: 0,
        times: "linspace(0, 4e-6, 5)".to_string(),
        voltages: "0, 2.5, 5, 2.5, 0".to_string(),
        order: 3,
        shift: 0,
        reset: false,
        multiplier: false,
        disarm: false,
        free: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--serial" | "-s" => {
                i += 1;
                cli.serial = args.get(i).map(PathBuf::from);
            }
            "--dump" => {
                i += 1;
                cli.dump = args.get(i).map(PathBuf::from);
            }
            "--channel" | "-c" => {
                i += 1;
                if let Some(s) = args.get(i) {
                    cli.channel = s.parse().unwrap_or(0);
                }
            }
            "--frame" | "-f" => {
                i += 1;
                if let Some(s) = args.get(i) {
                    cli.frame = s.parse().unwrap_or(0);
                }
            }
            "--times" | "-t" => {
                i += 1;
                if let Some(s) = args.get(i) {
                    cli.times.clone_from(s);
                }
            }
            "--voltages" | "-v" => {
                i += 1;
                if let Some(s) = args.get(i) {
                    cli.voltages.clone_from(s);
                }
            }
            "--order" | "-o" => {
                i += 1;
                if let Some(s) = args.get(i) {
                    cli.order = s.parse().unwrap_or(3);
                }
            }
            "--shift" => {
                i += 1;
                if let Some(s) = args.get(i) {
                    cli.shift = s.parse().unwrap_or(0);
                }
            }
            "--reset" | "-r" => cli.reset = true,
            "--multiplier" | "-m" => cli.multiplier = true,
            "--disarm" | "-n" => cli.disarm = true,
            "--free" | "-e" => cli.free = true,
            "--help" | "-h" => {
                eprintln!("Usage: run [OPTIONS]");
                eprintln!();
                eprintln!("Evaluates times and voltages, interpolates and uploads them.");
                eprintln!();
                eprintln!("Options:");
                eprintln!("  --serial <path>     Serial device node to write to");
                eprintln!("  --dump <path>       Write the wire bytes to a file instead");
                eprintln!("  --channel <n>       Channel: 3*board + dac [default: 0]");
                eprintln!("  --frame <n>         Frame (0-7) [default: 0]");
                eprintln!("  --times <list>      Sample times in seconds: \"0,1e-6,...\"");
                eprintln!("                      or linspace(start, stop, count)");
                eprintln!("  --voltages <list>   Sample voltages in volts");
                eprintln!("  --order <k>         Interpolation: 0 const, 1 lin, 2 quad,");
                eprintln!("                      3 cubic [default: 3]");
                eprintln!("  --shift <s>         Time dilation exponent [default: 0]");
                eprintln!("  --reset             Reset the device first");
                eprintln!("  --multiplier        Select the fast 100 MHz clock");
                eprintln!("  --disarm            Leave the device disarmed");
                eprintln!("  --free              Enable the software trigger");
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

fn fail(message: &str) -> ! {
    eprintln!("run: {message}");
    process::exit(1);
}

fn upload(cli: &CliArgs, out: Box<dyn Write>) -> Result<(), HostError> {
    let times = match expr::parse_values(&cli.times) {
        Ok(times) => times,
        Err(err) => fail(&format!("--times: {err}")),
    };
    let voltages = match expr::parse_values(&cli.voltages) {
        Ok(voltages) => voltages,
        Err(err) => fail(&format!("--voltages: {err}")),
    };
    if cli.frame >= NUM_FRAMES {
        fail(&format!("--frame {} (0-7)", cli.frame));
    }

    let mut dev = Device::new(out);

    if cli.reset {
        // Terminate a dangling escape left by an interrupted upload
        dev.flush_escape()?;
        dev.cmd(Command::Reset, true)?;
    }
    if cli.multiplier {
        dev.cmd(Command::Dcm, true)?;
        dev.freq = f64::from(DCM_CLOCK_HZ);
    }
    dev.cmd(Command::Start, false)?;

    let segment = dev.build_segment(
        cli.channel,
        &times,
        &voltages,
        None,
        None,
        &WaveformOptions {
            order: cli.order,
            shift: cli.shift,
            ..WaveformOptions::default()
        },
    )?;
    let mut entry = [None; NUM_FRAMES];
    entry[cli.frame] = Some(segment);
    dev.write_channel(cli.channel, Some(&entry))?;

    dev.cmd(Command::Start, true)?;
    if !cli.disarm {
        dev.cmd(Command::Arm, true)?;
    }
    if cli.free {
        dev.cmd(Command::Trigger, true)?;
    }
    dev.into_inner().flush()?;
    Ok(())
}

fn main() {
    let cli = parse_args();

    let out: Box<dyn Write> = if let Some(path) = &cli.dump {
        match File::create(path) {
            Ok(file) => Box::new(file),
            Err(err) => fail(&format!("cannot create {}: {err}", path.display())),
        }
    } else if let Some(path) = &cli.serial {
        match OpenOptions::new().write(true).open(path) {
            Ok(file) => Box::new(file),
            Err(err) => fail(&format!("cannot open {}: {err}", path.display())),
        }
    } else {
        fail("need --serial <path> or --dump <path>")
    };

    if let Err(err) = upload(&cli, out) {
        fail(&err.to_string());
    }
}
