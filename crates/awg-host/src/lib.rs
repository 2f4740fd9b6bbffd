//! Host-side waveform compiler.
//!
//! Turns (time, voltage[, phase, frequency]) sample arrays into the exact
//! byte stream the device consumes: spline derivative computation with
//! adder-chain latency correction, fixed-point coefficient packing into
//! lines, segment placement behind the per-channel jump table, and the
//! escape-framed wire protocol with its control opcodes. Everything is
//! validated before a single byte is written; the device never sees a
//! malformed image from this path.

mod channel;
mod device;
pub mod expr;
mod segment;
pub mod spline;

pub use channel::HostChannel;
pub use device::{Command, Device, WaveformOptions, NUM_BOARDS};
pub use segment::{LineOptions, Segment};

use std::fmt;

/// Full-scale output voltage.
pub const MAX_OUT_VOLTS: f64 = 10.0;

/// DAC unit scale: signed 16-bit full scale.
pub const MAX_VAL: f64 = 32768.0;

/// CORDIC intrinsic gain Π √(1 + 2^(−2i)), pre-divided out of DDS
/// amplitudes so the rotator's output is bit-accurate.
#[must_use]
pub fn cordic_gain() -> f64 {
    (0..16).map(|i| (1.0 + 2f64.powi(-2 * i)).sqrt()).product()
}

/// Compiler-side validation and I/O errors.
#[derive(Debug)]
pub enum HostError {
    /// Sample times must be strictly increasing by at least one tick.
    NonMonotonicTimes { index: usize },
    /// A line with a zero duration is malformed.
    ZeroDuration,
    /// A line duration exceeds the 16-bit tick counter.
    DurationTooLong { index: usize, ticks: i64 },
    /// Spline order above cubic.
    OrderTooHigh(usize),
    /// Fewer than two sample points.
    TooFewPoints(usize),
    /// Time and value arrays differ in length.
    LengthMismatch { times: usize, values: usize },
    /// Line data exceeds the 14-word budget.
    LineTooLong(usize),
    /// Memory image exceeds the channel memory.
    MemoryOverflow { needed: usize, capacity: usize },
    /// No such channel or segment.
    BadIndex(usize),
    /// Transport failure; device state is unaffected.
    Io(std::io::Error),
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonMonotonicTimes { index } => {
                write!(f, "sample times not strictly increasing at index {index}")
            }
            Self::ZeroDuration => write!(f, "line duration of zero ticks"),
            Self::DurationTooLong { index, ticks } => {
                write!(f, "line {index} lasts {ticks} ticks (max 65535)")
            }
            Self::OrderTooHigh(order) => write!(f, "spline order {order} (max 3)"),
            Self::TooFewPoints(n) => write!(f, "need at least 2 sample points, got {n}"),
            Self::LengthMismatch { times, values } => {
                write!(f, "{times} times but {values} values")
            }
            Self::LineTooLong(words) => write!(f, "line data of {words} words (max 14)"),
            Self::MemoryOverflow { needed, capacity } => {
                write!(f, "memory image needs {needed} words, channel holds {capacity}")
            }
            Self::BadIndex(index) => write!(f, "no such channel or segment: {index}"),
            Self::Io(err) => write!(f, "I/O: {err}"),
        }
    }
}

impl std::error::Error for HostError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for HostError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}
