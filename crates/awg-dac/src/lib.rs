//! Per-channel playback datapath.
//!
//! Each DAC channel owns a waveform memory, a parser that walks the jump
//! table and assembles [`awg_core::Line`] records, a small FIFO, and a
//! sequencer that schedules lines in dilated time and runs the two spline
//! engines (bias DC and quadrature DDS) whose outputs sum into one signed
//! 16-bit sample per clock.

mod bias;
mod cordic;
mod dac;
mod dds;
mod fifo;
mod parser;
mod sequencer;

pub use bias::BiasEngine;
pub use cordic::Cordic;
pub use dac::{DEFAULT_FIFO_DEPTH, Dac};
pub use dds::DdsEngine;
pub use fifo::LineFifo;
pub use parser::{Parser, ParserState};
pub use sequencer::Sequencer;
