//! Core data model for the three-channel spline AWG.
//!
//! Everything on the device advances on a single sample clock (50 MHz, or
//! 100 MHz with the clock doubler engaged). The unit of waveform execution
//! is the [`Line`]: a header word, a duration word, and up to 14 data words
//! holding fixed-point spline coefficients. Lines live in per-channel word
//! memories behind an eight-entry jump table.

mod line;
mod memory;

pub use line::{Line, LineHeader, LineType, MAX_DATA_WORDS};
pub use memory::ChannelMemory;

/// Escape byte of the inbound framing protocol. Doubled to encode a
/// literal; followed by any other byte to encode a control opcode.
pub const ESCAPE: u8 = 0xA5;

/// Number of DAC channels on one board.
pub const NUM_CHANNELS: usize = 3;

/// Jump-table depth: frames selectable by the external 3-bit frame input.
pub const NUM_FRAMES: usize = 8;

/// Per-channel waveform memory depths in 16-bit words.
pub const MEM_DEPTHS: [usize; NUM_CHANNELS] = [8192, 8192, 4096];

/// Sample clock with the doubler off.
pub const BASE_CLOCK_HZ: u32 = 50_000_000;

/// Sample clock with the doubler on.
pub const DCM_CLOCK_HZ: u32 = 100_000_000;
