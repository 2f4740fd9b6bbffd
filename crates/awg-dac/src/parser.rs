//! Memory parser: walks the jump table and assembles lines.
//!
//! A five-state machine driven by the external frame select and the
//! start/arm levels. The memory read port is synchronous: the word used in
//! a state was addressed in the previous one, and the registered address
//! advances one behind the read stream. State transitions:
//!
//! - **JUMP**: address the jump-table entry for the current frame; leave
//!   when start is high.
//! - **FRAME**: the entry just read is the frame start address, or zero
//!   for "no frame here" (back to JUMP).
//! - **HEADER**: latch the header word, note its length.
//! - **LINE**: read the dt word and the data words, one per cycle.
//! - **STB**: offer the line downstream; hold until the FIFO accepts. If
//!   arm drops, return to JUMP without emitting.
//!
//! The parser never validates memory contents; a host that writes a
//! malformed image gets unspecified playback. Word counts wrap at the
//! 4-bit assembly index exactly like the hardware, so even a zero-length
//! header terminates.

use awg_core::{ChannelMemory, Line, LineHeader, MAX_DATA_WORDS};

use crate::fifo::LineFifo;

/// Parser state, exposed for the board's observability hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParserState {
    #[default]
    Jump,
    Frame,
    Header,
    Line,
    Stb,
}

/// Per-channel memory parser.
#[derive(Debug, Default)]
pub struct Parser {
    state: ParserState,
    /// Registered read address (one ahead of the word in `dat_r`).
    adr: u16,
    /// Synchronous read-port output: the word addressed last cycle.
    dat_r: u16,
    /// Line assembly register.
    line: Line,
    /// 4-bit assembly index: 1 targets dt, 2.. target the data words.
    data_read: u8,
}

impl Parser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Advance one clock cycle.
    pub fn tick(
        &mut self,
        mem: &ChannelMemory,
        frame: u8,
        start: bool,
        arm: bool,
        fifo: &mut LineFifo,
    ) {
        let read_adr = match self.state {
            ParserState::Jump => u16::from(frame & 0x7),
            ParserState::Frame => self.dat_r,
            _ => self.adr,
        };

        let mut inc = false;
        match self.state {
            ParserState::Jump => {
                if start {
                    self.state = ParserState::Frame;
                }
            }
            ParserState::Frame => {
                inc = true;
                self.state = if self.dat_r == 0 {
                    ParserState::Jump
                } else {
                    ParserState::Header
                };
            }
            ParserState::Header => {
                inc = true;
                self.line = Line {
                    header: LineHeader::decode(self.dat_r),
                    ..Line::default()
                };
                self.data_read = 1;
                self.state = ParserState::Line;
            }
            ParserState::Line => {
                let done = self.data_read == self.line.header.length & 0x0F;
                match self.data_read {
                    1 => self.line.dt = self.dat_r,
                    idx => {
                        let slot = usize::from(idx).wrapping_sub(2);
                        if slot < MAX_DATA_WORDS {
                            self.line.data[slot] = self.dat_r;
                        }
                    }
                }
                self.data_read = (self.data_read + 1) & 0x0F;
                if done {
                    self.state = ParserState::Stb;
                } else {
                    inc = true;
                }
            }
            ParserState::Stb => {
                if !arm {
                    self.state = ParserState::Jump;
                } else if !fifo.is_full() {
                    fifo.push(self.line);
                    inc = true;
                    self.state = if self.line.header.end {
                        ParserState::Jump
                    } else {
                        ParserState::Header
                    };
                }
            }
        }

        if inc {
            self.adr = read_adr.wrapping_add(1);
        }
        self.dat_r = mem.read(read_adr);
    }

    /// Back to JUMP, dropping the line in flight.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
