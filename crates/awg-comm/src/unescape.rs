//! Escape demultiplexer: one byte stream in, two lanes out.
//!
//! The protocol reserves one byte value E. A byte that is not E passes to
//! the data lane. `E b` (b ≠ E) delivers `b` to the command lane. `E E`
//! delivers a literal E to the data lane. Any byte stream is legal; the
//! only state is whether the previous byte was an unmatched escape.

use awg_core::ESCAPE;

/// Where an accepted byte was routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    /// Bulk-data lane (memory write messages).
    Data(u8),
    /// Control lane (opcodes).
    Command(u8),
}

/// The two-lane escape demultiplexer.
#[derive(Debug)]
pub struct Unescaper {
    escape: u8,
    was_escape: bool,
}

impl Unescaper {
    #[must_use]
    pub fn new() -> Self {
        Self::with_escape(ESCAPE)
    }

    /// Use a non-default escape byte.
    #[must_use]
    pub fn with_escape(escape: u8) -> Self {
        Self {
            escape,
            was_escape: false,
        }
    }

    /// Accept one byte. Returns the routed byte, or `None` when the byte
    /// was a lone escape (swallowed until its successor arrives).
    pub fn push(&mut self, byte: u8) -> Option<Lane> {
        let is_escape = byte == self.escape;
        let out = if is_escape == self.was_escape {
            // 00: plain data. 11: doubled escape, literal on the data lane.
            Some(Lane::Data(byte))
        } else if is_escape {
            // 01: escape opens, swallow
            None
        } else {
            // 10: escaped byte is an opcode
            Some(Lane::Command(byte))
        };
        self.was_escape = is_escape && !self.was_escape;
        out
    }

    /// Forget a pending unmatched escape.
    pub fn reset(&mut self) {
        self.was_escape = false;
    }
}

impl Default for Unescaper {
    fn default() -> Self {
        Self::new()
    }
}
