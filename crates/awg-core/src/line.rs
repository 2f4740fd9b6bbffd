//! The line record: one unit of waveform execution.
//!
//! A line is stored in channel memory as consecutive little-endian 16-bit
//! words: a header, a duration, and the spline coefficient data. The
//! header `length` nibble counts every word that follows the header (the
//! duration word plus the data words), which is how the parser knows when
//! a line ends without any explicit framing.
//!
//! # Header word layout (bit 0 = LSB)
//!
//! | Bits  | Field   |                                          |
//! |-------|---------|------------------------------------------|
//! | 0–3   | length  | words after the header (dt + data, 1–15) |
//! | 4–5   | typ     | 0 = bias spline, 1 = DDS spline          |
//! | 6     | trigger | wait for trigger before executing        |
//! | 7     | silence | mute the DAC clock while active          |
//! | 8     | aux     | AUX TTL level while active               |
//! | 9–12  | shift   | time dilation: one tick = 2^shift cycles |
//! | 13    | end     | return to the jump table after this line |
//! | 14    | clear   | zero the DDS phase accumulator on load   |
//! | 15    | wait    | wait for trigger after executing         |
//!
//! # Data packing
//!
//! For `typ = 0` (bias) the data words hold four signed coefficients of
//! 1, 2, 3 and 3 half-words: the value and its first three forward
//! differences, each successive one carrying 16 more fraction bits. For
//! `typ = 1` (DDS) the same four amplitude coefficients are followed by a
//! one-word phase offset (turns × 2^16), a two-word frequency tuning word
//! and a two-word chirp. Words the host does not emit load as zero.

/// Maximum number of coefficient data words in one line.
pub const MAX_DATA_WORDS: usize = 14;

/// Which spline engine a line drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineType {
    /// Bias DC spline (four-accumulator polynomial engine).
    Bias,
    /// Quadrature DDS spline (amplitude chain + CORDIC rotator).
    Dds,
    /// Reserved encodings 2 and 3. Loads neither engine.
    Reserved(u8),
}

impl LineType {
    /// Decode the two-bit `typ` field.
    #[must_use]
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x3 {
            0 => Self::Bias,
            1 => Self::Dds,
            other => Self::Reserved(other),
        }
    }

    /// Encode to the two-bit `typ` field.
    #[must_use]
    pub fn bits(self) -> u8 {
        match self {
            Self::Bias => 0,
            Self::Dds => 1,
            Self::Reserved(other) => other & 0x3,
        }
    }
}

/// Decoded line header word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineHeader {
    /// Words following the header: the dt word plus the data words (1–15).
    pub length: u8,
    /// Spline engine selector (two bits).
    pub typ: u8,
    /// Wait for trigger before executing.
    pub trigger: bool,
    /// Mute the DAC clock while this line is active.
    pub silence: bool,
    /// AUX TTL level while this line is active.
    pub aux: bool,
    /// Time-dilation exponent: one dilated tick = 2^shift cycles.
    pub shift: u8,
    /// Return to the jump table after this line.
    pub end: bool,
    /// Zero the persistent DDS phase accumulator on load.
    pub clear: bool,
    /// Wait for trigger after executing.
    pub wait: bool,
}

impl LineHeader {
    /// Decode a header word.
    #[must_use]
    pub fn decode(word: u16) -> Self {
        Self {
            length: (word & 0x0F) as u8,
            typ: ((word >> 4) & 0x3) as u8,
            trigger: word & (1 << 6) != 0,
            silence: word & (1 << 7) != 0,
            aux: word & (1 << 8) != 0,
            shift: ((word >> 9) & 0x0F) as u8,
            end: word & (1 << 13) != 0,
            clear: word & (1 << 14) != 0,
            wait: word & (1 << 15) != 0,
        }
    }

    /// Encode to a header word.
    #[must_use]
    pub fn encode(&self) -> u16 {
        u16::from(self.length & 0x0F)
            | (u16::from(self.typ & 0x3) << 4)
            | (u16::from(self.trigger) << 6)
            | (u16::from(self.silence) << 7)
            | (u16::from(self.aux) << 8)
            | (u16::from(self.shift & 0x0F) << 9)
            | (u16::from(self.end) << 13)
            | (u16::from(self.clear) << 14)
            | (u16::from(self.wait) << 15)
    }

    /// Spline engine selected by this header.
    #[must_use]
    pub fn line_type(&self) -> LineType {
        LineType::from_bits(self.typ)
    }

    /// Number of coefficient data words (length minus the dt word).
    #[must_use]
    pub fn data_words(&self) -> usize {
        usize::from(self.length.saturating_sub(1))
    }
}

/// One fully-assembled line, as transferred from parser to sequencer.
///
/// `data` is always 14 words; entries beyond [`LineHeader::data_words`]
/// are zero, matching the zero-fill of the parser's assembly register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Line {
    pub header: LineHeader,
    /// Duration in dilated ticks. Zero is malformed.
    pub dt: u16,
    /// Spline coefficient words.
    pub data: [u16; MAX_DATA_WORDS],
}

impl Line {
    /// The populated coefficient words.
    #[must_use]
    pub fn data_words(&self) -> &[u16] {
        &self.data[..self.header.data_words().min(MAX_DATA_WORDS)]
    }

    /// Serialize to memory-image words: header, dt, data.
    #[must_use]
    pub fn words(&self) -> Vec<u16> {
        let mut words = Vec::with_capacity(2 + self.header.data_words());
        words.push(self.header.encode());
        words.push(self.dt);
        words.extend_from_slice(self.data_words());
        words
    }

    /// Rebuild a line from memory-image words.
    ///
    /// Returns `None` if `words` is shorter than the header's length field
    /// implies. Extra words are ignored (they belong to the next line).
    #[must_use]
    pub fn from_words(words: &[u16]) -> Option<Self> {
        let header = LineHeader::decode(*words.first()?);
        let n = header.data_words();
        if n > MAX_DATA_WORDS || words.len() < 2 + n {
            return None;
        }
        let mut data = [0u16; MAX_DATA_WORDS];
        data[..n].copy_from_slice(&words[2..2 + n]);
        Some(Self {
            header,
            dt: words[1],
            data,
        })
    }
}
