//! Segment placement and the per-channel memory image.
//!
//! The image is the eight-word jump table followed by the segments packed
//! back to back. Placement assigns each segment its word address; the
//! table maps each externally-selectable frame to a segment start (or 0
//! for "no frame here").

use awg_core::NUM_FRAMES;

use crate::segment::Segment;
use crate::HostError;

/// One channel's worth of segments on the host side.
#[derive(Debug)]
pub struct HostChannel {
    pub segments: Vec<Segment>,
    capacity: usize,
}

impl HostChannel {
    /// `capacity` is the channel memory depth in words.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            segments: Vec::new(),
            capacity,
        }
    }

    /// Channel memory depth in words.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append an empty segment, returning its index.
    pub fn new_segment(&mut self) -> usize {
        self.segments.push(Segment::new());
        self.segments.len() - 1
    }

    /// Assign addresses to all segments. Returns the total image size in
    /// words.
    pub fn place(&mut self) -> Result<usize, HostError> {
        let mut addr = NUM_FRAMES;
        for segment in &mut self.segments {
            segment.addr = Some(addr as u16);
            addr += segment.word_len();
        }
        if addr > self.capacity {
            return Err(HostError::MemoryOverflow {
                needed: addr,
                capacity: self.capacity,
            });
        }
        Ok(addr)
    }

    /// Encode the jump table for a frame→segment map. `None` entries (and
    /// frames beyond the map) read as 0: "no frame configured".
    ///
    /// Call [`Self::place`] first; unplaced segments encode as 0.
    #[must_use]
    pub fn table(&self, entry: &[Option<usize>]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(NUM_FRAMES * 2);
        for frame in 0..NUM_FRAMES {
            let addr = entry
                .get(frame)
                .copied()
                .flatten()
                .and_then(|segment| self.segments.get(segment))
                .and_then(|segment| segment.addr)
                .unwrap_or(0);
            bytes.extend_from_slice(&addr.to_le_bytes());
        }
        bytes
    }

    /// Place segments and serialize the full memory image. With no
    /// explicit map, frame i plays segment i.
    pub fn serialize(&mut self, entry: Option<&[Option<usize>]>) -> Result<Vec<u8>, HostError> {
        self.place()?;
        let identity: Vec<Option<usize>> = (0..self.segments.len()).map(Some).collect();
        let mut image = self.table(entry.unwrap_or(&identity));
        for segment in &self.segments {
            image.extend_from_slice(segment.bytes());
        }
        Ok(image)
    }
}
