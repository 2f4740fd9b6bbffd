//! Cycle-accurate model of the three-channel AWG board.
//!
//! The board advances on a single master clock. Each tick consumes at most
//! one inbound byte (escape demux → word packing → memory writer, or the
//! control decoder), resynchronizes the external pads, and advances the
//! three DAC channels. A RESET opcode pulses the reset generator, which
//! holds every state machine cleared for its debounce window while the
//! channel memories survive.

pub mod capture;

use std::collections::VecDeque;

use awg_comm::{Ctrl, Lane, MemWriter, Unescaper, WordPacker};
use awg_core::{BASE_CLOCK_HZ, ChannelMemory, DCM_CLOCK_HZ, MEM_DEPTHS, NUM_CHANNELS};
use awg_dac::Dac;

/// Board construction parameters.
#[derive(Debug, Clone)]
pub struct AwgConfig {
    /// This board's address, as matched against write-message headers.
    /// The address pins are active-low; all pins pulled up reads as 0.
    pub board: u8,
    /// Per-channel memory depths in words.
    pub mem_depths: [usize; NUM_CHANNELS],
}

impl Default for AwgConfig {
    fn default() -> Self {
        Self {
            board: 0,
            mem_depths: MEM_DEPTHS,
        }
    }
}

/// The AWG board.
pub struct Awg {
    input: VecDeque<u8>,
    unescaper: Unescaper,
    packer: WordPacker,
    memwriter: MemWriter,
    ctrl: Ctrl,
    mems: Vec<ChannelMemory>,
    dacs: Vec<Dac>,
    /// External frame-select pad (3 bits).
    frame_pad: u8,
    /// External trigger pad.
    trigger_pad: bool,
    // Two-flop synchronizers for the external pads
    frame_sync: [u8; 2],
    trigger_sync: [bool; 2],
    reset_level: bool,
    master_clock: u64,
}

impl Awg {
    #[must_use]
    pub fn new(config: &AwgConfig) -> Self {
        Self {
            input: VecDeque::new(),
            unescaper: Unescaper::new(),
            packer: WordPacker::new(),
            memwriter: MemWriter::new(config.board),
            ctrl: Ctrl::new(),
            mems: config
                .mem_depths
                .iter()
                .map(|&depth| ChannelMemory::new(depth))
                .collect(),
            dacs: (0..NUM_CHANNELS).map(|_| Dac::new()).collect(),
            frame_pad: 0,
            trigger_pad: false,
            frame_sync: [0; 2],
            trigger_sync: [false; 2],
            reset_level: false,
            master_clock: 0,
        }
    }

    /// Queue inbound bytes. The board consumes one per tick outside reset.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.input.extend(bytes);
    }

    /// Bytes not yet consumed.
    #[must_use]
    pub fn pending_input(&self) -> usize {
        self.input.len()
    }

    /// Drive the external frame-select pad.
    pub fn set_frame(&mut self, frame: u8) {
        self.frame_pad = frame & 0x7;
    }

    /// Drive the external trigger pad.
    pub fn set_trigger(&mut self, level: bool) {
        self.trigger_pad = level;
    }

    /// Advance one master-clock tick.
    pub fn tick(&mut self) {
        self.master_clock += 1;

        self.reset_level = self.ctrl.tick_reset();
        if self.reset_level {
            // Hold every state machine cleared; leave memories and the
            // inbound queue alone
            self.unescaper.reset();
            self.packer.reset();
            self.memwriter.reset();
            self.ctrl.clear_levels();
            for dac in &mut self.dacs {
                dac.reset();
            }
        } else if let Some(byte) = self.input.pop_front() {
            match self.unescaper.push(byte) {
                Some(Lane::Data(b)) => {
                    if let Some(word) = self.packer.push(b) {
                        self.memwriter.push(word, &mut self.mems);
                    }
                }
                Some(Lane::Command(op)) => self.ctrl.exec(op),
                None => {}
            }
        }

        // Pad synchronizers: the channels see the value two flops back
        let frame = self.frame_sync[1];
        let ext_trigger = self.trigger_sync[1];
        self.frame_sync = [self.frame_pad, self.frame_sync[0]];
        self.trigger_sync = [self.trigger_pad, self.trigger_sync[0]];

        if !self.reset_level {
            let trigger = ext_trigger || self.ctrl.trigger;
            for (dac, mem) in self.dacs.iter_mut().zip(&self.mems) {
                dac.tick(mem, frame, self.ctrl.start, self.ctrl.arm, trigger);
            }
        }
    }

    /// Run `cycles` ticks, collecting one sample set per tick.
    pub fn run(&mut self, cycles: usize) -> Vec<[i16; NUM_CHANNELS]> {
        (0..cycles)
            .map(|_| {
                self.tick();
                self.samples()
            })
            .collect()
    }

    /// Current registered sample of every channel.
    #[must_use]
    pub fn samples(&self) -> [i16; NUM_CHANNELS] {
        let mut out = [0i16; NUM_CHANNELS];
        for (slot, dac) in out.iter_mut().zip(&self.dacs) {
            *slot = dac.data();
        }
        out
    }

    /// Board AUX pad: OR of the per-channel aux outputs.
    #[must_use]
    pub fn aux(&self) -> bool {
        self.dacs.iter().any(|dac| dac.out.aux())
    }

    /// DAC-clock mute level of one channel.
    #[must_use]
    pub fn silence(&self, channel: usize) -> bool {
        self.dacs[channel].out.silence()
    }

    /// Reset level this cycle.
    #[must_use]
    pub fn in_reset(&self) -> bool {
        self.reset_level
    }

    /// Soft control levels (trigger, arm, start, dcm).
    #[must_use]
    pub fn levels(&self) -> (bool, bool, bool, bool) {
        (self.ctrl.trigger, self.ctrl.arm, self.ctrl.start, self.ctrl.dcm)
    }

    /// Effective sample rate given the clock-doubler select.
    #[must_use]
    pub fn sample_rate_hz(&self) -> u32 {
        if self.ctrl.dcm { DCM_CLOCK_HZ } else { BASE_CLOCK_HZ }
    }

    /// Master clock tick count.
    #[must_use]
    pub fn master_clock(&self) -> u64 {
        self.master_clock
    }

    /// One channel's memory (for tests and observability).
    #[must_use]
    pub fn memory(&self, channel: usize) -> &ChannelMemory {
        &self.mems[channel]
    }

    /// Parser and sequencer of one channel.
    #[must_use]
    pub fn dac(&self, channel: usize) -> &Dac {
        &self.dacs[channel]
    }
}
