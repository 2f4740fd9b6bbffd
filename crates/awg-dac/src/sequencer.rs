//! Line sequencer: dilated-time scheduling and engine dispatch.
//!
//! Consumes lines from the FIFO and produces one signed 16-bit sample per
//! clock. Time inside a line is counted in dilated ticks of 2^shift raw
//! cycles; the line's `dt` field is the tick count (the internal register
//! holds `dt − 1`). Line advance is gated by the trigger rules: the
//! current line's wait-after flag and the incoming line's trigger-before
//! flag both demand a trigger, and one trigger satisfies both.
//!
//! Per raw cycle, with `tic` = end of a dilated tick and `toc` = last tick
//! of the line:
//!
//! - `adv  = arm ∧ pending ∧ (trigger ∨ ¬(wait ∨ next_trigger))`
//! - `stb  = tic ∧ toc ∧ adv` — accept the next line now
//! - `inc  = arm ∧ tic ∧ (¬toc ∨ (¬toc0 ∧ ¬adv))` — evolve the engines;
//!   the `toc0` term grants exactly one extra evolve step when the line
//!   has ended but no successor may start, landing the spline on its
//!   endpoint before the dwell.
//!
//! Both engines evolve on `inc`; a load only reaches the engine selected
//! by the line's `typ`. The outputs are summed and registered, so samples
//! trail the engine state by one cycle (plus the CORDIC latency on the
//! DDS path).

use awg_core::{Line, LineHeader, LineType};

use crate::bias::BiasEngine;
use crate::dds::DdsEngine;
use crate::fifo::LineFifo;

/// Per-channel line sequencer.
#[derive(Debug)]
pub struct Sequencer {
    /// Executing line's header.
    header: LineHeader,
    /// Executing line's tick count minus one.
    line_dt: u16,
    /// Elapsed dilated ticks in the current line.
    dt: u16,
    /// Raw-cycle counter within the current dilated tick.
    dt_dec: u16,
    /// Raw cycles per dilated tick minus one (2^shift − 1).
    dt_end: u16,
    /// Previous cycle's `toc`, for the one-extra-step dwell.
    toc0: bool,
    bias: BiasEngine,
    dds: DdsEngine,
    data: i16,
    aux: bool,
    silence: bool,
}

impl Sequencer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            header: LineHeader::default(),
            line_dt: 0,
            dt: 0,
            dt_dec: 0,
            dt_end: 0,
            toc0: false,
            bias: BiasEngine::new(),
            dds: DdsEngine::new(),
            data: 0,
            aux: false,
            silence: false,
        }
    }

    /// Registered DAC sample.
    #[must_use]
    pub fn data(&self) -> i16 {
        self.data
    }

    /// AUX TTL level of the executing line.
    #[must_use]
    pub fn aux(&self) -> bool {
        self.aux
    }

    /// DAC-clock mute level of the executing line.
    #[must_use]
    pub fn silence(&self) -> bool {
        self.silence
    }

    /// The DDS engine (for observability).
    #[must_use]
    pub fn dds(&self) -> &DdsEngine {
        &self.dds
    }

    /// Advance one clock cycle.
    pub fn tick(&mut self, fifo: &mut LineFifo, arm: bool, trigger: bool) {
        let next_trigger = fifo.front().is_some_and(|l| l.header.trigger);
        let pending = !fifo.is_empty();

        let adv = arm && pending && (trigger || !(self.header.wait || next_trigger));
        let tic = self.dt_dec == self.dt_end;
        let toc = self.dt == self.line_dt;
        let stb = tic && toc && adv;
        let inc = arm && tic && (!toc || (!self.toc0 && !adv));

        // Registered outputs sample the engines before they move
        self.data = self.bias.output().wrapping_add(self.dds.output());
        self.aux = self.header.aux;
        self.silence = self.header.silence;

        let new_line: Option<Line> = if stb { fifo.pop() } else { None };
        let load = new_line.as_ref();
        self.bias
            .step(inc, load.filter(|l| l.header.line_type() == LineType::Bias));
        self.dds
            .step(inc, load.filter(|l| l.header.line_type() == LineType::Dds));

        if !tic {
            self.dt_dec += 1;
        } else if !toc {
            self.dt_dec = 0;
            self.dt += 1;
        } else if let Some(line) = new_line {
            self.header = line.header;
            self.line_dt = line.dt.wrapping_sub(1);
            self.dt_end = (1u16 << (line.header.shift & 0x0F)) - 1;
            self.dt_dec = 0;
            self.dt = 0;
        }
        self.toc0 = toc;
    }

    /// Clear all execution state and both engines.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use awg_core::MAX_DATA_WORDS;

    fn bias_line(dt: u16, words: &[u16], opts: impl FnOnce(&mut LineHeader)) -> Line {
        let mut data = [0u16; MAX_DATA_WORDS];
        data[..words.len()].copy_from_slice(words);
        let mut header = LineHeader {
            length: words.len() as u8 + 1,
            ..LineHeader::default()
        };
        opts(&mut header);
        Line {
            header,
            dt,
            data,
        }
    }

    fn samples(seq: &mut Sequencer, fifo: &mut LineFifo, arm: bool, trigger: bool, n: usize) -> Vec<i16> {
        (0..n)
            .map(|_| {
                seq.tick(fifo, arm, trigger);
                seq.data()
            })
            .collect()
    }

    #[test]
    fn idle_sequencer_outputs_zero() {
        let mut seq = Sequencer::new();
        let mut fifo = LineFifo::new(4);
        for s in samples(&mut seq, &mut fifo, true, true, 50) {
            assert_eq!(s, 0);
        }
    }

    #[test]
    fn constant_line_plays_for_dt_ticks() {
        let mut seq = Sequencer::new();
        let mut fifo = LineFifo::new(4);
        fifo.push(bias_line(5, &[0x4000], |h| h.end = true));
        let out = samples(&mut seq, &mut fifo, true, false, 20);
        // Load on the first tick, first sample one cycle after the first
        // evolve; the value then dwells (nothing follows).
        let first = out.iter().position(|&s| s == 0x4000).expect("plays");
        assert!(out[first..].iter().all(|&s| s == 0x4000));
        assert!(first <= 3, "load-to-output latency too long: {first}");
    }

    #[test]
    fn ramp_advances_once_per_dilated_tick() {
        let mut seq = Sequencer::new();
        let mut fifo = LineFifo::new(4);
        // d1 = 7 per tick, shift=2: four raw cycles per dilated tick
        fifo.push(bias_line(6, &[0, 0, 7], |h| {
            h.shift = 2;
            h.end = true;
        }));
        let out = samples(&mut seq, &mut fifo, true, false, 60);
        let mut changes = Vec::new();
        for window in out.windows(2) {
            if window[1] != window[0] {
                changes.push((window[0], window[1]));
            }
        }
        // Values step by 7, and each plateau is four cycles wide
        for &(a, b) in &changes {
            assert_eq!(b - a, 7);
        }
        let first = out.iter().position(|&s| s == 7).expect("ramp starts");
        assert_eq!(out[first..first + 4], [7, 7, 7, 7]);
    }

    #[test]
    fn trigger_before_gates_the_first_line() {
        let mut seq = Sequencer::new();
        let mut fifo = LineFifo::new(4);
        fifo.push(bias_line(4, &[0x1234], |h| {
            h.trigger = true;
            h.end = true;
        }));
        let quiet = samples(&mut seq, &mut fifo, true, false, 30);
        assert!(quiet.iter().all(|&s| s == 0));
        // Trigger arrives: playback begins
        let out = samples(&mut seq, &mut fifo, true, true, 10);
        assert!(out.contains(&0x1234));
    }

    #[test]
    fn wait_after_holds_until_trigger() {
        let mut seq = Sequencer::new();
        let mut fifo = LineFifo::new(4);
        fifo.push(bias_line(3, &[100], |h| h.wait = true));
        fifo.push(bias_line(3, &[200], |h| h.end = true));
        let out = samples(&mut seq, &mut fifo, true, false, 40);
        // First line plays and dwells; the second is blocked by wait
        assert!(out.contains(&100));
        assert!(!out.contains(&200));
        let out = samples(&mut seq, &mut fifo, true, true, 20);
        assert!(out.contains(&200));
    }

    #[test]
    fn one_trigger_satisfies_wait_and_trigger() {
        let mut seq = Sequencer::new();
        let mut fifo = LineFifo::new(4);
        fifo.push(bias_line(3, &[100], |h| h.wait = true));
        fifo.push(bias_line(3, &[200], |h| {
            h.trigger = true;
            h.end = true;
        }));
        samples(&mut seq, &mut fifo, true, false, 20);
        // A single trigger level change releases the pair
        let out = samples(&mut seq, &mut fifo, true, true, 20);
        assert!(out.contains(&200));
    }

    #[test]
    fn disarmed_sequencer_freezes() {
        let mut seq = Sequencer::new();
        let mut fifo = LineFifo::new(4);
        fifo.push(bias_line(10, &[0, 0, 3], |h| h.end = true));
        samples(&mut seq, &mut fifo, true, false, 5);
        // Dropping arm stops the engines mid-ramp; the registered sample
        // settles one cycle later and then never moves
        let out = samples(&mut seq, &mut fifo, false, false, 20);
        assert!(out[1..].windows(2).all(|w| w[0] == w[1]));
        assert_ne!(out[1], 0);
        // Re-arming with a fresh line pending starts it immediately
        fifo.push(bias_line(4, &[0x0777], |h| h.end = true));
        let resumed = samples(&mut seq, &mut fifo, true, false, 10);
        assert!(resumed.contains(&0x0777));
    }

    #[test]
    fn dwell_lands_on_the_line_endpoint() {
        // d0=0, d1=5, dt=4: endpoint value is 4·5 = 20, reached by the
        // extra evolve step granted when no successor is pending.
        let mut seq = Sequencer::new();
        let mut fifo = LineFifo::new(4);
        fifo.push(bias_line(4, &[0, 0, 5], |h| h.end = true));
        let out = samples(&mut seq, &mut fifo, true, false, 30);
        assert_eq!(out.last(), Some(&20));
    }

    #[test]
    fn aux_and_silence_follow_the_line() {
        let mut seq = Sequencer::new();
        let mut fifo = LineFifo::new(4);
        fifo.push(bias_line(4, &[1], |h| {
            h.aux = true;
            h.silence = true;
            h.end = true;
        }));
        assert!(!seq.aux());
        samples(&mut seq, &mut fifo, true, false, 10);
        assert!(seq.aux());
        assert!(seq.silence());
    }

    #[test]
    fn back_to_back_lines_chain_without_gaps() {
        let mut seq = Sequencer::new();
        let mut fifo = LineFifo::new(4);
        fifo.push(bias_line(3, &[10], |_| {}));
        fifo.push(bias_line(3, &[20], |_| {}));
        fifo.push(bias_line(3, &[30], |h| h.end = true));
        let out = samples(&mut seq, &mut fifo, true, false, 40);
        let first = out.iter().position(|&s| s == 10).expect("starts");
        assert_eq!(
            &out[first..first + 9],
            &[10, 10, 10, 20, 20, 20, 30, 30, 30]
        );
    }
}
