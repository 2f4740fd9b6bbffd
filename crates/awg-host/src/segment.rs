//! Line emission: fixed-point packing of spline coefficients.
//!
//! A segment accumulates encoded lines for one frame. The bias and DDS
//! builders take times in dilated ticks and values in DAC units (the
//! device layer does the volts/seconds conversion), fit the requested
//! spline, apply the adder-chain correction, scale each derivative by
//! 2^(16·(w−1)) for its half-word width w, round, and pack little-endian.

use awg_core::{LineHeader, MAX_DATA_WORDS};

use crate::spline;
use crate::HostError;

/// Half-word widths of the four bias coefficients.
const BIAS_WIDTHS: [u32; 4] = [1, 2, 3, 3];

/// Half-word widths of the DDS frequency and chirp words.
const FREQ_WIDTHS: [u32; 2] = [2, 2];

/// Flags applied to an emitted line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineOptions {
    pub trigger: bool,
    pub silence: bool,
    pub aux: bool,
    pub end: bool,
    pub clear: bool,
    pub wait: bool,
}

/// One frame's worth of encoded lines.
#[derive(Debug, Default)]
pub struct Segment {
    data: Vec<u8>,
    /// Word address assigned at placement.
    pub addr: Option<u16>,
}

impl Segment {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Encoded bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Size in 16-bit words.
    #[must_use]
    pub fn word_len(&self) -> usize {
        self.data.len() / 2
    }

    /// Append one line.
    ///
    /// Rejects oversized data and zero durations. Lines shorter than
    /// their own fetch time (header + length words) still play correctly
    /// from the FIFO's slack, but cannot stream back to back forever.
    pub fn line(
        &mut self,
        typ: u8,
        dt: u16,
        words: &[u16],
        shift: u8,
        opts: &LineOptions,
    ) -> Result<(), HostError> {
        if words.len() > MAX_DATA_WORDS {
            return Err(HostError::LineTooLong(words.len()));
        }
        if dt == 0 {
            return Err(HostError::ZeroDuration);
        }
        let header = LineHeader {
            length: words.len() as u8 + 1,
            typ,
            trigger: opts.trigger,
            silence: opts.silence,
            aux: opts.aux,
            shift,
            end: opts.end,
            clear: opts.clear,
            wait: opts.wait,
        };
        self.data.extend_from_slice(&header.encode().to_le_bytes());
        self.data.extend_from_slice(&dt.to_le_bytes());
        for &word in words {
            self.data.extend_from_slice(&word.to_le_bytes());
        }
        Ok(())
    }

    /// Append a bias spline through `(t, v)`: times in dilated ticks,
    /// values in DAC units. Emits one line per interval; `stop` appends a
    /// holding line so the output does not drift past the last point.
    pub fn bias(
        &mut self,
        t: &[f64],
        v: &[f64],
        order: usize,
        shift: u8,
        first: &LineOptions,
        mid: &LineOptions,
        last: &LineOptions,
        stop: bool,
    ) -> Result<(), HostError> {
        let (tr, dt) = line_times(t, v, order)?;
        let order = order.min(t.len() - 1);

        let mut dv = spline::derivatives(t, v, order, &tr);
        spline::adder_chain_correction(&mut dv, order);

        let count = dt.len();
        for (i, (d, &ticks)) in dv.iter().zip(&dt).enumerate() {
            let words = pack(&BIAS_WIDTHS[..=order], &scaled(d, &BIAS_WIDTHS));
            let opts = pick(i, count, first, mid, if stop { mid } else { last });
            self.line(0, ticks, &words, shift, &opts)?;
        }
        if stop {
            let hold = pack(&BIAS_WIDTHS[..1], &[v[v.len() - 1].round() as i64]);
            self.line(0, 2, &hold, shift, last)?;
        }
        Ok(())
    }

    /// Append a DDS spline: amplitude through `(t, v)` as for
    /// [`Self::bias`] (already divided by the CORDIC gain), plus optional
    /// phase (16-bit turn units) and frequency (tuning-word units, scaled
    /// by 2^16 on packing) tracks, both fitted linearly.
    pub fn dds(
        &mut self,
        t: &[f64],
        v: &[f64],
        p: Option<&[f64]>,
        f: Option<&[f64]>,
        order: usize,
        shift: u8,
        first: &LineOptions,
        mid: &LineOptions,
        last: &LineOptions,
        stop: bool,
    ) -> Result<(), HostError> {
        let (tr, dt) = line_times(t, v, order)?;
        let order = order.min(t.len() - 1);
        for track in [p, f].into_iter().flatten() {
            if track.len() != t.len() {
                return Err(HostError::LengthMismatch {
                    times: t.len(),
                    values: track.len(),
                });
            }
        }

        let mut dv = spline::derivatives(t, v, order, &tr);
        spline::adder_chain_correction(&mut dv, order);

        let dp = p.map(|p| spline::derivatives(t, p, 1.min(t.len() - 1), &tr));
        let df = f.map(|f| spline::derivatives(t, f, 1.min(t.len() - 1), &tr));

        let count = dt.len();
        for (i, (d, &ticks)) in dv.iter().zip(&dt).enumerate() {
            let mut words = Vec::with_capacity(MAX_DATA_WORDS);
            // With a phase track the amplitude occupies all nine words so
            // the phase lands at its fixed slot
            let amp_widths: &[u32] = if dp.is_some() {
                &BIAS_WIDTHS
            } else {
                &BIAS_WIDTHS[..=order]
            };
            words.extend(pack(amp_widths, &scaled(d, &BIAS_WIDTHS)));
            if let Some(dp) = &dp {
                words.extend(pack(&[1], &[dp[i][0].round() as i64]));
                if let Some(df) = &df {
                    let freq = [
                        (df[i][0] * 65536.0).round() as i64,
                        (df[i][1] * 65536.0).round() as i64,
                    ];
                    words.extend(pack(&FREQ_WIDTHS, &freq));
                }
            }
            let opts = pick(i, count, first, mid, if stop { mid } else { last });
            self.line(1, ticks, &words, shift, &opts)?;
        }
        if stop {
            let p_hold = p.map_or(0.0, |p| p[p.len() - 1]);
            let f_hold = f.map_or(0.0, |f| f[f.len() - 1]);
            let hold = pack(
                &[1, 2, 3, 3, 1, 2],
                &[
                    v[v.len() - 1].round() as i64,
                    0,
                    0,
                    0,
                    p_hold.round() as i64,
                    (f_hold * 65536.0).round() as i64,
                ],
            );
            self.line(1, 2, &hold, shift, last)?;
        }
        Ok(())
    }
}

/// Rounded tick times and per-line durations, validated.
fn line_times(t: &[f64], v: &[f64], order: usize) -> Result<(Vec<f64>, Vec<u16>), HostError> {
    if t.len() < 2 {
        return Err(HostError::TooFewPoints(t.len()));
    }
    if t.len() != v.len() {
        return Err(HostError::LengthMismatch {
            times: t.len(),
            values: v.len(),
        });
    }
    if order > 3 {
        return Err(HostError::OrderTooHigh(order));
    }
    let tr: Vec<f64> = t.iter().map(|x| x.round()).collect();
    let mut dt = Vec::with_capacity(t.len() - 1);
    for (i, pair) in tr.windows(2).enumerate() {
        let ticks = (pair[1] - pair[0]) as i64;
        if ticks < 1 {
            return Err(HostError::NonMonotonicTimes { index: i + 1 });
        }
        if ticks > i64::from(u16::MAX) {
            return Err(HostError::DurationTooLong { index: i + 1, ticks });
        }
        dt.push(ticks as u16);
    }
    let tr = tr[..t.len() - 1].to_vec();
    Ok((tr, dt))
}

/// Scale derivatives by 2^(16·(w−1)) and round to integers.
fn scaled(d: &[f64; 4], widths: &[u32]) -> Vec<i64> {
    d.iter()
        .zip(widths)
        .map(|(value, &w)| (value * 2f64.powi(16 * (w as i32 - 1))).round() as i64)
        .collect()
}

/// Pack values little-endian, `w` half-words each. Overshooting
/// interpolants are not range-checked; they wrap like the device would.
fn pack(widths: &[u32], values: &[i64]) -> Vec<u16> {
    let mut out = Vec::new();
    for (&w, &value) in widths.iter().zip(values) {
        for j in 0..w {
            out.push((value >> (16 * j)) as u16);
        }
    }
    out
}

/// First / middle / last option selection. A single-line segment is both
/// first and last: its flags combine.
fn pick(i: usize, count: usize, first: &LineOptions, mid: &LineOptions, last: &LineOptions) -> LineOptions {
    match (i == 0, i == count - 1) {
        (true, true) => LineOptions {
            trigger: first.trigger || last.trigger,
            silence: first.silence || last.silence,
            aux: first.aux || last.aux,
            end: first.end || last.end,
            clear: first.clear || last.clear,
            wait: first.wait || last.wait,
        },
        (true, false) => *first,
        (false, true) => *last,
        (false, false) => *mid,
    }
}
