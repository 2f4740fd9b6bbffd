//! Pipelined CORDIC rotator (circular, rotate mode, 16-bit).
//!
//! Rotates the vector `(xi, yi)` by the angle `zi`, where the full 16-bit
//! phase range is one turn. After the pipeline latency the output is
//! `xo = K·xi·cos(2π·zi/2^16) − K·yi·sin(2π·zi/2^16)` with the intrinsic
//! gain K = Π √(1 + 2^(−2i)) ≈ 1.6468. The host pre-divides amplitudes by
//! K, so the commanded amplitude comes out bit-accurate.
//!
//! The per-stage arithmetic is exact; the pipeline is modelled as the
//! stage computation followed by a fixed delay line, which is
//! bit-identical to stage-by-stage registers because the datapath has no
//! feedback.

use std::collections::VecDeque;

/// Microrotation count (one per output bit).
const STAGES: usize = 16;

/// Guard fraction bits carried through the iteration.
const GUARD: u32 = 8;

/// atan(2^−i) in phase units of one turn / 2^16.
const ATAN: [i32; STAGES] = [
    8192, 4836, 2555, 1297, 651, 326, 163, 81, 41, 20, 10, 5, 3, 1, 1, 0,
];

/// 16-bit pipelined CORDIC rotator.
#[derive(Debug)]
pub struct Cordic {
    pipe: VecDeque<i16>,
}

impl Cordic {
    /// Pipeline latency in cycles: the quadrant stage plus one register
    /// per microrotation.
    pub const LATENCY: usize = STAGES + 1;

    /// Intrinsic gain K.
    #[must_use]
    pub fn gain() -> f64 {
        (0..STAGES).map(|i| (1.0 + 2f64.powi(-2 * i as i32)).sqrt()).product()
    }

    #[must_use]
    pub fn new() -> Self {
        Self {
            pipe: VecDeque::from(vec![0; Self::LATENCY]),
        }
    }

    /// The sample leaving the pipeline this cycle.
    #[must_use]
    pub fn output(&self) -> i16 {
        self.pipe.front().copied().unwrap_or(0)
    }

    /// Advance one cycle with the given inputs.
    pub fn tick(&mut self, xi: i16, yi: i16, zi: u16) {
        self.pipe.pop_front();
        self.pipe.push_back(Self::rotate(xi, yi, zi));
    }

    /// Flush the pipeline to zero.
    pub fn reset(&mut self) {
        self.pipe.iter_mut().for_each(|v| *v = 0);
    }

    /// The combinational rotation.
    fn rotate(xi: i16, yi: i16, zi: u16) -> i16 {
        let mut x = i32::from(xi) << GUARD;
        let mut y = i32::from(yi) << GUARD;
        // Signed phase: one turn spans the full 16-bit range
        let mut z = i32::from(zi as i16);

        // Quadrant fold: microrotations converge only within ±1/4 turn,
        // so fold the outer half-turn by point reflection
        if z > 0x4000 {
            z -= 0x8000;
            x = -x;
            y = -y;
        } else if z < -0x4000 {
            z += 0x8000;
            x = -x;
            y = -y;
        }

        for (i, &atan) in ATAN.iter().enumerate() {
            let (xs, ys) = (x >> i, y >> i);
            if z >= 0 {
                x -= ys;
                y += xs;
                z -= atan;
            } else {
                x += ys;
                y -= xs;
                z += atan;
            }
        }

        let rounded = (x + (1 << (GUARD - 1))) >> GUARD;
        rounded.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
    }
}

impl Default for Cordic {
    fn default() -> Self {
        Self::new()
    }
}
