//! Quadrature DDS spline engine.
//!
//! An amplitude forward-difference chain (like the bias engine) feeding
//! the CORDIC's x input, and a phase path: z0 is a phase offset, z1 a
//! frequency tuning word accumulated by the free-running 32-bit phase
//! accumulator `za` *every* cycle (inc or not), z2 a chirp added to z1 on
//! each evolve step. The CORDIC angle is the high half of `za` plus the
//! high half of z0. A line load with the clear flag also zeroes `za`; this
//! is the only persistent state a line can carry across its neighbours.

use awg_core::Line;

use crate::cordic::Cordic;

const MASK48: u64 = (1 << 48) - 1;

/// Amplitude spline + phase accumulator + CORDIC rotator.
#[derive(Debug)]
pub struct DdsEngine {
    x: [u64; 4],
    z0: u32,
    z1: u32,
    z2: u32,
    za: u32,
    cordic: Cordic,
}

impl DdsEngine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            x: [0; 4],
            z0: 0,
            z1: 0,
            z2: 0,
            za: 0,
            cordic: Cordic::new(),
        }
    }

    /// Current output sample: the CORDIC pipeline tail.
    #[must_use]
    pub fn output(&self) -> i16 {
        self.cordic.output()
    }

    /// Free-running phase accumulator (for observability).
    #[must_use]
    pub fn phase_accumulator(&self) -> u32 {
        self.za
    }

    /// Advance one cycle.
    pub fn step(&mut self, inc: bool, load: Option<&Line>) {
        // The rotator consumes this cycle's register values
        let xi = ((self.x[0] >> 32) & 0xFFFF) as u16 as i16;
        let zi = ((self.za >> 16) as u16).wrapping_add((self.z0 >> 16) as u16);
        self.cordic.tick(xi, 0, zi);

        let za_advanced = self.za.wrapping_add(self.z1);
        if let Some(line) = load {
            let d = &line.data;
            self.x[0] = u64::from(d[0]) << 32;
            self.x[1] = (u64::from(d[1]) | (u64::from(d[2]) << 16)) << 16;
            self.x[2] = u64::from(d[3]) | (u64::from(d[4]) << 16) | (u64::from(d[5]) << 32);
            self.x[3] = u64::from(d[6]) | (u64::from(d[7]) << 16) | (u64::from(d[8]) << 32);
            self.z0 = u32::from(d[9]) << 16;
            self.z1 = u32::from(d[10]) | (u32::from(d[11]) << 16);
            self.z2 = u32::from(d[12]) | (u32::from(d[13]) << 16);
            self.za = if line.header.clear { 0 } else { za_advanced };
        } else {
            if inc {
                self.x[0] = (self.x[0] + self.x[1]) & MASK48;
                self.x[1] = (self.x[1] + self.x[2]) & MASK48;
                self.x[2] = (self.x[2] + self.x[3]) & MASK48;
                self.z1 = self.z1.wrapping_add(self.z2);
            }
            self.za = za_advanced;
        }
    }

    /// Zero everything, including the CORDIC pipeline.
    pub fn reset(&mut self) {
        self.x = [0; 4];
        self.z0 = 0;
        self.z1 = 0;
        self.z2 = 0;
        self.za = 0;
        self.cordic.reset();
    }
}

impl Default for DdsEngine {
    fn default() -> Self {
        Self::new()
    }
}
