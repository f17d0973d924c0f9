#![allow(dead_code)]

use emos_sim::{ProcessService, SimConfig};

/// Linear congruential generator (48-bit, java.util.Random constants)
pub struct LcGenerator {
    seed: u64,
}

impl LcGenerator {
    pub fn new(seed: u64) -> Self {
        Self { seed: (seed ^ 0x5DEE_CE66D) & ((1 << 48) - 1) }
    }

    pub fn next(&mut self) -> u64 {
        self.seed = (self.seed.wrapping_mul(0x5_DEEC_E66D).wrapping_add(0xB)) & ((1 << 48) - 1);
        self.seed >> 16
    }

    /// Uniform-ish value in [0, bound)
    pub fn below(&mut self, bound: u64) -> u64 {
        self.next() % bound
    }
}

pub fn reference_sim() -> ProcessService {
    ProcessService::new(SimConfig::default()).expect("reference config is valid")
}
