//! Replayable randomness for genes and evolution.

use std::cell::RefCell;
use std::rc::Rc;

use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// A source of random bits.
pub trait Noise {
    /// Next 8 random bits.
    fn next_byte(&mut self) -> u8;

    /// Uniform in `[0, 1)`.
    fn next_double(&mut self) -> f64;

    /// Uniform in `0..count`.
    fn choose(&mut self, count: usize) -> usize {
        (self.next_double() * count as f64) as usize
    }

    /// Seed that restarts this stream at its current position.
    fn copy_seed(&self) -> NoiseSeed;
}

/// Noise shared by every gene of a session.
pub type SharedNoise = Rc<RefCell<dyn Noise>>;

/// Wrap a noise source for sharing.
pub fn shared(noise: impl Noise + 'static) -> SharedNoise {
    Rc::new(RefCell::new(noise))
}

/// Seed bytes plus the number of draws already taken from them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoiseSeed {
    pub bytes: [u8; 32],
    pub count: u64,
}

impl NoiseSeed {
    /// Fresh seed at draw zero.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self { bytes, count: 0 }
    }

    /// Seed derived from a 64-bit value.
    pub fn from_u64(seed: u64) -> Self {
        let mut bytes = [0u8; 32];
        StdRng::seed_from_u64(seed).fill_bytes(&mut bytes);
        Self::new(bytes)
    }
}

/// Pseudo-random noise that counts its draws so it can be replayed.
pub struct PseudoNoise {
    rng: StdRng,
    seed: NoiseSeed,
}

impl PseudoNoise {
    /// Create with random seed.
    pub fn random() -> Self {
        Self::from_seed(NoiseSeed::new(rand::random()))
    }

    /// Restart from a seed, fast-forwarding past `seed.count` draws.
    pub fn from_seed(seed: NoiseSeed) -> Self {
        let mut noise = Self {
            rng: StdRng::from_seed(seed.bytes),
            seed: NoiseSeed::new(seed.bytes),
        };
        while noise.seed.count < seed.count {
            noise.next_double();
        }
        noise
    }

    /// Number of draws taken so far.
    pub fn draws(&self) -> u64 {
        self.seed.count
    }
}

impl Noise for PseudoNoise {
    fn next_byte(&mut self) -> u8 {
        (self.next_double() * 256.0) as u8
    }

    fn next_double(&mut self) -> f64 {
        self.seed.count += 1;
        self.rng.r#gen::<f64>()
    }

    fn copy_seed(&self) -> NoiseSeed {
        self.seed.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED_BYTES: [u8; 32] = [
        0x8A, 0x98, 0xAF, 0x9B, 0x63, 0xBB, 0x98, 0x31, 0x62, 0x11, 0x3A, 0x71, 0x7F, 0x7E, 0x45,
        0xAE, 0x8A, 0x98, 0xAF, 0x9B, 0x63, 0xBB, 0x98, 0x31, 0x62, 0x11, 0x3A, 0x71, 0x7F, 0x7E,
        0x45, 0xAE,
    ];

    #[test]
    fn test_replay_from_copied_seed() {
        let mut noise0 = PseudoNoise::from_seed(NoiseSeed::new(SEED_BYTES));
        for _ in 0..100 {
            noise0.next_byte();
        }
        let mut noise1 = PseudoNoise::from_seed(noise0.copy_seed());
        assert_eq!(noise1.draws(), 100);
        for _ in 0..100 {
            assert_eq!(noise0.next_byte(), noise1.next_byte());
        }
    }

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = PseudoNoise::from_seed(NoiseSeed::from_u64(7));
        let mut b = PseudoNoise::from_seed(NoiseSeed::from_u64(7));
        for _ in 0..50 {
            assert_eq!(a.next_double().to_bits(), b.next_double().to_bits());
        }
    }

    #[test]
    fn test_choose_in_range() {
        let mut noise = PseudoNoise::from_seed(NoiseSeed::from_u64(3));
        for _ in 0..1000 {
            assert!(noise.choose(17) < 17);
        }
    }
}
