// Deterministic, seedable randomness for the MuseMap composer.
//
// Two pieces live here:
// - `RandomSource`: the port every randomized composition step takes as
//   `&mut impl RandomSource`. Only `next_u64` is required; the derived
//   draws (unit floats, bounded integers, float ranges) are provided
//   methods so that every implementation derives them the same way.
// - `MuseRng`: xoshiro256++ (Blackman & Vigna, 2019) seeded through
//   SplitMix64. It is the production implementation of the port.
//
// `musemap_music` never reaches for an ambient RNG: the pattern generator is
// a pure function of (idea, random source), so a fixed seed reproduces a
// composition bit for bit, and tests can substitute scripted sources.
//
// **Determinism.** `next_u64` must produce identical output given the same
// prior state on every platform and optimization level. The core generator
// uses integer arithmetic only; floats are derived from it by exact bit
// shifts.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of random draws for humanization decisions.
pub trait RandomSource {
    /// Next raw 64-bit value.
    fn next_u64(&mut self) -> u64;

    /// Uniform `f64` in [0, 1), built from the upper 53 bits.
    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform integer in `[low, high)`.
    ///
    /// Rejection sampling keeps the draw free of modulo bias.
    /// Panics if `low >= high`.
    fn range_usize(&mut self, low: usize, high: usize) -> usize {
        assert!(low < high, "range_usize: low must be less than high");
        let span = (high - low) as u64;
        if span.is_power_of_two() {
            return low + (self.next_u64() & (span - 1)) as usize;
        }
        // Largest multiple of `span` that fits; draws at or above it are redrawn.
        let limit = u64::MAX - u64::MAX % span;
        loop {
            let r = self.next_u64();
            if r < limit {
                return low + (r % span) as usize;
            }
        }
    }

    /// Uniform `f64` in `[low, high)`.
    ///
    /// Panics if `low >= high`.
    fn range_f64(&mut self, low: f64, high: f64) -> f64 {
        assert!(low < high, "range_f64: low must be less than high");
        low + self.next_f64() * (high - low)
    }
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn next_u64(&mut self) -> u64 {
        (**self).next_u64()
    }
}

/// Xoshiro256++ generator. Clone it to fork an identical stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MuseRng {
    s: [u64; 4],
}

impl MuseRng {
    /// Seed from a single `u64`, expanded to 256 bits with SplitMix64.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        Self {
            s: [
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
            ],
        }
    }

    /// Pick a seed from the wall clock and process id.
    ///
    /// Returns the seed alongside the generator so callers can log it and
    /// reproduce the run later.
    pub fn from_entropy() -> (u64, Self) {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        let seed = nanos ^ (u64::from(std::process::id()) << 32);
        (seed, Self::new(seed))
    }
}

impl RandomSource for MuseRng {
    fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);

        let t = self.s[1] << 17;

        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];

        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        result
    }
}

/// SplitMix64 step, used only to expand seeds.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
