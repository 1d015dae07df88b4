// Deterministic, portable pseudo-random number generator.
//
// Implements xoshiro256++ (Blackman & Vigna, 2019) with SplitMix64 seeding,
// plus the handful of sampling helpers the melody search needs: uniform
// choice from a slice and drawing distinct indices without replacement for
// tournament selection.
//
// Every evolutionary run owns exactly one `HarmonyRng`. Initialization,
// selection, crossover cut points, mutation, and diversity injection all
// draw from it, so a fixed seed reproduces a run bit-for-bit.
//
// **Critical constraint: determinism.** Every method must produce identical
// output given the same prior state, regardless of platform or optimization
// level. No floating-point arithmetic in the core generator, and no other
// source of randomness anywhere in the workspace.

/// Xoshiro256++ PRNG, the workspace's sole source of randomness.
#[derive(Clone, Debug)]
pub struct HarmonyRng {
    s: [u64; 4],
}

impl HarmonyRng {
    /// Create a new PRNG seeded from a `u64`.
    ///
    /// Uses SplitMix64 to expand the seed into the 256-bit internal state.
    /// Two instances created with the same seed produce identical streams.
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

    /// Seed from the system clock. Only the CLI uses this, when no seed
    /// was supplied; library code always takes an explicit generator.
    pub fn from_entropy() -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x5eed);
        Self::new(nanos ^ u64::from(std::process::id()).rotate_left(32))
    }

    /// Generate the next `u64` in the sequence.
    pub fn next_u64(&mut self) -> u64 {
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

    /// Generate a uniform `f64` in [0, 1) from the upper 53 bits.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Generate a uniform random integer in `[low, high)`.
    ///
    /// Uses rejection sampling to avoid modulo bias.
    /// Panics if `low >= high`.
    pub fn range_u64(&mut self, low: u64, high: u64) -> u64 {
        assert!(low < high, "range_u64: low must be less than high");
        let range = high - low;
        if range.is_power_of_two() {
            return low + (self.next_u64() & (range - 1));
        }
        let threshold = range.wrapping_neg() % range; // = (2^64 - range) % range
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return low + (r % range);
            }
        }
    }

    /// Generate a uniform random `usize` in `[low, high)`.
    ///
    /// Panics if `low >= high`.
    pub fn range_usize(&mut self, low: usize, high: usize) -> usize {
        self.range_u64(low as u64, high as u64) as usize
    }

    /// Generate a uniform random `usize` in `[low, high]`.
    ///
    /// Panics if `low > high`.
    pub fn range_usize_inclusive(&mut self, low: usize, high: usize) -> usize {
        assert!(low <= high, "range_usize_inclusive: low must be <= high");
        self.range_u64(low as u64, high as u64 + 1) as usize
    }

    /// Return `true` with probability `p`.
    ///
    /// `p <= 0.0` always returns false, `p >= 1.0` always returns true.
    pub fn random_bool(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Pick a uniformly random element, or `None` for an empty slice.
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        Some(&items[self.range_usize(0, items.len())])
    }

    /// Draw `k` distinct indices from `0..n`, in draw order.
    ///
    /// Partial Fisher-Yates over an index table, so every `k`-subset is
    /// equally likely. Panics if `k > n`.
    pub fn sample_indices(&mut self, n: usize, k: usize) -> Vec<usize> {
        assert!(k <= n, "sample_indices: cannot draw {k} from {n}");
        let mut pool: Vec<usize> = (0..n).collect();
        for i in 0..k {
            let j = self.range_usize(i, n);
            pool.swap(i, j);
        }
        pool.truncate(k);
        pool
    }
}

/// SplitMix64, used only to expand a single `u64` seed into xoshiro state.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn determinism_same_seed_same_output() {
        let mut a = HarmonyRng::new(42);
        let mut b = HarmonyRng::new(42);
        for _ in 0..1000 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn different_seeds_different_output() {
        let mut a = HarmonyRng::new(42);
        let mut b = HarmonyRng::new(43);
        assert_ne!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn f64_in_unit_range() {
        let mut rng = HarmonyRng::new(12345);
        for _ in 0..10_000 {
            let v = rng.next_f64();
            assert!((0.0..1.0).contains(&v), "f64 out of range: {v}");
        }
    }

    #[test]
    fn range_usize_within_bounds() {
        let mut rng = HarmonyRng::new(555);
        for _ in 0..10_000 {
            let v = rng.range_usize(5, 15);
            assert!((5..15).contains(&v), "range_usize out of range: {v}");
        }
    }

    #[test]
    fn range_usize_inclusive_reaches_upper_bound() {
        let mut rng = HarmonyRng::new(1);
        let mut saw_max = false;
        for _ in 0..10_000 {
            let v = rng.range_usize_inclusive(1, 3);
            assert!((1..=3).contains(&v));
            saw_max |= v == 3;
        }
        assert!(saw_max, "range_usize_inclusive should reach the upper bound");
    }

    #[test]
    fn random_bool_extremes() {
        let mut rng = HarmonyRng::new(42);
        for _ in 0..100 {
            assert!(!rng.random_bool(0.0));
            assert!(rng.random_bool(1.0));
        }
    }

    #[test]
    fn choose_empty_is_none() {
        let mut rng = HarmonyRng::new(7);
        let empty: [u8; 0] = [];
        assert_eq!(rng.choose(&empty), None);
        let notes = [60u8, 62, 64];
        for _ in 0..100 {
            assert!(notes.contains(rng.choose(&notes).unwrap()));
        }
    }

    #[test]
    fn sample_indices_are_distinct_and_in_range() {
        let mut rng = HarmonyRng::new(99);
        for _ in 0..1000 {
            let picked = rng.sample_indices(10, 3);
            assert_eq!(picked.len(), 3);
            assert!(picked.iter().all(|&i| i < 10));
            assert_ne!(picked[0], picked[1]);
            assert_ne!(picked[0], picked[2]);
            assert_ne!(picked[1], picked[2]);
        }
    }

    #[test]
    fn sample_all_indices_is_a_permutation() {
        let mut rng = HarmonyRng::new(3);
        let mut picked = rng.sample_indices(6, 6);
        picked.sort_unstable();
        assert_eq!(picked, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    #[should_panic]
    fn sample_more_than_available_panics() {
        HarmonyRng::new(3).sample_indices(2, 3);
    }
}
