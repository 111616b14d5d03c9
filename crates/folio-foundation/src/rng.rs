//! Deterministic random number streams.
//!
//! All randomness in a Folio document (asset picks, `random()` and the other
//! seeded expression helpers) derives from the document seed combined with a
//! semantic label, so a document rendered twice with the same seed resolves
//! identically.
//!
//! The generator is SplitMix64: deterministic, portable, fast, and of good
//! statistical quality for presentation purposes.

use crate::stable_hash::fnv1a64_str;

/// A deterministic pseudo-random number stream.
///
/// Streams are created from a seed plus a label and produce a reproducible
/// sequence. Each generation call advances the stream state; streams never
/// reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RngStream {
    state: u64,
}

impl RngStream {
    /// Create a stream from a raw seed.
    #[inline]
    pub const fn new(seed: u64) -> Self {
        // SplitMix64 requires a non-zero state.
        let state = if seed == 0 { 0x9E3779B97F4A7C15 } else { seed };
        Self { state }
    }

    /// Create a stream by combining a parent seed with a semantic label.
    ///
    /// This is the primary constructor: `RngStream::derive(seed, "assets/p1")`.
    #[inline]
    pub fn derive(parent_seed: u64, label: &str) -> Self {
        let mixed = splitmix64_mix(parent_seed ^ fnv1a64_str(label));
        Self::new(mixed)
    }

    /// Create an independent substream by mixing in an extra component
    /// (e.g. a docstep index) without advancing this stream.
    #[inline]
    pub fn substream(&self, salt: u64) -> Self {
        Self::new(splitmix64_mix(self.state ^ salt))
    }

    /// Generate the next random u64.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E3779B97F4A7C15);
        splitmix64_mix(self.state)
    }

    /// Generate a uniform f64 in [0, 1).
    #[inline]
    pub fn uniform(&mut self) -> f64 {
        // 53 high bits, the double's full mantissa precision.
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Pick an index in `0..len` uniformly. Returns `None` for `len == 0`.
    #[inline]
    pub fn pick_index(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            None
        } else {
            Some((self.uniform() * len as f64) as usize % len)
        }
    }

    /// Pick an index with the given non-negative weights.
    ///
    /// Zero-total or empty weight lists fall back to `None`.
    pub fn pick_weighted(&mut self, weights: &[f64]) -> Option<usize> {
        let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
        if total <= 0.0 {
            return None;
        }
        let mut target = self.uniform() * total;
        for (i, w) in weights.iter().enumerate() {
            if *w <= 0.0 {
                continue;
            }
            if target < *w {
                return Some(i);
            }
            target -= *w;
        }
        // Floating point drift: fall back to the last positive weight.
        weights.iter().rposition(|w| *w > 0.0)
    }

    /// Produce a deterministic permutation of `0..len` (Fisher-Yates).
    pub fn permutation(&mut self, len: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..len).collect();
        for i in (1..len).rev() {
            let j = (self.uniform() * (i + 1) as f64) as usize % (i + 1);
            indices.swap(i, j);
        }
        indices
    }
}

#[inline]
fn splitmix64_mix(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streams_are_reproducible() {
        let mut a = RngStream::derive(42, "assets/page:p1:0");
        let mut b = RngStream::derive(42, "assets/page:p1:0");
        for _ in 0..100 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn labels_decorrelate_streams() {
        let mut a = RngStream::derive(42, "a");
        let mut b = RngStream::derive(42, "b");
        assert_ne!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn uniform_in_unit_interval() {
        let mut rng = RngStream::new(7);
        for _ in 0..1000 {
            let v = rng.uniform();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn pick_index_bounds() {
        let mut rng = RngStream::new(3);
        assert_eq!(rng.pick_index(0), None);
        for _ in 0..100 {
            let i = rng.pick_index(5).unwrap();
            assert!(i < 5);
        }
    }

    #[test]
    fn pick_weighted_respects_zero_weights() {
        let mut rng = RngStream::new(9);
        for _ in 0..100 {
            let i = rng.pick_weighted(&[0.0, 1.0, 0.0]).unwrap();
            assert_eq!(i, 1);
        }
        assert_eq!(rng.pick_weighted(&[0.0, 0.0]), None);
        assert_eq!(rng.pick_weighted(&[]), None);
    }

    #[test]
    fn permutation_is_a_permutation() {
        let mut rng = RngStream::new(11);
        let mut p = rng.permutation(10);
        p.sort_unstable();
        assert_eq!(p, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn substream_is_independent_of_parent_advance() {
        let parent = RngStream::derive(1, "x");
        let s1 = parent.substream(5);
        let s2 = parent.substream(5);
        assert_eq!(s1, s2);
        assert_ne!(s1, parent.substream(6));
    }
}
