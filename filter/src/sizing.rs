//! Bloom filter sizing and bit-position derivation.
//!
//! Deliberately simple textbook math — the exact false-positive behavior is
//! a non-goal of the layer that consumes this crate; this only needs to be
//! a real, working Bloom filter.

use std::hash::{Hash, Hasher};

use bloomd_manager::FilterParams;

/// Bit-array length (`m`) and hash-function count (`k`) for a target
/// capacity and false-positive rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sizing {
    pub m_bits: u64,
    pub k: u32,
}

impl Sizing {
    pub fn compute(params: &FilterParams) -> Result<Self, crate::Error> {
        let p = params.false_positive_rate;
        if !(p > 0.0 && p < 1.0) {
            return Err(crate::Error::InvalidParams(format!(
                "false_positive_rate must be in (0, 1), got {p}"
            )));
        }

        let n = params.capacity.get() as f64;
        let ln2 = std::f64::consts::LN_2;
        let m_bits = (-(n * p.ln()) / (ln2 * ln2)).ceil().max(64.0) as u64;
        let k = ((m_bits as f64 / n) * ln2).round().max(1.0) as u32;

        Ok(Self { m_bits, k })
    }

    pub fn words(&self) -> u64 {
        self.m_bits.div_ceil(64)
    }

    /// Kirsch-Mitzenmacher double hashing: derive `k` bit positions from two
    /// independent 64-bit hashes instead of running `k` hash functions.
    pub fn positions(&self, key: &[u8]) -> impl Iterator<Item = u64> + '_ {
        let h1 = hash_with_seed(key, 0x9E37_79B9_7F4A_7C15);
        let h2 = hash_with_seed(key, 0xC2B2_AE3D_27D4_EB4F).max(1);
        (0..self.k as u64).map(move |i| (h1.wrapping_add(i.wrapping_mul(h2))) % self.m_bits)
    }
}

fn hash_with_seed(key: &[u8], seed: u64) -> u64 {
    let mut hasher = foldhash::fast::FixedState::with_seed(seed).build_hasher();
    key.hash(&mut hasher);
    hasher.finish()
}
