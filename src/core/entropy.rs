//! Random bit sources for weighted choices.
//!
//! Every probabilistic decision in the engine (which dependency to measure, how a
//! measurement collapses) consumes bits from an explicitly passed [`BitSource`]. Recording
//! the bits is enough to replay a whole game.

use std::collections::VecDeque;

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::core::fraction::Fraction;
use crate::error::{Result, RulesError};

/// A finite supply of random bits.
pub trait BitSource {
    /// Consume `n` bits (at most 128), most significant first.
    fn draw_bits(&mut self, n: u32) -> Result<u128>;

    /// Bits still available.
    fn remaining(&self) -> usize;
}

/// FIFO queue of pre-drawn bits.
#[derive(Debug, Clone, Default)]
pub struct BitQueue {
    bits: VecDeque<bool>,
}

impl BitQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `n` bits from the thread-local CSPRNG.
    pub fn add_random(&mut self, n: usize) {
        let mut rng = rand::rng();
        self.bits.extend((0..n).map(|_| rng.random::<bool>()));
    }

    /// Append `n` bits from a ChaCha stream seeded with `seed`.
    pub fn add_seeded(&mut self, seed: u64, n: usize) {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        self.bits.extend((0..n).map(|_| rng.random::<bool>()));
    }

    /// Append literal bits (tests and replays).
    pub fn add_custom<I: IntoIterator<Item = bool>>(&mut self, bits: I) {
        self.bits.extend(bits);
    }

    pub fn clear(&mut self) {
        self.bits.clear();
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }
}

impl BitSource for BitQueue {
    fn draw_bits(&mut self, n: u32) -> Result<u128> {
        if n > 128 {
            return Err(RulesError::invalid_value(format!(
                "cannot draw {n} bits at once"
            )));
        }
        if self.bits.len() < n as usize {
            return Err(RulesError::InsufficientEntropy {
                needed: n,
                remaining: self.bits.len(),
            });
        }
        let mut v: u128 = 0;
        for _ in 0..n {
            let bit = self.bits.pop_front().unwrap_or(false);
            v = (v << 1) | bit as u128;
        }
        Ok(v)
    }

    fn remaining(&self) -> usize {
        self.bits.len()
    }
}

/// `ceil(log2(limit))`; zero for `limit <= 1`.
#[inline]
pub fn bits_for(limit: u128) -> u32 {
    if limit <= 1 {
        0
    } else {
        128 - (limit - 1).leading_zeros()
    }
}

/// Uniform integer in `0..limit` by rejection sampling.
pub fn random_below(source: &mut dyn BitSource, limit: u128) -> Result<u128> {
    if limit == 0 {
        return Err(RulesError::invalid_value("random_below(0)"));
    }
    let bits = bits_for(limit);
    loop {
        let v = source.draw_bits(bits)?;
        if v < limit {
            return Ok(v);
        }
    }
}

/// Uniform big integer in `0..limit` by rejection sampling, drawing at most 128 bits at
/// a time, most significant first.
pub fn random_below_big(source: &mut dyn BitSource, limit: &BigUint) -> Result<BigUint> {
    if limit.is_zero() {
        return Err(RulesError::invalid_value("random_below(0)"));
    }
    let bits = if limit.is_one() {
        0
    } else {
        (limit - 1u32).bits()
    };
    loop {
        let mut v = BigUint::zero();
        let mut left = bits;
        while left > 0 {
            let chunk = left.min(128);
            v = (v << chunk) | BigUint::from(source.draw_bits(chunk as u32)?);
            left -= chunk;
        }
        if &v < limit {
            return Ok(v);
        }
    }
}

/// Index drawn with probability proportional to `weights`.
///
/// Weights are scaled to a common denominator so the draw is exact.
pub fn weighted_index(source: &mut dyn BitSource, weights: &[Fraction]) -> Result<usize> {
    if weights.iter().any(|w| w.is_negative()) {
        return Err(RulesError::invalid_value("negative weight"));
    }
    let common = weights
        .iter()
        .fold(BigInt::one(), |acc, w| acc.lcm(w.denominator()));
    let scaled: Vec<BigUint> = weights
        .iter()
        .filter_map(|w| (w.numerator() * (&common / w.denominator())).to_biguint())
        .collect();
    let total: BigUint = scaled.iter().sum();
    if total.is_zero() {
        return Err(RulesError::invalid_value("all weights are zero"));
    }

    let mut r = random_below_big(source, &total)?;
    for (i, w) in scaled.iter().enumerate() {
        if &r < w {
            return Ok(i);
        }
        r -= w;
    }
    Err(RulesError::invalid_value("weighted draw fell outside the total"))
}

/// `true` with probability `p` (clamped to `[0, 1]`).
pub fn weighted_coin(source: &mut dyn BitSource, p: &Fraction) -> Result<bool> {
    let p = p.clone().clamp(Fraction::zero(), Fraction::one());
    let q = Fraction::one() - &p;
    Ok(weighted_index(source, &[p, q])? == 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_counts() {
        assert_eq!(bits_for(1), 0);
        assert_eq!(bits_for(2), 1);
        assert_eq!(bits_for(3), 2);
        assert_eq!(bits_for(4), 2);
        assert_eq!(bits_for(5), 3);
    }

    #[test]
    fn rejection_sampling_consumes_until_in_range() {
        let mut q = BitQueue::new();
        // 11 = 3 is rejected for limit 3, then 10 = 2 is accepted.
        q.add_custom([true, true, true, false]);
        assert_eq!(random_below(&mut q, 3).unwrap(), 2);
        assert!(q.is_empty());
    }

    #[test]
    fn exhausted_queue_reports_insufficient_entropy() {
        let mut q = BitQueue::new();
        q.add_custom([true]);
        assert_eq!(
            random_below(&mut q, 4),
            Err(RulesError::InsufficientEntropy {
                needed: 2,
                remaining: 1
            })
        );
    }

    #[test]
    fn weighted_choice_uses_common_denominator() {
        let third = Fraction::new(1, 3).unwrap();
        let two_thirds = Fraction::new(2, 3).unwrap();
        let mut q = BitQueue::new();
        // total = 3, draws 00 -> 0, 01 -> 1, 10 -> 2
        q.add_custom([false, false, false, true, true, false]);
        assert_eq!(weighted_index(&mut q, &[third.clone(), two_thirds.clone()]).unwrap(), 0);
        assert_eq!(weighted_index(&mut q, &[third.clone(), two_thirds.clone()]).unwrap(), 1);
        assert_eq!(weighted_index(&mut q, &[third.clone(), two_thirds.clone()]).unwrap(), 1);
    }

    #[test]
    fn certain_coin_needs_no_bits() {
        let mut q = BitQueue::new();
        assert!(weighted_coin(&mut q, &Fraction::one()).unwrap());
        assert!(!weighted_coin(&mut q, &Fraction::zero()).unwrap());
    }

    #[test]
    fn wide_totals_draw_in_chunks() {
        let limit = BigUint::one() << 130u32;
        let mut q = BitQueue::new();
        q.add_custom(std::iter::repeat(true).take(130));
        assert_eq!(random_below_big(&mut q, &limit).unwrap(), limit - 1u32);
        assert!(q.is_empty());
    }

    #[test]
    fn seeded_streams_replay() {
        let mut a = BitQueue::new();
        let mut b = BitQueue::new();
        a.add_seeded(7, 64);
        b.add_seeded(7, 64);
        assert_eq!(a.draw_bits(64).unwrap(), b.draw_bits(64).unwrap());
    }
}
