//! Depletable, splittable energy.

use std::collections::VecDeque;
use std::fmt;
use std::io::{self, Read, Write};

use crate::codec;

/// A store of energy.
///
/// Not `Clone`: splitting moves the whole amount into the pieces.
#[derive(Debug, Default, PartialEq)]
pub struct Energy {
    amount: f64,
}

impl Energy {
    pub fn new(amount: f64) -> Self {
        Self { amount }
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn add(&mut self, amount: f64) {
        self.amount += amount;
    }

    /// Always succeeds, possibly leaving a debt.
    pub fn extract(&mut self, amount: f64) -> f64 {
        self.amount -= amount;
        amount
    }

    /// Only a debt counts as empty; exactly zero is still viable.
    pub fn is_empty(&self) -> bool {
        self.amount < 0.0
    }

    /// Divide into `pieces` equal parts, consuming the whole.
    pub fn split(self, pieces: usize) -> VecDeque<Energy> {
        if pieces == 0 {
            return VecDeque::new();
        }
        let part = self.amount / pieces as f64;
        (0..pieces).map(|_| Energy::new(part)).collect()
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        codec::write_f64(w, self.amount)
    }

    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        Ok(Self::new(codec::read_f64(r)?))
    }
}

impl fmt::Display for Energy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Energy({})", self.amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_zero_is_not_empty() {
        let mut energy = Energy::new(0.1);
        assert_eq!(energy.extract(0.1), 0.1);
        assert_eq!(energy.amount(), 0.0);
        assert!(!energy.is_empty());
        energy.extract(1e-9);
        assert!(energy.is_empty());
        energy.add(1.0);
        assert!(!energy.is_empty());
    }

    #[test]
    fn test_split_moves_everything() {
        let mut energy = Energy::new(0.6);
        let pieces = std::mem::take(&mut energy).split(3);
        assert_eq!(energy.amount(), 0.0);
        assert_eq!(pieces.len(), 3);
        assert!(pieces.iter().all(|p| (p.amount() - 0.2).abs() < 1e-12));
        assert!(Energy::new(1.0).split(0).is_empty());
    }

    proptest! {
        #[test]
        fn prop_split_conserves(amount in -10.0f64..10.0, pieces in 1usize..16) {
            let total: f64 = Energy::new(amount).split(pieces).iter().map(Energy::amount).sum();
            prop_assert!((total - amount).abs() < 1e-9);
        }
    }
}
