//! Endless genes: named bit streams that grow on demand.
//!
//! A gene stores its bits in a byte buffer which is extended with fresh
//! random bytes whenever a scan reads past its end. Several scans may read
//! the same gene at independent positions, so two consumers of one gene see
//! the same bits without coordinating.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Read, Write};

use serde::{Deserialize, Serialize};

use super::GeneticsError;
use super::noise::SharedNoise;
use crate::codec;

/// Identifies one cursor of a gene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScanId(pub u32);

/// Number of bits consumed to resolve `divisions` steps.
///
/// Starts at 3 and grows by one per halving of `divisions`, so
/// `bits_for(2) == 5` and `bits_for(10) == 7`.
pub fn bits_for(divisions: usize) -> u32 {
    let mut divisions = divisions;
    let mut bits = 3;
    while divisions > 0 {
        divisions >>= 1;
        bits += 1;
    }
    bits
}

/// A named, lazily growing source of bits.
pub struct Gene {
    name: String,
    bytes: Vec<u8>,
    scans: BTreeMap<ScanId, u32>,
    noise: Option<SharedNoise>,
}

impl Gene {
    /// Create an empty gene, optionally attached to a noise source.
    pub fn new(name: impl Into<String>, noise: Option<SharedNoise>) -> Self {
        Self {
            name: name.into(),
            bytes: Vec::new(),
            scans: BTreeMap::new(),
            noise,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of bits realised so far.
    pub fn bit_len(&self) -> usize {
        self.bytes.len() * 8
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Live scans and their next bit positions.
    pub fn scans(&self) -> impl Iterator<Item = (ScanId, u32)> + '_ {
        self.scans.iter().map(|(id, pos)| (*id, *pos))
    }

    /// Attach or detach the noise that extends this gene.
    pub fn set_noise(&mut self, noise: Option<SharedNoise>) {
        self.noise = noise;
    }

    /// Allocate a new scan at position zero.
    pub fn create_scan(&mut self) -> ScanId {
        let id = ScanId(self.scans.keys().next_back().map_or(1, |last| last.0 + 1));
        self.scans.insert(id, 0);
        id
    }

    /// Re-attach to a scan, creating it at position zero if it is unknown.
    pub fn scan(&mut self, id: ScanId) -> GeneReader<'_> {
        self.scans.entry(id).or_insert(0);
        GeneReader { gene: self, id }
    }

    /// Remove a scan's cursor.
    pub fn destroy_scan(&mut self, id: ScanId) {
        self.scans.remove(&id);
    }

    /// Flip `max(1, round(chance * bit_len))` randomly chosen bits.
    ///
    /// Returns the number of flips; an empty gene is left alone.
    pub fn mutate(&mut self, chance_of_mutation: f64) -> Result<usize, GeneticsError> {
        if self.bytes.is_empty() {
            return Ok(0);
        }
        let noise = self
            .noise
            .as_ref()
            .ok_or_else(|| GeneticsError::Detached(self.name.clone()))?;
        let bit_len = self.bit_len();
        let count = ((chance_of_mutation * bit_len as f64).round() as usize).max(1);
        let mut noise = noise.borrow_mut();
        for _ in 0..count {
            let position = noise.choose(bit_len);
            self.bytes[position / 8] ^= 0x80 >> (position % 8);
        }
        Ok(count)
    }

    /// Give up on the realised bits; they will be re-rolled on demand.
    pub fn forget(&mut self) {
        self.bytes.clear();
    }

    fn bit(&self, position: usize) -> bool {
        self.bytes[position / 8] & (0x80 >> (position % 8)) != 0
    }

    fn next_bit(&mut self, id: ScanId) -> Result<bool, GeneticsError> {
        let position = self.scans.get(&id).copied().unwrap_or(0) as usize;
        let byte = position / 8;
        while byte >= self.bytes.len() {
            let Some(noise) = &self.noise else {
                return Err(GeneticsError::Exhausted(self.name.clone()));
            };
            let fresh = noise.borrow_mut().next_byte();
            self.bytes.push(fresh);
        }
        self.scans.insert(id, position as u32 + 1);
        Ok(self.bit(position))
    }

    /// Write name, live scans and raw bytes.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        codec::write_str(w, &self.name)?;
        let scan_count = u16::try_from(self.scans.len())
            .map_err(|_| codec::invalid_data("too many scans"))?;
        codec::write_u16(w, scan_count)?;
        for (id, position) in &self.scans {
            codec::write_u32(w, id.0)?;
            codec::write_u32(w, *position)?;
        }
        codec::write_u32(w, self.bytes.len() as u32)?;
        w.write_all(&self.bytes)
    }

    /// Read a gene written by [`Gene::write_to`].
    pub fn read_from<R: Read>(r: &mut R, noise: Option<SharedNoise>) -> io::Result<Self> {
        let mut gene = Gene::new(codec::read_str(r)?, noise);
        let scan_count = codec::read_u16(r)?;
        for _ in 0..scan_count {
            let id = ScanId(codec::read_u32(r)?);
            let position = codec::read_u32(r)?;
            gene.scans.insert(id, position);
        }
        let len = codec::read_u32(r)? as usize;
        gene.bytes = codec::read_bytes(r, len)?;
        Ok(gene)
    }
}

impl fmt::Display for Gene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for position in 0..self.bit_len() {
            f.write_str(if self.bit(position) { "1" } else { "0" })?;
        }
        for (id, position) in &self.scans {
            write!(f, " scan({}/{})", id.0, position)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Gene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gene")
            .field("name", &self.name)
            .field("bytes", &self.bytes.len())
            .field("scans", &self.scans)
            .field("attached", &self.noise.is_some())
            .finish()
    }
}

/// A scan positioned on a gene, decoding decisions from its bits.
pub struct GeneReader<'a> {
    gene: &'a mut Gene,
    id: ScanId,
}

impl GeneReader<'_> {
    pub fn id(&self) -> ScanId {
        self.id
    }

    /// Next bit position of this scan.
    pub fn position(&self) -> u32 {
        self.gene.scans.get(&self.id).copied().unwrap_or(0)
    }

    /// Fixed-point fraction of `bits_for(divisions)` bits, mapped onto `[low, high]`.
    pub fn interpolate(
        &mut self,
        low: f64,
        high: f64,
        divisions: usize,
    ) -> Result<f64, GeneticsError> {
        let value = self.nuance(bits_for(divisions))?;
        Ok(low * (1.0 - value) + high * value)
    }

    /// A decision in `0..options`.
    pub fn choice(&mut self, options: usize) -> Result<usize, GeneticsError> {
        let choice = self.interpolate(0.0, options as f64, options)? as usize;
        Ok(choice.min(options.saturating_sub(1)))
    }

    /// `count` raw bits.
    pub fn choices(&mut self, count: usize) -> Result<Vec<bool>, GeneticsError> {
        (0..count).map(|_| self.gene.next_bit(self.id)).collect()
    }

    fn nuance(&mut self, bits: u32) -> Result<f64, GeneticsError> {
        let mut numerator = 0u64;
        let mut denominator = 0u64;
        for _ in 0..bits {
            numerator <<= 1;
            denominator <<= 1;
            if self.gene.next_bit(self.id)? {
                numerator += 1;
            }
            denominator += 1;
        }
        Ok(numerator as f64 / denominator as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genetics::noise::{NoiseSeed, PseudoNoise, shared};
    use proptest::prelude::*;
    use std::io::Cursor;

    fn seeded(name: &str, seed: u64) -> Gene {
        Gene::new(name, Some(shared(PseudoNoise::from_seed(NoiseSeed::from_u64(seed)))))
    }

    #[test]
    fn test_bits_for() {
        assert_eq!(bits_for(0), 3);
        assert_eq!(bits_for(1), 4);
        assert_eq!(bits_for(2), 5);
        assert_eq!(bits_for(3), 5);
        assert_eq!(bits_for(10), 7);
    }

    #[test]
    fn test_choice_consumes_bits_for_options() {
        let mut gene = seeded("g", 1);
        let id = gene.create_scan();
        let mut scan = gene.scan(id);
        let choice = scan.choice(3).unwrap();
        assert!(choice < 3);
        assert_eq!(scan.position(), bits_for(3));
    }

    #[test]
    fn test_all_ones_clamps_choice() {
        let mut gene = Gene::new("ones", None);
        gene.bytes = vec![0xFF; 4];
        let id = gene.create_scan();
        assert_eq!(gene.scan(id).choice(4).unwrap(), 3);
        assert_eq!(gene.scan(id).interpolate(2.0, 5.0, 1).unwrap(), 5.0);
    }

    #[test]
    fn test_scans_are_independent() {
        let mut gene = seeded("g", 2);
        let a = gene.create_scan();
        let b = gene.create_scan();
        assert_ne!(a, b);
        let first = gene.scan(a).choices(24).unwrap();
        let second = gene.scan(b).choices(24).unwrap();
        assert_eq!(first, second);
        assert_eq!(gene.bit_len(), 24);
    }

    #[test]
    fn test_exhausted_without_noise() {
        let mut gene = Gene::new("finished", None);
        gene.bytes = vec![0b1010_0000];
        let id = gene.create_scan();
        let bits = gene.scan(id).choices(8).unwrap();
        assert_eq!(bits[0..3], [true, false, true]);
        let err = gene.scan(id).choices(1).unwrap_err();
        assert!(matches!(err, GeneticsError::Exhausted(name) if name == "finished"));
    }

    #[test]
    fn test_create_scan_after_destroy() {
        let mut gene = seeded("g", 3);
        let a = gene.create_scan();
        let b = gene.create_scan();
        gene.destroy_scan(a);
        let c = gene.create_scan();
        assert!(c > b);
        assert_eq!(gene.scans().count(), 2);
    }

    #[test]
    fn test_mutate_counts() {
        let mut gene = seeded("g", 4);
        assert_eq!(gene.mutate(0.5).unwrap(), 0);

        let id = gene.create_scan();
        gene.scan(id).choices(80).unwrap();
        assert_eq!(gene.bit_len(), 80);
        assert_eq!(gene.mutate(0.0).unwrap(), 1);
        assert_eq!(gene.mutate(0.1).unwrap(), 8);
        assert_eq!(gene.mutate(0.01).unwrap(), 1);
    }

    #[test]
    fn test_mutate_flips_bits() {
        let mut gene = seeded("g", 5);
        let id = gene.create_scan();
        gene.scan(id).choices(64).unwrap();
        let before = gene.bytes().to_vec();
        gene.mutate(1.0 / 64.0).unwrap();
        let flipped: u32 = before
            .iter()
            .zip(gene.bytes())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum();
        assert_eq!(flipped, 1);
    }

    #[test]
    fn test_forget_rerolls() {
        let mut gene = seeded("g", 6);
        let id = gene.create_scan();
        gene.scan(id).choices(16).unwrap();
        gene.forget();
        assert_eq!(gene.bit_len(), 0);
        let fresh = gene.create_scan();
        gene.scan(fresh).choices(8).unwrap();
        assert_eq!(gene.bit_len(), 8);
    }

    proptest! {
        #[test]
        fn prop_same_seed_same_decisions(seed in any::<u64>(), options in 1usize..40) {
            let mut a = seeded("a", seed);
            let mut b = seeded("b", seed);
            let sa = a.create_scan();
            let sb = b.create_scan();
            for _ in 0..10 {
                prop_assert_eq!(a.scan(sa).choice(options).unwrap(), b.scan(sb).choice(options).unwrap());
                prop_assert_eq!(
                    a.scan(sa).interpolate(-1.0, 1.0, options).unwrap().to_bits(),
                    b.scan(sb).interpolate(-1.0, 1.0, options).unwrap().to_bits()
                );
                prop_assert_eq!(a.scan(sa).choices(3).unwrap(), b.scan(sb).choices(3).unwrap());
            }
        }

        #[test]
        fn prop_round_trip_preserves_decisions(seed in any::<u64>(), read in 0usize..64, later in 1usize..64) {
            let mut gene = seeded("round", seed);
            let id = gene.create_scan();
            gene.scan(id).choices(read).unwrap();
            let mut buf = Vec::new();
            gene.write_to(&mut buf).unwrap();
            let expected = gene.scan(id).choices(later).unwrap();

            let mut restored = Gene::read_from(&mut Cursor::new(buf), None).unwrap();
            let known = restored.bit_len().saturating_sub(read);
            let actual = restored.scan(id).choices(later.min(known)).unwrap();
            prop_assert_eq!(&expected[..actual.len()], &actual[..]);
        }
    }
}
