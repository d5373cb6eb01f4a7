//! Genome: genes by name, created on first use.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Cursor, Read, Write};

use super::GeneticsError;
use super::gene::{Gene, GeneReader, ScanId};
use super::noise::SharedNoise;
use crate::body::Direction;
use crate::codec;

/// The purpose a gene serves, mapped to its name by [`GeneKey::name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeneKey {
    /// Proportion of energy given to the trunk.
    TrunkLimb,
    /// Number of limbs.
    GrowthBuds,
    /// Root of the trunk bud family.
    GrowthTrunk,
    /// Limb at the given index.
    GrowthLimb(usize),
    /// Muscle pattern when facing a direction.
    Movement(Direction),
}

impl GeneKey {
    pub fn name(self) -> String {
        match self {
            GeneKey::TrunkLimb => "trunk-limb".to_string(),
            GeneKey::GrowthBuds => "growth-buds".to_string(),
            GeneKey::GrowthTrunk => "growth-trunk".to_string(),
            GeneKey::GrowthLimb(index) => format!("growth-limb-{index}"),
            GeneKey::Movement(direction) => format!("{MOVEMENT_PREFIX}{}", direction.code()),
        }
    }
}

/// Every movement gene starts with this.
pub const MOVEMENT_PREFIX: &str = "move-";

/// Handle to one cursor of one gene.
///
/// Handles are deliberately not `Clone`; [`Genome::destroy_scan`] consumes
/// them.
#[derive(Debug, PartialEq, Eq)]
pub struct Scan {
    gene: String,
    id: ScanId,
}

impl Scan {
    /// Rebuild a handle from persisted parts.
    pub fn restore(gene: impl Into<String>, id: ScanId) -> Self {
        Self {
            gene: gene.into(),
            id,
        }
    }

    pub fn gene(&self) -> &str {
        &self.gene
    }

    pub fn id(&self) -> ScanId {
        self.id
    }
}

/// All genes of a being.
#[derive(Default)]
pub struct Genome {
    genes: BTreeMap<String, Gene>,
    noise: Option<SharedNoise>,
}

impl Genome {
    pub fn new(noise: Option<SharedNoise>) -> Self {
        Self {
            genes: BTreeMap::new(),
            noise,
        }
    }

    pub fn noise(&self) -> Option<&SharedNoise> {
        self.noise.as_ref()
    }

    /// Attach (or detach) noise on the genome and every gene.
    pub fn set_noise(&mut self, noise: Option<SharedNoise>) {
        for gene in self.genes.values_mut() {
            gene.set_noise(noise.clone());
        }
        self.noise = noise;
    }

    /// Gene by name, created empty if unknown.
    pub fn gene(&mut self, name: &str) -> &mut Gene {
        let noise = &self.noise;
        self.genes
            .entry(name.to_string())
            .or_insert_with(|| Gene::new(name, noise.clone()))
    }

    /// Existing gene, without creating it.
    pub fn get(&self, name: &str) -> Option<&Gene> {
        self.genes.get(name)
    }

    pub fn genes(&self) -> impl Iterator<Item = &Gene> {
        self.genes.values()
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// New scan on the named gene.
    pub fn create_scan(&mut self, name: &str) -> Scan {
        let id = self.gene(name).create_scan();
        Scan::restore(name, id)
    }

    /// New scan on the gene for `key`.
    pub fn scan_for(&mut self, key: GeneKey) -> Scan {
        self.create_scan(&key.name())
    }

    /// Reader positioned at the handle's cursor.
    pub fn reader(&mut self, scan: &Scan) -> GeneReader<'_> {
        self.gene(&scan.gene).scan(scan.id)
    }

    pub fn destroy_scan(&mut self, scan: Scan) {
        if let Some(gene) = self.genes.get_mut(&scan.gene) {
            gene.destroy_scan(scan.id);
        }
    }

    /// Discard the realised bits of a gene, if it exists.
    pub fn forget(&mut self, name: &str) {
        if let Some(gene) = self.genes.get_mut(name) {
            gene.forget();
        }
    }

    /// Mutate one gene chosen uniformly among those named `prefix*`.
    pub fn mutate(&mut self, chance: f64, prefix: &str) -> Result<&mut Self, GeneticsError> {
        let noise = self
            .noise
            .clone()
            .ok_or_else(|| GeneticsError::Detached(prefix.to_string()))?;
        let candidates: Vec<String> = self
            .genes
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect();
        if candidates.is_empty() {
            return Err(GeneticsError::NoCandidates(prefix.to_string()));
        }
        let pick = noise.borrow_mut().choose(candidates.len());
        let name = &candidates[pick.min(candidates.len() - 1)];
        let flips = self.gene(name).mutate(chance)?;
        log::debug!("Mutated {flips} bits of {name}");
        Ok(self)
    }

    /// Behavioural clone through a write/read round trip, sharing this noise.
    pub fn copy(&self) -> io::Result<Genome> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        Genome::read_from(&mut Cursor::new(buf), self.noise.clone())
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        codec::write_u32(w, self.genes.len() as u32)?;
        for gene in self.genes.values() {
            gene.write_to(w)?;
        }
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R, noise: Option<SharedNoise>) -> io::Result<Self> {
        let count = codec::read_u32(r)?;
        let mut genome = Genome::new(noise.clone());
        for _ in 0..count {
            let gene = Gene::read_from(r, noise.clone())?;
            genome.genes.insert(gene.name().to_string(), gene);
        }
        Ok(genome)
    }
}

impl fmt::Debug for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Genome")
            .field("genes", &self.genes.values().collect::<Vec<_>>())
            .field("attached", &self.noise.is_some())
            .finish()
    }
}

impl fmt::Display for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for gene in self.genes.values() {
            writeln!(f, "{}: {}", gene.name(), gene)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genetics::noise::{NoiseSeed, PseudoNoise, shared};
    use proptest::prelude::*;

    fn seeded(seed: u64) -> Genome {
        Genome::new(Some(shared(PseudoNoise::from_seed(NoiseSeed::from_u64(seed)))))
    }

    #[test]
    fn test_gene_names() {
        assert_eq!(GeneKey::TrunkLimb.name(), "trunk-limb");
        assert_eq!(GeneKey::GrowthLimb(2).name(), "growth-limb-2");
        assert_eq!(GeneKey::Movement(Direction::Ffr).name(), "move-FFR");
    }

    #[test]
    fn test_genes_created_lazily() {
        let mut genome = seeded(1);
        assert!(genome.is_empty());
        let scan = genome.scan_for(GeneKey::GrowthTrunk);
        assert_eq!(scan.gene(), "growth-trunk");
        assert_eq!(genome.len(), 1);
        genome.reader(&scan).choice(5).unwrap();
        genome.destroy_scan(scan);
        assert_eq!(genome.get("growth-trunk").unwrap().scans().count(), 0);
    }

    #[test]
    fn test_mutate_without_candidates() {
        let mut genome = seeded(2);
        genome.create_scan("growth-trunk");
        let err = genome.mutate(0.1, MOVEMENT_PREFIX).unwrap_err();
        assert!(matches!(err, GeneticsError::NoCandidates(prefix) if prefix == "move-"));
    }

    #[test]
    fn test_mutate_touches_only_prefixed() {
        let mut genome = seeded(3);
        for name in ["move-FFF", "growth-trunk"] {
            let scan = genome.create_scan(name);
            genome.reader(&scan).choices(32).unwrap();
        }
        let trunk_before = genome.get("growth-trunk").unwrap().bytes().to_vec();
        let move_before = genome.get("move-FFF").unwrap().bytes().to_vec();
        genome.mutate(0.1, MOVEMENT_PREFIX).unwrap();
        assert_eq!(genome.get("growth-trunk").unwrap().bytes(), &trunk_before[..]);
        assert_ne!(genome.get("move-FFF").unwrap().bytes(), &move_before[..]);
    }

    #[test]
    fn test_copy_is_independent() {
        let mut genome = seeded(4);
        let scan = genome.create_scan("move-BBB");
        genome.reader(&scan).choices(16).unwrap();

        let mut copy = genome.copy().unwrap();
        copy.forget("move-BBB");
        assert_eq!(genome.get("move-BBB").unwrap().bit_len(), 16);
        assert_eq!(copy.get("move-BBB").unwrap().bit_len(), 0);
    }

    proptest! {
        #[test]
        fn prop_round_trip_repeats_decisions(
            seed in any::<u64>(),
            reads in proptest::collection::vec((0usize..4, 1usize..20), 1..12),
        ) {
            let names = ["growth-trunk", "growth-limb-0", "move-FFF", "trunk-limb"];
            let mut genome = seeded(seed);
            let scans: Vec<Scan> = names.iter().map(|n| genome.create_scan(n)).collect();
            for (gene, bits) in &reads {
                genome.reader(&scans[*gene]).choices(*bits).unwrap();
            }
            // an untouched gene with no live scan
            genome.gene("growth-buds");

            let mut buf = Vec::new();
            genome.write_to(&mut buf).unwrap();
            let mut restored = Genome::read_from(&mut Cursor::new(buf), None).unwrap();
            prop_assert_eq!(restored.len(), genome.len());

            for scan in &scans {
                let gene = genome.get(scan.gene()).unwrap();
                let position = gene.scans().find(|(id, _)| *id == scan.id()).map(|(_, p)| p).unwrap();
                let remaining = gene.bit_len() - position as usize;
                let expected = genome.reader(scan).choices(remaining).unwrap();
                let actual = restored.reader(scan).choices(remaining).unwrap();
                prop_assert_eq!(expected, actual);
            }
        }
    }
}
