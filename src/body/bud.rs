//! Growth buds: construction processes sitting on body faces.

use std::io::{self, Read, Write};
use std::mem;

use super::energy::Energy;
use crate::codec;
use crate::fabric::{Fabric, FaceId, OpenUp, Role, Transformation};
use crate::genetics::{GeneticsError, Genome, Scan, ScanId};
use crate::schema::LifeConfig;

/// Outcomes decoded by a trunk bud, resolved once its opening has happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Branching {
    pub stay_alive: bool,
    pub expand01: bool,
    pub expand20: bool,
}

impl Branching {
    /// Read three bits; when none is set the bud stays alive.
    pub fn from_bits(bits: &[bool]) -> Self {
        let bit = |index: usize| bits.get(index).copied().unwrap_or(false);
        let (stay_alive, expand01, expand20) = (bit(0), bit(1), bit(2));
        Self {
            stay_alive: stay_alive || !(expand01 || expand20),
            expand01,
            expand20,
        }
    }

    /// Number of buds that share the energy after branching.
    pub fn count(&self) -> usize {
        [self.stay_alive, self.expand01, self.expand20]
            .into_iter()
            .filter(|fired| *fired)
            .count()
    }
}

/// What a bud did when asked to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudStep {
    /// Out of energy; the bud should be terminated.
    Exhausted,
    /// Queued openings that need no follow-up.
    Opened,
    /// Queued a notifying opening; branch when its faces exist.
    Branching(Branching),
}

/// A bud's gene, scan and energy.
#[derive(Debug)]
pub struct BudState {
    gene: String,
    scan: Scan,
    energy: Energy,
}

impl BudState {
    fn fresh(genome: &mut Genome, gene: &str, energy: Energy) -> Self {
        Self {
            gene: gene.to_string(),
            scan: genome.create_scan(gene),
            energy,
        }
    }

    pub fn gene(&self) -> &str {
        &self.gene
    }

    pub fn scan(&self) -> &Scan {
        &self.scan
    }

    pub fn energy(&self) -> &Energy {
        &self.energy
    }
}

/// Trunk and limb buds, told apart by a tag in the record.
#[derive(Debug)]
pub enum GrowthBud {
    Trunk(BudState),
    Limb(BudState),
}

impl GrowthBud {
    /// Fresh trunk bud with its own scan of `gene`.
    pub fn trunk(genome: &mut Genome, gene: &str, energy: Energy) -> Self {
        GrowthBud::Trunk(BudState::fresh(genome, gene, energy))
    }

    /// Fresh limb bud with its own scan of `gene`.
    pub fn limb(genome: &mut Genome, gene: &str, energy: Energy) -> Self {
        GrowthBud::Limb(BudState::fresh(genome, gene, energy))
    }

    pub fn state(&self) -> &BudState {
        match self {
            GrowthBud::Trunk(state) | GrowthBud::Limb(state) => state,
        }
    }

    fn state_mut(&mut self) -> &mut BudState {
        match self {
            GrowthBud::Trunk(state) | GrowthBud::Limb(state) => state,
        }
    }

    /// Decode the next move from the gene and queue it on the body.
    pub fn run(
        &mut self,
        face: FaceId,
        genome: &mut Genome,
        body: &mut Fabric,
        config: &LifeConfig,
    ) -> Result<BudStep, GeneticsError> {
        if self.state().energy.is_empty() {
            return Ok(BudStep::Exhausted);
        }
        match self {
            GrowthBud::Trunk(state) => {
                let bits = genome.reader(&state.scan).choices(3)?;
                let branching = Branching::from_bits(&bits);
                body.add_transformation(Transformation::OpenUp(OpenUp {
                    face,
                    role: Role::Spring,
                    length: config.interval_length,
                    ticks: config.trunk_ticks,
                    use_chirality: false,
                    notify: true,
                }));
                state.energy.extract(config.growth_cost);
                Ok(BudStep::Branching(branching))
            }
            GrowthBud::Limb(state) => {
                let mut reader = genome.reader(&state.scan);
                match reader.choice(3)? {
                    0 => body.add_transformation(Transformation::Twist {
                        face,
                        clockwise: true,
                    }),
                    1 => body.add_transformation(Transformation::Twist {
                        face,
                        clockwise: false,
                    }),
                    _ => {}
                }
                let size = 3 + reader.choice(3)?;
                for _ in 0..size {
                    body.add_transformation(Transformation::OpenUp(OpenUp {
                        face,
                        role: Role::Muscle,
                        length: config.interval_length,
                        ticks: config.limb_ticks,
                        use_chirality: true,
                        notify: false,
                    }));
                }
                state.energy.extract(size as f64 * config.growth_cost);
                Ok(BudStep::Opened)
            }
        }
    }

    /// Release the bud's scan.
    pub fn terminate(self, genome: &mut Genome) {
        match self {
            GrowthBud::Trunk(state) | GrowthBud::Limb(state) => genome.destroy_scan(state.scan),
        }
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let (tag, state) = match self {
            GrowthBud::Trunk(state) => ("Trunk", state),
            GrowthBud::Limb(state) => ("Limb", state),
        };
        codec::write_str(w, tag)?;
        codec::write_str(w, &state.gene)?;
        codec::write_u32(w, state.scan.id().0)?;
        state.energy.write_to(w)
    }

    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let tag = codec::read_str(r)?;
        let gene = codec::read_str(r)?;
        let scan = Scan::restore(gene.as_str(), ScanId(codec::read_u32(r)?));
        let energy = Energy::read_from(r)?;
        let state = BudState { gene, scan, energy };
        match tag.as_str() {
            "Trunk" => Ok(GrowthBud::Trunk(state)),
            "Limb" => Ok(GrowthBud::Limb(state)),
            other => Err(codec::invalid_data(format!("unknown growth bud {other:?}"))),
        }
    }
}

/// A trunk bud after its opening: children on the new side faces, and the
/// bud itself if it stays alive.
pub struct Branched {
    pub stayed: Option<GrowthBud>,
    pub children: Vec<(FaceId, GrowthBud)>,
}

/// Split the bud's energy among the outcomes that fired.
pub fn branch(
    bud: GrowthBud,
    branching: Branching,
    face01: FaceId,
    face20: FaceId,
    genome: &mut Genome,
) -> Branched {
    let mut bud = bud;
    let state = bud.state_mut();
    let mut parts = mem::take(&mut state.energy).split(branching.count());
    let gene = state.gene.clone();
    let mut children = Vec::new();
    if branching.expand01 {
        let energy = parts.pop_front().unwrap_or_default();
        children.push((face01, GrowthBud::trunk(genome, &format!("{gene}-01"), energy)));
    }
    if branching.expand20 {
        let energy = parts.pop_front().unwrap_or_default();
        children.push((face20, GrowthBud::trunk(genome, &format!("{gene}-20"), energy)));
    }
    let stayed = if branching.stay_alive {
        bud.state_mut().energy = parts.pop_front().unwrap_or_default();
        Some(bud)
    } else {
        bud.terminate(genome);
        None
    };
    Branched { stayed, children }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genetics::{NoiseSeed, PseudoNoise, shared};
    use std::io::Cursor;

    fn genome() -> Genome {
        Genome::new(Some(shared(PseudoNoise::from_seed(NoiseSeed::from_u64(11)))))
    }

    #[test]
    fn test_silent_bits_force_stay_alive() {
        let branching = Branching::from_bits(&[false, false, false]);
        assert!(branching.stay_alive);
        assert_eq!(branching.count(), 1);

        let branching = Branching::from_bits(&[false, true, false]);
        assert!(!branching.stay_alive);
        assert_eq!(branching.count(), 1);
        assert_eq!(Branching::from_bits(&[true, true, true]).count(), 3);
    }

    #[test]
    fn test_all_zero_gene_still_branches_once() {
        // a gene of zero bits with no noise behind it
        let mut zeros = Vec::new();
        codec::write_u32(&mut zeros, 1).unwrap();
        codec::write_str(&mut zeros, "growth-trunk").unwrap();
        codec::write_u16(&mut zeros, 0).unwrap();
        codec::write_u32(&mut zeros, 4).unwrap();
        zeros.extend([0u8; 4]);
        let mut genome = Genome::read_from(&mut Cursor::new(zeros), None).unwrap();

        let mut body = Fabric::seed_triangle(1.0);
        let face = body.faces()[0].id;
        let mut bud = GrowthBud::trunk(&mut genome, "growth-trunk", Energy::new(0.2));
        let config = LifeConfig::default();
        let BudStep::Branching(branching) = bud.run(face, &mut genome, &mut body, &config).unwrap()
        else {
            panic!("trunk buds branch");
        };
        assert_eq!(
            branching,
            Branching {
                stay_alive: true,
                expand01: false,
                expand20: false
            }
        );
        assert!(body.has_pending_transformations());
        assert!((bud.state().energy().amount() - (0.2 - config.growth_cost)).abs() < 1e-12);
    }

    #[test]
    fn test_branch_splits_energy() {
        let mut genome = genome();
        let bud = GrowthBud::trunk(&mut genome, "growth-trunk", Energy::new(0.3));
        let branched = branch(
            bud,
            Branching {
                stay_alive: true,
                expand01: true,
                expand20: true,
            },
            FaceId(7),
            FaceId(8),
            &mut genome,
        );
        let stayed = branched.stayed.unwrap();
        assert!((stayed.state().energy().amount() - 0.1).abs() < 1e-12);
        let names: Vec<_> = branched
            .children
            .iter()
            .map(|(face, bud)| (*face, bud.state().gene().to_string()))
            .collect();
        assert_eq!(
            names,
            vec![
                (FaceId(7), "growth-trunk-01".to_string()),
                (FaceId(8), "growth-trunk-20".to_string()),
            ]
        );
    }

    #[test]
    fn test_branch_without_staying_releases_scan() {
        let mut genome = genome();
        let bud = GrowthBud::trunk(&mut genome, "growth-trunk", Energy::new(0.3));
        let branched = branch(
            bud,
            Branching {
                stay_alive: false,
                expand01: false,
                expand20: true,
            },
            FaceId(1),
            FaceId(2),
            &mut genome,
        );
        assert!(branched.stayed.is_none());
        assert_eq!(branched.children.len(), 1);
        assert_eq!(genome.get("growth-trunk").unwrap().scans().count(), 0);
        let (_, child) = &branched.children[0];
        assert!((child.state().energy().amount() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_limb_bud_queues_muscle_openings() {
        let mut genome = genome();
        let mut body = Fabric::seed_triangle(1.0);
        let face = body.faces()[0].id;
        let mut bud = GrowthBud::limb(&mut genome, "growth-limb-0", Energy::new(0.5));
        let config = LifeConfig::default();
        assert_eq!(
            bud.run(face, &mut genome, &mut body, &config).unwrap(),
            BudStep::Opened
        );
        body.execute_transformations(None);
        let muscles = body
            .intervals()
            .iter()
            .filter(|interval| interval.role == Role::Muscle)
            .count();
        assert!((9..=15).contains(&muscles), "{muscles} muscles");
        let spent = 0.5 - bud.state().energy().amount();
        assert!((spent - muscles as f64 / 3.0 * config.growth_cost).abs() < 1e-12);
    }

    #[test]
    fn test_exhausted_bud_does_nothing() {
        let mut genome = genome();
        let mut body = Fabric::seed_triangle(1.0);
        let face = body.faces()[0].id;
        let mut bud = GrowthBud::limb(&mut genome, "growth-limb-0", Energy::new(-0.01));
        let step = bud
            .run(face, &mut genome, &mut body, &LifeConfig::default())
            .unwrap();
        assert_eq!(step, BudStep::Exhausted);
        assert!(!body.has_pending_transformations());
        bud.terminate(&mut genome);
        assert_eq!(genome.get("growth-limb-0").unwrap().scans().count(), 0);
    }

    #[test]
    fn test_record_round_trip() {
        let mut genome = genome();
        let bud = GrowthBud::limb(&mut genome, "growth-limb-1", Energy::new(0.25));
        let mut buf = Vec::new();
        bud.write_to(&mut buf).unwrap();
        let restored = GrowthBud::read_from(&mut Cursor::new(buf)).unwrap();
        assert!(matches!(restored, GrowthBud::Limb(_)));
        assert_eq!(restored.state().scan(), bud.state().scan());
        assert_eq!(restored.state().energy(), bud.state().energy());

        let mut bad = Vec::new();
        codec::write_str(&mut bad, "Leaf").unwrap();
        codec::write_str(&mut bad, "x").unwrap();
        codec::write_u32(&mut bad, 1).unwrap();
        codec::write_f64(&mut bad, 0.0).unwrap();
        let err = GrowthBud::read_from(&mut Cursor::new(bad)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
