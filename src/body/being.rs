//! A being: body, genome and energy, driven through its life phases.
//!
//! Growth runs in phases. Trunk buds branch over the body, nearby joints are
//! merged, limb sites are chosen, limb buds extend muscles, and the shield
//! that protected the growing body collapses. After birth the being drinks
//! and walks, with every step decoded from the movement gene of the
//! direction it faces. Each phase waits for the body to settle before it
//! acts.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::mem;
use std::rc::Rc;

use glam::DVec3;

use super::BeingError;
use super::bud::{self, BudStep, Branching, GrowthBud};
use super::direction::Direction;
use super::embryo::Embryo;
use super::energy::Energy;
use super::geometry::Geometry;
use super::speech::Speech;
use crate::fabric::{Fabric, FabricEvent, FaceId, Physics, Role, Transformation};
use crate::genetics::{GeneKey, GeneticsError, Genome};
use crate::schema::LifeConfig;
use crate::terrain::Terrain;

/// Shield cables are left this slack around a growing body.
const SHIELD_RELAX: f64 = 1.2;
/// The birth canal replays the trail this many times faster than life.
const BIRTH_CANAL_SPEED: u64 = 5;

/// Life phases, in the order they are normally passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Conception,
    TrunkGrowth,
    JointMerge,
    SelectLimbFaces,
    LimbGrowth,
    ShieldCollapse,
    Birth,
    AdultLife,
    Killed,
    Dying,
    BirthCanal,
    Undeath,
    Death,
}

impl Phase {
    const ALL: [Phase; 13] = [
        Phase::Conception,
        Phase::TrunkGrowth,
        Phase::JointMerge,
        Phase::SelectLimbFaces,
        Phase::LimbGrowth,
        Phase::ShieldCollapse,
        Phase::Birth,
        Phase::AdultLife,
        Phase::Killed,
        Phase::Dying,
        Phase::BirthCanal,
        Phase::Undeath,
        Phase::Death,
    ];

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn from_ordinal(ordinal: u8) -> Option<Phase> {
        Self::ALL.get(ordinal as usize).copied()
    }

    /// Still building the body.
    pub fn is_growing(self) -> bool {
        self < Phase::AdultLife
    }
}

/// Where a being is heading, optionally chasing another being.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub location: DVec3,
    pub prey_name: String,
}

impl Target {
    pub fn at(location: DVec3) -> Self {
        Self {
            location,
            prey_name: String::new(),
        }
    }
}

/// Progress of the repeated joint merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct JointMerge {
    pub(crate) rounds: u32,
    pub(crate) finished: bool,
}

pub struct Being {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) speech: Speech,
    pub(crate) body: Fabric,
    pub(crate) shield: Option<Fabric>,
    pub(crate) genome: Genome,
    pub(crate) energy: Energy,
    pub(crate) buds: BTreeMap<FaceId, GrowthBud>,
    pub(crate) branchings: BTreeMap<FaceId, Branching>,
    pub(crate) joint_merge: JointMerge,
    pub(crate) phase: Phase,
    pub(crate) goal: DVec3,
    pub(crate) prey_name: String,
    pub(crate) trail: VecDeque<DVec3>,
    pub(crate) trail_age: u64,
    pub(crate) is_virtual: bool,
    pub(crate) drinking: bool,
    pub(crate) geometry: Geometry,
    pub(crate) config: Rc<LifeConfig>,
}

impl Being {
    /// Plant an embryo: a seed triangle with a trunk bud on each side,
    /// inside a fresh shield.
    pub fn create(embryo: Embryo, config: Rc<LifeConfig>) -> Self {
        let Embryo {
            id,
            email,
            speech,
            mut genome,
            trail,
            trunk_energy,
            limb_energy,
        } = embryo;
        log::info!("Creating being {id}:{email}");
        let body = Fabric::seed_triangle(config.interval_length);
        let shield = Fabric::sphere(body.center(), config.max_shield_radius, SHIELD_RELAX);
        let trunk_gene = GeneKey::GrowthTrunk.name();
        let mut energies = trunk_energy.split(body.faces().len());
        let mut buds = BTreeMap::new();
        for face in body.faces() {
            let energy = energies.pop_front().unwrap_or_default();
            buds.insert(face.id, GrowthBud::trunk(&mut genome, &trunk_gene, energy));
        }
        Self::assemble(
            id,
            email,
            speech,
            body,
            Some(shield),
            genome,
            limb_energy,
            buds,
            Phase::Conception,
            trail,
            config,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn assemble(
        id: String,
        email: String,
        speech: Speech,
        body: Fabric,
        shield: Option<Fabric>,
        genome: Genome,
        energy: Energy,
        buds: BTreeMap<FaceId, GrowthBud>,
        phase: Phase,
        trail: VecDeque<DVec3>,
        config: Rc<LifeConfig>,
    ) -> Self {
        Self {
            id,
            email,
            speech,
            body,
            shield,
            genome,
            energy,
            buds,
            branchings: BTreeMap::new(),
            joint_merge: JointMerge::default(),
            phase,
            goal: DVec3::ZERO,
            prey_name: String::new(),
            trail,
            trail_age: 0,
            is_virtual: false,
            drinking: false,
            geometry: Geometry::default(),
            config,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn speech(&self) -> &Speech {
        &self.speech
    }

    pub fn set_speech(&mut self, text: impl Into<String>) {
        self.speech = Speech::new(text);
    }

    pub fn body(&self) -> &Fabric {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Fabric {
        &mut self.body
    }

    pub fn shield(&self) -> Option<&Fabric> {
        self.shield.as_ref()
    }

    pub fn genome(&self) -> &Genome {
        &self.genome
    }

    pub fn genome_mut(&mut self) -> &mut Genome {
        &mut self.genome
    }

    pub fn set_genome(&mut self, genome: Genome) {
        self.genome = genome;
    }

    pub fn energy(&self) -> &Energy {
        &self.energy
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn goal(&self) -> DVec3 {
        self.goal
    }

    pub fn prey_name(&self) -> &str {
        &self.prey_name
    }

    pub fn set_target(&mut self, target: &Target) {
        self.goal = target.location;
        self.prey_name.clone_from(&target.prey_name);
        self.geometry.age = None;
    }

    /// Where the body has been, oldest point first.
    pub fn trail(&self) -> &VecDeque<DVec3> {
        &self.trail
    }

    pub fn is_drinking(&self) -> bool {
        self.drinking
    }

    pub fn is_virtual(&self) -> bool {
        self.is_virtual
    }

    /// Virtual beings never drink; evolution competitors are virtual.
    pub fn set_virtual(&mut self, is_virtual: bool) {
        self.is_virtual = is_virtual;
    }

    pub fn config(&self) -> &Rc<LifeConfig> {
        &self.config
    }

    /// Buds still attached to faces.
    pub fn buds(&self) -> impl Iterator<Item = (FaceId, &GrowthBud)> {
        self.buds.iter().map(|(face, bud)| (*face, bud))
    }

    /// Distance walked along the trail, ending at the body centre.
    pub fn fitness(&self) -> f64 {
        let mut previous = self.geometry.body_center;
        let mut sum = 0.0;
        for point in self.trail.iter().rev() {
            sum += previous.distance(*point);
            previous = *point;
        }
        sum
    }

    pub fn mutate_direction_gene(
        &mut self,
        direction: Direction,
        chance_of_mutation: f64,
    ) -> Result<usize, GeneticsError> {
        self.genome
            .gene(&GeneKey::Movement(direction).name())
            .mutate(chance_of_mutation)
    }

    /// Forget what the gene for this direction said, to re-roll it.
    pub fn randomize_movement_gene(&mut self, direction: Direction) {
        self.genome.forget(&GeneKey::Movement(direction).name());
    }

    /// Advance one step of life, then let the fabrics experience `physics`.
    pub fn experience_time(
        &mut self,
        physics: &Physics,
        terrain: &mut dyn Terrain,
    ) -> Result<(), BeingError> {
        self.refresh_geometry();
        let settled = !self.body.is_any_span_active();
        match self.phase {
            Phase::Conception => self.phase = Phase::TrunkGrowth,
            Phase::TrunkGrowth => {
                if settled && !self.grow_faces()? {
                    self.joint_merge = JointMerge::default();
                    self.body.add_transformation(Transformation::MergeJoints {
                        threshold: self.config.joint_merge_distance,
                    });
                    self.phase = Phase::JointMerge;
                }
            }
            Phase::JointMerge => {
                if settled {
                    if self.joint_merge.finished {
                        log::info!(
                            "Joints of {} merged in {} rounds",
                            self.id,
                            self.joint_merge.rounds
                        );
                        self.phase = Phase::SelectLimbFaces;
                    } else {
                        self.body.add_transformation(Transformation::MergeJoints {
                            threshold: self.config.joint_merge_distance,
                        });
                    }
                }
            }
            Phase::SelectLimbFaces => {
                self.add_limb_buds()?;
                self.phase = Phase::LimbGrowth;
            }
            Phase::LimbGrowth => {
                if settled && !self.grow_faces()? {
                    if let Some(shield) = &mut self.shield {
                        shield.add_transformation(Transformation::ScaleCables {
                            factor: 2.0,
                            ticks: self.config.shield_collapse_ticks,
                        });
                    }
                    self.phase = Phase::ShieldCollapse;
                }
            }
            Phase::ShieldCollapse => {
                if self.shield.as_ref().is_none_or(|s| !s.is_any_span_active()) {
                    self.phase = Phase::Birth;
                }
            }
            Phase::Birth => {
                self.shield = None;
                self.energy = Energy::new(self.config.adult_energy);
                self.phase = Phase::AdultLife;
                log::info!("{} is born", self);
            }
            Phase::AdultLife => {
                if settled {
                    self.live(terrain)?;
                }
            }
            Phase::Killed => {
                if settled {
                    self.phase = Phase::Dying;
                }
            }
            Phase::Dying => {
                if settled {
                    self.phase = Phase::Death;
                    log::info!("{} died", self);
                }
            }
            Phase::Death | Phase::Undeath => {}
            Phase::BirthCanal => {
                self.trail_age += physics.iterations() * BIRTH_CANAL_SPEED;
                self.follow_birth_canal();
                let replayed = self.trail_age / self.config.iterations_per_trail_point;
                if replayed >= self.trail.len() as u64 {
                    self.phase = Phase::Undeath;
                }
            }
        }
        self.body.execute_transformations(Some(physics));
        self.resolve_events()?;
        if !matches!(self.phase, Phase::BirthCanal | Phase::Undeath)
            && let Some(shield) = &mut self.shield
        {
            shield.execute_transformations(Some(physics));
        }
        Ok(())
    }

    /// Leave the body behind and replay the trail from its oldest point to
    /// where the body fell, inside a small capsule, ending in
    /// [`Phase::Undeath`].
    pub fn enter_birth_canal(&mut self) {
        let center = self.geometry.body_center;
        self.trail.push_back(center);
        self.trail_age = 0;
        self.shield = Some(Fabric::sphere(center, self.config.min_shield_radius, 1.0));
        for (_, bud) in mem::take(&mut self.buds) {
            bud.terminate(&mut self.genome);
        }
        self.branchings.clear();
        self.body.clear();
        self.phase = Phase::BirthCanal;
        log::info!("{} entered the birth canal", self);
    }

    /// Ask every bud to run; buds out of energy are dropped.
    ///
    /// Returns whether any bud is still growing.
    fn grow_faces(&mut self) -> Result<bool, BeingError> {
        let mut growing = false;
        let faces: Vec<FaceId> = self.buds.keys().copied().collect();
        for face in faces {
            let Some(mut bud) = self.buds.remove(&face) else {
                continue;
            };
            match bud.run(face, &mut self.genome, &mut self.body, &self.config)? {
                BudStep::Exhausted => bud.terminate(&mut self.genome),
                BudStep::Opened => {
                    growing = true;
                    self.buds.insert(face, bud);
                }
                BudStep::Branching(branching) => {
                    growing = true;
                    self.branchings.insert(face, branching);
                    self.buds.insert(face, bud);
                }
            }
        }
        Ok(growing)
    }

    /// Apply the consequences of openings and merges that just happened.
    fn resolve_events(&mut self) -> Result<(), BeingError> {
        for event in self.body.take_events() {
            match event {
                FabricEvent::FacesOpened {
                    face,
                    face01,
                    face20,
                } => {
                    let Some(branching) = self.branchings.remove(&face) else {
                        continue;
                    };
                    let bud = match self.buds.remove(&face) {
                        Some(bud @ GrowthBud::Trunk(_)) => bud,
                        Some(other) => {
                            self.buds.insert(face, other);
                            return Err(BeingError::UnknownBud(face));
                        }
                        None => return Err(BeingError::UnknownBud(face)),
                    };
                    let branched = bud::branch(bud, branching, face01, face20, &mut self.genome);
                    self.buds.extend(branched.children);
                    if let Some(stayed) = branched.stayed {
                        self.buds.insert(face, stayed);
                    }
                }
                FabricEvent::JointsMerged { merged } => {
                    self.joint_merge.rounds += 1;
                    self.joint_merge.finished =
                        !merged || self.joint_merge.rounds >= self.config.joint_merge_rounds;
                }
            }
        }
        Ok(())
    }

    /// Choose limb sites among face pairs and put a limb bud on both faces
    /// of each.
    fn add_limb_buds(&mut self) -> Result<(), BeingError> {
        let mut pairs = self.body.face_pairs();
        let scan = self.genome.scan_for(GeneKey::GrowthBuds);
        let limb_count = match self.genome.reader(&scan).choice(2) {
            Ok(choice) => (2 + choice).min(pairs.len()),
            Err(err) => {
                self.genome.destroy_scan(scan);
                return Err(err.into());
            }
        };
        let mut sites = Vec::with_capacity(limb_count);
        for _ in 0..limb_count {
            match self.genome.reader(&scan).choice(pairs.len()) {
                Ok(pick) => sites.push(pairs.remove(pick)),
                Err(err) => {
                    self.genome.destroy_scan(scan);
                    return Err(err.into());
                }
            }
        }
        self.genome.destroy_scan(scan);

        let mut energies = mem::take(&mut self.energy).split(limb_count * 2);
        for (index, (face0, face1)) in sites.into_iter().enumerate() {
            let gene = GeneKey::GrowthLimb(index).name();
            for face in [face0, face1] {
                let energy = energies.pop_front().unwrap_or_default();
                self.buds
                    .insert(face, GrowthBud::limb(&mut self.genome, &gene, energy));
            }
        }
        log::debug!("{} grows {limb_count} pairs of limbs", self.id);
        Ok(())
    }

    /// Drink if thirsty, otherwise step; starve to death when empty.
    fn live(&mut self, terrain: &mut dyn Terrain) -> Result<(), BeingError> {
        self.drinking = false;
        if !self.is_virtual && self.energy.amount() < 1.0 {
            for joint in self.body.joints() {
                if joint.location.length() < self.config.surface_radius {
                    let needed =
                        (1.0 - self.energy.amount()).clamp(0.0, self.config.water_consumption);
                    let consumed = terrain.consume_water(joint.location, needed);
                    if consumed > 0.0 {
                        self.drinking = true;
                    }
                    self.energy.add(consumed);
                }
            }
        }
        if !self.drinking {
            self.take_a_step()?;
        }
        if self.energy.is_empty() {
            self.body.add_transformation(Transformation::Death {
                ticks: self.config.dying_time,
            });
            self.body.execute_transformations(None);
            self.phase = Phase::Killed;
            log::info!("{} starved", self);
        }
        Ok(())
    }

    /// Set every muscle swinging as the movement gene of the current
    /// direction says: three bits per muscle, contracted or extended.
    fn take_a_step(&mut self) -> Result<(), BeingError> {
        let muscles: Vec<usize> = self
            .body
            .intervals()
            .iter()
            .enumerate()
            .filter(|(_, interval)| interval.role == Role::Muscle)
            .map(|(index, _)| index)
            .collect();
        let scan = self
            .genome
            .scan_for(GeneKey::Movement(self.geometry.direction));
        let bits = self.genome.reader(&scan).choices(muscles.len() * 3);
        self.genome.destroy_scan(scan);
        let bits = bits?;
        let config = &self.config;
        for (walk, muscle) in muscles.into_iter().enumerate() {
            let [a, b, c] = [0, 1, 2].map(|k| {
                if bits[walk * 3 + k] {
                    self.energy.extract(config.contraction_energy);
                    config.contracted
                } else {
                    config.extended
                }
            });
            self.body.intervals_mut()[muscle]
                .span
                .perturb_ideal(config.muscle_duration, a, b, c);
        }
        Ok(())
    }
}

impl fmt::Display for Being {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.id, self.email)
    }
}

impl fmt::Debug for Being {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Being")
            .field("id", &self.id)
            .field("phase", &self.phase)
            .field("energy", &self.energy.amount())
            .field("joints", &self.body.joints().len())
            .field("buds", &self.buds.len())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::genetics::{NoiseSeed, PseudoNoise, shared};
    use crate::schema::PhysicsConfig;
    use crate::terrain::{Dry, SurfaceWater};

    pub(crate) fn embryo(seed: u64) -> Embryo {
        let genome = Genome::new(Some(shared(PseudoNoise::from_seed(NoiseSeed::from_u64(seed)))));
        Embryo::new("TEST", "test@example.com", Speech::new("hello"), genome, None).unwrap()
    }

    /// Step until adult life, panicking if growth never finishes.
    pub(crate) fn grow(being: &mut Being, physics: &Physics) {
        let mut terrain = Dry;
        for _ in 0..20_000 {
            if being.phase() == Phase::AdultLife {
                return;
            }
            being.experience_time(physics, &mut terrain).unwrap();
        }
        panic!("growth stuck in {:?}", being.phase());
    }

    #[test]
    fn test_phase_ordinals() {
        for (ordinal, phase) in Phase::ALL.iter().enumerate() {
            assert_eq!(Phase::from_ordinal(ordinal as u8), Some(*phase));
            assert_eq!(phase.ordinal() as usize, ordinal);
        }
        assert_eq!(Phase::from_ordinal(13), None);
        assert!(Phase::ShieldCollapse.is_growing());
        assert!(!Phase::AdultLife.is_growing());
    }

    #[test]
    fn test_created_being() {
        let being = Being::create(embryo(1), Rc::new(LifeConfig::default()));
        assert_eq!(being.phase(), Phase::Conception);
        assert_eq!(being.buds().count(), 2);
        assert!(being.shield().is_some());
        let trunk: f64 = being
            .buds()
            .map(|(_, bud)| bud.state().energy().amount())
            .sum();
        assert!((trunk + being.energy().amount() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_grows_to_adult_life() {
        let physics = Physics::new(PhysicsConfig::default(), 50);
        let mut being = Being::create(embryo(2), Rc::new(LifeConfig::default()));
        let mut phases = vec![being.phase()];
        let mut terrain = Dry;
        while being.phase() != Phase::AdultLife {
            being.experience_time(&physics, &mut terrain).unwrap();
            if phases.last() != Some(&being.phase()) {
                phases.push(being.phase());
            }
            assert!(being.body().age() < 1_000_000, "stuck in {:?}", being.phase());
        }
        assert_eq!(
            phases,
            vec![
                Phase::Conception,
                Phase::TrunkGrowth,
                Phase::JointMerge,
                Phase::SelectLimbFaces,
                Phase::LimbGrowth,
                Phase::ShieldCollapse,
                Phase::Birth,
                Phase::AdultLife,
            ]
        );
        assert_eq!(being.energy().amount(), 0.5);
        assert!(being.shield().is_none());
        assert!(!being.body().is_empty());
        assert!(being.body().joints().len() > 3);
        assert!(being.buds().next().is_none());
        assert!(
            being
                .body()
                .intervals()
                .iter()
                .any(|interval| interval.role == Role::Muscle)
        );
    }

    #[test]
    fn test_same_seed_same_body() {
        let physics = Physics::new(PhysicsConfig::default(), 50);
        let config = Rc::new(LifeConfig::default());
        let mut a = Being::create(embryo(3), config.clone());
        let mut b = Being::create(embryo(3), config);
        grow(&mut a, &physics);
        grow(&mut b, &physics);
        assert_eq!(a.body().joints(), b.body().joints());
        assert_eq!(a.body().age(), b.body().age());
    }

    #[test]
    fn test_adult_starves_and_dies() {
        let physics = Physics::new(PhysicsConfig::default(), 50);
        let config = LifeConfig {
            contraction_energy: 0.05,
            muscle_duration: 40,
            dying_time: 100,
            ..Default::default()
        };
        let mut being = Being::create(embryo(4), Rc::new(config));
        grow(&mut being, &physics);
        let mut terrain = Dry;
        for _ in 0..10_000 {
            if being.phase() == Phase::Death {
                break;
            }
            being.experience_time(&physics, &mut terrain).unwrap();
        }
        assert_eq!(being.phase(), Phase::Death);
        assert!(being.energy().is_empty());
        assert!(being.body().faces().is_empty());
    }

    #[test]
    fn test_adult_drinks_below_surface() {
        let physics = Physics::new(PhysicsConfig::default(), 50);
        let mut being = Being::create(embryo(5), Rc::new(LifeConfig::default()));
        grow(&mut being, &physics);
        let mut water = SurfaceWater::new(100.0, 1.0);
        let before = being.energy().amount();
        while !being.is_drinking() {
            being.experience_time(&physics, &mut water).unwrap();
            assert!(being.body().age() < 1_000_000);
        }
        assert!(being.energy().amount() > before);

        being.set_virtual(true);
        for _ in 0..1000 {
            being.experience_time(&physics, &mut water).unwrap();
            if !being.is_drinking() {
                break;
            }
        }
        assert!(!being.is_drinking());
    }

    #[test]
    fn test_birth_canal_leads_to_undeath() {
        let physics = Physics::new(PhysicsConfig::default(), 50);
        let config = LifeConfig {
            iterations_per_trail_point: 100,
            ..Default::default()
        };
        let mut being = Being::create(embryo(6), Rc::new(config));
        grow(&mut being, &physics);
        let mut terrain = Dry;
        for _ in 0..40 {
            being.experience_time(&physics, &mut terrain).unwrap();
        }
        let trail = being.trail().len();
        assert!(trail > 0);
        let fell_at = being.geometry().body_center();
        being.enter_birth_canal();
        assert_eq!(being.phase(), Phase::BirthCanal);
        assert!(being.body().is_empty());
        assert_eq!(being.trail().len(), trail + 1);
        assert_eq!(being.trail().back(), Some(&fell_at));
        for _ in 0..1000 {
            if being.phase() == Phase::Undeath {
                break;
            }
            being.experience_time(&physics, &mut terrain).unwrap();
        }
        assert_eq!(being.phase(), Phase::Undeath);
        let capsule = being.shield().unwrap().center();
        assert!(capsule.distance(fell_at) < 1e-9);
    }

    #[test]
    fn test_exhausted_gene_is_an_error() {
        let physics = Physics::new(PhysicsConfig::default(), 50);
        let mut being = Being::create(embryo(7), Rc::new(LifeConfig::default()));
        being.genome_mut().set_noise(None);
        being.genome_mut().forget(&GeneKey::GrowthTrunk.name());
        let mut terrain = Dry;
        being.experience_time(&physics, &mut terrain).unwrap();
        let err = being.experience_time(&physics, &mut terrain).unwrap_err();
        assert!(matches!(
            err,
            BeingError::Genetics(GeneticsError::Exhausted(_))
        ));
    }
}
