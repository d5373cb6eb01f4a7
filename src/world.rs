//! A session: beings on a planet, stepped together.
//!
//! The world owns the shared noise, physics and terrain. Every step it
//! points hunters at their prey, lets every being experience time, buries
//! the dead (or sends them through the birth canal) and regrows the undead.
//! One being at a time can be handed to an evolutionary population.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::rc::Rc;

use glam::{DMat3, DQuat, DVec3};

use crate::body::{Being, Embryo, Phase, Speech, Target};
use crate::codec;
use crate::evolution::{EvolutionError, EvolutionaryPopulation};
use crate::fabric::{Fabric, Physics, Transformation};
use crate::genetics::{GeneticsError, Genome, NoiseSeed, PseudoNoise, SharedNoise, shared};
use crate::schema::{ConfigError, LifeConfig, SessionConfig};
use crate::terrain::{SurfaceWater, Terrain};

/// Magic bytes identifying a saved world.
pub const WORLD_MAGIC: &[u8; 4] = b"WMKW";

const ID_LENGTH: usize = 4;
const WATER_CELL_SIZE: f64 = 10.0;

#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Genetics(#[from] GeneticsError),
    #[error(transparent)]
    Evolution(#[from] EvolutionError),
    #[error("No being named {0}")]
    UnknownBeing(String),
    #[error("Nothing is evolving")]
    NoEvolution,
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub struct World {
    config: SessionConfig,
    life: Rc<LifeConfig>,
    physics: Physics,
    noise: SharedNoise,
    terrain: Box<dyn Terrain>,
    beings: BTreeMap<String, Being>,
    casualties: Vec<Being>,
    evolution: Option<(String, EvolutionaryPopulation)>,
    age: u64,
}

impl World {
    /// A world with rain-filled surface water.
    pub fn new(config: SessionConfig) -> Result<Self, WorldError> {
        let seed = config.random_seed.unwrap_or_else(rand::random);
        let terrain = SurfaceWater::with_rainfall(WATER_CELL_SIZE, 1.0, 0.5, seed);
        Self::with_terrain(config, Box::new(terrain))
    }

    pub fn with_terrain(
        config: SessionConfig,
        terrain: Box<dyn Terrain>,
    ) -> Result<Self, WorldError> {
        config.validate()?;
        let noise = match config.random_seed {
            Some(seed) => shared(PseudoNoise::from_seed(NoiseSeed::from_u64(seed))),
            None => shared(PseudoNoise::random()),
        };
        Ok(Self {
            life: Rc::new(config.life.clone()),
            physics: Physics::new(config.physics.clone(), 1),
            config,
            noise,
            terrain,
            beings: BTreeMap::new(),
            casualties: Vec::new(),
            evolution: None,
            age: 0,
        })
    }

    pub fn age(&self) -> u64 {
        self.age
    }

    pub fn noise(&self) -> &SharedNoise {
        &self.noise
    }

    pub fn terrain(&self) -> &dyn Terrain {
        self.terrain.as_ref()
    }

    pub fn being(&self, id: &str) -> Option<&Being> {
        self.beings.get(id)
    }

    pub fn being_mut(&mut self, id: &str) -> Option<&mut Being> {
        self.beings.get_mut(id)
    }

    pub fn beings(&self) -> impl Iterator<Item = &Being> {
        self.beings.values()
    }

    /// Beings removed after an error.
    pub fn casualties(&self) -> &[Being] {
        &self.casualties
    }

    /// Beings ranked by distance walked, furthest first.
    pub fn ranking(&self) -> Vec<&Being> {
        let mut beings: Vec<&Being> = self.beings.values().collect();
        beings.sort_by(|a, b| b.fitness().total_cmp(&a.fitness()));
        beings
    }

    /// The being lying furthest along `direction`, other than `avoid`.
    pub fn nearest_being(&self, direction: DVec3, avoid: Option<&str>) -> Option<&Being> {
        self.beings
            .values()
            .filter(|being| Some(being.id()) != avoid)
            .max_by(|a, b| {
                let a = direction.dot(a.geometry().body_center());
                let b = direction.dot(b.geometry().body_center());
                a.total_cmp(&b)
            })
    }

    /// Conceive a being with a fresh genome and a new random name.
    ///
    /// With a `location` it is planted there facing `gaze` (on a planet, on
    /// the surface below it); otherwise it grows at the origin.
    pub fn create_being(
        &mut self,
        email: &str,
        speech: &str,
        location: Option<DVec3>,
        gaze: DVec3,
    ) -> Result<&Being, WorldError> {
        let id = self.fresh_id();
        let genome = Genome::new(Some(self.noise.clone()));
        let embryo = Embryo::new(id, email, Speech::new(speech), genome, None)?;
        Ok(self.create_from_embryo(embryo, location, gaze))
    }

    pub fn create_from_embryo(
        &mut self,
        embryo: Embryo,
        location: Option<DVec3>,
        gaze: DVec3,
    ) -> &Being {
        let mut being = Being::create(embryo, self.life.clone());
        if let Some(location) = location {
            self.plant(&mut being, location, gaze);
        }
        being.refresh_geometry();
        let id = being.id().to_string();
        log::info!("Being created: {being}");
        match self.beings.entry(id) {
            Entry::Occupied(mut entry) => {
                entry.insert(being);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(being),
        }
    }

    /// Step every being by `iterations`.
    pub fn experience_time(&mut self, iterations: u64) {
        self.age += iterations;
        self.physics.set_iterations(iterations);
        self.chase_prey();

        let mut reborn = Vec::new();
        let ids: Vec<String> = self.beings.keys().cloned().collect();
        for id in ids {
            let Some(being) = self.beings.get_mut(&id) else {
                continue;
            };
            if let Err(err) = being.experience_time(&self.physics, self.terrain.as_mut()) {
                log::warn!("Casualty {id}: {err}");
                if let Some(being) = self.beings.remove(&id) {
                    self.casualties.push(being);
                }
                continue;
            }
            match being.phase() {
                Phase::Death if self.config.reincarnation => being.enter_birth_canal(),
                Phase::Death => {
                    log::info!("Death of {being}");
                    self.beings.remove(&id);
                }
                Phase::Undeath => {
                    if let Some(being) = self.beings.remove(&id) {
                        reborn.push(being);
                    }
                }
                _ => {}
            }
        }
        for being in reborn {
            if let Err(err) = self.reincarnate(being) {
                log::warn!("Reincarnation failed: {err}");
            }
        }
    }

    /// Hand a being's walking to an evolutionary population.
    pub fn start_evolution(&mut self, id: &str) -> Result<&mut EvolutionaryPopulation, WorldError> {
        let being = self
            .beings
            .get(id)
            .ok_or_else(|| WorldError::UnknownBeing(id.to_string()))?;
        let population = EvolutionaryPopulation::new(
            being,
            self.config.evolution.clone(),
            self.config.physics.clone(),
            self.noise.clone(),
        )?;
        Ok(&mut self.evolution.insert((id.to_string(), population)).1)
    }

    pub fn evolution(&self) -> Option<&EvolutionaryPopulation> {
        self.evolution.as_ref().map(|(_, population)| population)
    }

    pub fn evolution_mut(&mut self) -> Option<&mut EvolutionaryPopulation> {
        self.evolution.as_mut().map(|(_, population)| population)
    }

    /// Give the evolving being the best genome found and stop evolving.
    pub fn adopt_evolution(&mut self) -> Result<&Being, WorldError> {
        let (id, mut population) = self.evolution.take().ok_or(WorldError::NoEvolution)?;
        let genome = population.terminate()?;
        let being = self
            .beings
            .get_mut(&id)
            .ok_or(WorldError::UnknownBeing(id))?;
        being.set_genome(genome);
        log::info!("{being} adopted its evolved genome");
        Ok(being)
    }

    /// Abandon evolution, keeping the being as it was.
    pub fn abandon_evolution(&mut self) {
        if let Some((id, _)) = self.evolution.take() {
            log::info!("Evolution of {id} abandoned");
        }
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(WORLD_MAGIC)?;
        codec::write_u64(w, self.age)?;
        codec::write_u32(w, self.beings.len() as u32)?;
        for being in self.beings.values() {
            being.write_to(w)?;
        }
        log::info!("Saved {} beings", self.beings.len());
        Ok(())
    }

    /// Replace the beings of this world with the saved ones.
    pub fn read_beings<R: Read>(&mut self, r: &mut R) -> io::Result<()> {
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic)?;
        if &magic != WORLD_MAGIC {
            return Err(codec::invalid_data("not a world file"));
        }
        self.age = codec::read_u64(r)?;
        let count = codec::read_u32(r)?;
        self.beings.clear();
        for _ in 0..count {
            let mut being = Being::read_from(r, Some(self.noise.clone()), self.life.clone())?;
            being.refresh_geometry();
            log::info!(
                "Loaded {being} (age {}), prey: {:?}",
                being.body().age(),
                being.prey_name()
            );
            self.beings.insert(being.id().to_string(), being);
        }
        Ok(())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        self.write_to(&mut w)?;
        w.flush()
    }

    pub fn load(&mut self, path: impl AsRef<Path>) -> io::Result<()> {
        let mut r = BufReader::new(File::open(path)?);
        self.read_beings(&mut r)
    }

    fn fresh_id(&mut self) -> String {
        loop {
            let id: String = {
                let mut noise = self.noise.borrow_mut();
                (0..ID_LENGTH)
                    .map(|_| char::from(b'A' + noise.choose(26).min(25) as u8))
                    .collect()
            };
            if !self.beings.contains_key(&id) {
                return id;
            }
        }
    }

    fn chase_prey(&mut self) {
        let targets: Vec<(String, Target)> = self
            .beings
            .values()
            .filter(|being| !being.prey_name().is_empty())
            .filter_map(|being| {
                let prey = self.beings.get(being.prey_name())?;
                Some((
                    being.id().to_string(),
                    Target {
                        location: prey.geometry().body_center(),
                        prey_name: prey.id().to_string(),
                    },
                ))
            })
            .collect();
        for (id, target) in targets {
            if let Some(being) = self.beings.get_mut(&id) {
                being.set_target(&target);
            }
        }
    }

    /// Regrow an undead being where its capsule stopped.
    fn reincarnate(&mut self, mut being: Being) -> Result<(), WorldError> {
        let center = being
            .shield()
            .map(Fabric::center)
            .unwrap_or_else(|| being.geometry().body_center());
        let trail = being.trail();
        let forward = match (trail.front(), trail.back()) {
            (Some(first), Some(last)) if last.distance(*first) > 0.1 => (*last - *first).normalize(),
            _ => self.random_direction(),
        };
        let trail: Vec<DVec3> = trail.iter().copied().collect();
        let genome = std::mem::take(being.genome_mut());
        let embryo = Embryo::new(
            being.id(),
            being.email(),
            being.speech().clone(),
            genome,
            Some(trail),
        )?;
        let fresh = self.create_from_embryo(embryo, Some(center), forward);
        log::info!("{fresh} reborn");
        Ok(())
    }

    fn random_direction(&mut self) -> DVec3 {
        let mut noise = self.noise.borrow_mut();
        let mut coordinate = || noise.next_double() * 2.0 - 1.0;
        DVec3::new(coordinate(), coordinate(), coordinate()).normalize_or(DVec3::X)
    }

    /// Turn and move body and shield so the being faces along `gaze` at
    /// `location`, or on a planet, rests on the surface below it.
    fn plant(&self, being: &mut Being, location: DVec3, gaze: DVec3) {
        let surface = self.config.physics.surface_radius;
        let up = match surface {
            Some(_) => location.normalize_or(DVec3::Y),
            None => DVec3::Y,
        };
        let mut forward = (gaze - up * gaze.dot(up)).normalize_or_zero();
        if forward == DVec3::ZERO {
            forward = up.any_orthonormal_vector();
        }
        let right = up.cross(forward);
        let rotation = DQuat::from_mat3(&DMat3::from_cols(right, up, forward));
        let (pivot, radius) = match being.shield() {
            Some(shield) => {
                let center = shield.center();
                (center, shield.max_distance_from(center))
            }
            None => {
                let center = being.body().center();
                (center, being.body().max_distance_from(center))
            }
        };
        let destination = match surface {
            Some(surface) => up * (surface + radius),
            None => location,
        };
        let relocate = Transformation::Relocate {
            rotation,
            translation: destination - rotation * pivot,
        };
        being.body_mut().add_transformation(relocate.clone());
        being.body_mut().execute_transformations(None);
        if let Some(shield) = &mut being.shield {
            shield.add_transformation(relocate);
            shield.execute_transformations(None);
        }
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("age", &self.age)
            .field("beings", &self.beings.keys().collect::<Vec<_>>())
            .field("casualties", &self.casualties.len())
            .field("evolving", &self.evolution.as_ref().map(|(id, _)| id))
            .finish()
    }
}
