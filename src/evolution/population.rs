//! Genetic search over movement genes.
//!
//! An adult ancestor is frozen into a blueprint. Competitors are thawed from
//! that blueprint, each carrying its own genome, and live side by side for a
//! lifespan. Culling keeps the ones that got furthest on the ancestor's way
//! to its goal, and birth waves refill the population with mutated clones.
//! Lifespans grow between generations; whenever they shrink or reset, the
//! ancestor walks a little further and everyone is rebuilt from it.

use std::collections::BTreeSet;
use std::mem;
use std::rc::Rc;

use super::EvolutionError;
use super::fitness::{Bearing, rank_ascending, retain_best, trip_to_goal};
use super::progress::EvolutionProgress;
use crate::body::{Being, BeingBlob, BeingError, Direction, Phase, Target};
use crate::fabric::Physics;
use crate::genetics::{GeneKey, Genome, SharedNoise};
use crate::schema::{EvolutionConfig, LifeConfig, PhysicsConfig};
use crate::terrain::{Dry, Terrain};

/// Iterations per step until the caller asks for something else.
const DEFAULT_ITERATIONS: u64 = 30;

/// Lifespans grow by this factor per generation.
const LIFESPAN_GROWTH: f64 = 1.1;

/// One clone of the ancestor with its own genome.
pub struct Competitor {
    being: Being,
    directions: BTreeSet<Direction>,
    travel_to_goal: f64,
    speed: f64,
}

impl Competitor {
    fn new(being: Being, directions: BTreeSet<Direction>) -> Self {
        Self {
            being,
            directions,
            travel_to_goal: 0.0,
            speed: 0.0,
        }
    }

    pub fn being(&self) -> &Being {
        &self.being
    }

    /// Directions faced so far; their movement genes are the exercised ones.
    pub fn directions(&self) -> &BTreeSet<Direction> {
        &self.directions
    }

    pub fn travel_to_goal(&self) -> f64 {
        self.travel_to_goal
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    fn age(&self, ancestor_age: u64) -> u64 {
        self.being.body().age().saturating_sub(ancestor_age)
    }

    fn step(
        &mut self,
        physics: &Physics,
        terrain: &mut dyn Terrain,
        target: &Target,
    ) -> Result<(), BeingError> {
        self.being.experience_time(physics, terrain)?;
        self.being.refresh_geometry();
        self.directions.insert(self.being.geometry().direction());
        self.being.set_target(target);
        Ok(())
    }
}

impl std::fmt::Debug for Competitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Competitor")
            .field("directions", &self.directions)
            .field("travel_to_goal", &self.travel_to_goal)
            .field("speed", &self.speed)
            .finish()
    }
}

pub struct EvolutionaryPopulation {
    config: EvolutionConfig,
    life: Rc<LifeConfig>,
    physics: Physics,
    noise: SharedNoise,
    ancestor: Being,
    ancestor_blob: BeingBlob,
    ancestor_age: u64,
    bearing: Bearing,
    distance_to_goal: f64,
    target: Target,
    lifespan: u64,
    competitors: Vec<Competitor>,
    progress: EvolutionProgress,
    terminated: bool,
}

impl std::fmt::Debug for EvolutionaryPopulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvolutionaryPopulation")
            .field("ancestor", &self.ancestor)
            .field("ancestor_age", &self.ancestor_age)
            .field("distance_to_goal", &self.distance_to_goal)
            .field("lifespan", &self.lifespan)
            .field("competitors", &self.competitors.len())
            .field("terminated", &self.terminated)
            .finish()
    }
}

impl EvolutionaryPopulation {
    /// Start evolving a copy of an adult being towards its current goal.
    pub fn new(
        ancestor: &Being,
        config: EvolutionConfig,
        physics: PhysicsConfig,
        noise: SharedNoise,
    ) -> Result<Self, EvolutionError> {
        if ancestor.phase() != Phase::AdultLife {
            return Err(EvolutionError::NotAdult(ancestor.phase()));
        }
        let life = ancestor.config().clone();
        let ancestor_blob = BeingBlob::new(ancestor)?;
        let mut evolver = ancestor_blob.instantiate(Some(noise.clone()), life.clone())?;
        evolver.set_virtual(true);
        evolver.refresh_geometry();
        let body_center = evolver.geometry().body_center();
        let to_goal = evolver.goal() - body_center;
        let target = Target {
            location: evolver.goal(),
            prey_name: evolver.prey_name().to_string(),
        };
        log::info!(
            "Evolving {} over {:.1} towards {:?}",
            evolver,
            to_goal.length(),
            target.location
        );
        let lifespan = config.min_lifespan;
        let mut population = Self {
            config,
            life,
            physics: Physics::new(physics, DEFAULT_ITERATIONS),
            noise,
            ancestor: evolver,
            ancestor_blob,
            ancestor_age: 0,
            bearing: Bearing {
                body_center,
                to_goal: to_goal.normalize_or_zero(),
            },
            distance_to_goal: to_goal.length(),
            target,
            lifespan,
            competitors: Vec::new(),
            progress: EvolutionProgress {
                lifespan,
                ..Default::default()
            },
            terminated: false,
        };
        population.freeze()?;
        Ok(population)
    }

    pub fn competitors(&self) -> &[Competitor] {
        &self.competitors
    }

    pub fn ancestor(&self) -> &Being {
        &self.ancestor
    }

    pub fn distance_to_goal(&self) -> f64 {
        self.distance_to_goal
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn progress(&self) -> &EvolutionProgress {
        &self.progress
    }

    pub fn lifespan(&self) -> u64 {
        self.lifespan
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Competitors head here from their next step on.
    pub fn set_target(&mut self, target: Target) {
        self.target = target;
    }

    /// Step every unfinished competitor by `iterations`.
    ///
    /// Returns `false` once everyone has lived out the lifespan and the
    /// population is full, which is when it is ready for [`Self::cull`].
    pub fn experience_time(&mut self, iterations: u64) -> Result<bool, EvolutionError> {
        if self.terminated {
            return Ok(false);
        }
        self.physics.set_iterations(iterations);
        if self.competitors.is_empty() {
            let genome = self.ancestor.genome().copy()?;
            let mut first = self.thaw(genome)?;
            first.refresh_geometry();
            let directions = BTreeSet::from([first.geometry().direction()]);
            self.competitors.push(Competitor::new(first, directions));
            self.birth_wave()?;
        }

        let (ancestor_age, lifespan) = (self.ancestor_age, self.lifespan);
        let physics = &self.physics;
        let target = &self.target;
        let mut terrain = Dry;
        self.competitors.retain_mut(|competitor| {
            if competitor.age(ancestor_age) > lifespan {
                return true;
            }
            match competitor.step(physics, &mut terrain, target) {
                Ok(()) => true,
                Err(err) => {
                    log::debug!("Competitor {} dropped: {err}", competitor.being);
                    false
                }
            }
        });

        if self.competitors.is_empty() {
            log::warn!("Every competitor failed, restarting from the ancestor");
            return Ok(true);
        }
        let finished = self
            .competitors
            .iter()
            .all(|competitor| competitor.age(ancestor_age) > lifespan);
        if !finished {
            return Ok(true);
        }
        if self.competitors.len() < self.config.population_size {
            self.birth_wave()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Rank by trip to the goal and drop the worst, leaving room for a
    /// birth wave. Returns the best competitor.
    pub fn cull(&mut self) -> Result<&Competitor, EvolutionError> {
        self.measure();
        self.cull_measured()
    }

    fn cull_measured(&mut self) -> Result<&Competitor, EvolutionError> {
        rank_ascending(&mut self.competitors, Competitor::travel_to_goal);
        let keep = self
            .config
            .population_size
            .saturating_sub(self.config.birth_wave_size);
        retain_best(&mut self.competitors, keep);
        let best = self
            .competitors
            .last()
            .ok_or(EvolutionError::EmptyPopulation)?;
        log::debug!(
            "Culled to {}, best travels {:.3} at speed {:.3}",
            self.competitors.len(),
            best.travel_to_goal,
            best.speed
        );
        Ok(best)
    }

    /// Grow the lifespan by a tenth. Returns `true`, leaving the lifespan
    /// alone, when that would pass the maximum.
    pub fn advance_lifespan(&mut self) -> Result<bool, EvolutionError> {
        let longer = (self.lifespan as f64 * LIFESPAN_GROWTH) as u64;
        if longer > self.config.max_lifespan {
            return Ok(true);
        }
        self.set_lifespan(longer)?;
        Ok(false)
    }

    /// Back to the shortest lifespan, which always reseeds.
    pub fn reset_lifespan(&mut self) -> Result<(), EvolutionError> {
        self.set_lifespan(self.config.min_lifespan)
    }

    /// Forget every exercised movement gene so it gets re-rolled, then
    /// start over from the shortest lifespan.
    pub fn randomize_movement_genes(&mut self) -> Result<(), EvolutionError> {
        for competitor in &mut self.competitors {
            for direction in &competitor.directions {
                competitor.being.randomize_movement_gene(*direction);
            }
        }
        self.reset_lifespan()
    }

    /// Stop evolving and hand over the best genome.
    pub fn terminate(&mut self) -> Result<Genome, EvolutionError> {
        self.terminated = true;
        self.measure();
        rank_ascending(&mut self.competitors, Competitor::travel_to_goal);
        let best = self
            .competitors
            .last()
            .ok_or(EvolutionError::EmptyPopulation)?;
        log::info!(
            "Evolution of {} ends with travel {:.3}",
            self.ancestor,
            best.travel_to_goal
        );
        Ok(best.being.genome().copy()?)
    }

    fn set_lifespan(&mut self, lifespan: u64) -> Result<(), EvolutionError> {
        let lifespan = lifespan.clamp(self.config.min_lifespan, self.config.max_lifespan);
        self.measure();
        let ancestor_age = self.ancestor_age;
        let speeds = self
            .competitors
            .iter()
            .filter(|competitor| competitor.age(ancestor_age) > self.lifespan)
            .map(Competitor::speed);
        let mut progress =
            EvolutionProgress::measure(self.progress.generation + 1, lifespan, speeds);
        let reseed = lifespan < self.lifespan || lifespan == self.config.min_lifespan;
        self.lifespan = lifespan;
        if reseed {
            self.advance_ancestor(self.config.lifespan_advance)?;
            self.freeze()?;
            self.reboot()?;
            progress.reseeded = true;
        }
        log::info!("{progress}");
        self.progress = progress;
        Ok(())
    }

    /// Score every competitor against the frozen bearing.
    fn measure(&mut self) {
        for competitor in &mut self.competitors {
            competitor.being.refresh_geometry();
            let trip = trip_to_goal(
                &self.bearing,
                self.target.location,
                competitor.being.geometry().body_center(),
                competitor.age(self.ancestor_age),
                self.config.iterations_per_hour,
                self.config.slope_towards_original_path,
            );
            competitor.travel_to_goal = trip.travel_to_goal;
            competitor.speed = trip.speed;
        }
    }

    /// Walk the ancestor forward in time, stepping as competitors do, then
    /// take up the goal it ends up with.
    fn advance_ancestor(&mut self, iterations: u64) -> Result<(), EvolutionError> {
        let chunk = self.physics.iterations().max(1);
        let mut terrain = Dry;
        let mut advanced = 0;
        while advanced < iterations {
            self.ancestor.set_target(&self.target);
            self.ancestor.experience_time(&self.physics, &mut terrain)?;
            advanced += chunk;
        }
        self.ancestor.refresh_geometry();
        self.target = Target {
            location: self.ancestor.goal(),
            prey_name: self.ancestor.prey_name().to_string(),
        };
        Ok(())
    }

    /// Blueprint the ancestor and take the bearing from where it stands.
    fn freeze(&mut self) -> Result<(), EvolutionError> {
        self.ancestor_blob = BeingBlob::new(&self.ancestor)?;
        self.ancestor_age = self.ancestor.body().age();
        self.ancestor.refresh_geometry();
        let body_center = self.ancestor.geometry().body_center();
        let to_goal = self.target.location - body_center;
        self.bearing = Bearing {
            body_center,
            to_goal: to_goal.normalize_or_zero(),
        };
        self.distance_to_goal = to_goal.length();
        Ok(())
    }

    /// Rebuild every competitor from the current blueprint, keeping genomes.
    fn reboot(&mut self) -> Result<(), EvolutionError> {
        for mut competitor in mem::take(&mut self.competitors) {
            let genome = mem::take(competitor.being.genome_mut());
            let being = self.thaw(genome)?;
            self.competitors
                .push(Competitor::new(being, competitor.directions));
        }
        Ok(())
    }

    /// A fresh body from the blueprint carrying `genome`.
    fn thaw(&self, genome: Genome) -> Result<Being, EvolutionError> {
        let mut being = self
            .ancestor_blob
            .instantiate(Some(self.noise.clone()), self.life.clone())?;
        being.set_genome(genome);
        being.set_virtual(true);
        being.set_target(&self.target);
        Ok(being)
    }

    /// Add mutated clones of randomly chosen competitors.
    fn birth_wave(&mut self) -> Result<(), EvolutionError> {
        if self.competitors.is_empty() {
            return Err(EvolutionError::EmptyPopulation);
        }
        for _ in 0..self.config.birth_wave_size {
            let count = self.competitors.len();
            let pick = self.noise.borrow_mut().choose(count).min(count - 1);
            let parent = &self.competitors[pick];
            let mut directions = parent.directions.clone();
            let mut being = self.thaw(parent.being.genome().copy()?)?;
            being.refresh_geometry();
            directions.insert(being.geometry().direction());
            for direction in &directions {
                being
                    .genome_mut()
                    .gene(&GeneKey::Movement(*direction).name())
                    .mutate(self.config.chance_of_mutation)
                    .map_err(BeingError::from)?;
            }
            self.competitors.push(Competitor::new(being, directions));
        }
        log::debug!("Birth wave, population {}", self.competitors.len());
        Ok(())
    }
}
