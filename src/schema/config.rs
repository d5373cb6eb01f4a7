//! Configuration types for growth, physics and evolution parameters.

use serde::{Deserialize, Serialize};

/// Top-level session configuration, as loaded by the CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Growth and adult-life tunables.
    #[serde(default)]
    pub life: LifeConfig,
    /// Reference fabric integrator settings.
    #[serde(default)]
    pub physics: PhysicsConfig,
    /// Evolutionary search settings.
    #[serde(default)]
    pub evolution: EvolutionConfig,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
    /// Dead beings pass through the birth canal and are regrown.
    #[serde(default)]
    pub reincarnation: bool,
}

impl SessionConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.life.validate()?;
        self.physics.validate()?;
        self.evolution.validate()?;
        Ok(())
    }
}

/// Growth and adult-life constants of a being.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifeConfig {
    /// Energy charged per face opening.
    #[serde(default = "default_growth_cost")]
    pub growth_cost: f64,
    /// Ramp duration of a trunk opening.
    #[serde(default = "default_trunk_ticks")]
    pub trunk_ticks: u64,
    /// Ramp duration of a limb opening.
    #[serde(default = "default_limb_ticks")]
    pub limb_ticks: u64,
    /// Rest length of intervals created by openings.
    #[serde(default = "default_interval_length")]
    pub interval_length: f64,
    /// Upper bound on joint merges after trunk growth.
    #[serde(default = "default_joint_merge_rounds")]
    pub joint_merge_rounds: u32,
    /// Joints closer than this (and unconnected) are merged.
    #[serde(default = "default_joint_merge_distance")]
    pub joint_merge_distance: f64,
    /// Ramp duration of the shield collapse.
    #[serde(default = "default_shield_collapse_ticks")]
    pub shield_collapse_ticks: u64,
    /// Shield radius while growing.
    #[serde(default = "default_max_shield_radius")]
    pub max_shield_radius: f64,
    /// Shield radius in the birth canal.
    #[serde(default = "default_min_shield_radius")]
    pub min_shield_radius: f64,
    /// Energy granted at birth.
    #[serde(default = "default_adult_energy")]
    pub adult_energy: f64,
    /// Duration of one muscle perturbation.
    #[serde(default = "default_muscle_duration")]
    pub muscle_duration: u64,
    /// Ideal-length factor of a contracted muscle.
    #[serde(default = "default_contracted")]
    pub contracted: f64,
    /// Ideal-length factor of an extended muscle.
    #[serde(default = "default_extended")]
    pub extended: f64,
    /// Energy charged per contraction.
    #[serde(default = "default_contraction_energy")]
    pub contraction_energy: f64,
    /// Maximum water drawn per joint per tick.
    #[serde(default = "default_water_consumption")]
    pub water_consumption: f64,
    /// Radius of the planet surface.
    #[serde(default = "default_surface_radius")]
    pub surface_radius: f64,
    /// Goals closer than this are considered reached.
    #[serde(default = "default_min_goal_distance")]
    pub min_goal_distance: f64,
    /// Goals are pulled in to at most this distance.
    #[serde(default = "default_max_goal_distance")]
    pub max_goal_distance: f64,
    /// Duration of the death transformation.
    #[serde(default = "default_dying_time")]
    pub dying_time: u64,
    /// Body age between trail points.
    #[serde(default = "default_iterations_per_trail_point")]
    pub iterations_per_trail_point: u64,
    /// Oldest trail points are evicted past this size.
    #[serde(default = "default_max_trail_size")]
    pub max_trail_size: usize,
}

impl Default for LifeConfig {
    fn default() -> Self {
        Self {
            growth_cost: default_growth_cost(),
            trunk_ticks: default_trunk_ticks(),
            limb_ticks: default_limb_ticks(),
            interval_length: default_interval_length(),
            joint_merge_rounds: default_joint_merge_rounds(),
            joint_merge_distance: default_joint_merge_distance(),
            shield_collapse_ticks: default_shield_collapse_ticks(),
            max_shield_radius: default_max_shield_radius(),
            min_shield_radius: default_min_shield_radius(),
            adult_energy: default_adult_energy(),
            muscle_duration: default_muscle_duration(),
            contracted: default_contracted(),
            extended: default_extended(),
            contraction_energy: default_contraction_energy(),
            water_consumption: default_water_consumption(),
            surface_radius: default_surface_radius(),
            min_goal_distance: default_min_goal_distance(),
            max_goal_distance: default_max_goal_distance(),
            dying_time: default_dying_time(),
            iterations_per_trail_point: default_iterations_per_trail_point(),
            max_trail_size: default_max_trail_size(),
        }
    }
}

impl LifeConfig {
    /// Validate growth parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.growth_cost <= 0.0 {
            return Err(ConfigError::InvalidGrowthCost);
        }
        if self.contracted <= 0.0 || self.extended <= 0.0 {
            return Err(ConfigError::InvalidMuscleFactor);
        }
        if self.iterations_per_trail_point == 0 {
            return Err(ConfigError::InvalidTrailSpacing);
        }
        if self.min_goal_distance > self.max_goal_distance {
            return Err(ConfigError::InvalidGoalDistances);
        }
        Ok(())
    }
}

fn default_growth_cost() -> f64 {
    1.0 / 40.0
}
fn default_trunk_ticks() -> u64 {
    500
}
fn default_limb_ticks() -> u64 {
    1000
}
fn default_interval_length() -> f64 {
    1.0
}
fn default_joint_merge_rounds() -> u32 {
    30
}
fn default_joint_merge_distance() -> f64 {
    0.3
}
fn default_shield_collapse_ticks() -> u64 {
    3600
}
fn default_max_shield_radius() -> f64 {
    1.6
}
fn default_min_shield_radius() -> f64 {
    0.1
}
fn default_adult_energy() -> f64 {
    0.5
}
fn default_muscle_duration() -> u64 {
    1600
}
fn default_contracted() -> f64 {
    0.8
}
fn default_extended() -> f64 {
    1.2
}
fn default_contraction_energy() -> f64 {
    0.00003
}
fn default_water_consumption() -> f64 {
    default_contraction_energy() * 5.0
}
fn default_surface_radius() -> f64 {
    800.0
}
fn default_min_goal_distance() -> f64 {
    12.0
}
fn default_max_goal_distance() -> f64 {
    240.0
}
fn default_dying_time() -> u64 {
    2000
}
fn default_iterations_per_trail_point() -> u64 {
    3600
}
fn default_max_trail_size() -> usize {
    24
}

/// Settings of the reference fabric integrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicsConfig {
    /// Spring constant applied to interval length error.
    #[serde(default = "default_stiffness")]
    pub stiffness: f64,
    /// Velocity retained per iteration.
    #[serde(default = "default_drag")]
    pub drag: f64,
    /// Acceleration towards the planet centre.
    #[serde(default)]
    pub gravity: f64,
    /// Velocity retained by joints touching the surface.
    #[serde(default = "default_friction")]
    pub friction: f64,
    /// Planet surface radius; `None` floats beings in free space.
    #[serde(default)]
    pub surface_radius: Option<f64>,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            stiffness: default_stiffness(),
            drag: default_drag(),
            gravity: 0.0,
            friction: default_friction(),
            surface_radius: None,
        }
    }
}

impl PhysicsConfig {
    /// A planet with gravity and a solid surface.
    pub fn planet(surface_radius: f64) -> Self {
        Self {
            gravity: 0.0005,
            surface_radius: Some(surface_radius),
            ..Default::default()
        }
    }

    /// Validate integrator parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stiffness <= 0.0 || self.stiffness > 0.5 {
            return Err(ConfigError::InvalidStiffness(self.stiffness));
        }
        if !(0.0..=1.0).contains(&self.drag) || !(0.0..=1.0).contains(&self.friction) {
            return Err(ConfigError::InvalidDamping);
        }
        Ok(())
    }
}

fn default_stiffness() -> f64 {
    0.1
}
fn default_drag() -> f64 {
    0.8
}
fn default_friction() -> f64 {
    0.5
}

/// Evolutionary search over movement genes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// Target number of competitors.
    #[serde(default = "default_population_size")]
    pub population_size: usize,
    /// Mutated clones added per birth wave.
    #[serde(default = "default_birth_wave_size")]
    pub birth_wave_size: usize,
    /// Shortest competitor lifespan in iterations.
    #[serde(default = "default_min_lifespan")]
    pub min_lifespan: u64,
    /// Longest competitor lifespan in iterations.
    #[serde(default = "default_max_lifespan")]
    pub max_lifespan: u64,
    /// How far the ancestor is advanced when re-seeding.
    #[serde(default = "default_lifespan_advance")]
    pub lifespan_advance: u64,
    /// Per-bit mutation chance of an exercised movement gene.
    #[serde(default = "default_chance_of_mutation")]
    pub chance_of_mutation: f64,
    /// Credit for displacement that keeps to the ancestor's bearing.
    #[serde(default = "default_slope_towards_original_path")]
    pub slope_towards_original_path: f64,
    /// Iterations per simulated hour, used for speed.
    #[serde(default = "default_iterations_per_hour")]
    pub iterations_per_hour: u64,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: default_population_size(),
            birth_wave_size: default_birth_wave_size(),
            min_lifespan: default_min_lifespan(),
            max_lifespan: default_max_lifespan(),
            lifespan_advance: default_lifespan_advance(),
            chance_of_mutation: default_chance_of_mutation(),
            slope_towards_original_path: default_slope_towards_original_path(),
            iterations_per_hour: default_iterations_per_hour(),
        }
    }
}

impl EvolutionConfig {
    /// Validate population parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size < 2 {
            return Err(ConfigError::InvalidPopulationSize);
        }
        if self.birth_wave_size == 0 || self.birth_wave_size >= self.population_size {
            return Err(ConfigError::InvalidBirthWave {
                wave: self.birth_wave_size,
                population: self.population_size,
            });
        }
        if self.min_lifespan == 0 || self.min_lifespan > self.max_lifespan {
            return Err(ConfigError::InvalidLifespan {
                min: self.min_lifespan,
                max: self.max_lifespan,
            });
        }
        if !(0.0..=1.0).contains(&self.chance_of_mutation) {
            return Err(ConfigError::InvalidMutationChance(self.chance_of_mutation));
        }
        Ok(())
    }
}

fn default_population_size() -> usize {
    24
}
fn default_birth_wave_size() -> usize {
    8
}
fn default_iterations_per_hour() -> u64 {
    3600
}
fn default_min_lifespan() -> u64 {
    2 * default_iterations_per_hour()
}
fn default_max_lifespan() -> u64 {
    12 * default_iterations_per_hour()
}
fn default_lifespan_advance() -> u64 {
    default_iterations_per_hour() / 3
}
fn default_chance_of_mutation() -> f64 {
    0.01
}
fn default_slope_towards_original_path() -> f64 {
    0.6
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Growth cost must be positive")]
    InvalidGrowthCost,
    #[error("Muscle contraction and extension factors must be positive")]
    InvalidMuscleFactor,
    #[error("Trail points need a non-zero spacing")]
    InvalidTrailSpacing,
    #[error("Minimum goal distance exceeds maximum goal distance")]
    InvalidGoalDistances,
    #[error("Stiffness {0} is outside (0, 0.5]")]
    InvalidStiffness(f64),
    #[error("Drag and friction must lie in [0, 1]")]
    InvalidDamping,
    #[error("Population size must be at least 2")]
    InvalidPopulationSize,
    #[error("Birth wave of {wave} does not fit a population of {population}")]
    InvalidBirthWave { wave: usize, population: usize },
    #[error("Invalid lifespan bounds [{min}, {max}]")]
    InvalidLifespan { min: u64, max: u64 },
    #[error("Mutation chance {0} is outside [0, 1]")]
    InvalidMutationChance(f64),
}
