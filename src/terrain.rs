//! Water on the planet surface.

use std::collections::HashMap;

use glam::DVec3;
use rand::prelude::*;
use rand_distr::Normal;

/// Where beings drink.
pub trait Terrain {
    /// Take up to `amount` of water near `location`; returns what was taken.
    fn consume_water(&mut self, location: DVec3, amount: f64) -> f64;

    /// Water available near `location`.
    fn water_at(&self, location: DVec3) -> f64;
}

/// A planet without water.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dry;

impl Terrain for Dry {
    fn consume_water(&mut self, _location: DVec3, _amount: f64) -> f64 {
        0.0
    }

    fn water_at(&self, _location: DVec3) -> f64 {
        0.0
    }
}

/// Water reservoirs on a grid of cubic cells.
///
/// Cells are filled the first time they are touched, either to a fixed level
/// or to a level drawn from a rainfall distribution.
pub struct SurfaceWater {
    cell_size: f64,
    cells: HashMap<(i64, i64, i64), f64>,
    rainfall: Rainfall,
}

enum Rainfall {
    Even(f64),
    Scattered { rng: StdRng, normal: Normal<f64> },
}

impl SurfaceWater {
    /// Every cell starts with `level`.
    pub fn new(cell_size: f64, level: f64) -> Self {
        Self {
            cell_size,
            cells: HashMap::new(),
            rainfall: Rainfall::Even(level),
        }
    }

    /// Cells start with normally distributed levels, never negative.
    pub fn with_rainfall(cell_size: f64, mean: f64, std_dev: f64, seed: u64) -> Self {
        let rainfall = match Normal::new(mean, std_dev) {
            Ok(normal) => Rainfall::Scattered {
                rng: StdRng::seed_from_u64(seed),
                normal,
            },
            Err(_) => Rainfall::Even(mean.max(0.0)),
        };
        Self {
            cell_size,
            cells: HashMap::new(),
            rainfall,
        }
    }

    fn cell(&self, location: DVec3) -> (i64, i64, i64) {
        let scaled = (location / self.cell_size).floor();
        (scaled.x as i64, scaled.y as i64, scaled.z as i64)
    }

    fn reservoir(&mut self, location: DVec3) -> &mut f64 {
        let cell = self.cell(location);
        let rainfall = &mut self.rainfall;
        self.cells.entry(cell).or_insert_with(|| match rainfall {
            Rainfall::Even(level) => *level,
            Rainfall::Scattered { rng, normal } => normal.sample(rng).max(0.0),
        })
    }
}

impl Terrain for SurfaceWater {
    fn consume_water(&mut self, location: DVec3, amount: f64) -> f64 {
        let reservoir = self.reservoir(location);
        let taken = amount.clamp(0.0, *reservoir);
        *reservoir -= taken;
        taken
    }

    fn water_at(&self, location: DVec3) -> f64 {
        match self.cells.get(&self.cell(location)) {
            Some(level) => *level,
            None => match &self.rainfall {
                Rainfall::Even(level) => *level,
                Rainfall::Scattered { normal, .. } => normal.mean().max(0.0),
            },
        }
    }
}
