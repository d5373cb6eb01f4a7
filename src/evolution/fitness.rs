//! Scoring competitors against the ancestor's trip to its goal.

use std::cmp::Ordering;

use glam::DVec3;

/// Where the ancestor stood when its blueprint was frozen, and where it was
/// heading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bearing {
    pub body_center: DVec3,
    /// Unit vector from the ancestor's centre to the goal.
    pub to_goal: DVec3,
}

/// Fitness of one competitor.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Trip {
    pub travel_to_goal: f64,
    /// Displacement per hour of simulated life.
    pub speed: f64,
}

/// Score a body that has lived `age` iterations since the blueprint froze.
///
/// The remaining distance to `goal` is weighed by how well the remaining
/// heading agrees with the ancestor's bearing, with `slope` credit for the
/// perpendicular part.
pub fn trip_to_goal(
    bearing: &Bearing,
    goal: DVec3,
    body_center: DVec3,
    age: u64,
    iterations_per_hour: u64,
    slope: f64,
) -> Trip {
    let speed = if age == 0 {
        0.0
    } else {
        bearing.body_center.distance(body_center) * iterations_per_hour as f64 / age as f64
    };
    let to_goal = goal - body_center;
    let distance = to_goal.length();
    let cos = to_goal
        .normalize_or_zero()
        .dot(bearing.to_goal)
        .clamp(-1.0, 1.0);
    Trip {
        travel_to_goal: distance * (cos + slope * (1.0 - cos * cos).sqrt()),
        speed,
    }
}

/// Sort so the largest score ends up last.
pub fn rank_ascending<T>(items: &mut [T], score: impl Fn(&T) -> f64) {
    items.sort_by(|a, b| score(a).partial_cmp(&score(b)).unwrap_or(Ordering::Equal));
}

/// Drop from the front of a ranked list until `keep` remain.
pub fn retain_best<T>(items: &mut Vec<T>, keep: usize) {
    let excess = items.len().saturating_sub(keep);
    items.drain(..excess);
}
