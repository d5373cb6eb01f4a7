//! Where a being is, which way it faces, and where it has been.

use glam::DVec3;

use super::being::{Being, Phase};
use super::direction::Direction;

/// Body frame derived from the joints, refreshed once per body age.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub(crate) age: Option<u64>,
    pub(crate) body_center: DVec3,
    pub(crate) up: DVec3,
    pub(crate) forward: DVec3,
    pub(crate) right: DVec3,
    pub(crate) direction: Direction,
    pub(crate) body_radius: f64,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            age: None,
            body_center: DVec3::ZERO,
            up: DVec3::Y,
            forward: DVec3::Z,
            right: DVec3::X,
            direction: Direction::Fff,
            body_radius: 0.0,
        }
    }
}

impl Geometry {
    pub fn body_center(&self) -> DVec3 {
        self.body_center
    }

    pub fn up(&self) -> DVec3 {
        self.up
    }

    pub fn forward(&self) -> DVec3 {
        self.forward
    }

    pub fn right(&self) -> DVec3 {
        self.right
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn body_radius(&self) -> f64 {
        self.body_radius
    }
}

impl Being {
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Recompute the body frame, goal and direction, and extend the trail.
    pub fn refresh_geometry(&mut self) {
        let age = self.body.age();
        if self.phase == Phase::BirthCanal {
            self.follow_birth_canal();
            return;
        }
        if self.geometry.age == Some(age) {
            return;
        }
        let config = self.config.clone();
        let center = self.body.center();
        let on_planet = center.length() > config.surface_radius / 2.0;
        let up = if on_planet {
            center.normalize()
        } else {
            DVec3::Y
        };

        let mut right = match self.body.joints() {
            [j0, j1, j2, ..] => {
                let cross = (j1.location - j0.location).cross(j2.location - j1.location);
                (cross - up * cross.dot(up)).normalize_or_zero()
            }
            _ => DVec3::ZERO,
        };
        if right == DVec3::ZERO {
            right = up.any_orthonormal_vector();
        }
        let forward = right.cross(up);

        if self.goal == DVec3::ZERO {
            self.goal = center + forward * 3.0 * config.min_goal_distance;
            if on_planet {
                self.goal = self.goal.normalize() * config.surface_radius;
            }
        }
        let to_goal = self.goal - center;
        if to_goal.length() > config.max_goal_distance {
            self.goal = center + to_goal.normalize() * config.max_goal_distance;
            if on_planet {
                self.goal = self.goal.normalize() * config.surface_radius;
            }
            self.prey_name.clear();
        }

        let to_goal = self.goal - center;
        let heading = to_goal - up * to_goal.dot(up);
        if let Some(direction) = Direction::closest(heading.dot(forward), heading.dot(right)) {
            self.geometry.direction = direction;
        }

        if self.phase == Phase::AdultLife
            && self.shield.is_none()
            && age.saturating_sub(self.trail_age) > config.iterations_per_trail_point
        {
            self.trail.push_back(center);
            while self.trail.len() > config.max_trail_size {
                self.trail.pop_front();
            }
            self.trail_age = if self.trail_age == 0 {
                age
            } else {
                self.trail_age + config.iterations_per_trail_point
            };
        }

        self.geometry.age = Some(age);
        self.geometry.body_center = center;
        self.geometry.up = up;
        self.geometry.right = right;
        self.geometry.forward = forward;
        self.geometry.body_radius = self.body.max_distance_from(center);
    }

    /// Whether the goal is close enough to count as reached.
    pub fn has_reached_goal(&self) -> bool {
        self.geometry.body_center.distance(self.goal) < self.config.min_goal_distance
    }

    /// Drag the capsule shield along the trail, newest point last.
    pub(super) fn follow_birth_canal(&mut self) {
        let position = self.interpolate_trail();
        if let Some(shield) = &mut self.shield {
            let translation = position - shield.center();
            for joint in shield.joints_mut() {
                joint.location += translation;
            }
        }
        self.geometry.body_center = position;
        self.geometry.age = None;
    }

    /// Position along the trail after `trail_age` iterations of replay.
    pub(crate) fn interpolate_trail(&self) -> DVec3 {
        let Some(&start) = self.trail.front() else {
            return self.geometry.body_center;
        };
        let progress = self.trail_age as f64 / self.config.iterations_per_trail_point as f64;
        let index = progress.floor() as usize;
        let fraction = progress - index as f64;
        match (self.trail.get(index), self.trail.get(index + 1)) {
            (Some(from), Some(to)) => from.lerp(*to, fraction),
            (Some(last), None) => *last,
            _ => self.trail.back().copied().unwrap_or(start),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::body::being::tests::{embryo, grow};
    use crate::body::being::Target;
    use crate::fabric::Physics;
    use crate::schema::{LifeConfig, PhysicsConfig};
    use crate::terrain::Dry;

    #[test]
    fn test_default_goal_lies_ahead() {
        let config = LifeConfig::default();
        let mut being = Being::create(embryo(11), Rc::new(config.clone()));
        being.refresh_geometry();
        let geometry = being.geometry().clone();
        let expected = geometry.body_center + geometry.forward * 3.0 * config.min_goal_distance;
        assert!(being.goal().distance(expected) < 1e-9);
        assert_eq!(geometry.direction, Direction::Fff);
        assert!((geometry.forward.length() - 1.0).abs() < 1e-9);
        assert!(geometry.forward.dot(geometry.up).abs() < 1e-9);
    }

    #[test]
    fn test_far_goal_is_pulled_in() {
        let config = LifeConfig::default();
        let mut being = Being::create(embryo(12), Rc::new(config.clone()));
        being.set_target(&Target {
            location: DVec3::new(10_000.0, 0.0, 0.0),
            prey_name: "WXYZ".into(),
        });
        being.refresh_geometry();
        let distance = being.goal().distance(being.geometry().body_center());
        assert!((distance - config.max_goal_distance).abs() < 1e-6);
        assert_eq!(being.prey_name(), "");
    }

    #[test]
    fn test_direction_follows_goal() {
        let mut being = Being::create(embryo(13), Rc::new(LifeConfig::default()));
        being.refresh_geometry();
        let geometry = being.geometry().clone();
        let behind = geometry.body_center - geometry.forward * 50.0;
        being.set_target(&Target::at(behind));
        being.refresh_geometry();
        assert_eq!(being.geometry().direction(), Direction::Bbb);
        let left = geometry.body_center - geometry.right * 50.0;
        being.set_target(&Target::at(left));
        being.refresh_geometry();
        assert_eq!(being.geometry().direction(), Direction::Lll);
    }

    #[test]
    fn test_trail_is_bounded() {
        let physics = Physics::new(PhysicsConfig::default(), 50);
        let config = LifeConfig {
            iterations_per_trail_point: 50,
            max_trail_size: 5,
            ..Default::default()
        };
        let mut being = Being::create(embryo(14), Rc::new(config));
        grow(&mut being, &physics);
        assert!(being.trail().is_empty());
        let mut terrain = Dry;
        for _ in 0..40 {
            let trail_age = being.trail_age;
            being.experience_time(&physics, &mut terrain).unwrap();
            if being.trail_age != trail_age {
                assert_eq!(being.trail().back(), Some(&being.geometry().body_center()));
            }
        }
        assert_eq!(being.trail().len(), 5);
        assert!(being.fitness() >= 0.0);
    }
}
