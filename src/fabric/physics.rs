//! Relaxation integrator for fabrics.
//!
//! Intervals pull (and springs push) their joints towards ideal lengths;
//! velocities decay by drag. On a planet, gravity pulls towards the centre and
//! joints cannot sink below the surface, where friction holds them back.

use glam::DVec3;

use super::structure::{Fabric, Role};
use crate::schema::PhysicsConfig;

/// Integrator settings plus the number of iterations per execution.
#[derive(Debug, Clone)]
pub struct Physics {
    config: PhysicsConfig,
    iterations: u64,
}

impl Physics {
    pub fn new(config: PhysicsConfig, iterations: u64) -> Self {
        Self { config, iterations }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn set_iterations(&mut self, iterations: u64) {
        self.iterations = iterations;
    }

    /// Run `iterations` relaxation steps; every step ages the fabric by one.
    pub fn iterate(&self, fabric: &mut Fabric) {
        for _ in 0..self.iterations {
            self.relax(fabric);
            fabric.tick();
        }
    }

    fn relax(&self, fabric: &mut Fabric) {
        let stiffness = self.config.stiffness;
        for interval in &fabric.intervals {
            let alpha = fabric.joints[interval.alpha].location;
            let omega = fabric.joints[interval.omega].location;
            let delta = omega - alpha;
            let length = delta.length();
            if length <= f64::EPSILON {
                continue;
            }
            let stretch = length - interval.span.ideal();
            if interval.role == Role::Cable && stretch < 0.0 {
                continue;
            }
            let push = delta / length * (stretch * stiffness / 2.0);
            fabric.joints[interval.alpha].velocity += push;
            fabric.joints[interval.omega].velocity -= push;
        }
        for joint in &mut fabric.joints {
            let up = joint.location.normalize_or_zero();
            if self.config.gravity > 0.0 {
                joint.velocity -= up * self.config.gravity;
            }
            joint.velocity *= self.config.drag;
            joint.location += joint.velocity;
            if let Some(surface) = self.config.surface_radius
                && joint.location.length() < surface
                && up != DVec3::ZERO
            {
                joint.location = up * surface;
                let sinking = joint.velocity.dot(up).min(0.0);
                joint.velocity = (joint.velocity - up * sinking) * self.config.friction;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spring_relaxes_to_ideal() {
        let mut fabric = Fabric::new();
        let a = fabric.add_joint(DVec3::ZERO);
        let b = fabric.add_joint(DVec3::new(2.0, 0.0, 0.0));
        fabric.add_interval(a, b, Role::Spring, 1.0);
        Physics::new(PhysicsConfig::default(), 500).iterate(&mut fabric);
        let length = fabric.joints()[0].location.distance(fabric.joints()[1].location);
        assert!((length - 1.0).abs() < 1e-3, "length {length}");
        assert_eq!(fabric.age(), 500);
    }

    #[test]
    fn test_cable_does_not_push() {
        let mut fabric = Fabric::new();
        let a = fabric.add_joint(DVec3::ZERO);
        let b = fabric.add_joint(DVec3::new(0.5, 0.0, 0.0));
        fabric.add_interval(a, b, Role::Cable, 1.0);
        Physics::new(PhysicsConfig::default(), 50).iterate(&mut fabric);
        assert_eq!(fabric.joints()[1].location, DVec3::new(0.5, 0.0, 0.0));
    }

    #[test]
    fn test_surface_holds_joints() {
        let mut fabric = Fabric::new();
        fabric.add_joint(DVec3::new(0.0, 801.0, 0.0));
        Physics::new(PhysicsConfig::planet(800.0), 2000).iterate(&mut fabric);
        let height = fabric.joints()[0].location.length();
        assert!((height - 800.0).abs() < 1e-9, "height {height}");
    }
}
