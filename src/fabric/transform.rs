//! Queued structural changes and their execution.

use glam::{DQuat, DVec3};

use super::physics::Physics;
use super::structure::{Chirality, Fabric, FabricEvent, FaceId, Joint, Role};

/// Sideways lean of a chiral apex, relative to the opening length.
const CHIRAL_LEAN: f64 = 0.05;
/// Initial height of a new apex, relative to the opening length.
const APEX_HEIGHT: f64 = 0.1;

/// Raise a tetrahedron on a face.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenUp {
    pub face: FaceId,
    pub role: Role,
    /// Final length of the three new intervals.
    pub length: f64,
    /// Iterations to ramp to `length`.
    pub ticks: u64,
    /// Lean the apex according to the face's chirality.
    pub use_chirality: bool,
    /// Report the new faces as [`FabricEvent::FacesOpened`].
    pub notify: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transformation {
    OpenUp(OpenUp),
    Twist {
        face: FaceId,
        clockwise: bool,
    },
    /// Merge the closest unconnected pair of joints nearer than `threshold`.
    MergeJoints {
        threshold: f64,
    },
    ScaleCables {
        factor: f64,
        ticks: u64,
    },
    /// Tear every interval loose and let it shrink away.
    Death {
        ticks: u64,
    },
    Relocate {
        rotation: DQuat,
        translation: DVec3,
    },
}

impl Fabric {
    /// Apply every queued transformation, then run the physics if given.
    pub fn execute_transformations(&mut self, physics: Option<&Physics>) {
        while let Some(transformation) = self.transformations.pop_front() {
            self.apply(transformation);
        }
        if let Some(physics) = physics {
            physics.iterate(self);
        }
    }

    fn apply(&mut self, transformation: Transformation) {
        match transformation {
            Transformation::OpenUp(open_up) => self.open_up(&open_up),
            Transformation::Twist { face, clockwise } => {
                if let Some(face) = self.face_mut(face) {
                    face.twist(clockwise);
                }
            }
            Transformation::MergeJoints { threshold } => {
                let merged = self.merge_closest(threshold);
                self.events.push(FabricEvent::JointsMerged { merged });
            }
            Transformation::ScaleCables { factor, ticks } => {
                for interval in &mut self.intervals {
                    if interval.role == Role::Cable {
                        let target = interval.span.ultimate_ideal() * factor;
                        interval.span.set_ideal(target, ticks);
                    }
                }
            }
            Transformation::Death { ticks } => self.fall_apart(ticks),
            Transformation::Relocate {
                rotation,
                translation,
            } => {
                for joint in &mut self.joints {
                    joint.location = rotation * joint.location + translation;
                    joint.velocity = rotation * joint.velocity;
                }
            }
        }
    }

    fn open_up(&mut self, open_up: &OpenUp) {
        let Some(face) = self.face(open_up.face).cloned() else {
            log::debug!("Face {:?} vanished before opening", open_up.face);
            return;
        };
        let [a, b, c] = face.joints;
        let centroid = self.face_centroid(&face);
        let mut apex = centroid + self.face_normal(&face) * open_up.length * APEX_HEIGHT;
        if open_up.use_chirality {
            let lean = (self.joints[a].location - centroid) * CHIRAL_LEAN;
            apex += match face.chirality {
                Chirality::Left => lean,
                Chirality::Right => -lean,
            };
        }
        let d = self.add_joint(apex);
        for base in [a, b, c] {
            let start = self.joints[base].location.distance(apex);
            let interval = self.add_interval(base, d, open_up.role, start);
            self.intervals[interval]
                .span
                .set_ideal(open_up.length, open_up.ticks);
        }
        if let Some(original) = self.face_mut(open_up.face) {
            original.joints = [b, c, d];
        }
        let face01 = self.add_face([a, b, d], face.chirality);
        let face20 = self.add_face([c, a, d], face.chirality);
        if open_up.notify {
            self.events.push(FabricEvent::FacesOpened {
                face: open_up.face,
                face01,
                face20,
            });
        }
    }

    fn merge_closest(&mut self, threshold: f64) -> bool {
        let mut closest: Option<(usize, usize, f64)> = None;
        for keep in 0..self.joints.len() {
            for gone in keep + 1..self.joints.len() {
                let distance = self.joints[keep]
                    .location
                    .distance(self.joints[gone].location);
                if distance < threshold
                    && closest.is_none_or(|(_, _, best)| distance < best)
                    && !self.interval_between(keep, gone)
                {
                    closest = Some((keep, gone, distance));
                }
            }
        }
        let Some((keep, gone, _)) = closest else {
            return false;
        };
        let removed = self.joints.remove(gone);
        let kept = &mut self.joints[keep];
        kept.location = (kept.location + removed.location) / 2.0;
        kept.velocity = (kept.velocity + removed.velocity) / 2.0;

        let remap = |joint: usize| match joint {
            j if j == gone => keep,
            j if j > gone => j - 1,
            j => j,
        };
        let mut seen = Vec::new();
        self.intervals.retain_mut(|interval| {
            interval.alpha = remap(interval.alpha);
            interval.omega = remap(interval.omega);
            let key = (
                interval.alpha.min(interval.omega),
                interval.alpha.max(interval.omega),
            );
            if interval.alpha == interval.omega || seen.contains(&key) {
                return false;
            }
            seen.push(key);
            true
        });
        self.faces.retain_mut(|face| {
            face.joints = face.joints.map(remap);
            let [a, b, c] = face.joints;
            a != b && b != c && c != a
        });
        log::debug!("Merged joint {gone} into {keep}");
        true
    }

    fn fall_apart(&mut self, ticks: u64) {
        let mut joints = Vec::with_capacity(self.intervals.len() * 2);
        for interval in &mut self.intervals {
            joints.push(Joint {
                location: self.joints[interval.alpha].location,
                velocity: self.joints[interval.alpha].velocity,
            });
            interval.alpha = joints.len() - 1;
            joints.push(Joint {
                location: self.joints[interval.omega].location,
                velocity: self.joints[interval.omega].velocity,
            });
            interval.omega = joints.len() - 1;
            let target = interval.span.ultimate_ideal() / 2.0;
            interval.span.set_ideal(target, ticks);
        }
        self.joints = joints;
        self.faces.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(face: FaceId, notify: bool) -> Transformation {
        Transformation::OpenUp(OpenUp {
            face,
            role: Role::Spring,
            length: 1.0,
            ticks: 10,
            use_chirality: false,
            notify,
        })
    }

    #[test]
    fn test_open_up_keeps_face_identity() {
        let mut fabric = Fabric::seed_triangle(1.0);
        let face = fabric.faces()[0].id;
        fabric.add_transformation(open(face, true));
        fabric.execute_transformations(None);

        assert_eq!(fabric.joints().len(), 4);
        assert_eq!(fabric.intervals().len(), 6);
        assert_eq!(fabric.faces().len(), 4);
        assert!(fabric.is_any_span_active());
        let events = fabric.take_events();
        let [FabricEvent::FacesOpened { face: opened, face01, face20 }] = events.as_slice() else {
            panic!("expected one opening, got {events:?}");
        };
        assert_eq!(*opened, face);
        assert_eq!(fabric.face(face).unwrap().joints, [1, 2, 3]);
        assert_eq!(fabric.face(*face01).unwrap().joints, [0, 1, 3]);
        assert_eq!(fabric.face(*face20).unwrap().joints, [2, 0, 3]);
        assert!(fabric.take_events().is_empty());
    }

    #[test]
    fn test_new_faces_point_outwards() {
        let mut fabric = Fabric::seed_triangle(1.0);
        let face = fabric.faces()[0].id;
        fabric.add_transformation(open(face, false));
        fabric.execute_transformations(None);
        let center = fabric.center();
        for face in fabric.faces().iter().skip(1) {
            let outward = fabric.face_centroid(face) - center;
            assert!(fabric.face_normal(face).dot(outward) > 0.0, "{face:?}");
        }
    }

    #[test]
    fn test_merge_joins_nearby_unconnected_joints() {
        let mut fabric = Fabric::new();
        let a = fabric.add_joint(DVec3::ZERO);
        let b = fabric.add_joint(DVec3::X);
        let c = fabric.add_joint(DVec3::new(0.0, 0.1, 0.0));
        fabric.add_interval(a, b, Role::Spring, 1.0);
        fabric.add_interval(c, b, Role::Spring, 1.0);
        fabric.add_transformation(Transformation::MergeJoints { threshold: 0.3 });
        fabric.add_transformation(Transformation::MergeJoints { threshold: 0.3 });
        fabric.execute_transformations(None);

        assert_eq!(fabric.joints().len(), 2);
        assert_eq!(fabric.intervals().len(), 1);
        assert_eq!(
            fabric.take_events(),
            vec![
                FabricEvent::JointsMerged { merged: true },
                FabricEvent::JointsMerged { merged: false },
            ]
        );
    }

    #[test]
    fn test_death_separates_intervals() {
        let mut fabric = Fabric::seed_triangle(1.0);
        fabric.add_transformation(Transformation::Death { ticks: 20 });
        fabric.execute_transformations(None);
        assert_eq!(fabric.joints().len(), 6);
        assert!(fabric.faces().is_empty());
        for interval in fabric.intervals() {
            assert!((interval.span.ultimate_ideal() - 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn test_relocate() {
        let mut fabric = Fabric::seed_triangle(1.0);
        let before = fabric.center();
        fabric.add_transformation(Transformation::Relocate {
            rotation: DQuat::IDENTITY,
            translation: DVec3::new(0.0, 802.0, 0.0),
        });
        fabric.execute_transformations(None);
        assert!((fabric.center() - before - DVec3::new(0.0, 802.0, 0.0)).length() < 1e-9);
    }
}
