//! Joints, intervals and faces of a tensile fabric.

use std::collections::VecDeque;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use super::transform::Transformation;

/// Stable identity of a face; survives openings and joint merges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FaceId(pub u32);

/// What an interval does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Pushes and pulls towards its ideal length.
    Spring,
    /// Only pulls.
    Cable,
    /// A spring whose ideal length is perturbed by movement genes.
    Muscle,
}

impl Role {
    pub(crate) fn ordinal(self) -> u8 {
        match self {
            Role::Spring => 0,
            Role::Cable => 1,
            Role::Muscle => 2,
        }
    }

    pub(crate) fn from_ordinal(ordinal: u8) -> Option<Role> {
        match ordinal {
            0 => Some(Role::Spring),
            1 => Some(Role::Cable),
            2 => Some(Role::Muscle),
            _ => None,
        }
    }
}

/// Handedness of a face, flipped by twisting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Chirality {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    pub location: DVec3,
    pub velocity: DVec3,
}

impl Joint {
    pub fn at(location: DVec3) -> Self {
        Self {
            location,
            velocity: DVec3::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Stage {
    from: f64,
    to: f64,
    ticks: u64,
    elapsed: u64,
}

/// Ideal length of an interval, optionally ramping through stages.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    ideal: f64,
    active: Option<Stage>,
    queued: VecDeque<(f64, u64)>,
}

impl Span {
    pub fn new(ideal: f64) -> Self {
        Self {
            ideal,
            active: None,
            queued: VecDeque::new(),
        }
    }

    /// Current ideal length.
    pub fn ideal(&self) -> f64 {
        self.ideal
    }

    /// Ideal length once every stage has run.
    pub fn ultimate_ideal(&self) -> f64 {
        self.queued
            .back()
            .map(|(to, _)| *to)
            .or(self.active.map(|stage| stage.to))
            .unwrap_or(self.ideal)
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Ramp linearly to `target` over `ticks`, abandoning any other stages.
    pub fn set_ideal(&mut self, target: f64, ticks: u64) {
        self.queued.clear();
        self.active = None;
        self.push_stage(target, ticks);
    }

    /// Swing through `a`, `b` and `c` times the resting length and back.
    pub fn perturb_ideal(&mut self, duration: u64, a: f64, b: f64, c: f64) {
        let rest = self.ultimate_ideal();
        let quarter = (duration / 4).max(1);
        self.queued.clear();
        self.active = None;
        for factor in [a, b, c, 1.0] {
            self.push_stage(rest * factor, quarter);
        }
    }

    fn push_stage(&mut self, to: f64, ticks: u64) {
        if self.active.is_none() && self.queued.is_empty() {
            if ticks == 0 {
                self.ideal = to;
            } else {
                self.active = Some(Stage {
                    from: self.ideal,
                    to,
                    ticks,
                    elapsed: 0,
                });
            }
        } else {
            self.queued.push_back((to, ticks));
        }
    }

    /// Advance one iteration.
    pub fn tick(&mut self) {
        let Some(stage) = &mut self.active else {
            return;
        };
        stage.elapsed += 1;
        if stage.elapsed >= stage.ticks {
            self.ideal = stage.to;
            self.active = None;
            while let Some((to, ticks)) = self.queued.pop_front() {
                if ticks == 0 {
                    self.ideal = to;
                } else {
                    self.active = Some(Stage {
                        from: self.ideal,
                        to,
                        ticks,
                        elapsed: 0,
                    });
                    break;
                }
            }
        } else {
            let t = stage.elapsed as f64 / stage.ticks as f64;
            self.ideal = stage.from * (1.0 - t) + stage.to * t;
        }
    }

    /// Running stage as (from, to, ticks, elapsed).
    pub(crate) fn active_stage(&self) -> Option<(f64, f64, u64, u64)> {
        self.active.map(|s| (s.from, s.to, s.ticks, s.elapsed))
    }

    /// Stages waiting behind the running one, as (to, ticks).
    pub(crate) fn queued_stages(&self) -> impl Iterator<Item = (f64, u64)> + '_ {
        self.queued.iter().copied()
    }

    pub(crate) fn restore(
        ideal: f64,
        active: Option<(f64, f64, u64, u64)>,
        queued: VecDeque<(f64, u64)>,
    ) -> Self {
        Self {
            ideal,
            active: active.map(|(from, to, ticks, elapsed)| Stage {
                from,
                to,
                ticks,
                elapsed,
            }),
            queued,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Interval {
    pub alpha: usize,
    pub omega: usize,
    pub role: Role,
    pub span: Span,
}

impl Interval {
    pub fn touches(&self, joint: usize) -> bool {
        self.alpha == joint || self.omega == joint
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    pub id: FaceId,
    pub joints: [usize; 3],
    pub chirality: Chirality,
}

impl Face {
    /// Rotate the joint order one step and take on the matching handedness.
    pub fn twist(&mut self, clockwise: bool) {
        let [a, b, c] = self.joints;
        if clockwise {
            self.joints = [c, a, b];
            self.chirality = Chirality::Right;
        } else {
            self.joints = [b, c, a];
            self.chirality = Chirality::Left;
        }
    }

    fn shares_edge(&self, other: &Face) -> bool {
        self.joints
            .iter()
            .filter(|joint| other.joints.contains(joint))
            .count()
            == 2
    }
}

/// Something that happened while executing transformations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FabricEvent {
    /// A notifying opening finished; `face` now spans the far side.
    FacesOpened {
        face: FaceId,
        face01: FaceId,
        face20: FaceId,
    },
    /// One round of joint merging ran.
    JointsMerged { merged: bool },
}

/// A body or shield: joints held together by intervals, with faces to grow on.
#[derive(Debug, Clone, Default)]
pub struct Fabric {
    pub(crate) joints: Vec<Joint>,
    pub(crate) intervals: Vec<Interval>,
    pub(crate) faces: Vec<Face>,
    pub(crate) next_face: u32,
    pub(crate) age: u64,
    pub(crate) transformations: VecDeque<Transformation>,
    pub(crate) events: Vec<FabricEvent>,
}

impl Fabric {
    pub fn new() -> Self {
        Self::default()
    }

    /// Equilateral triangle of springs in the y = 0 plane, with one face on
    /// each side.
    pub fn seed_triangle(length: f64) -> Self {
        let mut fabric = Fabric::new();
        let radius = length * (3.0f64 / 4.0).sqrt() * 2.0 / 3.0;
        for walk in 0..3 {
            let angle = walk as f64 * std::f64::consts::TAU / 3.0;
            fabric.add_joint(DVec3::new(
                radius * angle.cos(),
                0.0,
                radius + radius * angle.sin(),
            ));
        }
        for walk in 0..3 {
            fabric.add_interval(walk, (walk + 1) % 3, Role::Spring, length);
        }
        fabric.add_face([0, 1, 2], Chirality::Right);
        fabric.add_face([0, 2, 1], Chirality::Left);
        fabric
    }

    /// Icosahedron of cables around `center`, left slack by `relax`.
    pub fn sphere(center: DVec3, radius: f64, relax: f64) -> Self {
        let mut fabric = Fabric::new();
        let phi = (1.0 + 5.0f64.sqrt()) / 2.0;
        let corners = [
            (-1.0, phi, 0.0),
            (1.0, phi, 0.0),
            (-1.0, -phi, 0.0),
            (1.0, -phi, 0.0),
            (0.0, -1.0, phi),
            (0.0, 1.0, phi),
            (0.0, -1.0, -phi),
            (0.0, 1.0, -phi),
            (phi, 0.0, -1.0),
            (phi, 0.0, 1.0),
            (-phi, 0.0, -1.0),
            (-phi, 0.0, 1.0),
        ];
        for (x, y, z) in corners {
            fabric.add_joint(center + DVec3::new(x, y, z).normalize() * radius);
        }
        // icosahedron edges join corners at the minimum distance
        let edge = 2.0 / (1.0 + phi * phi).sqrt() * radius;
        for alpha in 0..corners.len() {
            for omega in alpha + 1..corners.len() {
                let length = fabric.joints[alpha]
                    .location
                    .distance(fabric.joints[omega].location);
                if (length - edge).abs() < edge * 0.01 {
                    fabric.add_interval(alpha, omega, Role::Cable, length * relax);
                }
            }
        }
        fabric
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    pub fn joints_mut(&mut self) -> &mut [Joint] {
        &mut self.joints
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn intervals_mut(&mut self) -> &mut [Interval] {
        &mut self.intervals
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn face(&self, id: FaceId) -> Option<&Face> {
        self.faces.iter().find(|face| face.id == id)
    }

    pub fn face_mut(&mut self, id: FaceId) -> Option<&mut Face> {
        self.faces.iter_mut().find(|face| face.id == id)
    }

    /// Iterations this fabric has experienced.
    pub fn age(&self) -> u64 {
        self.age
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    pub fn add_joint(&mut self, location: DVec3) -> usize {
        self.joints.push(Joint::at(location));
        self.joints.len() - 1
    }

    pub fn add_interval(&mut self, alpha: usize, omega: usize, role: Role, ideal: f64) -> usize {
        self.intervals.push(Interval {
            alpha,
            omega,
            role,
            span: Span::new(ideal),
        });
        self.intervals.len() - 1
    }

    pub fn add_face(&mut self, joints: [usize; 3], chirality: Chirality) -> FaceId {
        let id = FaceId(self.next_face);
        self.next_face += 1;
        self.faces.push(Face {
            id,
            joints,
            chirality,
        });
        id
    }

    pub fn remove_face(&mut self, id: FaceId) -> Option<Face> {
        let index = self.faces.iter().position(|face| face.id == id)?;
        Some(self.faces.remove(index))
    }

    /// Drop every joint, interval and face, keeping the age.
    pub fn clear(&mut self) {
        self.joints.clear();
        self.intervals.clear();
        self.faces.clear();
    }

    /// Mean joint location.
    pub fn center(&self) -> DVec3 {
        if self.joints.is_empty() {
            return DVec3::ZERO;
        }
        let sum: DVec3 = self.joints.iter().map(|joint| joint.location).sum();
        sum / self.joints.len() as f64
    }

    pub fn max_distance_from(&self, point: DVec3) -> f64 {
        self.joints
            .iter()
            .map(|joint| joint.location.distance(point))
            .fold(0.0, f64::max)
    }

    /// Something is still mid-settle.
    pub fn is_any_span_active(&self) -> bool {
        self.intervals.iter().any(|interval| interval.span.is_active())
    }

    pub fn face_centroid(&self, face: &Face) -> DVec3 {
        face.joints
            .iter()
            .map(|&joint| self.joints[joint].location)
            .sum::<DVec3>()
            / 3.0
    }

    /// Unit normal by the right-hand rule over the face's joint order.
    pub fn face_normal(&self, face: &Face) -> DVec3 {
        let [a, b, c] = face.joints.map(|joint| self.joints[joint].location);
        (b - a).cross(c - a).normalize_or_zero()
    }

    /// Disjoint pairs of faces sharing an edge, in face order.
    pub fn face_pairs(&self) -> Vec<(FaceId, FaceId)> {
        let mut taken = vec![false; self.faces.len()];
        let mut pairs = Vec::new();
        for first in 0..self.faces.len() {
            if taken[first] {
                continue;
            }
            let partner = (first + 1..self.faces.len())
                .find(|&second| !taken[second] && self.faces[first].shares_edge(&self.faces[second]));
            if let Some(second) = partner {
                taken[first] = true;
                taken[second] = true;
                pairs.push((self.faces[first].id, self.faces[second].id));
            }
        }
        pairs
    }

    /// Queue a transformation for the next execution.
    pub fn add_transformation(&mut self, transformation: Transformation) {
        self.transformations.push_back(transformation);
    }

    pub fn has_pending_transformations(&self) -> bool {
        !self.transformations.is_empty()
    }

    /// Events produced since the last call.
    pub fn take_events(&mut self) -> Vec<FabricEvent> {
        std::mem::take(&mut self.events)
    }

    /// Advance every span one iteration and count it.
    pub(crate) fn tick(&mut self) {
        for interval in &mut self.intervals {
            interval.span.tick();
        }
        self.age += 1;
    }

    pub(crate) fn interval_between(&self, a: usize, b: usize) -> bool {
        self.intervals
            .iter()
            .any(|i| (i.alpha == a && i.omega == b) || (i.alpha == b && i.omega == a))
    }
}
