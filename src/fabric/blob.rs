//! Frozen fabric snapshots.
//!
//! A blob holds everything needed to rebuild a fabric at the same age: joint
//! locations and velocities, intervals with their ramping spans, faces with
//! their identities. Queued transformations and undrained events are not
//! part of a blob.

use std::collections::VecDeque;
use std::io::{self, Cursor, Read, Write};

use super::structure::{Chirality, Face, FaceId, Fabric, Interval, Joint, Role, Span};
use crate::codec;

/// Magic bytes identifying a fabric blob.
pub const FABRIC_MAGIC: &[u8; 4] = b"WMFB";

/// Current blob version.
pub const FABRIC_VERSION: u16 = 1;

/// Serialized fabric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FabricBlob {
    bytes: Vec<u8>,
}

impl FabricBlob {
    pub fn new(fabric: &Fabric) -> io::Result<Self> {
        let mut bytes = Vec::new();
        fabric.write_to(&mut bytes)?;
        Ok(Self { bytes })
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Build a fresh fabric from the snapshot.
    pub fn instantiate(&self) -> io::Result<Fabric> {
        Fabric::read_from(&mut Cursor::new(&self.bytes))
    }
}

impl Fabric {
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(FABRIC_MAGIC)?;
        codec::write_u16(w, FABRIC_VERSION)?;
        codec::write_u64(w, self.age)?;
        codec::write_u32(w, self.next_face)?;

        codec::write_u32(w, self.joints.len() as u32)?;
        for joint in &self.joints {
            codec::write_vec3(w, joint.location)?;
            codec::write_vec3(w, joint.velocity)?;
        }

        codec::write_u32(w, self.intervals.len() as u32)?;
        for interval in &self.intervals {
            codec::write_u32(w, interval.alpha as u32)?;
            codec::write_u32(w, interval.omega as u32)?;
            codec::write_u8(w, interval.role.ordinal())?;
            write_span(w, &interval.span)?;
        }

        codec::write_u32(w, self.faces.len() as u32)?;
        for face in &self.faces {
            codec::write_u32(w, face.id.0)?;
            for joint in face.joints {
                codec::write_u32(w, joint as u32)?;
            }
            codec::write_u8(w, matches!(face.chirality, Chirality::Right) as u8)?;
        }
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> io::Result<Self> {
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic)?;
        if &magic != FABRIC_MAGIC {
            return Err(codec::invalid_data("Invalid WMFB magic bytes"));
        }
        let version = codec::read_u16(r)?;
        if version != FABRIC_VERSION {
            return Err(codec::invalid_data(format!(
                "Unsupported WMFB version: {version}"
            )));
        }
        let mut fabric = Fabric::new();
        fabric.age = codec::read_u64(r)?;
        fabric.next_face = codec::read_u32(r)?;

        let joint_count = codec::read_u32(r)? as usize;
        for _ in 0..joint_count {
            fabric.joints.push(Joint {
                location: codec::read_vec3(r)?,
                velocity: codec::read_vec3(r)?,
            });
        }
        let in_range = |joint: u32| {
            let joint = joint as usize;
            if joint < joint_count {
                Ok(joint)
            } else {
                Err(codec::invalid_data(format!("joint {joint} out of range")))
            }
        };

        let interval_count = codec::read_u32(r)?;
        for _ in 0..interval_count {
            let alpha = in_range(codec::read_u32(r)?)?;
            let omega = in_range(codec::read_u32(r)?)?;
            let role = Role::from_ordinal(codec::read_u8(r)?)
                .ok_or_else(|| codec::invalid_data("unknown interval role"))?;
            let span = read_span(r)?;
            fabric.intervals.push(Interval {
                alpha,
                omega,
                role,
                span,
            });
        }

        let face_count = codec::read_u32(r)?;
        for _ in 0..face_count {
            let id = FaceId(codec::read_u32(r)?);
            let joints = [
                in_range(codec::read_u32(r)?)?,
                in_range(codec::read_u32(r)?)?,
                in_range(codec::read_u32(r)?)?,
            ];
            let chirality = if codec::read_u8(r)? != 0 {
                Chirality::Right
            } else {
                Chirality::Left
            };
            fabric.faces.push(Face {
                id,
                joints,
                chirality,
            });
        }
        Ok(fabric)
    }
}

fn write_span<W: Write>(w: &mut W, span: &Span) -> io::Result<()> {
    codec::write_f64(w, span.ideal())?;
    match span.active_stage() {
        Some((from, to, ticks, elapsed)) => {
            codec::write_u8(w, 1)?;
            codec::write_f64(w, from)?;
            codec::write_f64(w, to)?;
            codec::write_u64(w, ticks)?;
            codec::write_u64(w, elapsed)?;
        }
        None => codec::write_u8(w, 0)?,
    }
    let queued: Vec<_> = span.queued_stages().collect();
    codec::write_u16(w, queued.len() as u16)?;
    for (to, ticks) in queued {
        codec::write_f64(w, to)?;
        codec::write_u64(w, ticks)?;
    }
    Ok(())
}

fn read_span<R: Read>(r: &mut R) -> io::Result<Span> {
    let ideal = codec::read_f64(r)?;
    let active = match codec::read_u8(r)? {
        0 => None,
        _ => Some((
            codec::read_f64(r)?,
            codec::read_f64(r)?,
            codec::read_u64(r)?,
            codec::read_u64(r)?,
        )),
    };
    let queued_count = codec::read_u16(r)?;
    let mut queued = VecDeque::with_capacity(queued_count as usize);
    for _ in 0..queued_count {
        queued.push_back((codec::read_f64(r)?, codec::read_u64(r)?));
    }
    Ok(Span::restore(ideal, active, queued))
}
