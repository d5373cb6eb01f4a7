//! Binary record of a whole being.
//!
//! Layout after the magic and version: body fabric, attached buds, genome,
//! energy, id, email, speech, phase ordinal, goal, prey name, shield blob
//! (`-1` length when absent), trail, trail age.

use std::collections::{BTreeMap, VecDeque};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Cursor, Read, Write};
use std::path::Path;
use std::rc::Rc;

use super::being::{Being, Phase};
use super::bud::GrowthBud;
use super::energy::Energy;
use super::speech::Speech;
use crate::codec;
use crate::fabric::{Fabric, FabricBlob, FaceId};
use crate::genetics::{Genome, SharedNoise};
use crate::schema::LifeConfig;

/// Magic bytes identifying a being record.
pub const BEING_MAGIC: &[u8; 4] = b"WMKB";

/// Current record version.
pub const BEING_VERSION: u16 = 1;

impl Being {
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(BEING_MAGIC)?;
        codec::write_u16(w, BEING_VERSION)?;
        self.body.write_to(w)?;

        codec::write_u16(w, self.buds.len() as u16)?;
        for (face, bud) in &self.buds {
            codec::write_u32(w, face.0)?;
            bud.write_to(w)?;
        }

        self.genome.write_to(w)?;
        self.energy.write_to(w)?;
        codec::write_str(w, &self.id)?;
        codec::write_str(w, &self.email)?;
        codec::write_str(w, self.speech.text())?;
        codec::write_u8(w, self.phase.ordinal())?;
        codec::write_vec3(w, self.goal)?;
        codec::write_str(w, &self.prey_name)?;

        match &self.shield {
            Some(shield) => {
                let blob = FabricBlob::new(shield)?;
                codec::write_i32(w, blob.bytes().len() as i32)?;
                w.write_all(blob.bytes())?;
            }
            None => codec::write_i32(w, -1)?,
        }

        codec::write_u16(w, self.trail.len() as u16)?;
        for point in &self.trail {
            codec::write_vec3(w, *point)?;
        }
        codec::write_u64(w, self.trail_age)
    }

    /// Rebuild a being, attaching `noise` to its genome.
    pub fn read_from<R: Read>(
        r: &mut R,
        noise: Option<SharedNoise>,
        config: Rc<LifeConfig>,
    ) -> io::Result<Self> {
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic)?;
        if &magic != BEING_MAGIC {
            return Err(codec::invalid_data("not a being record"));
        }
        let version = codec::read_u16(r)?;
        if version != BEING_VERSION {
            return Err(codec::invalid_data(format!(
                "unsupported being record version {version}"
            )));
        }
        let body = Fabric::read_from(r)?;

        let bud_count = codec::read_u16(r)?;
        let mut buds = BTreeMap::new();
        for _ in 0..bud_count {
            let face = FaceId(codec::read_u32(r)?);
            if body.face(face).is_none() {
                return Err(codec::invalid_data(format!("bud on missing face {}", face.0)));
            }
            buds.insert(face, GrowthBud::read_from(r)?);
        }

        let genome = Genome::read_from(r, noise)?;
        let energy = Energy::read_from(r)?;
        let id = codec::read_str(r)?;
        let email = codec::read_str(r)?;
        let speech = Speech::new(codec::read_str(r)?);
        let ordinal = codec::read_u8(r)?;
        let phase = Phase::from_ordinal(ordinal)
            .ok_or_else(|| codec::invalid_data(format!("unhandled phase {ordinal}")))?;
        let goal = codec::read_vec3(r)?;
        let prey_name = codec::read_str(r)?;

        let shield = match codec::read_i32(r)? {
            -1 => None,
            len if len < 0 => {
                return Err(codec::invalid_data(format!("bad shield length {len}")));
            }
            len => {
                let blob = FabricBlob::from_bytes(codec::read_bytes(r, len as usize)?);
                Some(blob.instantiate()?)
            }
        };

        let trail_len = codec::read_u16(r)?;
        let trail = (0..trail_len)
            .map(|_| codec::read_vec3(r))
            .collect::<io::Result<VecDeque<_>>>()?;
        let trail_age = codec::read_u64(r)?;

        let mut being = Being::assemble(
            id, email, speech, body, shield, genome, energy, buds, phase, trail, config,
        );
        being.goal = goal;
        being.prey_name = prey_name;
        being.trail_age = trail_age;
        Ok(being)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        self.write_to(&mut w)?;
        w.flush()
    }

    pub fn load(
        path: impl AsRef<Path>,
        noise: Option<SharedNoise>,
        config: Rc<LifeConfig>,
    ) -> io::Result<Self> {
        let mut r = BufReader::new(File::open(path)?);
        Self::read_from(&mut r, noise, config)
    }
}

/// A being frozen into bytes, ready to be thawed any number of times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeingBlob {
    bytes: Vec<u8>,
}

impl BeingBlob {
    pub fn new(being: &Being) -> io::Result<Self> {
        let mut bytes = Vec::new();
        being.write_to(&mut bytes)?;
        Ok(Self { bytes })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn instantiate(&self, noise: Option<SharedNoise>, config: Rc<LifeConfig>) -> io::Result<Being> {
        Being::read_from(&mut Cursor::new(&self.bytes), noise, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::being::tests::{embryo, grow};
    use crate::fabric::Physics;
    use crate::genetics::{GeneKey, NoiseSeed, PseudoNoise, shared};
    use crate::schema::PhysicsConfig;
    use crate::terrain::Dry;

    fn record(being: &Being) -> Vec<u8> {
        let mut bytes = Vec::new();
        being.write_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_round_trip_mid_growth() {
        let config = Rc::new(LifeConfig::default());
        let physics = Physics::new(PhysicsConfig::default(), 50);
        let mut being = Being::create(embryo(21), config.clone());
        let mut terrain = Dry;
        for _ in 0..15 {
            being.experience_time(&physics, &mut terrain).unwrap();
        }
        assert!(being.shield().is_some());
        let bytes = record(&being);
        let restored = BeingBlob::new(&being)
            .unwrap()
            .instantiate(being.genome().noise().cloned(), config)
            .unwrap();
        assert_eq!(record(&restored), bytes);
        assert_eq!(restored.phase(), being.phase());
        assert_eq!(restored.buds().count(), being.buds().count());
    }

    #[test]
    fn test_restored_adult_steps_identically() {
        let config = Rc::new(LifeConfig::default());
        let physics = Physics::new(PhysicsConfig::default(), 50);
        let mut being = Being::create(embryo(22), config.clone());
        grow(&mut being, &physics);
        let mut terrain = Dry;
        for _ in 0..5 {
            being.experience_time(&physics, &mut terrain).unwrap();
        }
        let blob = BeingBlob::new(&being).unwrap();
        let replay = || shared(PseudoNoise::from_seed(NoiseSeed::from_u64(99)));
        let mut a = blob.instantiate(Some(replay()), config.clone()).unwrap();
        let mut b = blob.instantiate(Some(replay()), config).unwrap();
        assert!(a.shield().is_none());
        for _ in 0..20 {
            a.experience_time(&physics, &mut terrain).unwrap();
            b.experience_time(&physics, &mut terrain).unwrap();
        }
        assert_eq!(a.body().joints(), b.body().joints());
        assert_eq!(record(&a), record(&b));
    }

    #[test]
    fn test_save_and_load() {
        let config = Rc::new(LifeConfig::default());
        let mut being = Being::create(embryo(23), config.clone());
        being.genome_mut().scan_for(GeneKey::Movement(crate::body::Direction::Rrr));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("being.wmk");
        being.save(&path).unwrap();
        let loaded = Being::load(&path, None, config).unwrap();
        assert_eq!(record(&loaded), record(&being));
        assert_eq!(loaded.id(), "TEST");
        assert_eq!(loaded.speech().text(), "hello");
    }

    #[test]
    fn test_unhandled_phase() {
        let config = Rc::new(LifeConfig::default());
        let being = Being::create(embryo(24), config.clone());
        let mut bytes = record(&being);
        // phase ordinal follows the speech string
        let speech = being.speech().text().as_bytes();
        let at = bytes
            .windows(speech.len())
            .rposition(|window| window == speech)
            .unwrap()
            + speech.len();
        bytes[at] = 42;
        let err = Being::read_from(&mut Cursor::new(bytes), None, config).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(err.to_string().contains("unhandled phase"));
    }

    #[test]
    fn test_rejects_wrong_magic() {
        let config = Rc::new(LifeConfig::default());
        let err = Being::read_from(&mut Cursor::new(b"NOPE\x01\x00".to_vec()), None, config)
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
