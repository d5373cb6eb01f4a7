//! Everything needed to grow a new being for an existing genome.

use std::collections::VecDeque;
use std::fmt;

use glam::DVec3;

use super::energy::Energy;
use super::speech::Speech;
use crate::genetics::{GeneKey, GeneticsError, Genome};

pub struct Embryo {
    pub id: String,
    pub email: String,
    pub speech: Speech,
    pub genome: Genome,
    pub trail: VecDeque<DVec3>,
    pub trunk_energy: Energy,
    pub limb_energy: Energy,
}

impl Embryo {
    /// Divide one unit of energy between trunk and limbs as the
    /// `trunk-limb` gene says, somewhere between 0.1 and 0.4 to the trunk.
    pub fn new(
        id: impl Into<String>,
        email: impl Into<String>,
        speech: Speech,
        mut genome: Genome,
        trail: Option<Vec<DVec3>>,
    ) -> Result<Self, GeneticsError> {
        let scan = genome.scan_for(GeneKey::TrunkLimb);
        let proportion = genome.reader(&scan).interpolate(0.1, 0.4, 10);
        genome.destroy_scan(scan);
        let proportion = proportion?;
        Ok(Self {
            id: id.into(),
            email: email.into(),
            speech,
            genome,
            trail: trail.unwrap_or_default().into(),
            trunk_energy: Energy::new(proportion),
            limb_energy: Energy::new(1.0 - proportion),
        })
    }
}

impl fmt::Debug for Embryo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Embryo({})", self.id)
    }
}
