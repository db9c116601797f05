//! Tower key packing.
//!
//! EMCal keys carry eta in the upper and phi in the lower 16 bits. HCal keys
//! (inner, outer and the combined view) use 8-bit fields: eta in bits 8..16
//! and phi in bits 0..8.

use std::fmt;
use std::fmt::{Display, Formatter};

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::defs::DetectorId;
use crate::error::CodecError;

/// Storage slot of one tower inside its detector's container.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize, Encode, Decode)]
pub struct TowerKey(pub u32);

impl TowerKey {
    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl Display for TowerKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Packing scheme shared by a family of detectors.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum TowerScheme {
    EMCal,
    HCal,
}

impl TowerScheme {
    /// Scheme a detector's towers are keyed with, `None` for `Unknown`.
    pub fn for_detector(detector: DetectorId) -> Option<TowerScheme> {
        match detector {
            DetectorId::EMCal => Some(TowerScheme::EMCal),
            DetectorId::HCalInner | DetectorId::HCalOuter | DetectorId::HCalCombined => Some(TowerScheme::HCal),
            DetectorId::Unknown => None,
        }
    }

    fn eta_shift(&self) -> u32 {
        match self {
            TowerScheme::EMCal => 16,
            TowerScheme::HCal => 8,
        }
    }

    fn field_mask(&self) -> u32 {
        match self {
            TowerScheme::EMCal => 0xffff,
            TowerScheme::HCal => 0xff,
        }
    }

    /// Largest eta or phi bin representable in this scheme.
    pub fn max_bin(&self) -> u32 {
        self.field_mask()
    }

    /// Packs an (eta, phi) bin pair, rejecting bins wider than a field.
    ///
    /// `detector` is only used to label the error.
    pub fn encode(&self, eta: u32, phi: u32, detector: DetectorId) -> Result<TowerKey, CodecError> {
        let max = self.max_bin();
        if eta > max {
            return Err(CodecError::BinOutOfRange { detector, axis: "eta", bin: eta, max });
        }
        if phi > max {
            return Err(CodecError::BinOutOfRange { detector, axis: "phi", bin: phi, max });
        }
        Ok(TowerKey((eta << self.eta_shift()) | phi))
    }

    /// Unpacks a key into its (eta, phi) bin pair.
    pub fn decode(&self, key: TowerKey) -> (u32, u32) {
        let mask = self.field_mask();
        ((key.0 >> self.eta_shift()) & mask, key.0 & mask)
    }
}
