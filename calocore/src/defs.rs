use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::error::CodecError;

/// Coordinate selected when decoding a sum key.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize, Encode, Decode)]
pub enum Axis {
    Eta,
    Phi,
}

impl Axis {
    pub fn name(&self) -> &'static str {
        match self {
            Axis::Eta => "eta",
            Axis::Phi => "phi",
        }
    }
}

impl Display for Axis {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl TryFrom<u8> for Axis {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Axis::Eta),
            1 => Ok(Axis::Phi),
            other => Err(CodecError::InvalidAxis(other.to_string())),
        }
    }
}

impl FromStr for Axis {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "eta" => Ok(Axis::Eta),
            "phi" => Ok(Axis::Phi),
            _ => Err(CodecError::InvalidAxis(s.to_string())),
        }
    }
}

/// Where a trigger word came from.
///
/// # Description
///
/// The source type fixes how many sums make up one primitive along an axis,
/// i.e. the segmentation used to linearize a (primitive, sum) address into a
/// flat bin index.
///
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize, Encode, Decode)]
pub enum SourceType {
    Primitive,
    LL1,
}

impl SourceType {
    /// Number of sub-indices per primitive index along one axis.
    pub fn segment(&self) -> u32 {
        match self {
            SourceType::Primitive => 4,
            SourceType::LL1 => 2,
        }
    }
}

impl Display for SourceType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SourceType::Primitive => write!(f, "Primitive"),
            SourceType::LL1 => write!(f, "LL1"),
        }
    }
}

impl TryFrom<u8> for SourceType {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SourceType::Primitive),
            1 => Ok(SourceType::LL1),
            other => Err(CodecError::InvalidSourceType(other.to_string())),
        }
    }
}

impl FromStr for SourceType {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "primitive" | "prim" => Ok(SourceType::Primitive),
            "ll1" => Ok(SourceType::LL1),
            _ => Err(CodecError::InvalidSourceType(s.to_string())),
        }
    }
}

/// Calorimeter a sum, primitive or tower belongs to.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize, Encode, Decode)]
pub enum DetectorId {
    EMCal,
    HCalInner,
    HCalOuter,
    HCalCombined,
    Unknown,
}

impl DetectorId {
    /// Returns the `DetectorId` for the 4-bit id stored in sum and primitive keys.
    ///
    /// # Arguments
    ///
    /// * `id` - raw detector id, anything outside 0..=3 maps to `Unknown`.
    ///
    pub fn new(id: u32) -> DetectorId {
        match id {
            0 => DetectorId::EMCal,
            1 => DetectorId::HCalInner,
            2 => DetectorId::HCalOuter,
            3 => DetectorId::HCalCombined,
            _ => DetectorId::Unknown,
        }
    }

    /// Returns the raw id, or `None` for `Unknown`.
    pub fn numeric(&self) -> Option<u32> {
        match self {
            DetectorId::EMCal => Some(0),
            DetectorId::HCalInner => Some(1),
            DetectorId::HCalOuter => Some(2),
            DetectorId::HCalCombined => Some(3),
            DetectorId::Unknown => None,
        }
    }

    /// True for the three detectors that own a tower container.
    pub fn has_towers(&self) -> bool {
        matches!(self, DetectorId::EMCal | DetectorId::HCalInner | DetectorId::HCalOuter)
    }

    pub fn is_hcal(&self) -> bool {
        matches!(self, DetectorId::HCalInner | DetectorId::HCalOuter | DetectorId::HCalCombined)
    }
}

impl Default for DetectorId {
    fn default() -> Self {
        DetectorId::Unknown
    }
}

impl Display for DetectorId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DetectorId::EMCal => write!(f, "EMCal"),
            DetectorId::HCalInner => write!(f, "HCalInner"),
            DetectorId::HCalOuter => write!(f, "HCalOuter"),
            DetectorId::HCalCombined => write!(f, "HCalCombined"),
            DetectorId::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Trigger a primitive or LL1 output was produced for.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize, Encode, Decode)]
pub enum TriggerId {
    None,
    Jet,
    Pair,
    Photon,
    Cosmic,
    Unknown,
}

impl TriggerId {
    pub fn new(id: u32) -> TriggerId {
        match id {
            0 => TriggerId::None,
            1 => TriggerId::Jet,
            2 => TriggerId::Pair,
            3 => TriggerId::Photon,
            4 => TriggerId::Cosmic,
            _ => TriggerId::Unknown,
        }
    }

    pub fn numeric(&self) -> Option<u32> {
        match self {
            TriggerId::None => Some(0),
            TriggerId::Jet => Some(1),
            TriggerId::Pair => Some(2),
            TriggerId::Photon => Some(3),
            TriggerId::Cosmic => Some(4),
            TriggerId::Unknown => None,
        }
    }
}

impl Default for TriggerId {
    fn default() -> Self {
        TriggerId::Unknown
    }
}

impl Display for TriggerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TriggerId::None => write!(f, "None"),
            TriggerId::Jet => write!(f, "Jet"),
            TriggerId::Pair => write!(f, "Pair"),
            TriggerId::Photon => write!(f, "Photon"),
            TriggerId::Cosmic => write!(f, "Cosmic"),
            TriggerId::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Categories of trigger-primitive containers produced upstream.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum PrimitiveSource {
    RawEM,
    RawEMLL1,
    RawTrg,
    EMCal,
    EMCalLL1,
    IHCal,
    OHCal,
    HCalLL1,
}

impl PrimitiveSource {
    pub const ALL: [PrimitiveSource; 8] = [
        PrimitiveSource::RawEM,
        PrimitiveSource::RawEMLL1,
        PrimitiveSource::RawTrg,
        PrimitiveSource::EMCal,
        PrimitiveSource::EMCalLL1,
        PrimitiveSource::IHCal,
        PrimitiveSource::OHCal,
        PrimitiveSource::HCalLL1,
    ];

    /// Name the upstream emulator registers this container under.
    pub fn node_name(&self) -> &'static str {
        match self {
            PrimitiveSource::RawEM => "TRIGGERPRIMITIVES_RAW_EMCAL",
            PrimitiveSource::RawEMLL1 => "TRIGGERPRIMITIVES_RAW_EMCAL_LL1",
            PrimitiveSource::RawTrg => "TRIGGERPRIMITIVES_RAW_JET",
            PrimitiveSource::EMCal => "TRIGGERPRIMITIVES_EMCAL",
            PrimitiveSource::EMCalLL1 => "TRIGGERPRIMITIVES_EMCAL_LL1",
            PrimitiveSource::IHCal => "TRIGGERPRIMITIVES_HCALIN",
            PrimitiveSource::OHCal => "TRIGGERPRIMITIVES_HCALOUT",
            PrimitiveSource::HCalLL1 => "TRIGGERPRIMITIVES_HCAL_LL1",
        }
    }

    /// Detector whose sums populate this container.
    pub fn detector(&self) -> DetectorId {
        match self {
            PrimitiveSource::RawEM
            | PrimitiveSource::RawEMLL1
            | PrimitiveSource::EMCal
            | PrimitiveSource::EMCalLL1 => DetectorId::EMCal,
            PrimitiveSource::IHCal => DetectorId::HCalInner,
            PrimitiveSource::OHCal => DetectorId::HCalOuter,
            PrimitiveSource::RawTrg | PrimitiveSource::HCalLL1 => DetectorId::HCalCombined,
        }
    }
}

/// Categories of LL1 outputs produced upstream.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Ll1Source {
    Raw,
    Jet,
}

impl Ll1Source {
    pub fn node_name(&self) -> &'static str {
        match self {
            Ll1Source::Raw => "LL1OUT_RAW_JET",
            Ll1Source::Jet => "LL1OUT_JET",
        }
    }
}
