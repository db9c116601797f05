//! Bit layout of trigger sum keys and trigger primitive keys.
//!
//! ```text
//!  31    28 27    24 23          16 15           8 7      4 3      0
//! +--------+--------+--------------+--------------+--------+--------+
//! | trigger| detector| primitive eta| primitive phi| sum eta| sum phi|
//! +--------+--------+--------------+--------------+--------+--------+
//! ```
//!
//! A primitive key is a sum key with the two sum fields cleared. The
//! composition functions exist for the producers of primitives (emulator,
//! synthetic frames); cluster building only ever decomposes.

use std::fmt;
use std::fmt::{Display, Formatter};

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::defs::{Axis, DetectorId, TriggerId};

const SHIFT_TRIGGER_ID: u32 = 28;
const SHIFT_DETECTOR_ID: u32 = 24;
const SHIFT_PRIMITIVE_ETA_ID: u32 = 16;
const SHIFT_PRIMITIVE_PHI_ID: u32 = 8;
const SHIFT_SUM_ETA_ID: u32 = 4;
const SHIFT_SUM_PHI_ID: u32 = 0;

const MASK_4: u32 = 0xf;
const MASK_8: u32 = 0xff;

#[inline]
fn field(raw: u32, shift: u32, mask: u32) -> u32 {
    (raw >> shift) & mask
}

/// Opaque address of one elementary trigger sum.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize, Encode, Decode)]
pub struct TriggerSumKey(pub u32);

impl TriggerSumKey {
    /// Composes a sum key. Fields wider than their slot are truncated.
    ///
    /// # Examples
    ///
    /// ```
    /// use calocore::{Axis, DetectorId, TriggerId, TriggerSumKey};
    ///
    /// let key = TriggerSumKey::compose(TriggerId::Jet, DetectorId::EMCal, 1, 3, 2, 0);
    /// assert_eq!(key.primitive_id(Axis::Eta), 1);
    /// assert_eq!(key.sum_id(Axis::Eta), 2);
    /// ```
    pub fn compose(
        trigger: TriggerId,
        detector: DetectorId,
        primitive_eta: u32,
        primitive_phi: u32,
        sum_eta: u32,
        sum_phi: u32,
    ) -> Self {
        let primitive = TriggerPrimitiveKey::compose(trigger, detector, primitive_eta, primitive_phi);
        TriggerSumKey(
            primitive.0
                | ((sum_eta & MASK_4) << SHIFT_SUM_ETA_ID)
                | ((sum_phi & MASK_4) << SHIFT_SUM_PHI_ID),
        )
    }

    pub fn raw(&self) -> u32 {
        self.0
    }

    pub fn trigger(&self) -> TriggerId {
        TriggerId::new(field(self.0, SHIFT_TRIGGER_ID, MASK_4))
    }

    pub fn detector(&self) -> DetectorId {
        DetectorId::new(field(self.0, SHIFT_DETECTOR_ID, MASK_4))
    }

    /// Index of the primitive holding this sum along `axis`.
    pub fn primitive_id(&self, axis: Axis) -> u32 {
        match axis {
            Axis::Eta => field(self.0, SHIFT_PRIMITIVE_ETA_ID, MASK_8),
            Axis::Phi => field(self.0, SHIFT_PRIMITIVE_PHI_ID, MASK_8),
        }
    }

    /// Index of the sum inside its primitive along `axis`.
    pub fn sum_id(&self, axis: Axis) -> u32 {
        match axis {
            Axis::Eta => field(self.0, SHIFT_SUM_ETA_ID, MASK_4),
            Axis::Phi => field(self.0, SHIFT_SUM_PHI_ID, MASK_4),
        }
    }

    pub fn primitive_key(&self) -> TriggerPrimitiveKey {
        TriggerPrimitiveKey(self.0 & !((MASK_4 << SHIFT_SUM_ETA_ID) | (MASK_4 << SHIFT_SUM_PHI_ID)))
    }
}

impl From<u32> for TriggerSumKey {
    fn from(raw: u32) -> Self {
        TriggerSumKey(raw)
    }
}

impl Display for TriggerSumKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Opaque address of a trigger primitive.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize, Encode, Decode)]
pub struct TriggerPrimitiveKey(pub u32);

impl TriggerPrimitiveKey {
    pub fn compose(trigger: TriggerId, detector: DetectorId, primitive_eta: u32, primitive_phi: u32) -> Self {
        // Unknown ids are stored as the all-ones nibble, which decodes back to Unknown
        let trigger = trigger.numeric().unwrap_or(MASK_4);
        let detector = detector.numeric().unwrap_or(MASK_4);
        TriggerPrimitiveKey(
            ((trigger & MASK_4) << SHIFT_TRIGGER_ID)
                | ((detector & MASK_4) << SHIFT_DETECTOR_ID)
                | ((primitive_eta & MASK_8) << SHIFT_PRIMITIVE_ETA_ID)
                | ((primitive_phi & MASK_8) << SHIFT_PRIMITIVE_PHI_ID),
        )
    }

    pub fn raw(&self) -> u32 {
        self.0
    }

    pub fn trigger(&self) -> TriggerId {
        TriggerId::new(field(self.0, SHIFT_TRIGGER_ID, MASK_4))
    }

    pub fn detector(&self) -> DetectorId {
        DetectorId::new(field(self.0, SHIFT_DETECTOR_ID, MASK_4))
    }

    pub fn primitive_id(&self, axis: Axis) -> u32 {
        match axis {
            Axis::Eta => field(self.0, SHIFT_PRIMITIVE_ETA_ID, MASK_8),
            Axis::Phi => field(self.0, SHIFT_PRIMITIVE_PHI_ID, MASK_8),
        }
    }

    /// Key of the sum at (`sum_eta`, `sum_phi`) within this primitive.
    pub fn sum_key(&self, sum_eta: u32, sum_phi: u32) -> TriggerSumKey {
        TriggerSumKey(
            self.0 | ((sum_eta & MASK_4) << SHIFT_SUM_ETA_ID) | ((sum_phi & MASK_4) << SHIFT_SUM_PHI_ID),
        )
    }
}

impl From<u32> for TriggerPrimitiveKey {
    fn from(raw: u32) -> Self {
        TriggerPrimitiveKey(raw)
    }
}

impl Display for TriggerPrimitiveKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_decompose() {
        let key = TriggerSumKey::compose(TriggerId::Photon, DetectorId::HCalOuter, 5, 17, 3, 1);
        assert_eq!(key.trigger(), TriggerId::Photon);
        assert_eq!(key.detector(), DetectorId::HCalOuter);
        assert_eq!(key.primitive_id(Axis::Eta), 5);
        assert_eq!(key.primitive_id(Axis::Phi), 17);
        assert_eq!(key.sum_id(Axis::Eta), 3);
        assert_eq!(key.sum_id(Axis::Phi), 1);
    }

    #[test]
    fn test_primitive_key_strips_sum_fields() {
        let primitive = TriggerPrimitiveKey::compose(TriggerId::Jet, DetectorId::EMCal, 2, 9);
        let sum = primitive.sum_key(3, 2);
        assert_eq!(sum.primitive_key(), primitive);
        assert_eq!(sum.detector(), primitive.detector());
    }

    #[test]
    fn test_unknown_detector_survives_composition() {
        let key = TriggerSumKey::compose(TriggerId::Jet, DetectorId::Unknown, 0, 0, 0, 0);
        assert_eq!(key.detector(), DetectorId::Unknown);
    }

    #[test]
    fn test_display_is_hex() {
        assert_eq!(TriggerSumKey(0x1000_0102).to_string(), "0x10000102");
    }
}
