use std::collections::BTreeMap;
use std::fmt;
use std::fmt::{Display, Formatter};

use bincode::{Decode, Encode};
use itertools::iproduct;
use serde::{Deserialize, Serialize};

use crate::defs::{DetectorId, TriggerId};
use crate::trigger::keys::{TriggerPrimitiveKey, TriggerSumKey};

/// Towers a single sum covers along each axis, anchored at the decoded bin.
///
/// Slot `(i, j)` of the sum at bin `(eta, phi)` is the tower
/// `(eta + i, phi + j)`; slot `(0, 0)` is always the decoded tower itself.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize, Encode, Decode)]
pub struct SumFootprint {
    pub eta: u32,
    pub phi: u32,
}

impl SumFootprint {
    pub fn new(eta: u32, phi: u32) -> Self {
        SumFootprint { eta, phi }
    }

    /// One tower per sum, the decoded bin.
    pub fn unit() -> Self {
        SumFootprint::new(1, 1)
    }

    pub fn size(&self) -> usize {
        self.eta as usize * self.phi as usize
    }

    /// Tower (eta, phi) bins covered by the sum at (`eta`, `phi`), eta-major.
    pub fn slots(&self, eta: u32, phi: u32) -> impl Iterator<Item = (u32, u32)> {
        iproduct!(0..self.eta, 0..self.phi).map(move |(i, j)| (eta.saturating_add(i), phi.saturating_add(j)))
    }
}

impl Default for SumFootprint {
    fn default() -> Self {
        SumFootprint::unit()
    }
}

/// A trigger primitive: a block of elementary sums, each with its ADC sample sequence.
#[derive(Clone, Debug, Serialize, Deserialize, Encode, Decode)]
pub struct TriggerPrimitive {
    pub key: TriggerPrimitiveKey,
    pub footprint: SumFootprint,
    sums: BTreeMap<TriggerSumKey, Vec<u32>>,
}

impl TriggerPrimitive {
    /// Creates an empty primitive.
    ///
    /// # Arguments
    ///
    /// * `key` - primitive key, carries trigger and detector ids
    /// * `footprint` - tower slots covered by each sum of this primitive
    ///
    /// # Examples
    ///
    /// ```
    /// use calocore::{DetectorId, SumFootprint, TriggerId, TriggerPrimitive, TriggerPrimitiveKey};
    ///
    /// let key = TriggerPrimitiveKey::compose(TriggerId::Jet, DetectorId::HCalInner, 0, 3);
    /// let mut primitive = TriggerPrimitive::new(key, SumFootprint::unit());
    /// primitive.add_sum(key.sum_key(1, 1), vec![0, 12, 40, 9]);
    /// assert_eq!(primitive.n_sums(), 1);
    /// ```
    pub fn new(key: TriggerPrimitiveKey, footprint: SumFootprint) -> Self {
        TriggerPrimitive { key, footprint, sums: BTreeMap::new() }
    }

    pub fn detector(&self) -> DetectorId {
        self.key.detector()
    }

    pub fn trigger(&self) -> TriggerId {
        self.key.trigger()
    }

    /// Inserts or replaces the sample sequence of a sum.
    pub fn add_sum(&mut self, sum_key: TriggerSumKey, samples: Vec<u32>) {
        self.sums.insert(sum_key, samples);
    }

    pub fn get_sum(&self, sum_key: TriggerSumKey) -> Option<&[u32]> {
        self.sums.get(&sum_key).map(|s| s.as_slice())
    }

    /// Sums in storage order.
    pub fn sums(&self) -> impl Iterator<Item = (TriggerSumKey, &[u32])> {
        self.sums.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    pub fn n_sums(&self) -> usize {
        self.sums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sums.is_empty()
    }
}

impl Display for TriggerPrimitive {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "TriggerPrimitive(key: {}, detector: {}, sums: {})", self.key, self.detector(), self.sums.len())
    }
}

/// All primitives one emulator stage produced for an event.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Encode, Decode)]
pub struct TriggerPrimitiveContainer {
    pub trigger: TriggerId,
    pub detector: DetectorId,
    primitives: BTreeMap<TriggerPrimitiveKey, TriggerPrimitive>,
}

impl TriggerPrimitiveContainer {
    pub fn new(trigger: TriggerId, detector: DetectorId) -> Self {
        TriggerPrimitiveContainer { trigger, detector, primitives: BTreeMap::new() }
    }

    pub fn add_primitive(&mut self, primitive: TriggerPrimitive) {
        self.primitives.insert(primitive.key, primitive);
    }

    pub fn get_primitive(&self, key: TriggerPrimitiveKey) -> Option<&TriggerPrimitive> {
        self.primitives.get(&key)
    }

    /// Primitives in key order.
    pub fn primitives(&self) -> impl Iterator<Item = &TriggerPrimitive> {
        self.primitives.values()
    }

    pub fn size(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    pub fn n_sums(&self) -> usize {
        self.primitives.values().map(|p| p.n_sums()).sum()
    }

    pub fn clear(&mut self) {
        self.primitives.clear();
    }
}
