use std::fmt;
use std::fmt::{Display, Formatter};

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::defs::DetectorId;
use crate::tower::keys::{TowerKey, TowerScheme};

/// Per-tower quantities read back from a calibrated tower container.
#[derive(Copy, Clone, PartialEq, Debug, Default, Serialize, Deserialize, Encode, Decode)]
pub struct TowerSample {
    pub energy: f32,
    pub time: f32,
}

impl TowerSample {
    pub fn new(energy: f32, time: f32) -> Self {
        TowerSample { energy, time }
    }
}

/// Eta/phi binning of one detector's towers.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize, Encode, Decode)]
pub struct TowerGeometry {
    pub detector: DetectorId,
    pub n_eta: u32,
    pub n_phi: u32,
}

impl TowerGeometry {
    pub fn new(detector: DetectorId, n_eta: u32, n_phi: u32) -> Self {
        TowerGeometry { detector, n_eta, n_phi }
    }

    pub fn emcal() -> Self {
        TowerGeometry::new(DetectorId::EMCal, 96, 256)
    }

    pub fn hcal_inner() -> Self {
        TowerGeometry::new(DetectorId::HCalInner, 24, 64)
    }

    pub fn hcal_outer() -> Self {
        TowerGeometry::new(DetectorId::HCalOuter, 24, 64)
    }

    /// Full-detector binning, `None` for detectors without their own towers.
    pub fn for_detector(detector: DetectorId) -> Option<Self> {
        match detector {
            DetectorId::EMCal => Some(Self::emcal()),
            DetectorId::HCalInner => Some(Self::hcal_inner()),
            DetectorId::HCalOuter => Some(Self::hcal_outer()),
            DetectorId::HCalCombined | DetectorId::Unknown => None,
        }
    }

    pub fn size(&self) -> usize {
        self.n_eta as usize * self.n_phi as usize
    }

    pub fn contains(&self, eta: u32, phi: u32) -> bool {
        eta < self.n_eta && phi < self.n_phi
    }

    /// Dense channel index of an (eta, phi) bin.
    pub fn channel(&self, eta: u32, phi: u32) -> Option<usize> {
        if self.contains(eta, phi) {
            Some(eta as usize * self.n_phi as usize + phi as usize)
        } else {
            None
        }
    }
}

/// Calibrated towers of one detector, stored channel-dense.
///
/// Lookups by [`TowerKey`] decode the key with this detector's packing scheme
/// and bounds-check the result against the geometry, so a key built from an
/// out-of-range bin is simply not found.
#[derive(Clone, Debug, Serialize, Deserialize, Encode, Decode)]
pub struct TowerContainer {
    pub geometry: TowerGeometry,
    towers: Vec<TowerSample>,
}

impl TowerContainer {
    /// Creates a container with every tower zeroed.
    ///
    /// # Examples
    ///
    /// ```
    /// use calocore::{TowerContainer, TowerGeometry};
    ///
    /// let towers = TowerContainer::new(TowerGeometry::hcal_inner());
    /// assert_eq!(towers.size(), 24 * 64);
    /// ```
    pub fn new(geometry: TowerGeometry) -> Self {
        TowerContainer { geometry, towers: vec![TowerSample::default(); geometry.size()] }
    }

    /// Creates a container whose tower at (eta, phi) is `f(eta, phi)`.
    pub fn from_fn<F>(geometry: TowerGeometry, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> TowerSample,
    {
        let mut towers = Vec::with_capacity(geometry.size());
        for eta in 0..geometry.n_eta {
            for phi in 0..geometry.n_phi {
                towers.push(f(eta, phi));
            }
        }
        TowerContainer { geometry, towers }
    }

    pub fn detector(&self) -> DetectorId {
        self.geometry.detector
    }

    pub fn size(&self) -> usize {
        self.towers.len()
    }

    fn scheme(&self) -> Option<TowerScheme> {
        TowerScheme::for_detector(self.geometry.detector)
    }

    /// Key of the tower at (eta, phi), `None` outside the geometry.
    pub fn key_at(&self, eta: u32, phi: u32) -> Option<TowerKey> {
        if !self.geometry.contains(eta, phi) {
            return None;
        }
        self.scheme()?.encode(eta, phi, self.geometry.detector).ok()
    }

    /// (eta, phi) bin a key addresses in this container.
    pub fn bins_of(&self, key: TowerKey) -> Option<(u32, u32)> {
        let (eta, phi) = self.scheme()?.decode(key);
        if self.geometry.contains(eta, phi) {
            Some((eta, phi))
        } else {
            None
        }
    }

    pub fn get_tower_at_key(&self, key: TowerKey) -> Option<&TowerSample> {
        let (eta, phi) = self.bins_of(key)?;
        self.get_tower_at(eta, phi)
    }

    pub fn get_tower_at(&self, eta: u32, phi: u32) -> Option<&TowerSample> {
        self.towers.get(self.geometry.channel(eta, phi)?)
    }

    /// Overwrites one tower, returns false if (eta, phi) is outside the geometry.
    pub fn set_tower_at(&mut self, eta: u32, phi: u32, sample: TowerSample) -> bool {
        match self.geometry.channel(eta, phi) {
            Some(channel) => {
                self.towers[channel] = sample;
                true
            }
            None => false,
        }
    }

    pub fn total_energy(&self) -> f32 {
        self.towers.iter().map(|t| t.energy).sum()
    }
}

impl Display for TowerContainer {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TowerContainer({}, {}x{} towers)",
            self.geometry.detector, self.geometry.n_eta, self.geometry.n_phi
        )
    }
}
