use std::fmt;
use std::fmt::{Display, Formatter};

use bincode::{Decode, Encode};
use calocore::{DetectorId, TowerKey, TowerSample, TriggerPrimitiveKey, TriggerSumKey};
use serde::{Deserialize, Serialize};

/// A resolved tower inside a cluster.
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize, Encode, Decode)]
pub struct ClusterTower {
    pub key: TowerKey,
    pub eta: u32,
    pub phi: u32,
    pub energy: f32,
    pub time: f32,
}

impl ClusterTower {
    pub fn new(key: TowerKey, eta: u32, phi: u32, sample: &TowerSample) -> Self {
        ClusterTower { key, eta, phi, energy: sample.energy, time: sample.time }
    }
}

/// Towers covered by one trigger-primitive sum.
#[derive(Clone, Debug, Serialize, Deserialize, Encode, Decode)]
pub struct Cluster {
    pub cluster_id: u64,
    pub primitive_key: TriggerPrimitiveKey,
    pub sum_key: TriggerSumKey,
    pub detector: DetectorId,
    // decoded sum bins
    pub eta_bin: u32,
    pub phi_bin: u32,
    // largest ADC sample of the sum
    pub peak_sum: u32,
    pub towers: Vec<ClusterTower>,
}

impl Cluster {
    pub fn new(
        primitive_key: TriggerPrimitiveKey,
        sum_key: TriggerSumKey,
        detector: DetectorId,
        eta_bin: u32,
        phi_bin: u32,
        peak_sum: u32,
    ) -> Self {
        Cluster { cluster_id: 0, primitive_key, sum_key, detector, eta_bin, phi_bin, peak_sum, towers: Vec::new() }
    }

    pub fn add_tower(&mut self, tower: ClusterTower) {
        self.towers.push(tower);
    }

    pub fn n_towers(&self) -> usize {
        self.towers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.towers.is_empty()
    }

    /// Plain sum of the tower energies, no calibration applied.
    pub fn energy(&self) -> f32 {
        self.towers.iter().map(|t| t.energy).sum()
    }

    pub fn tower_keys(&self) -> Vec<TowerKey> {
        self.towers.iter().map(|t| t.key).collect()
    }
}

impl Display for Cluster {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cluster(id: {}, sum: {}, {} (eta, phi) = ({}, {}), towers: {}, energy: {:.3})",
            self.cluster_id,
            self.sum_key,
            self.detector,
            self.eta_bin,
            self.phi_bin,
            self.towers.len(),
            self.energy()
        )
    }
}

/// Counters of recoverable conditions met while building clusters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct Diagnostics {
    pub sums_seen: usize,
    pub clusters_built: usize,
    /// Sums whose detector has no tower container (aggregate or unknown ids).
    pub unresolved_detectors: usize,
    /// Footprint slots whose tower could not be found.
    pub unresolved_towers: usize,
    pub suppressed_empty_clusters: usize,
    pub ll1_words: usize,
}

impl Diagnostics {
    pub fn merge(&mut self, other: &Diagnostics) {
        self.sums_seen += other.sums_seen;
        self.clusters_built += other.clusters_built;
        self.unresolved_detectors += other.unresolved_detectors;
        self.unresolved_towers += other.unresolved_towers;
        self.suppressed_empty_clusters += other.suppressed_empty_clusters;
        self.ll1_words += other.ll1_words;
    }

    /// True when every sum and every tower resolved.
    pub fn is_clean(&self) -> bool {
        self.unresolved_detectors == 0 && self.unresolved_towers == 0
    }

    pub fn summary(&self) -> String {
        format!(
            "{} sums -> {} clusters, {} unresolved detectors, {} unresolved towers, {} empty clusters suppressed, {} LL1 words",
            self.sums_seen,
            self.clusters_built,
            self.unresolved_detectors,
            self.unresolved_towers,
            self.suppressed_empty_clusters,
            self.ll1_words,
        )
    }
}

/// Clusters of one processing cycle, in primitive-then-sum order.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Encode, Decode)]
pub struct ClusterCollection {
    clusters: Vec<Cluster>,
    pub diagnostics: Diagnostics,
}

impl ClusterCollection {
    pub fn new() -> Self {
        ClusterCollection::default()
    }

    /// Appends clusters, numbering them after the ones already held.
    pub fn extend<I: IntoIterator<Item = Cluster>>(&mut self, clusters: I) {
        for mut cluster in clusters {
            cluster.cluster_id = self.clusters.len() as u64;
            self.clusters.push(cluster);
        }
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Cluster> {
        self.clusters.iter()
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn n_towers(&self) -> usize {
        self.clusters.iter().map(|c| c.n_towers()).sum()
    }

    pub fn clear(&mut self) {
        self.clusters.clear();
        self.diagnostics = Diagnostics::default();
    }
}

impl<'a> IntoIterator for &'a ClusterCollection {
    type Item = &'a Cluster;
    type IntoIter = std::slice::Iter<'a, Cluster>;

    fn into_iter(self) -> Self::IntoIter {
        self.clusters.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calocore::TriggerId;

    fn cluster(energies: &[f32]) -> Cluster {
        let primitive = TriggerPrimitiveKey::compose(TriggerId::Jet, DetectorId::EMCal, 0, 0);
        let mut c = Cluster::new(primitive, primitive.sum_key(0, 0), DetectorId::EMCal, 0, 0, 10);
        for (i, &e) in energies.iter().enumerate() {
            c.add_tower(ClusterTower::new(TowerKey(i as u32), 0, i as u32, &TowerSample::new(e, 0.0)));
        }
        c
    }

    #[test]
    fn test_cluster_energy() {
        let c = cluster(&[1.0, 2.5, 0.5]);
        assert_eq!(c.n_towers(), 3);
        assert_eq!(c.energy(), 4.0);
        assert_eq!(c.tower_keys(), vec![TowerKey(0), TowerKey(1), TowerKey(2)]);
    }

    #[test]
    fn test_collection_numbers_clusters() {
        let mut collection = ClusterCollection::new();
        collection.extend(vec![cluster(&[1.0]), cluster(&[2.0])]);
        collection.extend(vec![cluster(&[3.0])]);
        let ids: Vec<u64> = collection.iter().map(|c| c.cluster_id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(collection.n_towers(), 3);
    }

    #[test]
    fn test_diagnostics_merge() {
        let mut total = Diagnostics::default();
        let cycle = Diagnostics { sums_seen: 4, clusters_built: 3, unresolved_towers: 2, ..Default::default() };
        total.merge(&cycle);
        total.merge(&cycle);
        assert_eq!(total.sums_seen, 8);
        assert_eq!(total.unresolved_towers, 4);
        assert!(!total.is_clean());
        assert!(Diagnostics::default().is_clean());
    }
}
