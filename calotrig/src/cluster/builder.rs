use calocore::{
    decode_bin, encode_tower_key, Axis, CodecError, SourceType, TriggerPrimitive, TriggerSumKey,
};
use tracing::trace;

use crate::cluster::cluster::{Cluster, ClusterTower, Diagnostics};
use crate::cluster::resolver::{NotFound, TowerSet};

/// Turns the sums of trigger primitives into clusters of resolved towers.
#[derive(Copy, Clone, Debug)]
pub struct ClusterBuilder<'a> {
    towers: TowerSet<'a>,
    keep_empty_clusters: bool,
}

impl<'a> ClusterBuilder<'a> {
    pub fn new(towers: TowerSet<'a>) -> Self {
        ClusterBuilder { towers, keep_empty_clusters: false }
    }

    /// Emit clusters even when none of their towers resolved.
    pub fn keep_empty_clusters(mut self, keep: bool) -> Self {
        self.keep_empty_clusters = keep;
        self
    }

    pub fn towers(&self) -> &TowerSet<'a> {
        &self.towers
    }

    /// Lazily builds one cluster per sum of `primitive`, in storage order.
    ///
    /// The iterator is single pass; diagnostics accumulate on it while it is
    /// consumed.
    pub fn clusters_from_primitive<'p>(&self, primitive: &'p TriggerPrimitive) -> PrimitiveClusters<'a, 'p> {
        PrimitiveClusters {
            builder: *self,
            primitive,
            sums: Box::new(primitive.sums()),
            next_id: 0,
            diagnostics: Diagnostics::default(),
        }
    }

    /// Eager variant of [`clusters_from_primitive`](Self::clusters_from_primitive).
    pub fn build_clusters_from_primitive(&self, primitive: &TriggerPrimitive) -> (Vec<Cluster>, Diagnostics) {
        let mut iter = self.clusters_from_primitive(primitive);
        let clusters: Vec<Cluster> = iter.by_ref().collect();
        (clusters, iter.into_diagnostics())
    }

    fn build_sum_cluster(
        &self,
        primitive: &TriggerPrimitive,
        sum_key: TriggerSumKey,
        samples: &[u32],
        diagnostics: &mut Diagnostics,
    ) -> Cluster {
        let detector = sum_key.detector();
        let eta = decode_bin(sum_key, Axis::Eta, SourceType::Primitive);
        let phi = decode_bin(sum_key, Axis::Phi, SourceType::Primitive);
        let peak = samples.iter().copied().max().unwrap_or(0);

        diagnostics.sums_seen += 1;
        let mut cluster = Cluster::new(primitive.key, sum_key, detector, eta, phi, peak);

        for (tower_eta, tower_phi) in primitive.footprint.slots(eta, phi) {
            let key = match encode_tower_key(tower_eta, tower_phi, detector) {
                Ok(key) => key,
                Err(CodecError::UnsupportedDetector(_)) => {
                    trace!("sum {} references detector {} without towers", sum_key, detector);
                    diagnostics.unresolved_detectors += 1;
                    return cluster;
                }
                Err(e) => {
                    trace!("sum {}: {}", sum_key, e);
                    diagnostics.unresolved_towers += 1;
                    continue;
                }
            };

            match self.towers.resolve(key, detector) {
                Ok(sample) => cluster.add_tower(ClusterTower::new(key, tower_eta, tower_phi, sample)),
                Err(NotFound::UnsupportedDetector(_)) => {
                    trace!("sum {} references detector {} without towers", sum_key, detector);
                    diagnostics.unresolved_detectors += 1;
                    return cluster;
                }
                Err(e) => {
                    trace!("sum {}: {}", sum_key, e);
                    diagnostics.unresolved_towers += 1;
                }
            }
        }

        trace!("sum {} -> (eta, phi) = ({}, {}), {} towers", sum_key, eta, phi, cluster.n_towers());
        cluster
    }
}

/// Clusters of one primitive, built as the iterator advances.
pub struct PrimitiveClusters<'a, 'p> {
    builder: ClusterBuilder<'a>,
    primitive: &'p TriggerPrimitive,
    sums: Box<dyn Iterator<Item = (TriggerSumKey, &'p [u32])> + 'p>,
    next_id: u64,
    diagnostics: Diagnostics,
}

impl<'a, 'p> PrimitiveClusters<'a, 'p> {
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }
}

impl<'a, 'p> Iterator for PrimitiveClusters<'a, 'p> {
    type Item = Cluster;

    fn next(&mut self) -> Option<Cluster> {
        loop {
            let (sum_key, samples) = self.sums.next()?;
            let mut cluster = self.builder.build_sum_cluster(self.primitive, sum_key, samples, &mut self.diagnostics);

            if cluster.is_empty() && !self.builder.keep_empty_clusters {
                self.diagnostics.suppressed_empty_clusters += 1;
                continue;
            }

            cluster.cluster_id = self.next_id;
            self.next_id += 1;
            self.diagnostics.clusters_built += 1;
            return Some(cluster);
        }
    }
}
