use calocore::{decode_bin, Axis, LL1Out, SourceType, TriggerPrimitive, TriggerPrimitiveContainer};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::{debug, trace};

use crate::cluster::builder::ClusterBuilder;
use crate::cluster::cluster::{Cluster, ClusterCollection, Diagnostics};
use crate::cluster::resolver::TowerSet;
use crate::config::TriggerClusterMakerConfig;
use crate::data::registry::NodeRegistry;
use crate::error::ClusterMakerError;

/// Typed input containers of one processing cycle.
#[derive(Clone, Debug, Default)]
pub struct InputNodes<'a> {
    pub towers: TowerSet<'a>,
    pub primitives: Vec<&'a TriggerPrimitiveContainer>,
    pub ll1: Vec<&'a LL1Out>,
}

impl<'a> InputNodes<'a> {
    /// Resolves every configured node name, failing on the first one missing.
    pub fn grab(registry: &'a NodeRegistry, config: &TriggerClusterMakerConfig) -> Result<Self, ClusterMakerError> {
        let towers = config
            .in_tower_nodes
            .iter()
            .map(|name| registry.grab_towers(name))
            .collect::<Result<Vec<_>, _>>()?;
        let primitives = config
            .in_prim_nodes
            .iter()
            .map(|name| registry.grab_primitives(name))
            .collect::<Result<Vec<_>, _>>()?;
        let ll1 = config
            .in_ll1_nodes
            .iter()
            .map(|name| registry.grab_ll1(name))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(InputNodes { towers: TowerSet::from_containers(towers), primitives, ll1 })
    }
}

#[derive(Clone, Debug)]
pub struct PipelineOptions {
    pub walk_ll1: bool,
    pub keep_empty_clusters: bool,
    pub num_threads: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        PipelineOptions { walk_ll1: true, keep_empty_clusters: false, num_threads: 1 }
    }
}

impl From<&TriggerClusterMakerConfig> for PipelineOptions {
    fn from(config: &TriggerClusterMakerConfig) -> Self {
        PipelineOptions {
            walk_ll1: config.walk_ll1,
            keep_empty_clusters: config.keep_empty_clusters,
            num_threads: config.num_threads,
        }
    }
}

/// One processing cycle: every primitive of every primitive container becomes
/// clusters, LL1 outputs are walked for bookkeeping only.
pub struct Pipeline<'a> {
    inputs: InputNodes<'a>,
    options: PipelineOptions,
}

impl<'a> Pipeline<'a> {
    pub fn new(inputs: InputNodes<'a>, options: PipelineOptions) -> Self {
        Pipeline { inputs, options }
    }

    /// Builds a pipeline from the nodes named in `config`.
    ///
    /// A missing node aborts construction, so no clusters are ever produced
    /// from an incomplete set of inputs.
    pub fn from_registry(registry: &'a NodeRegistry, config: &TriggerClusterMakerConfig) -> Result<Self, ClusterMakerError> {
        let inputs = InputNodes::grab(registry, config)?;
        Ok(Pipeline::new(inputs, PipelineOptions::from(config)))
    }

    fn builder(&self) -> ClusterBuilder<'a> {
        ClusterBuilder::new(self.inputs.towers).keep_empty_clusters(self.options.keep_empty_clusters)
    }

    fn primitives(&self) -> Vec<&'a TriggerPrimitive> {
        self.inputs.primitives.iter().flat_map(|c| c.primitives()).collect()
    }

    /// Runs the cycle, in a thread pool when more than one thread is configured.
    pub fn run(&self) -> Result<ClusterCollection, ClusterMakerError> {
        if self.options.num_threads > 1 {
            self.run_parallel(self.options.num_threads)
        } else {
            Ok(self.run_sequential())
        }
    }

    pub fn run_sequential(&self) -> ClusterCollection {
        let builder = self.builder();
        let per_primitive: Vec<(Vec<Cluster>, Diagnostics)> = self
            .primitives()
            .into_iter()
            .map(|p| builder.build_clusters_from_primitive(p))
            .collect();
        self.assemble(per_primitive)
    }

    /// Builds primitives in parallel; the indexed collect keeps primitive order,
    /// so the result equals [`run_sequential`](Self::run_sequential).
    pub fn run_parallel(&self, num_threads: usize) -> Result<ClusterCollection, ClusterMakerError> {
        let builder = self.builder();
        let primitives = self.primitives();
        let pool = ThreadPoolBuilder::new().num_threads(num_threads).build()?;

        let per_primitive: Vec<(Vec<Cluster>, Diagnostics)> =
            pool.install(|| primitives.par_iter().map(|p| builder.build_clusters_from_primitive(p)).collect());

        Ok(self.assemble(per_primitive))
    }

    fn assemble(&self, per_primitive: Vec<(Vec<Cluster>, Diagnostics)>) -> ClusterCollection {
        let mut collection = ClusterCollection::new();
        if self.options.walk_ll1 {
            collection.diagnostics.ll1_words = self.walk_ll1();
        }
        for (clusters, diagnostics) in per_primitive {
            collection.diagnostics.merge(&diagnostics);
            collection.extend(clusters);
        }
        debug!("built {} clusters: {}", collection.len(), collection.diagnostics.summary());
        collection
    }

    /// Visits every LL1 trigger word and returns how many were seen.
    ///
    /// Which primitives an LL1 word stands for is not part of the addressing
    /// scheme, so words only get their LL1 bins decoded for tracing.
    fn walk_ll1(&self) -> usize {
        let mut n_words = 0;
        for ll1 in &self.inputs.ll1 {
            for (key, word) in ll1.words() {
                n_words += 1;
                trace!(
                    "LL1 {} word {}: (eta, phi) = ({}, {}), {} samples",
                    ll1.trigger,
                    key,
                    decode_bin(key, Axis::Eta, SourceType::LL1),
                    decode_bin(key, Axis::Phi, SourceType::LL1),
                    word.len()
                );
            }
        }
        n_words
    }
}

/// Builds the cluster collection of one cycle from directly supplied containers.
pub fn run(
    primitive_containers: &[&TriggerPrimitiveContainer],
    ll1_containers: &[&LL1Out],
    towers: TowerSet<'_>,
) -> ClusterCollection {
    let inputs = InputNodes {
        towers,
        primitives: primitive_containers.to_vec(),
        ll1: ll1_containers.to_vec(),
    };
    Pipeline::new(inputs, PipelineOptions::default()).run_sequential()
}

#[cfg(test)]
mod tests {
    use super::*;
    use calocore::{
        DetectorId, SumFootprint, TowerContainer, TowerGeometry, TowerSample, TriggerId, TriggerPrimitiveKey,
        TriggerSumKey,
    };

    fn hcal_container(detector: DetectorId, n_primitives: u32) -> TriggerPrimitiveContainer {
        let mut container = TriggerPrimitiveContainer::new(TriggerId::Jet, detector);
        for phi in 0..n_primitives {
            let key = TriggerPrimitiveKey::compose(TriggerId::Jet, detector, 1, phi);
            let mut primitive = TriggerPrimitive::new(key, SumFootprint::unit());
            for (e, p) in [(0, 0), (1, 1), (2, 3)] {
                primitive.add_sum(key.sum_key(e, p), vec![0, 8, 3]);
            }
            container.add_primitive(primitive);
        }
        container
    }

    #[test]
    fn test_clusters_in_primitive_then_sum_order() {
        let inner = TowerContainer::from_fn(TowerGeometry::hcal_inner(), |eta, phi| {
            TowerSample::new((eta * 100 + phi) as f32, 0.0)
        });
        let prims = hcal_container(DetectorId::HCalInner, 4);
        let collection = run(&[&prims], &[], TowerSet::from_containers([&inner]));

        assert_eq!(collection.len(), 12);
        assert!(collection.diagnostics.is_clean());
        let ids: Vec<u64> = collection.iter().map(|c| c.cluster_id).collect();
        assert_eq!(ids, (0..12).collect::<Vec<u64>>());
        // second primitive (phi index 1), first sum: eta 0 + 4 * 1, phi 0 + 4 * 1
        assert_eq!((collection.clusters()[3].eta_bin, collection.clusters()[3].phi_bin), (4, 4));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let inner = TowerContainer::from_fn(TowerGeometry::hcal_inner(), |eta, phi| {
            TowerSample::new((eta * 100 + phi) as f32, 0.0)
        });
        let outer = TowerContainer::from_fn(TowerGeometry::hcal_outer(), |eta, phi| {
            TowerSample::new((eta + phi) as f32, 1.0)
        });
        let a = hcal_container(DetectorId::HCalInner, 16);
        let b = hcal_container(DetectorId::HCalOuter, 16);
        let inputs = InputNodes {
            towers: TowerSet::from_containers([&inner, &outer]),
            primitives: vec![&a, &b],
            ll1: vec![],
        };
        let pipeline = Pipeline::new(inputs, PipelineOptions::default());

        let sequential = pipeline.run_sequential();
        let parallel = pipeline.run_parallel(4).unwrap();
        assert_eq!(sequential.len(), parallel.len());
        assert_eq!(sequential.diagnostics, parallel.diagnostics);
        for (s, p) in sequential.iter().zip(parallel.iter()) {
            assert_eq!(s.cluster_id, p.cluster_id);
            assert_eq!(s.sum_key, p.sum_key);
            assert_eq!(s.tower_keys(), p.tower_keys());
        }
    }

    #[test]
    fn test_ll1_words_are_counted_not_clustered() {
        let mut ll1 = LL1Out::new(TriggerId::Jet);
        for phi in 0..5 {
            ll1.add_word(TriggerSumKey::compose(TriggerId::Jet, DetectorId::HCalCombined, 0, phi, 1, 1), vec![1, 2]);
        }
        let collection = run(&[], &[&ll1], TowerSet::default());
        assert!(collection.is_empty());
        assert_eq!(collection.diagnostics.ll1_words, 5);
    }

    #[test]
    fn test_empty_inputs() {
        let collection = run(&[], &[], TowerSet::default());
        assert!(collection.is_empty());
        assert_eq!(collection.diagnostics, Diagnostics::default());
    }
}
