use std::collections::BTreeMap;
use std::fmt;
use std::fmt::{Display, Formatter};

use bincode::{Decode, Encode};
use calocore::{LL1Out, TowerContainer, TriggerPrimitiveContainer};
use serde::{Deserialize, Serialize};

use crate::cluster::cluster::ClusterCollection;
use crate::error::ClusterMakerError;

/// Category of a named node.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum NodeKind {
    Tower,
    Primitive,
    LL1,
    Cluster,
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Tower => write!(f, "TowerContainer"),
            NodeKind::Primitive => write!(f, "TriggerPrimitiveContainer"),
            NodeKind::LL1 => write!(f, "LL1Out"),
            NodeKind::Cluster => write!(f, "ClusterCollection"),
        }
    }
}

/// Named containers of one event frame.
///
/// Upstream stages register towers, primitives and LL1 outputs here; the
/// cluster maker resolves the names it is configured with once per frame and
/// may put its output collection back.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Encode, Decode)]
pub struct NodeRegistry {
    pub event: u64,
    towers: BTreeMap<String, TowerContainer>,
    primitives: BTreeMap<String, TriggerPrimitiveContainer>,
    ll1: BTreeMap<String, LL1Out>,
    #[serde(default)]
    clusters: BTreeMap<String, ClusterCollection>,
}

impl NodeRegistry {
    pub fn new(event: u64) -> Self {
        NodeRegistry { event, ..Default::default() }
    }

    pub fn add_towers(&mut self, name: &str, towers: TowerContainer) {
        self.towers.insert(name.to_string(), towers);
    }

    pub fn add_primitives(&mut self, name: &str, primitives: TriggerPrimitiveContainer) {
        self.primitives.insert(name.to_string(), primitives);
    }

    pub fn add_ll1(&mut self, name: &str, ll1: LL1Out) {
        self.ll1.insert(name.to_string(), ll1);
    }

    pub fn put_clusters(&mut self, name: &str, clusters: ClusterCollection) {
        self.clusters.insert(name.to_string(), clusters);
    }

    pub fn get_towers(&self, name: &str) -> Option<&TowerContainer> {
        self.towers.get(name)
    }

    pub fn get_primitives(&self, name: &str) -> Option<&TriggerPrimitiveContainer> {
        self.primitives.get(name)
    }

    pub fn get_ll1(&self, name: &str) -> Option<&LL1Out> {
        self.ll1.get(name)
    }

    pub fn get_clusters(&self, name: &str) -> Option<&ClusterCollection> {
        self.clusters.get(name)
    }

    /// Like [`get_towers`](Self::get_towers), but a missing node is an error naming it.
    pub fn grab_towers(&self, name: &str) -> Result<&TowerContainer, ClusterMakerError> {
        self.get_towers(name).ok_or_else(|| missing(NodeKind::Tower, name))
    }

    pub fn grab_primitives(&self, name: &str) -> Result<&TriggerPrimitiveContainer, ClusterMakerError> {
        self.get_primitives(name).ok_or_else(|| missing(NodeKind::Primitive, name))
    }

    pub fn grab_ll1(&self, name: &str) -> Result<&LL1Out, ClusterMakerError> {
        self.get_ll1(name).ok_or_else(|| missing(NodeKind::LL1, name))
    }

    pub fn node_names(&self, kind: NodeKind) -> Vec<&str> {
        match kind {
            NodeKind::Tower => self.towers.keys().map(|k| k.as_str()).collect(),
            NodeKind::Primitive => self.primitives.keys().map(|k| k.as_str()).collect(),
            NodeKind::LL1 => self.ll1.keys().map(|k| k.as_str()).collect(),
            NodeKind::Cluster => self.clusters.keys().map(|k| k.as_str()).collect(),
        }
    }
}

fn missing(kind: NodeKind, name: &str) -> ClusterMakerError {
    ClusterMakerError::MissingInputContainer { kind, name: name.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calocore::{DetectorId, TowerGeometry, TriggerId};

    #[test]
    fn test_grab_names_missing_node() {
        let mut registry = NodeRegistry::new(7);
        registry.add_primitives("TRIGGERPRIMITIVES_EMCAL", TriggerPrimitiveContainer::new(TriggerId::Jet, DetectorId::EMCal));

        assert!(registry.grab_primitives("TRIGGERPRIMITIVES_EMCAL").is_ok());
        let err = registry.grab_primitives("TRIGGERPRIMITIVES_HCALIN").unwrap_err();
        assert!(err.to_string().contains("TRIGGERPRIMITIVES_HCALIN"));
        match err {
            ClusterMakerError::MissingInputContainer { kind, name } => {
                assert_eq!(kind, NodeKind::Primitive);
                assert_eq!(name, "TRIGGERPRIMITIVES_HCALIN");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_node_names() {
        let mut registry = NodeRegistry::new(0);
        registry.add_towers("TOWERINFO_CALIB_HCALIN", TowerContainer::new(TowerGeometry::hcal_inner()));
        registry.add_ll1("LL1OUT_JET", LL1Out::new(TriggerId::Jet));
        assert_eq!(registry.node_names(NodeKind::Tower), vec!["TOWERINFO_CALIB_HCALIN"]);
        assert_eq!(registry.node_names(NodeKind::LL1), vec!["LL1OUT_JET"]);
        assert!(registry.node_names(NodeKind::Cluster).is_empty());
    }
}
