// src/lib.rs
pub mod config;
pub mod error;
pub mod maker;

pub mod data {
    pub mod registry;
    pub mod frames;
}

pub mod cluster {
    pub mod cluster;
    pub mod resolver;
    pub mod builder;
    pub mod pipeline;
    pub mod io;
}

pub mod sim {
    pub mod synthetic;
}

pub use cluster::builder::{ClusterBuilder, PrimitiveClusters};
pub use cluster::cluster::{Cluster, ClusterCollection, ClusterTower, Diagnostics};
pub use cluster::pipeline::{run, InputNodes, Pipeline, PipelineOptions};
pub use cluster::resolver::{resolve, NotFound, TowerSet};
pub use config::{OutputFormat, TriggerClusterMakerConfig};
pub use data::registry::{NodeKind, NodeRegistry};
pub use error::ClusterMakerError;
pub use maker::{RunSummary, TriggerClusterMaker};
