use thiserror::Error;

use crate::data::registry::NodeKind;

/// Errors that stop a run.
///
/// Recoverable per-sum conditions (unsupported detectors, missing towers) are
/// never reported through this type; they are counted in
/// [`Diagnostics`](crate::cluster::cluster::Diagnostics) instead.
#[derive(Error, Debug)]
pub enum ClusterMakerError {
    #[error("couldn't grab {kind} node '{name}'")]
    MissingInputContainer { kind: NodeKind, name: String },
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("bincode encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("bincode decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),
    #[error("couldn't build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("invalid configuration: {0}")]
    Config(String),
}
