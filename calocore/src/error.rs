use thiserror::Error;

use crate::defs::DetectorId;

/// Errors raised by the sum key and tower key codecs.
///
/// All of these are programming defects or out-of-scheme values; none of them
/// is ever mapped onto a valid-looking key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("{0} is not a valid axis (expected 0 = eta or 1 = phi)")]
    InvalidAxis(String),
    #[error("{0} is not a valid source type (expected 0 = primitive or 1 = LL1)")]
    InvalidSourceType(String),
    #[error("detector {0} has no tower key scheme")]
    UnsupportedDetector(DetectorId),
    #[error("{axis} bin {bin} does not fit the {detector} tower key scheme (max {max})")]
    BinOutOfRange {
        detector: DetectorId,
        axis: &'static str,
        bin: u32,
        max: u32,
    },
}
