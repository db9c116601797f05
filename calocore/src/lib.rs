pub mod defs;
pub mod error;

// trigger primitives, LL1 outputs and the sum key codec
pub mod trigger {
    pub mod keys;
    pub mod codec;
    pub mod primitive;
    pub mod ll1;
}

// calorimeter towers
pub mod tower {
    pub mod keys;
    pub mod container;
}

pub use defs::{Axis, DetectorId, Ll1Source, PrimitiveSource, SourceType, TriggerId};
pub use error::CodecError;
pub use trigger::codec::{decode_bin, decode_bin_raw, encode_tower_key};
pub use trigger::keys::{TriggerPrimitiveKey, TriggerSumKey};
pub use trigger::ll1::LL1Out;
pub use trigger::primitive::{SumFootprint, TriggerPrimitive, TriggerPrimitiveContainer};
pub use tower::container::{TowerContainer, TowerGeometry, TowerSample};
pub use tower::keys::TowerKey;
