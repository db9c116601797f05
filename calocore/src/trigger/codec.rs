use crate::defs::{Axis, DetectorId, SourceType};
use crate::error::CodecError;
use crate::tower::keys::{TowerKey, TowerScheme};
use crate::trigger::keys::TriggerSumKey;

/// Decodes the flat eta or phi bin a sum key addresses.
///
/// The sum index within its primitive and the primitive index are linearized
/// as `sum + segment * primitive`, where the segmentation is fixed by the
/// source of the trigger word (4 for primitives, 2 for LL1).
///
/// # Arguments
///
/// * `sum_key` - key of the trigger sum
/// * `axis` - coordinate to decode
/// * `source` - where the key came from
///
/// # Examples
///
/// ```
/// use calocore::{decode_bin, Axis, DetectorId, SourceType, TriggerId, TriggerSumKey};
///
/// // primitive eta index 1, sum eta index 2
/// let key = TriggerSumKey::compose(TriggerId::Jet, DetectorId::EMCal, 1, 0, 2, 0);
/// assert_eq!(decode_bin(key, Axis::Eta, SourceType::Primitive), 6);
/// assert_eq!(decode_bin(key, Axis::Eta, SourceType::LL1), 4);
/// ```
pub fn decode_bin(sum_key: TriggerSumKey, axis: Axis, source: SourceType) -> u32 {
    sum_key.sum_id(axis) + source.segment() * sum_key.primitive_id(axis)
}

/// Same as [`decode_bin`] for axis and source given as raw ids.
///
/// Raw ids come from configuration or foreign data; anything outside the two
/// enumerations is rejected instead of mapped to a sentinel bin.
pub fn decode_bin_raw(sum_key: TriggerSumKey, axis: u8, source: u8) -> Result<u32, CodecError> {
    let axis = Axis::try_from(axis)?;
    let source = SourceType::try_from(source)?;
    Ok(decode_bin(sum_key, axis, source))
}

/// Packs an (eta, phi) bin pair into the tower key of `detector`.
///
/// EMCal and the HCal family use different packing; HCal inner, outer and
/// combined share one. `DetectorId::Unknown` has no scheme and is an error.
pub fn encode_tower_key(eta: u32, phi: u32, detector: DetectorId) -> Result<TowerKey, CodecError> {
    let scheme = TowerScheme::for_detector(detector).ok_or(CodecError::UnsupportedDetector(detector))?;
    scheme.encode(eta, phi, detector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::TriggerId;

    fn key(primitive_eta: u32, primitive_phi: u32, sum_eta: u32, sum_phi: u32) -> TriggerSumKey {
        TriggerSumKey::compose(TriggerId::Jet, DetectorId::EMCal, primitive_eta, primitive_phi, sum_eta, sum_phi)
    }

    #[test]
    fn test_decode_linearizes_per_source() {
        let k = key(1, 1, 2, 2);
        assert_eq!(decode_bin(k, Axis::Eta, SourceType::Primitive), 6);
        assert_eq!(decode_bin(k, Axis::Phi, SourceType::Primitive), 6);
        assert_eq!(decode_bin(k, Axis::Eta, SourceType::LL1), 4);
        assert_eq!(decode_bin(k, Axis::Phi, SourceType::LL1), 4);
    }

    #[test]
    fn test_decode_is_deterministic() {
        let k = key(7, 30, 3, 1);
        let first = decode_bin(k, Axis::Phi, SourceType::Primitive);
        for _ in 0..10 {
            assert_eq!(decode_bin(k, Axis::Phi, SourceType::Primitive), first);
        }
        assert_eq!(first, 1 + 4 * 30);
    }

    #[test]
    fn test_decode_axes_are_independent() {
        let k = key(2, 0, 1, 3);
        assert_eq!(decode_bin(k, Axis::Eta, SourceType::Primitive), 9);
        assert_eq!(decode_bin(k, Axis::Phi, SourceType::Primitive), 3);
    }

    #[test]
    fn test_decode_raw_rejects_invalid_arguments() {
        let k = key(1, 0, 2, 0);
        assert_eq!(decode_bin_raw(k, 0, 0), Ok(6));
        assert_eq!(decode_bin_raw(k, 0, 1), Ok(4));
        assert!(matches!(decode_bin_raw(k, 2, 0), Err(CodecError::InvalidAxis(_))));
        assert!(matches!(decode_bin_raw(k, 0, 5), Err(CodecError::InvalidSourceType(_))));
    }

    #[test]
    fn test_encode_is_total_over_known_detectors() {
        for detector in [DetectorId::EMCal, DetectorId::HCalInner, DetectorId::HCalOuter, DetectorId::HCalCombined] {
            assert!(encode_tower_key(3, 2, detector).is_ok(), "{detector} should encode");
        }
        assert_eq!(
            encode_tower_key(3, 2, DetectorId::Unknown),
            Err(CodecError::UnsupportedDetector(DetectorId::Unknown))
        );
    }

    #[test]
    fn test_hcal_family_shares_a_scheme() {
        let inner = encode_tower_key(5, 40, DetectorId::HCalInner).unwrap();
        let outer = encode_tower_key(5, 40, DetectorId::HCalOuter).unwrap();
        let combined = encode_tower_key(5, 40, DetectorId::HCalCombined).unwrap();
        let emcal = encode_tower_key(5, 40, DetectorId::EMCal).unwrap();
        assert_eq!(inner, outer);
        assert_eq!(inner, combined);
        assert_ne!(inner, emcal);
    }
}
