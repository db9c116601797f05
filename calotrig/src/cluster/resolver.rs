use calocore::{DetectorId, TowerContainer, TowerKey, TowerSample};
use thiserror::Error;
use tracing::warn;

/// Why a tower lookup came back empty.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFound {
    #[error("detector {0} has no tower container of its own")]
    UnsupportedDetector(DetectorId),
    #[error("no {0} tower container was supplied")]
    MissingContainer(DetectorId),
    #[error("no {detector} tower at key {key}")]
    NoTower { detector: DetectorId, key: TowerKey },
}

/// Borrowed tower containers of the three calorimeters.
#[derive(Copy, Clone, Debug, Default)]
pub struct TowerSet<'a> {
    pub emcal: Option<&'a TowerContainer>,
    pub hcal_inner: Option<&'a TowerContainer>,
    pub hcal_outer: Option<&'a TowerContainer>,
}

impl<'a> TowerSet<'a> {
    /// Sorts containers into their slots by the detector each one declares.
    ///
    /// The first container per detector wins; containers of detectors
    /// without towers are ignored.
    pub fn from_containers<I>(containers: I) -> Self
    where
        I: IntoIterator<Item = &'a TowerContainer>,
    {
        let mut set = TowerSet::default();
        for container in containers {
            let slot = match container.detector() {
                DetectorId::EMCal => &mut set.emcal,
                DetectorId::HCalInner => &mut set.hcal_inner,
                DetectorId::HCalOuter => &mut set.hcal_outer,
                other => {
                    warn!("ignoring tower container for {}", other);
                    continue;
                }
            };
            if slot.is_some() {
                warn!("more than one {} tower container supplied, keeping the first", container.detector());
                continue;
            }
            *slot = Some(container);
        }
        set
    }

    /// Container holding `detector`'s towers.
    pub fn container(&self, detector: DetectorId) -> Result<&'a TowerContainer, NotFound> {
        let slot = match detector {
            DetectorId::EMCal => self.emcal,
            DetectorId::HCalInner => self.hcal_inner,
            DetectorId::HCalOuter => self.hcal_outer,
            DetectorId::HCalCombined | DetectorId::Unknown => return Err(NotFound::UnsupportedDetector(detector)),
        };
        slot.ok_or(NotFound::MissingContainer(detector))
    }

    pub fn resolve(&self, key: TowerKey, detector: DetectorId) -> Result<&'a TowerSample, NotFound> {
        resolve(key, detector, self)
    }

    pub fn n_containers(&self) -> usize {
        [self.emcal, self.hcal_inner, self.hcal_outer].iter().filter(|c| c.is_some()).count()
    }
}

/// Looks up the sample stored under `key` in `detector`'s tower container.
pub fn resolve<'a>(key: TowerKey, detector: DetectorId, towers: &TowerSet<'a>) -> Result<&'a TowerSample, NotFound> {
    towers
        .container(detector)?
        .get_tower_at_key(key)
        .ok_or(NotFound::NoTower { detector, key })
}

#[cfg(test)]
mod tests {
    use super::*;
    use calocore::{encode_tower_key, TowerGeometry};

    fn filled(geometry: TowerGeometry) -> TowerContainer {
        TowerContainer::from_fn(geometry, |eta, phi| TowerSample::new((eta * 100 + phi) as f32, 1.0))
    }

    #[test]
    fn test_resolve_dispatches_on_detector() {
        let emcal = filled(TowerGeometry::emcal());
        let inner = filled(TowerGeometry::hcal_inner());
        let outer = TowerContainer::from_fn(TowerGeometry::hcal_outer(), |_, _| TowerSample::new(-1.0, 0.0));
        let towers = TowerSet::from_containers([&emcal, &inner, &outer]);
        assert_eq!(towers.n_containers(), 3);

        let key = encode_tower_key(4, 5, DetectorId::EMCal).unwrap();
        assert_eq!(towers.resolve(key, DetectorId::EMCal).unwrap().energy, 405.0);

        let key = encode_tower_key(4, 5, DetectorId::HCalInner).unwrap();
        assert_eq!(towers.resolve(key, DetectorId::HCalInner).unwrap().energy, 405.0);
        assert_eq!(towers.resolve(key, DetectorId::HCalOuter).unwrap().energy, -1.0);
    }

    #[test]
    fn test_aggregate_detector_is_not_found() {
        let inner = filled(TowerGeometry::hcal_inner());
        let towers = TowerSet::from_containers([&inner]);
        let key = encode_tower_key(0, 0, DetectorId::HCalCombined).unwrap();
        assert_eq!(
            towers.resolve(key, DetectorId::HCalCombined),
            Err(NotFound::UnsupportedDetector(DetectorId::HCalCombined))
        );
        assert_eq!(
            towers.resolve(key, DetectorId::HCalOuter),
            Err(NotFound::MissingContainer(DetectorId::HCalOuter))
        );
    }

    #[test]
    fn test_out_of_range_tower_is_not_found() {
        let emcal = filled(TowerGeometry::new(DetectorId::EMCal, 8, 8));
        let towers = TowerSet::from_containers([&emcal]);
        let key = encode_tower_key(8, 1, DetectorId::EMCal).unwrap();
        assert_eq!(
            towers.resolve(key, DetectorId::EMCal),
            Err(NotFound::NoTower { detector: DetectorId::EMCal, key })
        );
    }

    #[test]
    fn test_first_container_wins() {
        let first = TowerContainer::from_fn(TowerGeometry::emcal(), |_, _| TowerSample::new(1.0, 0.0));
        let second = TowerContainer::from_fn(TowerGeometry::emcal(), |_, _| TowerSample::new(2.0, 0.0));
        let towers = TowerSet::from_containers([&first, &second]);
        let key = encode_tower_key(0, 0, DetectorId::EMCal).unwrap();
        assert_eq!(towers.resolve(key, DetectorId::EMCal).unwrap().energy, 1.0);
    }
}
