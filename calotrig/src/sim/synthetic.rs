use calocore::{
    DetectorId, LL1Out, Ll1Source, PrimitiveSource, SumFootprint, TowerContainer, TowerGeometry, TowerSample,
    TriggerId, TriggerPrimitive, TriggerPrimitiveContainer, TriggerPrimitiveKey, TriggerSumKey,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::config::{JET_PRIMITIVE_NODE, TOWER_NODES};
use crate::data::registry::NodeRegistry;

/// Sums per primitive along each axis.
pub const SUMS_PER_PRIMITIVE: u32 = 4;

/// Primitive containers of a synthetic frame, with the detector filling them.
pub fn primitive_nodes() -> Vec<(&'static str, TriggerId, DetectorId)> {
    vec![
        (JET_PRIMITIVE_NODE, TriggerId::Jet, DetectorId::HCalCombined),
        (PrimitiveSource::EMCal.node_name(), TriggerId::Photon, PrimitiveSource::EMCal.detector()),
        (PrimitiveSource::EMCalLL1.node_name(), TriggerId::Photon, PrimitiveSource::EMCalLL1.detector()),
        (PrimitiveSource::HCalLL1.node_name(), TriggerId::Jet, PrimitiveSource::HCalLL1.detector()),
        (PrimitiveSource::IHCal.node_name(), TriggerId::Jet, PrimitiveSource::IHCal.detector()),
        (PrimitiveSource::OHCal.node_name(), TriggerId::Jet, PrimitiveSource::OHCal.detector()),
    ]
}

/// Generates event frames carrying every node the default configuration reads.
///
/// Sums only ever address towers inside the detector geometry, so everything
/// but the combined-HCal sums resolves.
pub struct SyntheticFrameBuilder {
    rng: StdRng,
    occupancy: f64,
    n_samples: usize,
    noise: f32,
}

impl SyntheticFrameBuilder {
    pub fn new(seed: u64) -> Self {
        SyntheticFrameBuilder { rng: StdRng::seed_from_u64(seed), occupancy: 0.05, n_samples: 5, noise: 0.2 }
    }

    /// Fraction of sums present in a primitive. Non-finite values mean none.
    pub fn occupancy(mut self, occupancy: f64) -> Self {
        self.occupancy = if occupancy.is_finite() { occupancy.clamp(0.0, 1.0) } else { 0.0 };
        self
    }

    /// ADC samples per sum and LL1 word.
    pub fn n_samples(mut self, n_samples: usize) -> Self {
        self.n_samples = n_samples.max(1);
        self
    }

    pub fn frames(&mut self, n_events: usize) -> Vec<NodeRegistry> {
        (0..n_events as u64).map(|event| self.frame(event)).collect()
    }

    pub fn frame(&mut self, event: u64) -> NodeRegistry {
        let mut registry = NodeRegistry::new(event);

        let geometries = [TowerGeometry::emcal(), TowerGeometry::hcal_inner(), TowerGeometry::hcal_outer()];
        for (name, geometry) in TOWER_NODES.iter().zip(geometries) {
            let towers = self.towers(geometry);
            registry.add_towers(name, towers);
        }

        for (name, trigger, detector) in primitive_nodes() {
            let primitives = self.primitives(trigger, detector);
            registry.add_primitives(name, primitives);
        }

        for source in [Ll1Source::Jet, Ll1Source::Raw] {
            let ll1 = self.ll1(TriggerId::Jet);
            registry.add_ll1(source.node_name(), ll1);
        }

        debug!("generated frame {}", event);
        registry
    }

    fn towers(&mut self, geometry: TowerGeometry) -> TowerContainer {
        let noise = self.noise;
        let rng = &mut self.rng;
        TowerContainer::from_fn(geometry, |_, _| {
            TowerSample::new(rng.gen_range(-noise..noise), rng.gen_range(-2.0..2.0))
        })
    }

    fn primitives(&mut self, trigger: TriggerId, detector: DetectorId) -> TriggerPrimitiveContainer {
        let footprint = SumFootprint::unit();
        // combined HCal sums share the inner-HCal granularity
        let geometry = TowerGeometry::for_detector(detector).unwrap_or_else(TowerGeometry::hcal_inner);
        let n_eta = geometry.n_eta / SUMS_PER_PRIMITIVE;
        let n_phi = geometry.n_phi / SUMS_PER_PRIMITIVE;

        let mut container = TriggerPrimitiveContainer::new(trigger, detector);
        for primitive_eta in 0..n_eta {
            for primitive_phi in 0..n_phi {
                let key = TriggerPrimitiveKey::compose(trigger, detector, primitive_eta, primitive_phi);
                let mut primitive = TriggerPrimitive::new(key, footprint);
                for sum_eta in 0..SUMS_PER_PRIMITIVE {
                    for sum_phi in 0..SUMS_PER_PRIMITIVE {
                        if self.rng.gen_bool(self.occupancy) {
                            let samples = self.samples();
                            primitive.add_sum(key.sum_key(sum_eta, sum_phi), samples);
                        }
                    }
                }
                if !primitive.is_empty() {
                    container.add_primitive(primitive);
                }
            }
        }
        container
    }

    fn ll1(&mut self, trigger: TriggerId) -> LL1Out {
        let mut ll1 = LL1Out::new(trigger);
        for primitive_eta in 0..6 {
            for primitive_phi in 0..16 {
                if self.rng.gen_bool(self.occupancy) {
                    let key = TriggerSumKey::compose(trigger, DetectorId::HCalCombined, primitive_eta, primitive_phi, 0, 0);
                    let word = self.samples();
                    ll1.add_word(key, word);
                }
            }
        }
        let bits = (0..self.n_samples).map(|_| self.rng.gen_range(0..2)).collect();
        ll1.set_bit_pattern(bits);
        ll1
    }

    /// Pulse-like ADC samples peaking in the middle of the window.
    fn samples(&mut self) -> Vec<u32> {
        let peak: u32 = self.rng.gen_range(1..256);
        let middle = self.n_samples / 2;
        (0..self.n_samples)
            .map(|i| {
                let distance = i.abs_diff(middle) as u32;
                peak.checked_shr(2 * distance).unwrap_or(0)
            })
            .collect()
    }
}
