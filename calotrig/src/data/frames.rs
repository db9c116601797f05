use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cluster::io::is_zstd;
use crate::config::OutputFormat;
use crate::data::registry::NodeRegistry;
use crate::error::ClusterMakerError;

/// A sequence of event frames, the input of a batch run.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Encode, Decode)]
pub struct FrameFile {
    pub version: u32,
    pub frames: Vec<NodeRegistry>,
}

impl FrameFile {
    pub fn new(frames: Vec<NodeRegistry>) -> Self {
        FrameFile { version: 1, frames }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Writes the frames, json or zstd-compressed bincode depending on the extension.
    pub fn save(&self, path: &Path) -> Result<(), ClusterMakerError> {
        match OutputFormat::from_path(path) {
            OutputFormat::Json => {
                let mut w = BufWriter::new(File::create(path)?);
                serde_json::to_writer(&mut w, self)?;
                w.flush()?;
            }
            OutputFormat::Bincode => {
                let mut zw = zstd::Encoder::new(File::create(path)?, 3)?;
                bincode::encode_into_std_write(self, &mut zw, bincode::config::standard())?;
                zw.finish()?;
            }
        }
        debug!("saved {} frames to {}", self.frames.len(), path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<FrameFile, ClusterMakerError> {
        let file = match OutputFormat::from_path(path) {
            OutputFormat::Json => serde_json::from_reader(BufReader::new(File::open(path)?))?,
            OutputFormat::Bincode => {
                let mut f = File::open(path)?;
                let config = bincode::config::standard();
                if is_zstd(&mut f)? {
                    bincode::decode_from_std_read(&mut zstd::Decoder::new(f)?, config)?
                } else {
                    bincode::decode_from_std_read(&mut BufReader::new(f), config)?
                }
            }
        };
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calocore::{DetectorId, LL1Out, TowerContainer, TowerGeometry, TowerSample, TriggerId, TriggerPrimitiveContainer};

    fn frames() -> FrameFile {
        let mut frames = Vec::new();
        for event in 0..3 {
            let mut registry = NodeRegistry::new(event);
            registry.add_towers(
                "TOWERINFO_CALIB_HCALIN",
                TowerContainer::from_fn(TowerGeometry::hcal_inner(), |eta, phi| {
                    TowerSample::new((eta + phi + event as u32) as f32, 0.0)
                }),
            );
            registry.add_primitives("TRIGGERPRIMITIVES_HCALIN", TriggerPrimitiveContainer::new(TriggerId::Jet, DetectorId::HCalInner));
            registry.add_ll1("LL1OUT_JET", LL1Out::new(TriggerId::Jet));
            frames.push(registry);
        }
        FrameFile::new(frames)
    }

    fn check(loaded: &FrameFile) {
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.len(), 3);
        let towers = loaded.frames[2].get_towers("TOWERINFO_CALIB_HCALIN").unwrap();
        assert_eq!(towers.get_tower_at(3, 4).unwrap().energy, 9.0);
        assert!(loaded.frames[0].get_ll1("LL1OUT_JET").is_some());
    }

    #[test]
    fn test_frames_json() {
        let path = std::env::temp_dir().join(format!("calotrig-frames-{}.json", std::process::id()));
        frames().save(&path).unwrap();
        check(&FrameFile::load(&path).unwrap());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_frames_bincode() {
        let path = std::env::temp_dir().join(format!("calotrig-frames-{}.bin", std::process::id()));
        frames().save(&path).unwrap();
        check(&FrameFile::load(&path).unwrap());
        std::fs::remove_file(&path).ok();
    }
}
