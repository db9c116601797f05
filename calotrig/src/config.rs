use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use calocore::{Ll1Source, PrimitiveSource};
use serde::{Deserialize, Serialize};

use crate::error::ClusterMakerError;

/// Encoding of the cluster output file.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Bincode,
}

impl OutputFormat {
    /// `.json` files are written as JSON, everything else as bincode.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => OutputFormat::Json,
            _ => OutputFormat::Bincode,
        }
    }
}

/// Calibrated tower nodes of the EMCal, inner HCal and outer HCal.
pub const TOWER_NODES: [&str; 3] = ["TOWERINFO_CALIB_CEMC", "TOWERINFO_CALIB_HCALIN", "TOWERINFO_CALIB_HCALOUT"];

/// Jet primitives as registered by the trigger emulator.
pub const JET_PRIMITIVE_NODE: &str = "TRIGGERPRIMITIVES_JET";

/// Options of the trigger cluster maker.
///
/// Every field has a default, so a JSON config only needs to list what it
/// changes.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerClusterMakerConfig {
    // general options
    pub debug: bool,

    // output options
    pub save_to_node: bool,
    pub save_to_file: bool,
    pub out_node_name: String,
    pub out_file_name: String,
    pub out_format: OutputFormat,
    pub compress: bool,

    // input nodes
    pub in_tower_nodes: Vec<String>,
    pub in_ll1_nodes: Vec<String>,
    pub in_prim_nodes: Vec<String>,

    // processing
    pub walk_ll1: bool,
    pub keep_empty_clusters: bool,
    pub num_threads: usize,
}

impl Default for TriggerClusterMakerConfig {
    fn default() -> Self {
        Self {
            debug: true,

            save_to_node: false,
            save_to_file: true,
            out_node_name: "TriggerClusters".to_string(),
            out_file_name: "trigger_clusters.json".to_string(),
            out_format: OutputFormat::Json,
            compress: false,

            in_tower_nodes: TOWER_NODES.iter().map(|s| s.to_string()).collect(),
            in_ll1_nodes: vec![Ll1Source::Jet.node_name().to_string()],
            in_prim_nodes: std::iter::once(JET_PRIMITIVE_NODE)
                .chain(
                    [
                        PrimitiveSource::EMCal,
                        PrimitiveSource::EMCalLL1,
                        PrimitiveSource::HCalLL1,
                        PrimitiveSource::IHCal,
                        PrimitiveSource::OHCal,
                    ]
                    .iter()
                    .map(|s| s.node_name()),
                )
                .map(str::to_string)
                .collect(),

            walk_ll1: true,
            keep_empty_clusters: false,
            num_threads: 1,
        }
    }
}

impl TriggerClusterMakerConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, ClusterMakerError> {
        let reader = BufReader::new(File::open(path)?);
        let config: TriggerClusterMakerConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ClusterMakerError> {
        if self.num_threads == 0 {
            return Err(ClusterMakerError::Config("num_threads must be at least 1".to_string()));
        }
        if self.save_to_node && self.out_node_name.is_empty() {
            return Err(ClusterMakerError::Config("out_node_name is empty".to_string()));
        }
        if self.save_to_file && self.out_file_name.is_empty() {
            return Err(ClusterMakerError::Config("out_file_name is empty".to_string()));
        }
        if self.compress && self.out_format == OutputFormat::Json {
            return Err(ClusterMakerError::Config("compression needs the bincode output format".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TriggerClusterMakerConfig::default();
        assert!(config.debug);
        assert!(config.save_to_file);
        assert!(!config.save_to_node);
        assert_eq!(config.out_node_name, "TriggerClusters");
        assert_eq!(config.in_tower_nodes.len(), 3);
        assert_eq!(config.in_ll1_nodes, vec!["LL1OUT_JET".to_string()]);
        assert_eq!(config.in_prim_nodes.len(), 6);
        assert_eq!(config.in_prim_nodes[0], "TRIGGERPRIMITIVES_JET");
        assert_eq!(config.in_prim_nodes[5], "TRIGGERPRIMITIVES_HCALOUT");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: TriggerClusterMakerConfig =
            serde_json::from_str(r#"{ "debug": false, "out_format": "bincode", "num_threads": 4 }"#).unwrap();
        assert!(!config.debug);
        assert_eq!(config.out_format, OutputFormat::Bincode);
        assert_eq!(config.num_threads, 4);
        assert_eq!(config.in_tower_nodes.len(), 3);
    }

    #[test]
    fn test_invalid_config() {
        let config = TriggerClusterMakerConfig { num_threads: 0, ..Default::default() };
        assert!(matches!(config.validate(), Err(ClusterMakerError::Config(_))));

        let config = TriggerClusterMakerConfig { compress: true, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(OutputFormat::from_path(Path::new("out.JSON")), OutputFormat::Json);
        assert_eq!(OutputFormat::from_path(Path::new("out.bin")), OutputFormat::Bincode);
    }
}
