use std::fmt;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::cluster::cluster::Diagnostics;
use crate::cluster::io::ClusterWriter;
use crate::cluster::pipeline::Pipeline;
use crate::config::TriggerClusterMakerConfig;
use crate::data::registry::NodeRegistry;
use crate::error::ClusterMakerError;

/// What a run produced, reported by [`TriggerClusterMaker::end`].
#[derive(Clone, Debug, Default)]
pub struct RunSummary {
    pub n_events: usize,
    pub n_clusters: usize,
    pub diagnostics: Diagnostics,
    pub output: Option<PathBuf>,
}

impl Display for RunSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} events, {} clusters ({})", self.n_events, self.n_clusters, self.diagnostics.summary())?;
        if let Some(path) = &self.output {
            write!(f, ", written to {}", path.display())?;
        }
        Ok(())
    }
}

/// Event-loop module building trigger clusters frame by frame.
///
/// Call [`init`](Self::init) once, [`process_event`](Self::process_event) for
/// every frame and [`end`](Self::end) to flush the output file.
pub struct TriggerClusterMaker {
    config: TriggerClusterMakerConfig,
    writer: Option<ClusterWriter>,
    totals: Diagnostics,
    n_events: usize,
    n_clusters: usize,
}

impl TriggerClusterMaker {
    pub fn new(config: TriggerClusterMakerConfig) -> Result<Self, ClusterMakerError> {
        config.validate()?;
        Ok(TriggerClusterMaker { config, writer: None, totals: Diagnostics::default(), n_events: 0, n_clusters: 0 })
    }

    pub fn config(&self) -> &TriggerClusterMakerConfig {
        &self.config
    }

    /// Opens the output stream when file output is enabled.
    ///
    /// Nothing appears at the output path until [`end`](Self::end) succeeds;
    /// dropping the maker earlier discards what was streamed.
    pub fn init(&mut self) -> Result<(), ClusterMakerError> {
        if self.config.debug {
            debug!("initializing trigger cluster maker");
        }
        if self.config.save_to_file {
            let path = Path::new(&self.config.out_file_name);
            self.writer = Some(ClusterWriter::create(path, self.config.out_format, self.config.compress)?);
        }
        Ok(())
    }

    /// Grabs the configured inputs from `registry` and builds its clusters.
    ///
    /// A missing input node fails the event before anything is built or
    /// written. Returns the diagnostics of this event.
    pub fn process_event(&mut self, registry: &mut NodeRegistry) -> Result<Diagnostics, ClusterMakerError> {
        if self.config.debug {
            debug!("processing event {}", registry.event);
        }

        if self.config.save_to_file && self.writer.is_none() {
            return Err(ClusterMakerError::Config("output file not open, init was not called".to_string()));
        }

        let collection = Pipeline::from_registry(registry, &self.config)?.run()?;
        let diagnostics = collection.diagnostics.clone();

        if let Some(writer) = self.writer.as_mut() {
            writer.push(registry.event, &collection)?;
        }

        self.totals.merge(&diagnostics);
        self.n_events += 1;
        self.n_clusters += collection.len();
        if self.config.save_to_node {
            registry.put_clusters(&self.config.out_node_name, collection);
        }

        if self.config.debug {
            debug!("event {}: {}", registry.event, diagnostics.summary());
        }
        Ok(diagnostics)
    }

    /// Closes the output file and reports the totals of the run.
    pub fn end(self) -> Result<RunSummary, ClusterMakerError> {
        let output = match self.writer {
            Some(writer) => {
                let path = writer.path().to_path_buf();
                writer.finish()?;
                Some(path)
            }
            None => None,
        };

        let summary = RunSummary { n_events: self.n_events, n_clusters: self.n_clusters, diagnostics: self.totals, output };
        info!("trigger cluster maker done: {}", summary);
        Ok(summary)
    }
}
