use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::cluster::{Cluster, ClusterCollection, Diagnostics};
use crate::config::OutputFormat;
use crate::error::ClusterMakerError;

const ZSTD_MAGIC: [u8; 4] = [0x28, 0xb5, 0x2f, 0xfd];

/// Clusters of one event as stored on disk.
#[derive(Clone, Debug, Serialize, Deserialize, Encode, Decode)]
pub struct EventClusters {
    pub event: u64,
    pub diagnostics: Diagnostics,
    pub clusters: Vec<Cluster>,
}

impl EventClusters {
    pub fn new(event: u64, collection: &ClusterCollection) -> Self {
        EventClusters {
            event,
            diagnostics: collection.diagnostics.clone(),
            clusters: collection.clusters().to_vec(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Encode, Decode)]
pub struct ClusterFile {
    pub version: u32,
    pub events: Vec<EventClusters>,
}

impl ClusterFile {
    pub fn new(events: Vec<EventClusters>) -> Self {
        Self { version: CLUSTER_FILE_VERSION, events }
    }

    pub fn n_clusters(&self) -> usize {
        self.events.iter().map(|e| e.clusters.len()).sum()
    }
}

const CLUSTER_FILE_VERSION: u32 = 1;

// --- JSON (human-readable) ---
pub fn save_json(path: &Path, file: &ClusterFile) -> Result<(), ClusterMakerError> {
    let mut w = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut w, file)?;
    w.flush()?;
    Ok(())
}

pub fn load_json(path: &Path) -> Result<ClusterFile, ClusterMakerError> {
    let f = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(f)?)
}

// --- Bincode + optional zstd compression ---
//
// Layout: version, then one `true` + event record per event, then `false`.
fn write_bincode_header<W: Write>(w: &mut W, version: u32) -> Result<(), ClusterMakerError> {
    bincode::encode_into_std_write(version, w, bincode::config::standard())?;
    Ok(())
}

fn write_bincode_event<W: Write>(w: &mut W, event: &EventClusters) -> Result<(), ClusterMakerError> {
    let config = bincode::config::standard();
    bincode::encode_into_std_write(true, w, config)?;
    bincode::encode_into_std_write(event, w, config)?;
    Ok(())
}

fn write_bincode_end<W: Write>(w: &mut W) -> Result<(), ClusterMakerError> {
    bincode::encode_into_std_write(false, w, bincode::config::standard())?;
    Ok(())
}

fn write_bincode<W: Write>(w: &mut W, file: &ClusterFile) -> Result<(), ClusterMakerError> {
    write_bincode_header(w, file.version)?;
    for event in &file.events {
        write_bincode_event(w, event)?;
    }
    write_bincode_end(w)
}

fn read_bincode<R: Read>(r: &mut R) -> Result<ClusterFile, ClusterMakerError> {
    let config = bincode::config::standard();
    let version: u32 = bincode::decode_from_std_read(r, config)?;
    let mut events = Vec::new();
    loop {
        let more: bool = bincode::decode_from_std_read(r, config)?;
        if !more {
            break;
        }
        events.push(bincode::decode_from_std_read(r, config)?);
    }
    Ok(ClusterFile { version, events })
}

pub fn save_bincode(path: &Path, file: &ClusterFile, compress: bool) -> Result<(), ClusterMakerError> {
    let w = BufWriter::new(File::create(path)?);
    if compress {
        let mut zw = zstd::Encoder::new(w, 3)?;
        write_bincode(&mut zw, file)?;
        zw.finish()?.flush()?;
    } else {
        let mut w = w;
        write_bincode(&mut w, file)?;
        w.flush()?;
    }
    Ok(())
}

/// Loads a bincode cluster file, zstd-compressed or not.
pub fn load_bincode(path: &Path) -> Result<ClusterFile, ClusterMakerError> {
    let mut f = File::open(path)?;
    if is_zstd(&mut f)? {
        read_bincode(&mut zstd::Decoder::new(f)?)
    } else {
        read_bincode(&mut BufReader::new(f))
    }
}

/// Peeks at the frame magic and rewinds.
pub(crate) fn is_zstd(f: &mut File) -> std::io::Result<bool> {
    let mut magic = [0u8; 4];
    let n = f.read(&mut magic)?;
    f.seek(SeekFrom::Start(0))?;
    Ok(n == magic.len() && magic == ZSTD_MAGIC)
}

pub fn load(path: &Path) -> Result<ClusterFile, ClusterMakerError> {
    match OutputFormat::from_path(path) {
        OutputFormat::Json => load_json(path),
        OutputFormat::Bincode => load_bincode(path),
    }
}

/// Open output stream of a [`ClusterWriter`].
enum Sink {
    Json { w: BufWriter<File>, first: bool },
    Bincode(BufWriter<File>),
    Zstd(zstd::Encoder<'static, BufWriter<File>>),
}

impl Sink {
    fn open(file: File, format: OutputFormat, compress: bool) -> Result<Self, ClusterMakerError> {
        let mut w = BufWriter::new(file);
        let sink = match format {
            OutputFormat::Json => {
                write!(w, "{{\"version\":{},\"events\":[", CLUSTER_FILE_VERSION)?;
                Sink::Json { w, first: true }
            }
            OutputFormat::Bincode if compress => {
                let mut zw = zstd::Encoder::new(w, 3)?;
                write_bincode_header(&mut zw, CLUSTER_FILE_VERSION)?;
                Sink::Zstd(zw)
            }
            OutputFormat::Bincode => {
                write_bincode_header(&mut w, CLUSTER_FILE_VERSION)?;
                Sink::Bincode(w)
            }
        };
        Ok(sink)
    }

    fn write_event(&mut self, event: &EventClusters) -> Result<(), ClusterMakerError> {
        match self {
            Sink::Json { w, first } => {
                if !*first {
                    w.write_all(b",")?;
                }
                *first = false;
                serde_json::to_writer(&mut *w, event)?;
            }
            Sink::Bincode(w) => write_bincode_event(w, event)?,
            Sink::Zstd(zw) => write_bincode_event(zw, event)?,
        }
        Ok(())
    }

    fn close(self) -> Result<(), ClusterMakerError> {
        match self {
            Sink::Json { mut w, .. } => {
                w.write_all(b"]}")?;
                w.flush()?;
            }
            Sink::Bincode(mut w) => {
                write_bincode_end(&mut w)?;
                w.flush()?;
            }
            Sink::Zstd(mut zw) => {
                write_bincode_end(&mut zw)?;
                zw.finish()?.flush()?;
            }
        }
        Ok(())
    }
}

/// Streams per-event clusters to disk as they are produced.
///
/// Events go to `<path>.partial`, which only replaces `path` once
/// [`finish`](Self::finish) succeeds. A writer dropped before that removes
/// the partial file, so an aborted run never leaves output behind.
pub struct ClusterWriter {
    path: PathBuf,
    partial: PathBuf,
    sink: Option<Sink>,
    n_events: usize,
    finished: bool,
}

impl ClusterWriter {
    pub fn create(path: &Path, format: OutputFormat, compress: bool) -> Result<Self, ClusterMakerError> {
        let mut partial = path.as_os_str().to_owned();
        partial.push(".partial");
        let partial = PathBuf::from(partial);

        let sink = Sink::open(File::create(&partial)?, format, compress)?;
        debug!("writing clusters to {}", partial.display());
        Ok(ClusterWriter { path: path.to_path_buf(), partial, sink: Some(sink), n_events: 0, finished: false })
    }

    /// Appends the clusters of one event.
    pub fn push(&mut self, event: u64, collection: &ClusterCollection) -> Result<(), ClusterMakerError> {
        let sink = self
            .sink
            .as_mut()
            .ok_or_else(|| ClusterMakerError::Config("cluster writer already closed".to_string()))?;
        sink.write_event(&EventClusters::new(event, collection))?;
        self.n_events += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Closes the stream and moves it to its final path. Returns the number
    /// of events written.
    pub fn finish(mut self) -> Result<usize, ClusterMakerError> {
        if let Some(sink) = self.sink.take() {
            sink.close()?;
        }
        std::fs::rename(&self.partial, &self.path)?;
        self.finished = true;
        debug!("wrote {} events to {}", self.n_events, self.path.display());
        Ok(self.n_events)
    }
}

impl Drop for ClusterWriter {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        drop(self.sink.take());
        if std::fs::remove_file(&self.partial).is_ok() {
            warn!("discarded unfinished cluster output {}", self.partial.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calocore::{DetectorId, TowerKey, TowerSample, TriggerId, TriggerPrimitiveKey};
    use crate::cluster::cluster::ClusterTower;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("calotrig-{}-{}", std::process::id(), name))
    }

    fn collection() -> ClusterCollection {
        let primitive = TriggerPrimitiveKey::compose(TriggerId::Jet, DetectorId::EMCal, 2, 3);
        let mut cluster = Cluster::new(primitive, primitive.sum_key(1, 1), DetectorId::EMCal, 9, 13, 42);
        cluster.add_tower(ClusterTower::new(TowerKey(0x0012_001a), 18, 26, &TowerSample::new(1.5, 3.0)));
        let mut collection = ClusterCollection::new();
        collection.extend(vec![cluster]);
        collection.diagnostics.sums_seen = 1;
        collection.diagnostics.clusters_built = 1;
        collection
    }

    fn check(file: &ClusterFile) {
        assert_eq!(file.version, 1);
        assert_eq!(file.events.len(), 2);
        assert_eq!(file.events[1].event, 8);
        assert_eq!(file.n_clusters(), 2);
        let c = &file.events[0].clusters[0];
        assert_eq!((c.eta_bin, c.phi_bin, c.peak_sum), (9, 13, 42));
        assert_eq!(c.towers[0].energy, 1.5);
        assert_eq!(file.events[0].diagnostics.sums_seen, 1);
    }

    fn partial_of(path: &Path) -> PathBuf {
        let mut partial = path.as_os_str().to_owned();
        partial.push(".partial");
        PathBuf::from(partial)
    }

    #[test]
    fn test_writer_json() {
        let path = temp_path("clusters.json");
        let mut writer = ClusterWriter::create(&path, OutputFormat::Json, false).unwrap();
        writer.push(7, &collection()).unwrap();
        writer.push(8, &collection()).unwrap();
        assert!(!path.exists());
        assert_eq!(writer.finish().unwrap(), 2);
        check(&load(&path).unwrap());
        assert!(!partial_of(&path).exists());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_writer_bincode_compressed() {
        let path = temp_path("clusters.bin.zst");
        let mut writer = ClusterWriter::create(&path, OutputFormat::Bincode, true).unwrap();
        writer.push(7, &collection()).unwrap();
        writer.push(8, &collection()).unwrap();
        writer.finish().unwrap();
        check(&load_bincode(&path).unwrap());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_writer_plain_bincode_matches_save() {
        let streamed = temp_path("streamed.bin");
        let mut writer = ClusterWriter::create(&streamed, OutputFormat::Bincode, false).unwrap();
        writer.push(7, &collection()).unwrap();
        writer.push(8, &collection()).unwrap();
        writer.finish().unwrap();

        let saved = temp_path("saved.bin");
        let file = ClusterFile::new(vec![EventClusters::new(7, &collection()), EventClusters::new(8, &collection())]);
        save_bincode(&saved, &file, false).unwrap();

        check(&load(&streamed).unwrap());
        check(&load(&saved).unwrap());
        assert_eq!(std::fs::read(&streamed).unwrap(), std::fs::read(&saved).unwrap());
        std::fs::remove_file(&streamed).ok();
        std::fs::remove_file(&saved).ok();
    }

    #[test]
    fn test_empty_run_is_loadable() {
        let path = temp_path("empty.json");
        ClusterWriter::create(&path, OutputFormat::Json, false).unwrap().finish().unwrap();
        let file = load(&path).unwrap();
        assert_eq!(file.version, 1);
        assert!(file.events.is_empty());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_dropped_writer_leaves_nothing() {
        let path = temp_path("aborted.bin");
        std::fs::write(&path, b"previous run").unwrap();

        let mut writer = ClusterWriter::create(&path, OutputFormat::Bincode, true).unwrap();
        writer.push(1, &collection()).unwrap();
        assert!(partial_of(&path).exists());
        drop(writer);

        assert!(!partial_of(&path).exists());
        assert_eq!(std::fs::read(&path).unwrap(), b"previous run");
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_bad_output_path_fails_early() {
        let path = temp_path("no-such-dir").join("clusters.json");
        assert!(matches!(
            ClusterWriter::create(&path, OutputFormat::Json, false),
            Err(ClusterMakerError::Io(_))
        ));
    }
}
