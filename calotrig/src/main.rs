use std::path::{Path, PathBuf};
use std::process::ExitCode;

use calotrig::config::OutputFormat;
use calotrig::data::frames::FrameFile;
use calotrig::sim::synthetic::SyntheticFrameBuilder;
use calotrig::{ClusterMakerError, TriggerClusterMaker, TriggerClusterMakerConfig};
use clap::{ArgAction, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Calorimeter trigger cluster maker", long_about = None)]
struct Cli {
    /// Log more (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate synthetic event frames
    Simulate {
        /// Number of events
        #[arg(short = 'n', long, default_value_t = 10)]
        n_events: usize,
        #[arg(long, default_value_t = 1)]
        seed: u64,
        /// Fraction of trigger sums present per primitive
        #[arg(long, default_value_t = 0.05)]
        occupancy: f64,
        /// Frame file to write (.json or bincode)
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Build trigger clusters for every frame of a frame file
    Run {
        #[arg(short, long)]
        input: PathBuf,
        /// JSON config, defaults are used for anything it leaves out
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Cluster output file, overrides the config
        #[arg(long)]
        out_file: Option<String>,
        #[arg(long)]
        threads: Option<usize>,
        #[arg(long)]
        max_events: Option<usize>,
    },
}

impl Cli {
    fn config(&self) -> Result<TriggerClusterMakerConfig, ClusterMakerError> {
        let Commands::Run { config, out_file, threads, .. } = &self.command else {
            return Ok(TriggerClusterMakerConfig::default());
        };

        let mut config = match config {
            Some(path) => TriggerClusterMakerConfig::from_json_file(path)?,
            None => TriggerClusterMakerConfig::default(),
        };
        if let Some(out_file) = out_file {
            config.out_format = OutputFormat::from_path(Path::new(out_file));
            config.compress = config.out_format == OutputFormat::Bincode;
            config.out_file_name = out_file.clone();
        }
        if let Some(threads) = threads {
            config.num_threads = *threads;
        }
        config.validate()?;
        Ok(config)
    }

    fn run(&self, config: TriggerClusterMakerConfig) -> Result<(), ClusterMakerError> {
        match &self.command {
            Commands::Simulate { n_events, seed, occupancy, output } => {
                let frames = SyntheticFrameBuilder::new(*seed).occupancy(*occupancy).frames(*n_events);
                FrameFile::new(frames).save(output)?;
                info!("wrote {} synthetic frames to {}", n_events, output.display());
            }
            Commands::Run { input, max_events, .. } => {
                let frames = FrameFile::load(input)?;
                info!("loaded {} frames from {}", frames.len(), input.display());

                let mut maker = TriggerClusterMaker::new(config)?;
                maker.init()?;
                let n_events = max_events.unwrap_or(frames.len());
                for mut frame in frames.frames.into_iter().take(n_events) {
                    maker.process_event(&mut frame)?;
                }
                let summary = maker.end()?;
                info!("{}", summary);
            }
        }
        Ok(())
    }
}

fn init_tracing(verbose: u8, debug: bool) {
    let level = match verbose {
        0 if debug => "debug",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = cli.config();
    init_tracing(cli.verbose, config.as_ref().map(|c| c.debug).unwrap_or(false));

    match config.and_then(|config| cli.run(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
