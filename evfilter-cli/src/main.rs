//! evfilter command-line interface.
//!
//! Runs the group trigger scan over cluster tables and the same-event pair
//! analysis over particle tables.
#![allow(
    clippy::uninlined_format_args,
    clippy::cast_precision_loss,
    clippy::too_many_lines
)]

use clap::{Parser, Subcommand, ValueEnum};

use evfilter_algorithms::{
    filter_batches, pair_events, record_decision, register_pair_histograms, register_summary,
    HistogramRegistry, TriggerSummary, PAIR_HISTOGRAM,
};
use evfilter_core::{MassTable, PairCombinationPolicy, PairMetric};
use evfilter_io::{
    parse_clusters, parse_particles, read_clusters, read_particles, write_histograms_csv,
    AnalysisConfig, DecisionFormat, DecisionWriter, MappedFileReader, PairMetricWriter,
};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    EvfilterIo(#[from] evfilter_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] evfilter_core::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] evfilter_core::ConfigError),
}

/// Pair combination policy selection.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Policy {
    /// Unordered pairs within one partition
    #[value(name = "self")]
    SelfPairs,
    /// Every element of the first partition with every element of the second
    Cross,
}

impl From<Policy> for PairCombinationPolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::SelfPairs => PairCombinationPolicy::SelfPairs,
            Policy::Cross => PairCombinationPolicy::CrossPairs,
        }
    }
}

/// Pair metric selection.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Metric {
    /// Invariant mass of the pair
    Mass,
    /// Relative momentum k* in the pair rest frame
    Kstar,
}

impl From<Metric> for PairMetric {
    fn from(metric: Metric) -> Self {
        match metric {
            Metric::Mass => PairMetric::InvariantMass,
            Metric::Kstar => PairMetric::RelativeMomentum,
        }
    }
}

/// Decision output encoding.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    /// Pick from the output extension (`.csv`, otherwise binary)
    Auto,
    /// Comma-separated text
    Csv,
    /// Little-endian key and flag mask records
    Bin,
}

/// Group trigger and pair analysis over collision-sorted record tables.
#[derive(Parser)]
#[command(name = "evfilter")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Emit one trigger decision per collision from cluster tables
    Filter {
        /// Input cluster CSV file(s); each file is scanned independently
        #[arg(required = true)]
        input: Vec<PathBuf>,

        /// Output file for the decisions
        #[arg(short, long)]
        output: PathBuf,

        /// Decision output format
        #[arg(long, value_enum, default_value = "auto")]
        format: Format,

        /// JSON analysis configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Photon trigger energy threshold (GeV)
        #[arg(long)]
        photon_energy: Option<f64>,

        /// Electron trigger energy threshold (GeV)
        #[arg(long)]
        electron_energy: Option<f64>,

        /// Pair trigger invariant mass threshold (GeV)
        #[arg(long)]
        pair_mass: Option<f64>,

        /// Detector subtype to scan
        #[arg(long)]
        detector_type: Option<u8>,

        /// Fail when a collision reappears after its group was closed
        #[arg(long)]
        validate_ordering: bool,

        /// Write the summary histogram as CSV
        #[arg(long)]
        summary: Option<PathBuf>,
    },

    /// Fill same-event pair histograms from particle tables
    Pairs {
        /// Input particle CSV file
        input: PathBuf,

        /// Output histogram CSV file
        #[arg(short, long)]
        output: PathBuf,

        /// JSON analysis configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Pair combination policy
        #[arg(long, value_enum)]
        policy: Option<Policy>,

        /// Pair metric
        #[arg(long, value_enum)]
        metric: Option<Metric>,

        /// Also write every pair value as CSV
        #[arg(long)]
        values: Option<PathBuf>,

        /// Fail when a collision reappears after its group was closed
        #[arg(long)]
        validate_ordering: bool,
    },

    /// Show information about a cluster or particle table
    Info {
        /// Input CSV file
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Filter {
            input,
            output,
            format,
            config,
            photon_energy,
            electron_energy,
            pair_mass,
            detector_type,
            validate_ordering,
            summary,
        } => {
            let mut trigger = load_config(config.as_deref())?.trigger;
            if let Some(value) = photon_energy {
                trigger = trigger.with_photon_energy(value);
            }
            if let Some(value) = electron_energy {
                trigger = trigger.with_electron_energy(value);
            }
            if let Some(value) = pair_mass {
                trigger = trigger.with_pair_mass(value);
            }
            if let Some(value) = detector_type {
                trigger = trigger.with_detector_type(value);
            }
            if validate_ordering {
                trigger = trigger.with_validate_ordering(true);
            }
            trigger.validate()?;
            debug!(?trigger, "trigger configuration");

            let start = Instant::now();
            let batches = input
                .iter()
                .map(|path| {
                    info!(path = %path.display(), "reading clusters");
                    read_clusters(path)
                })
                .collect::<std::result::Result<Vec<_>, _>>()?;
            let outputs = filter_batches(&batches, &trigger)?;

            let mut writer = DecisionWriter::create(&output, decision_format(format, &output))?;
            let mut totals = TriggerSummary::new();
            let mut registry = HistogramRegistry::new();
            register_summary(&mut registry)?;

            for (path, batch) in input.iter().zip(&outputs) {
                let stats = &batch.statistics;
                info!(
                    path = %path.display(),
                    groups = stats.groups,
                    records = stats.records_scanned,
                    "scanned"
                );
                if stats.malformed_records > 0 || stats.bc_mismatches > 0 {
                    warn!(
                        path = %path.display(),
                        malformed = stats.malformed_records,
                        bc_mismatches = stats.bc_mismatches,
                        "input contained suspicious records"
                    );
                }
                for decision in &batch.decisions {
                    writer.write(decision)?;
                    totals.record(decision);
                    record_decision(decision, &mut registry);
                }
            }
            let written = writer.finish()?;

            if let Some(path) = &summary {
                write_histograms_csv(path, &registry)?;
                info!(path = %path.display(), "wrote summary histogram");
            }

            println!(
                "Processed {} files in {:.2}s",
                input.len(),
                start.elapsed().as_secs_f64()
            );
            println!("Decisions written: {}", written);
            for (label, count) in totals.iter() {
                println!("  {:<12} {}", label, count);
            }
        }

        Commands::Pairs {
            input,
            output,
            config,
            policy,
            metric,
            values,
            validate_ordering,
        } => {
            let mut pair = load_config(config.as_deref())?.pair;
            if let Some(policy) = policy {
                pair = pair.with_policy(policy.into());
            }
            if let Some(metric) = metric {
                pair = pair.with_metric(metric.into());
            }
            if validate_ordering {
                pair = pair.with_validate_ordering(true);
            }
            debug!(?pair, "pair configuration");

            let start = Instant::now();
            let particles = read_particles(&input)?;
            let masses = MassTable::new();
            let mut registry = HistogramRegistry::new();
            register_pair_histograms(&mut registry)?;

            let mut value_writer = values
                .as_ref()
                .map(|path| PairMetricWriter::create(path, pair.metric.name()))
                .transpose()?;
            let mut write_error = None;
            let stats = pair_events(particles, &pair, &masses, &mut registry, |value| {
                if let Some(writer) = value_writer.as_mut() {
                    if let Err(err) = writer.write(&value) {
                        write_error.get_or_insert(err);
                    }
                }
            })?;
            if let Some(err) = write_error {
                return Err(err.into());
            }
            if let Some(writer) = value_writer {
                writer.finish()?;
            }
            write_histograms_csv(&output, &registry)?;

            println!(
                "Processed {} particles in {:.2}s",
                stats.particles,
                start.elapsed().as_secs_f64()
            );
            println!(
                "Collisions: {} ({} outside vertex window)",
                stats.groups, stats.vertex_rejected
            );
            println!(
                "Selected: {} / {} (malformed {})",
                stats.first_partition, stats.second_partition, stats.malformed
            );
            println!("Pairs ({}): {}", pair.metric.name(), stats.pairs);
            if let Some(histogram) = registry.get(PAIR_HISTOGRAM) {
                println!(
                    "{}: {} entries ({} overflow)",
                    PAIR_HISTOGRAM,
                    histogram.entries(),
                    histogram.overflow()
                );
            }
        }

        Commands::Info { input } => {
            let reader = MappedFileReader::open(&input)?;
            println!("File: {}", input.display());
            println!(
                "Size: {} bytes ({:.2} MB)",
                reader.len(),
                reader.len() as f64 / 1_000_000.0
            );

            let keys: Vec<i64> = match parse_clusters(reader.as_bytes()) {
                Ok(clusters) => {
                    println!("Table: clusters");
                    clusters.iter().map(|c| c.key.as_i64()).collect()
                }
                Err(evfilter_io::Error::InvalidFormat(_)) => {
                    let particles = parse_particles(reader.as_bytes())?;
                    println!("Table: particles");
                    particles.iter().map(|p| p.key.as_i64()).collect()
                }
                Err(err) => return Err(err.into()),
            };
            println!("Records: {}", keys.len());
            println!("Groups: {}", count_runs(&keys));
            if let (Some(min), Some(max)) = (keys.iter().min(), keys.iter().max()) {
                println!("Key range: {} - {}", min, max);
            }
            let sorted = keys.windows(2).all(|w| w[0] <= w[1]);
            println!("Sorted by key: {}", if sorted { "yes" } else { "no" });
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    match path {
        Some(path) => {
            info!(path = %path.display(), "loading configuration");
            Ok(AnalysisConfig::from_file(path)?)
        }
        None => Ok(AnalysisConfig::default()),
    }
}

fn decision_format(format: Format, output: &Path) -> DecisionFormat {
    match format {
        Format::Csv => DecisionFormat::Csv,
        Format::Bin => DecisionFormat::Binary,
        Format::Auto => {
            let is_csv = output
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
            if is_csv {
                DecisionFormat::Csv
            } else {
                DecisionFormat::Binary
            }
        }
    }
}

/// Number of maximal runs of equal adjacent keys.
fn count_runs(keys: &[i64]) -> usize {
    match keys.first() {
        Some(_) => 1 + keys.windows(2).filter(|w| w[0] != w[1]).count(),
        None => 0,
    }
}
