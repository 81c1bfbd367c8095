//! evfilter-io: file I/O for evfilter.
//!
//! Reads cluster and particle tables from memory-mapped CSV files, writes
//! trigger decisions, pair metrics and histograms, and loads the JSON
//! analysis configuration.
//!

mod config;
mod error;
mod reader;
mod writer;

pub use config::AnalysisConfig;
pub use error::{Error, Result};
pub use reader::{
    parse_clusters, parse_particles, read_clusters, read_particles, MappedFileReader,
};
pub use writer::{write_histograms_csv, DecisionFormat, DecisionWriter, PairMetricWriter};
