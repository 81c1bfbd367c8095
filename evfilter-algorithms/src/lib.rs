//! evfilter-algorithms: Single-pass trigger scanning and pair enumeration.
//!
//! This crate provides the streaming engine:
//! - **Grouping** - detects collision boundaries in a sorted record stream
//! - **Trigger scan** - folds per-record predicates into per-group flags
//! - **Pairs** - self and cross combinations with pair metrics
//! - **Femto** - same-event pair analysis over particle partitions
//! - **Summary** - declarative trigger statistics for histogram sinks
//!
#![warn(missing_docs)]

mod accumulator;
mod femto;
mod grouping;
pub mod histogram;
mod pairs;
mod processing;
mod summary;
mod trigger;

pub use accumulator::GroupAccumulator;
pub use femto::{
    register_pair_histograms, PairingStatistics, SameEventPairing, PAIR_HISTOGRAM, VERTEX_HISTOGRAM,
};
pub use grouping::{Boundary, GroupBoundaryDetector};
pub use histogram::{Histogram1D, HistogramRegistry, HistogramSink};
pub use pairs::{combinations, Combinations, PairEngine};
pub use processing::{filter_batches, filter_events, pair_events, BatchOutput};
pub use summary::{
    record_decision, register_summary, SummaryBin, TriggerSummary, EVENTS_HISTOGRAM, SUMMARY_BINS,
};
pub use trigger::{
    antineutron_candidate, electron_candidate, photon_candidate, ScanStatistics, TriggerScanner,
    TriggerStream,
};

// Re-export core types used in signatures
pub use evfilter_core::{PairCombinationPolicy, PairMetric, TriggerConfig};
