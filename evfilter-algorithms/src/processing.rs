//! High-level drivers over whole streams and independent batches.

use crate::femto::{PairingStatistics, SameEventPairing};
use crate::histogram::HistogramSink;
use crate::trigger::{ScanStatistics, TriggerScanner};
use evfilter_core::{
    ClusterRecord, MassLookup, PairConfig, PairMetricValue, ParticleRecord, Result,
    TriggerConfig, TriggerDecision,
};
use rayon::prelude::*;

/// Decisions and counters of one independently scanned batch.
#[derive(Debug, Clone, Default)]
pub struct BatchOutput {
    /// Decisions in group first-seen order.
    pub decisions: Vec<TriggerDecision>,
    /// Scan counters.
    pub statistics: ScanStatistics,
}

/// Scans a sorted cluster stream, calling `on_decision` once per group.
///
/// # Errors
/// Fails on non-finite thresholds or, with ordering validation, on a group
/// key that reappears after its group was closed.
pub fn filter_events<I, F>(
    records: I,
    config: &TriggerConfig,
    mut on_decision: F,
) -> Result<ScanStatistics>
where
    I: IntoIterator<Item = ClusterRecord>,
    F: FnMut(TriggerDecision),
{
    config.validate()?;
    let mut scanner = TriggerScanner::new(config.clone());
    for record in records {
        if let Some(decision) = scanner.push(&record)? {
            on_decision(decision);
        }
    }
    if let Some(decision) = scanner.finish() {
        on_decision(decision);
    }
    Ok(scanner.statistics())
}

/// Scans independent batches in parallel, one scanner per batch.
///
/// Batches share no state; outputs are returned in batch order.
///
/// # Errors
/// Returns the first error of any batch.
pub fn filter_batches(
    batches: &[Vec<ClusterRecord>],
    config: &TriggerConfig,
) -> Result<Vec<BatchOutput>> {
    batches
        .par_iter()
        .map(|batch| -> Result<BatchOutput> {
            let mut decisions = Vec::new();
            let statistics =
                filter_events(batch.iter().copied(), config, |decision| decisions.push(decision))?;
            Ok(BatchOutput {
                decisions,
                statistics,
            })
        })
        .collect()
}

/// Runs the same-event pair analysis over a sorted particle stream.
///
/// # Errors
/// Fails on invalid configuration, an unknown PDG code, or (when validated)
/// a reappearing group key.
pub fn pair_events<I, L, F>(
    records: I,
    config: &PairConfig,
    masses: &L,
    sink: &mut dyn HistogramSink,
    mut on_pair: F,
) -> Result<PairingStatistics>
where
    I: IntoIterator<Item = ParticleRecord>,
    L: MassLookup + ?Sized,
    F: FnMut(PairMetricValue),
{
    let mut pairing = SameEventPairing::new(config.clone(), masses)?;
    for record in records {
        pairing.push(record, sink, &mut on_pair)?;
    }
    pairing.finish(sink, &mut on_pair)?;
    Ok(pairing.statistics())
}
