//! Trigger summary statistics.
//!
//! Each summary bin is filled once per decision whose flags contain all of
//! the bin's required triggers. Bin 0 requires nothing and counts groups.

use crate::histogram::{HistogramRegistry, HistogramSink};
use evfilter_core::{ConfigError, TriggerDecision, TriggerFlags, TriggerKind};

/// Histogram label the summary is filled under.
pub const EVENTS_HISTOGRAM: &str = "events";

/// One entry of the summary table.
#[derive(Debug, Clone, Copy)]
pub struct SummaryBin {
    /// Value filled into the events histogram.
    pub bin: u8,
    /// Human-readable name.
    pub label: &'static str,
    /// Triggers that must all have fired.
    pub requires: &'static [TriggerKind],
}

impl SummaryBin {
    /// Returns true if `decision` counts towards this bin.
    #[must_use]
    pub fn matches(&self, decision: &TriggerDecision) -> bool {
        decision
            .flags
            .contains(TriggerFlags::from_kinds(self.requires))
    }
}

/// Summary bins, in histogram order.
pub const SUMMARY_BINS: [SummaryBin; 7] = [
    SummaryBin {
        bin: 0,
        label: "all",
        requires: &[],
    },
    SummaryBin {
        bin: 1,
        label: "photon",
        requires: &[TriggerKind::Photon],
    },
    SummaryBin {
        bin: 2,
        label: "photon+electron",
        requires: &[TriggerKind::Photon, TriggerKind::Electron],
    },
    SummaryBin {
        bin: 3,
        label: "photon+pair",
        requires: &[TriggerKind::Photon, TriggerKind::Pair],
    },
    SummaryBin {
        bin: 4,
        label: "electron",
        requires: &[TriggerKind::Electron],
    },
    SummaryBin {
        bin: 5,
        label: "pair",
        requires: &[TriggerKind::Pair],
    },
    SummaryBin {
        bin: 6,
        label: "antineutron",
        requires: &[TriggerKind::Antineutron],
    },
];

/// Registers the events histogram (10 bins over `[0, 10)`).
///
/// # Errors
/// Never fails for the built-in binning; the `Result` mirrors
/// [`HistogramRegistry::add`].
pub fn register_summary(registry: &mut HistogramRegistry) -> Result<(), ConfigError> {
    registry.add(EVENTS_HISTOGRAM, 10, 0.0, 10.0)
}

/// Fills every summary bin matched by `decision` into `sink`.
pub fn record_decision<S: HistogramSink + ?Sized>(decision: &TriggerDecision, sink: &mut S) {
    for entry in SUMMARY_BINS.iter().filter(|entry| entry.matches(decision)) {
        sink.fill(EVENTS_HISTOGRAM, f64::from(entry.bin));
    }
}

/// In-memory counters for the summary bins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TriggerSummary {
    counts: [u64; SUMMARY_BINS.len()],
}

impl TriggerSummary {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one decision.
    pub fn record(&mut self, decision: &TriggerDecision) {
        for (count, entry) in self.counts.iter_mut().zip(SUMMARY_BINS.iter()) {
            if entry.matches(decision) {
                *count += 1;
            }
        }
    }

    /// Adds another summary's counts.
    pub fn merge(&mut self, other: &TriggerSummary) {
        for (count, add) in self.counts.iter_mut().zip(other.counts) {
            *count += add;
        }
    }

    /// Count for the bin with the given label.
    #[must_use]
    pub fn count(&self, label: &str) -> Option<u64> {
        SUMMARY_BINS
            .iter()
            .position(|entry| entry.label == label)
            .map(|idx| self.counts[idx])
    }

    /// Iterates over `(label, count)` in bin order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        SUMMARY_BINS
            .iter()
            .zip(self.counts.iter())
            .map(|(entry, count)| (entry.label, *count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evfilter_core::GroupKey;

    fn decision(kinds: &[TriggerKind]) -> TriggerDecision {
        TriggerDecision::new(GroupKey(1), TriggerFlags::from_kinds(kinds))
    }

    #[test]
    fn test_photon_and_pair_bins() {
        let mut summary = TriggerSummary::new();
        summary.record(&decision(&[TriggerKind::Photon, TriggerKind::Pair]));
        summary.record(&decision(&[]));
        assert_eq!(summary.count("all"), Some(2));
        assert_eq!(summary.count("photon"), Some(1));
        assert_eq!(summary.count("photon+pair"), Some(1));
        assert_eq!(summary.count("pair"), Some(1));
        assert_eq!(summary.count("photon+electron"), Some(0));
        assert_eq!(summary.count("electron"), Some(0));
        assert_eq!(summary.count("missing"), None);
    }

    #[test]
    fn test_record_decision_fills_events_histogram() {
        let mut registry = HistogramRegistry::new();
        register_summary(&mut registry).unwrap();
        record_decision(
            &decision(&[TriggerKind::Electron, TriggerKind::Antineutron]),
            &mut registry,
        );
        let events = registry.get(EVENTS_HISTOGRAM).unwrap();
        assert_eq!(events.counts()[0], 1);
        assert_eq!(events.counts()[1], 0);
        assert_eq!(events.counts()[4], 1);
        assert_eq!(events.counts()[6], 1);
        assert_eq!(events.entries(), 3);
    }

    #[test]
    fn test_merge() {
        let mut a = TriggerSummary::new();
        let mut b = TriggerSummary::new();
        a.record(&decision(&[TriggerKind::Photon]));
        b.record(&decision(&[TriggerKind::Photon, TriggerKind::Electron]));
        a.merge(&b);
        let counts: Vec<_> = a.iter().map(|(_, count)| count).collect();
        assert_eq!(counts, vec![2, 2, 1, 0, 1, 0, 0]);
    }
}
