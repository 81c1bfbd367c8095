//! Streaming trigger scan over clusters sorted by collision.

use crate::accumulator::GroupAccumulator;
use crate::grouping::{Boundary, GroupBoundaryDetector};
use evfilter_core::{
    ClusterRecord, GroupKey, Record, Result, ShapeCuts, TriggerConfig, TriggerDecision,
};
use tracing::{debug, warn};

/// Photon trigger: cluster energy above threshold.
#[inline]
#[must_use]
pub fn photon_candidate(cluster: &ClusterRecord, config: &TriggerConfig) -> bool {
    cluster.e > config.photon_energy
}

/// Electron trigger: cluster close to a charged track and above threshold.
#[inline]
#[must_use]
pub fn electron_candidate(cluster: &ClusterRecord, config: &TriggerConfig) -> bool {
    cluster.track_dist < config.track_dist_sigma && cluster.e > config.electron_energy
}

/// Antineutron trigger: neutral, wide shower passing the regime cut.
#[must_use]
pub fn antineutron_candidate(cluster: &ClusterRecord, cuts: &ShapeCuts) -> bool {
    let baseline = cluster.n_cells > cuts.min_cells
        && cluster.m02 > cuts.min_m02
        && cluster.e > cuts.min_energy
        && cluster.track_dist > cuts.min_track_dist;
    let low_regime = cluster.e < cuts.regime_split_energy
        && cluster.m02 > cuts.low_regime_offset - cluster.m20;
    let high_regime = cluster.e > cuts.regime_split_energy
        && cluster.m02 > cuts.high_regime_offset - cluster.m20;
    baseline && (low_regime || high_regime)
}

/// Counters collected during a trigger scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScanStatistics {
    /// Decisions emitted.
    pub groups: usize,
    /// Clusters of the configured subtype that were scanned.
    pub records_scanned: usize,
    /// Clusters of other subtypes, skipped before grouping.
    pub skipped_detector_type: usize,
    /// Clusters with non-finite attributes, excluded from the predicates.
    pub malformed_records: usize,
    /// Clusters whose bunch crossing differs from their group's first one.
    pub bc_mismatches: usize,
}

impl ScanStatistics {
    /// Adds the counters of another scan.
    pub fn merge(&mut self, other: &ScanStatistics) {
        self.groups += other.groups;
        self.records_scanned += other.records_scanned;
        self.skipped_detector_type += other.skipped_detector_type;
        self.malformed_records += other.malformed_records;
        self.bc_mismatches += other.bc_mismatches;
    }
}

/// Single-pass trigger scanner.
///
/// Feed clusters in stream order with [`push`](Self::push); a decision is
/// returned whenever a group closes. Call [`finish`](Self::finish) at end of
/// stream to flush the last group.
pub struct TriggerScanner {
    config: TriggerConfig,
    detector: GroupBoundaryDetector,
    accumulator: GroupAccumulator,
    statistics: ScanStatistics,
}

impl TriggerScanner {
    /// Creates a scanner with the given thresholds.
    #[must_use]
    pub fn new(config: TriggerConfig) -> Self {
        let detector = GroupBoundaryDetector::new(config.validate_ordering);
        Self {
            config,
            detector,
            accumulator: GroupAccumulator::new(),
            statistics: ScanStatistics::default(),
        }
    }

    /// Thresholds in use.
    #[must_use]
    pub fn config(&self) -> &TriggerConfig {
        &self.config
    }

    /// Counters so far.
    #[must_use]
    pub fn statistics(&self) -> ScanStatistics {
        self.statistics
    }

    /// Scans one cluster, returning the decision of a group it closed.
    ///
    /// # Errors
    /// Returns [`evfilter_core::Error::PreconditionViolation`] when ordering is
    /// validated and the cluster belongs to an already closed group.
    pub fn push(&mut self, cluster: &ClusterRecord) -> Result<Option<TriggerDecision>> {
        if cluster.detector_type != self.config.detector_type {
            self.statistics.skipped_detector_type += 1;
            return Ok(None);
        }
        self.statistics.records_scanned += 1;

        let emitted = match self.detector.observe(cluster.key)? {
            Boundary::Opened => {
                self.accumulator.reset();
                None
            }
            Boundary::Continued => None,
            Boundary::Crossed { closed } => {
                let decision = self.emit(closed);
                self.accumulator.reset();
                Some(decision)
            }
        };

        if !self.accumulator.note_bc(cluster.bc) {
            self.statistics.bc_mismatches += 1;
            warn!(group = %cluster.key, bc = cluster.bc, "bunch crossing differs within group");
        }

        match cluster.validate() {
            Ok(()) => self.accumulator.fold(cluster, &self.config),
            Err(err) => {
                self.statistics.malformed_records += 1;
                warn!(%err, "cluster excluded from trigger evaluation");
            }
        }

        Ok(emitted)
    }

    /// Flushes the open group, if any.
    pub fn finish(&mut self) -> Option<TriggerDecision> {
        let key = self.detector.finish()?;
        let decision = self.emit(key);
        self.accumulator.reset();
        Some(decision)
    }

    fn emit(&mut self, key: GroupKey) -> TriggerDecision {
        let decision = self.accumulator.decision(key);
        self.statistics.groups += 1;
        debug!(%decision, "group flushed");
        decision
    }
}

/// Iterator adapter yielding one decision per group of a cluster stream.
///
/// Stops after the first error.
pub struct TriggerStream<I> {
    records: I,
    scanner: TriggerScanner,
    done: bool,
}

impl<I> TriggerStream<I>
where
    I: Iterator<Item = ClusterRecord>,
{
    /// Wraps a sorted cluster iterator.
    pub fn new(records: I, config: TriggerConfig) -> Self {
        Self {
            records,
            scanner: TriggerScanner::new(config),
            done: false,
        }
    }

    /// Counters of the underlying scanner.
    #[must_use]
    pub fn statistics(&self) -> ScanStatistics {
        self.scanner.statistics()
    }
}

impl<I> Iterator for TriggerStream<I>
where
    I: Iterator<Item = ClusterRecord>,
{
    type Item = Result<TriggerDecision>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        for cluster in self.records.by_ref() {
            match self.scanner.push(&cluster) {
                Ok(Some(decision)) => return Some(Ok(decision)),
                Ok(None) => {}
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
        self.done = true;
        self.scanner.finish().map(Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evfilter_core::TriggerKind;

    fn photon(key: i64, e: f64) -> ClusterRecord {
        ClusterRecord::new(key, e, 0.0, 0.0, e)
    }

    fn collect(records: Vec<ClusterRecord>, config: TriggerConfig) -> Vec<TriggerDecision> {
        TriggerStream::new(records.into_iter(), config)
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_energy_trigger_per_group() {
        let decisions = collect(
            vec![photon(1, 3.0), photon(1, 0.1), photon(2, 0.1)],
            TriggerConfig::default(),
        );
        assert_eq!(decisions.len(), 2);
        assert_eq!(decisions[0].key, GroupKey(1));
        assert!(decisions[0].fired(TriggerKind::Photon));
        assert_eq!(decisions[1].key, GroupKey(2));
        assert!(!decisions[1].fired(TriggerKind::Photon));
    }

    #[test]
    fn test_single_record_is_flushed() {
        let decisions = collect(vec![photon(0, 0.1)], TriggerConfig::default());
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].key, GroupKey(0));
    }

    #[test]
    fn test_empty_stream_emits_nothing() {
        let decisions = collect(Vec::new(), TriggerConfig::default());
        assert!(decisions.is_empty());
    }

    #[test]
    fn test_electron_requires_track_match() {
        let config = TriggerConfig::default();
        let matched = photon(1, 2.5).with_track_dist(1.0);
        let unmatched = photon(1, 2.5).with_track_dist(3.0);
        let soft = photon(1, 1.5).with_track_dist(1.0);
        assert!(electron_candidate(&matched, &config));
        assert!(!electron_candidate(&unmatched, &config));
        assert!(!electron_candidate(&soft, &config));
    }

    #[test]
    fn test_antineutron_regimes() {
        let cuts = ShapeCuts::default();
        // Low regime: e < 2, m02 > 4.5 - m20
        let low = photon(1, 1.0).with_shape(5, 2.5, 2.5).with_track_dist(3.0);
        assert!(antineutron_candidate(&low, &cuts));
        // Low regime, shape too narrow
        let narrow = photon(1, 1.0).with_shape(5, 2.0, 2.0).with_track_dist(3.0);
        assert!(!antineutron_candidate(&narrow, &cuts));
        // High regime: e > 2, m02 > 4 - m20
        let high = photon(1, 3.0).with_shape(5, 2.1, 2.0).with_track_dist(3.0);
        assert!(antineutron_candidate(&high, &cuts));
    }

    #[test]
    fn test_antineutron_high_regime_still_needs_baseline() {
        // Charged cluster in the high regime: the regime cut alone is not enough.
        let cuts = ShapeCuts::default();
        let charged = photon(1, 3.0).with_shape(5, 2.1, 2.0).with_track_dist(1.0);
        assert!(!antineutron_candidate(&charged, &cuts));
        let few_cells = photon(1, 3.0).with_shape(2, 2.1, 2.0).with_track_dist(3.0);
        assert!(!antineutron_candidate(&few_cells, &cuts));
    }

    #[test]
    fn test_other_detector_types_are_skipped() {
        let records = vec![
            photon(1, 0.1),
            photon(2, 5.0).with_detector_type(1),
            photon(1, 0.2),
        ];
        let mut stream = TriggerStream::new(records.into_iter(), TriggerConfig::default());
        let decisions: Vec<_> = stream.by_ref().collect::<Result<_>>().unwrap();
        assert_eq!(decisions.len(), 1);
        assert!(!decisions[0].fired(TriggerKind::Photon));
        assert_eq!(stream.statistics().skipped_detector_type, 1);
    }

    #[test]
    fn test_malformed_record_is_counted_but_ignored() {
        let records = vec![photon(1, f64::NAN), photon(2, f64::INFINITY)];
        let mut stream = TriggerStream::new(records.into_iter(), TriggerConfig::default());
        let decisions: Vec<_> = stream.by_ref().collect::<Result<_>>().unwrap();
        assert_eq!(decisions.len(), 2);
        assert!(decisions.iter().all(|d| !d.keep()));
        assert_eq!(stream.statistics().malformed_records, 2);
    }

    #[test]
    fn test_bc_mismatch_is_counted() {
        let mut scanner = TriggerScanner::new(TriggerConfig::default());
        scanner.push(&photon(1, 0.1).with_bc(100)).unwrap();
        scanner.push(&photon(1, 0.1).with_bc(101)).unwrap();
        scanner.finish();
        assert_eq!(scanner.statistics().bc_mismatches, 1);
        assert_eq!(scanner.statistics().groups, 1);
    }

    #[test]
    fn test_out_of_order_fails_when_validated() {
        let records = vec![photon(1, 0.1), photon(2, 0.1), photon(1, 0.1)];
        let config = TriggerConfig::default().with_validate_ordering(true);
        let results: Vec<_> = TriggerStream::new(records.into_iter(), config).collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }

    #[test]
    fn test_out_of_order_splits_group_when_not_validated() {
        let records = vec![photon(1, 3.0), photon(2, 0.1), photon(1, 0.1)];
        let config = TriggerConfig::default().with_validate_ordering(false);
        let decisions = collect(records, config);
        let keys: Vec<_> = decisions.iter().map(|d| d.key.0).collect();
        assert_eq!(keys, vec![1, 2, 1]);
        assert!(decisions[0].fired(TriggerKind::Photon));
        assert!(!decisions[2].fired(TriggerKind::Photon));
    }
}
