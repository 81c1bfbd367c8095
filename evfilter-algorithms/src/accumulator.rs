//! Per-group trigger state.

use evfilter_core::kinematics::invariant_mass;
use evfilter_core::{
    ClusterRecord, FourMomentum, GroupKey, LorentzVector, TriggerConfig, TriggerDecision,
    TriggerFlags, TriggerKind,
};

use crate::trigger::{antineutron_candidate, electron_candidate, photon_candidate};

/// Mutable state of the group currently being scanned.
///
/// Holds the trigger flags and the four-vectors of the group's clusters that
/// are still candidates for the pair trigger. The candidate buffer keeps its
/// capacity across groups.
#[derive(Debug, Default)]
pub struct GroupAccumulator {
    flags: TriggerFlags,
    bc: Option<u64>,
    pair_candidates: Vec<LorentzVector>,
}

impl GroupAccumulator {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears all state for the next group.
    pub fn reset(&mut self) {
        self.flags = TriggerFlags::NONE;
        self.bc = None;
        self.pair_candidates.clear();
    }

    /// Flags raised so far.
    #[must_use]
    pub fn flags(&self) -> TriggerFlags {
        self.flags
    }

    /// Records the bunch crossing of a cluster.
    ///
    /// Returns false if it differs from the first bunch crossing seen in
    /// this group.
    pub fn note_bc(&mut self, bc: u64) -> bool {
        match self.bc {
            Some(first) => first == bc,
            None => {
                self.bc = Some(bc);
                true
            }
        }
    }

    /// Folds one valid cluster into the flags.
    ///
    /// The pair trigger pairs the cluster with every earlier cluster of the
    /// group and stops searching once a pair above threshold is found.
    pub fn fold(&mut self, cluster: &ClusterRecord, config: &TriggerConfig) {
        self.flags
            .raise(TriggerKind::Photon, photon_candidate(cluster, config));
        self.flags
            .raise(TriggerKind::Electron, electron_candidate(cluster, config));
        self.flags.raise(
            TriggerKind::Antineutron,
            antineutron_candidate(cluster, &config.shape),
        );

        if self.flags.get(TriggerKind::Pair) {
            return;
        }
        let momentum = cluster.four_momentum(0.0);
        let found = self
            .pair_candidates
            .iter()
            .any(|earlier| invariant_mass(earlier, &momentum) > config.pair_mass);
        if found {
            self.flags.raise(TriggerKind::Pair, true);
            self.pair_candidates.clear();
        } else {
            self.pair_candidates.push(momentum);
        }
    }

    /// Turns the finished state into a decision for `key`.
    #[must_use]
    pub fn decision(&self, key: GroupKey) -> TriggerDecision {
        TriggerDecision::new(key, self.flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_flag_set_by_back_to_back_clusters() {
        let config = TriggerConfig::default();
        let mut acc = GroupAccumulator::new();
        acc.fold(&ClusterRecord::new(1, 0.4, 0.4, 0.0, 0.0), &config);
        assert!(!acc.flags().get(TriggerKind::Pair));
        acc.fold(&ClusterRecord::new(1, 0.4, -0.4, 0.0, 0.0), &config);
        // m = 0.8 > 0.5
        assert!(acc.flags().get(TriggerKind::Pair));
    }

    #[test]
    fn test_collinear_pair_does_not_fire() {
        let config = TriggerConfig::default();
        let mut acc = GroupAccumulator::new();
        acc.fold(&ClusterRecord::new(1, 1.0, 1.0, 0.0, 0.0), &config);
        acc.fold(&ClusterRecord::new(1, 1.0, 1.0, 0.0, 0.0), &config);
        assert!(!acc.flags().get(TriggerKind::Pair));
    }

    #[test]
    fn test_reset_clears_flags_and_candidates() {
        let config = TriggerConfig::default();
        let mut acc = GroupAccumulator::new();
        acc.fold(&ClusterRecord::new(1, 3.0, 3.0, 0.0, 0.0), &config);
        assert!(acc.note_bc(10));
        assert!(!acc.note_bc(11));
        acc.reset();
        assert!(acc.flags().is_empty());
        assert!(acc.note_bc(11));

        // A cluster from the old group must not pair with the new one.
        acc.fold(&ClusterRecord::new(2, 0.4, -0.4, 0.0, 0.0), &config);
        assert!(!acc.flags().get(TriggerKind::Pair));
    }
}
