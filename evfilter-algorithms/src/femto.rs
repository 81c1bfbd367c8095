//! Same-event pair analysis over two particle partitions.
//!
//! For every collision the accepted particles are split into two partitions,
//! per-partition QA is filled, and every pair selected by the combination
//! policy is evaluated. With `SelfPairs` both members come from the first
//! partition and the second partition is neither paired nor QA'd.
//!
//! Groups whose records carry a vertex position must pass the vertex window;
//! accepted vertices are filled into `Event/hZvtx`.

use crate::grouping::{Boundary, GroupBoundaryDetector};
use crate::histogram::{HistogramRegistry, HistogramSink};
use crate::pairs::PairEngine;
use evfilter_core::{
    ConfigError, FourMomentum, GroupKey, LorentzVector, MassLookup, PairCombinationPolicy,
    PairConfig, PairMetricValue, ParticleRecord, PartitionSelection, Record, Result,
};
use tracing::{debug, warn};

/// Label of the same-event pair distribution.
pub const PAIR_HISTOGRAM: &str = "Pair/hSE";

/// Label of the accepted vertex distribution.
pub const VERTEX_HISTOGRAM: &str = "Event/hZvtx";

const QA_LABELS: [[&str; 3]; 2] = [
    ["Particle1/hPt", "Particle1/hEta", "Particle1/hPhi"],
    ["Particle2/hPt", "Particle2/hEta", "Particle2/hPhi"],
];

/// Registers the QA and pair histograms filled by [`SameEventPairing`].
///
/// # Errors
/// Never fails for the built-in binning; the `Result` mirrors
/// [`HistogramRegistry::add`].
pub fn register_pair_histograms(
    registry: &mut HistogramRegistry,
) -> std::result::Result<(), ConfigError> {
    registry.add(VERTEX_HISTOGRAM, 240, -12.0, 12.0)?;
    for [pt, eta, phi] in QA_LABELS {
        registry.add(pt, 100, 0.0, 4.0)?;
        registry.add(eta, 100, -1.0, 1.0)?;
        registry.add(phi, 360, 0.0, 6.28)?;
    }
    registry.add(PAIR_HISTOGRAM, 1000, 0.0, 5.0)
}

/// Counters collected by the pair analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PairingStatistics {
    /// Groups processed, including those rejected by the vertex window.
    pub groups: usize,
    /// Groups whose vertex fell outside the window.
    pub vertex_rejected: usize,
    /// Particles seen.
    pub particles: usize,
    /// Particles with non-finite attributes.
    pub malformed: usize,
    /// Particles selected into the first partition.
    pub first_partition: usize,
    /// Particles selected into the second partition.
    pub second_partition: usize,
    /// Pairs evaluated.
    pub pairs: usize,
}

/// Streaming same-event pairing of particles sorted by collision.
///
/// Only the records of the open group are buffered.
pub struct SameEventPairing<'m, L: MassLookup + ?Sized> {
    config: PairConfig,
    masses: &'m L,
    engine: PairEngine,
    detector: GroupBoundaryDetector,
    group: Vec<ParticleRecord>,
    statistics: PairingStatistics,
}

impl<'m, L: MassLookup + ?Sized> SameEventPairing<'m, L> {
    /// Creates the analysis.
    ///
    /// # Errors
    /// Fails if the kinematic window is inverted or a fixed PDG code of
    /// either partition has no known mass.
    pub fn new(config: PairConfig, masses: &'m L) -> Result<Self> {
        config.validate()?;
        for selection in [&config.first, &config.second] {
            if let Some(code) = selection.pdg_code {
                masses.mass(code)?;
            }
        }
        let engine = PairEngine::new(config.policy, config.metric, 0.0, 0.0);
        let detector = GroupBoundaryDetector::new(config.validate_ordering);
        Ok(Self {
            config,
            masses,
            engine,
            detector,
            group: Vec::new(),
            statistics: PairingStatistics::default(),
        })
    }

    /// Counters so far.
    #[must_use]
    pub fn statistics(&self) -> PairingStatistics {
        self.statistics
    }

    /// Adds one particle; processes the previous group if this one starts a new group.
    ///
    /// # Errors
    /// Fails on a reappearing group key (when validated) or an unknown
    /// per-record PDG code.
    pub fn push(
        &mut self,
        particle: ParticleRecord,
        sink: &mut dyn HistogramSink,
        emit: &mut dyn FnMut(PairMetricValue),
    ) -> Result<()> {
        self.statistics.particles += 1;
        match self.detector.observe(particle.key)? {
            Boundary::Opened | Boundary::Continued => {}
            Boundary::Crossed { closed } => self.flush(closed, sink, emit)?,
        }
        self.group.push(particle);
        Ok(())
    }

    /// Processes the last open group.
    ///
    /// # Errors
    /// See [`push`](Self::push).
    pub fn finish(
        &mut self,
        sink: &mut dyn HistogramSink,
        emit: &mut dyn FnMut(PairMetricValue),
    ) -> Result<()> {
        match self.detector.finish() {
            Some(key) => self.flush(key, sink, emit),
            None => Ok(()),
        }
    }

    fn flush(
        &mut self,
        key: GroupKey,
        sink: &mut dyn HistogramSink,
        emit: &mut dyn FnMut(PairMetricValue),
    ) -> Result<()> {
        let group = std::mem::take(&mut self.group);
        let outcome = self.process_group(key, &group, sink, emit);
        self.group = group;
        self.group.clear();
        outcome
    }

    fn momentum(
        &self,
        selection: &PartitionSelection,
        particle: &ParticleRecord,
    ) -> Result<LorentzVector> {
        let code = selection.pdg_code.unwrap_or(particle.pdg_code);
        let mass = self.masses.mass(code)?;
        Ok(particle.four_momentum(mass))
    }

    /// Runs QA and pairing for the particles of one collision.
    ///
    /// Each particle's four-vector is built from its partition's mass
    /// hypothesis (or its own PDG code) before pairing, so the engine is fed
    /// [`LorentzVector`]s and its per-partition masses stay at zero.
    ///
    /// # Errors
    /// Fails if a per-record PDG code has no known mass.
    pub fn process_group(
        &mut self,
        key: GroupKey,
        particles: &[ParticleRecord],
        sink: &mut dyn HistogramSink,
        emit: &mut dyn FnMut(PairMetricValue),
    ) -> Result<()> {
        self.statistics.groups += 1;
        if let Some(z) = particles.first().and_then(|particle| particle.zvtx) {
            if !self.config.vertex.accepts(z) {
                self.statistics.vertex_rejected += 1;
                debug!(group = %key, z, "group outside vertex window");
                return Ok(());
            }
            sink.fill(VERTEX_HISTOGRAM, z);
        }

        let with_second = self.config.policy == PairCombinationPolicy::CrossPairs;
        let mut first = Vec::new();
        let mut second = Vec::new();

        for particle in particles {
            if let Err(err) = particle.validate() {
                self.statistics.malformed += 1;
                warn!(%err, "particle excluded from pairing");
                continue;
            }
            if !self.config.kinematics.accepts(particle) {
                continue;
            }
            if self.config.first.accepts(particle) {
                fill_qa(sink, 0, particle);
                first.push(self.momentum(&self.config.first, particle)?);
            }
            if with_second && self.config.second.accepts(particle) {
                fill_qa(sink, 1, particle);
                second.push(self.momentum(&self.config.second, particle)?);
            }
        }

        let partner = if with_second { &second } else { &first };
        let mut pairs = 0;
        self.engine.for_each_metric(&first, partner, |value| {
            sink.fill(PAIR_HISTOGRAM, value);
            emit(PairMetricValue { key, value });
            pairs += 1;
        });

        self.statistics.first_partition += first.len();
        self.statistics.second_partition += second.len();
        self.statistics.pairs += pairs;
        debug!(group = %key, first = first.len(), second = second.len(), pairs, "group paired");
        Ok(())
    }
}

fn fill_qa(sink: &mut dyn HistogramSink, partition: usize, particle: &ParticleRecord) {
    let [pt, eta, phi] = QA_LABELS[partition];
    sink.fill(pt, particle.pt);
    sink.fill(eta, particle.eta);
    sink.fill(phi, particle.phi);
}

#[cfg(test)]
mod tests {
    use super::*;
    use evfilter_core::{MassTable, PairMetric};

    fn proton(key: i64, pt: f64, phi: f64) -> ParticleRecord {
        ParticleRecord::new(key, pt, 0.1, phi, 2212).with_bits(u32::MAX, u32::MAX)
    }

    fn run(
        config: PairConfig,
        particles: Vec<ParticleRecord>,
    ) -> (Vec<PairMetricValue>, PairingStatistics) {
        let masses = MassTable::new();
        let mut registry = HistogramRegistry::new();
        register_pair_histograms(&mut registry).unwrap();
        let mut values = Vec::new();
        let mut emit = |value: PairMetricValue| values.push(value);
        let mut pairing = SameEventPairing::new(config, &masses).unwrap();
        for particle in particles {
            pairing.push(particle, &mut registry, &mut emit).unwrap();
        }
        pairing.finish(&mut registry, &mut emit).unwrap();
        let statistics = pairing.statistics();
        (values, statistics)
    }

    #[test]
    fn test_self_pairs_per_group() {
        let config = PairConfig::default().with_policy(PairCombinationPolicy::SelfPairs);
        let particles = vec![
            proton(1, 1.0, 0.0),
            proton(1, 1.1, 1.0),
            proton(1, 1.2, 2.0),
            proton(2, 1.0, 0.0),
        ];
        let (values, statistics) = run(config, particles);
        assert_eq!(values.len(), 3);
        assert!(values.iter().all(|v| v.key == GroupKey(1)));
        assert_eq!(statistics.groups, 2);
        assert_eq!(statistics.second_partition, 0);
    }

    #[test]
    fn test_malformed_particle_is_counted_and_not_paired() {
        let config = PairConfig::default().with_policy(PairCombinationPolicy::SelfPairs);
        let particles = vec![
            proton(1, 1.0, 0.0),
            proton(1, f64::NAN, 1.0),
            proton(1, 1.2, 2.0),
        ];
        let (values, statistics) = run(config, particles);
        assert_eq!(values.len(), 1);
        assert!(values[0].value.is_finite());
        assert_eq!(statistics.malformed, 1);
        assert_eq!(statistics.first_partition, 2);
        assert_eq!(statistics.pairs, 1);
    }

    #[test]
    fn test_vertex_window_rejects_groups() {
        let masses = MassTable::new();
        let config = PairConfig::default().with_policy(PairCombinationPolicy::SelfPairs);
        let mut registry = HistogramRegistry::new();
        register_pair_histograms(&mut registry).unwrap();
        let mut values = Vec::new();
        let mut emit = |value: PairMetricValue| values.push(value);

        let particles = [
            proton(1, 1.0, 0.0).with_zvtx(2.55),
            proton(1, 1.1, 1.0).with_zvtx(2.55),
            proton(2, 1.0, 0.0).with_zvtx(11.0),
            proton(2, 1.1, 1.0).with_zvtx(11.0),
            proton(3, 1.0, 0.0),
            proton(3, 1.1, 1.0),
        ];
        let mut pairing = SameEventPairing::new(config, &masses).unwrap();
        for particle in particles {
            pairing.push(particle, &mut registry, &mut emit).unwrap();
        }
        pairing.finish(&mut registry, &mut emit).unwrap();
        let statistics = pairing.statistics();

        let keys: Vec<_> = values.iter().map(|v| v.key).collect();
        assert_eq!(keys, vec![GroupKey(1), GroupKey(3)]);
        assert_eq!(statistics.groups, 3);
        assert_eq!(statistics.vertex_rejected, 1);
        let vertex = registry.get(VERTEX_HISTOGRAM).unwrap();
        assert_eq!(vertex.entries(), 1);
        assert_eq!(vertex.counts()[145], 1);
    }

    #[test]
    fn test_cross_pairs_include_overlap() {
        let config = PairConfig::default().with_policy(PairCombinationPolicy::CrossPairs);
        let particles = vec![proton(7, 1.0, 0.0), proton(7, 1.5, 1.0)];
        let (values, statistics) = run(config, particles);
        // Both particles pass both selections: 2 x 2 pairs, two of them self-pairs.
        assert_eq!(values.len(), 4);
        assert_eq!(statistics.first_partition, 2);
        assert_eq!(statistics.second_partition, 2);
        assert!(values.iter().filter(|v| v.value.abs() < 1e-9).count() >= 2);
    }

    #[test]
    fn test_kinematic_window_excludes_particles() {
        let config = PairConfig::default().with_policy(PairCombinationPolicy::SelfPairs);
        let particles = vec![
            proton(1, 1.0, 0.0),
            proton(1, 5.0, 1.0),
            ParticleRecord::new(1, 1.0, 0.1, 0.5, 2212).with_bits(0, 0),
        ];
        let (values, statistics) = run(config, particles);
        assert!(values.is_empty());
        assert_eq!(statistics.first_partition, 1);
    }

    #[test]
    fn test_unknown_fixed_pdg_code_fails_early() {
        let masses = MassTable::new();
        let config = PairConfig::default().with_partitions(
            PartitionSelection::default().with_pdg_code(Some(424_242)),
            PartitionSelection::default(),
        );
        assert!(SameEventPairing::new(config, &masses).is_err());
    }

    #[test]
    fn test_unknown_record_pdg_code_fails_batch() {
        let masses = MassTable::new();
        let selection = PartitionSelection::default().with_pdg_code(None);
        let config = PairConfig::default()
            .with_policy(PairCombinationPolicy::SelfPairs)
            .with_metric(PairMetric::InvariantMass)
            .with_partitions(selection.clone(), selection);
        let mut pairing = SameEventPairing::new(config, &masses).unwrap();
        let mut sink = |_: &str, _: f64| {};
        let mut emit = |_: PairMetricValue| {};
        let particle =
            ParticleRecord::new(1, 1.0, 0.0, 0.0, 999_999).with_bits(u32::MAX, u32::MAX);
        pairing.push(particle, &mut sink, &mut emit).unwrap();
        assert!(pairing.finish(&mut sink, &mut emit).is_err());
    }
}
