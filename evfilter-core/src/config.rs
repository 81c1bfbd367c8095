//! Configuration for the trigger scan and the pair analysis.

use crate::error::ConfigError;
use crate::pair::{PairCombinationPolicy, PairMetric};
use crate::record::ParticleRecord;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Shower-shape cuts of the antineutron trigger.
///
/// A cluster passes when the baseline holds and the regime cut for its
/// energy holds:
/// `(n_cells > min_cells && m02 > min_m02 && e > min_energy && track_dist > min_track_dist)
///  && ((e < split && m02 > low_offset - m20) || (e > split && m02 > high_offset - m20))`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ShapeCuts {
    pub min_cells: u16,
    pub min_m02: f64,
    pub min_energy: f64,
    pub min_track_dist: f64,
    /// Energy separating the low and high regimes (GeV).
    pub regime_split_energy: f64,
    pub low_regime_offset: f64,
    pub high_regime_offset: f64,
}

impl Default for ShapeCuts {
    fn default() -> Self {
        Self {
            min_cells: 2,
            min_m02: 0.2,
            min_energy: 0.7,
            min_track_dist: 2.0,
            regime_split_energy: 2.0,
            low_regime_offset: 4.5,
            high_regime_offset: 4.0,
        }
    }
}

/// Thresholds for the per-group trigger scan.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TriggerConfig {
    /// Minimal photon energy (GeV).
    pub photon_energy: f64,
    /// Minimal electron energy (GeV).
    pub electron_energy: f64,
    /// Maximal cluster-to-track distance for electrons (sigmas).
    pub track_dist_sigma: f64,
    /// Minimal photon pair mass (GeV).
    pub pair_mass: f64,
    /// Only clusters of this calorimeter subtype are scanned.
    pub detector_type: u8,
    pub shape: ShapeCuts,
    /// Fail with a precondition violation when a closed group reappears.
    pub validate_ordering: bool,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            photon_energy: 2.0,
            electron_energy: 2.0,
            track_dist_sigma: 2.0,
            pair_mass: 0.5,
            detector_type: 0,
            shape: ShapeCuts::default(),
            validate_ordering: cfg!(debug_assertions),
        }
    }
}

impl TriggerConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the photon energy threshold.
    #[must_use]
    pub fn with_photon_energy(mut self, threshold: f64) -> Self {
        self.photon_energy = threshold;
        self
    }

    /// Sets the electron energy threshold.
    #[must_use]
    pub fn with_electron_energy(mut self, threshold: f64) -> Self {
        self.electron_energy = threshold;
        self
    }

    /// Sets the pair mass threshold.
    #[must_use]
    pub fn with_pair_mass(mut self, threshold: f64) -> Self {
        self.pair_mass = threshold;
        self
    }

    /// Sets the scanned calorimeter subtype.
    #[must_use]
    pub fn with_detector_type(mut self, detector_type: u8) -> Self {
        self.detector_type = detector_type;
        self
    }

    /// Enables or disables the sortedness check.
    #[must_use]
    pub fn with_validate_ordering(mut self, validate: bool) -> Self {
        self.validate_ordering = validate;
        self
    }

    /// Checks that every threshold is a finite number.
    ///
    /// # Errors
    /// Returns [`ConfigError::NonFiniteThreshold`] for the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let thresholds = [
            ("photon_energy", self.photon_energy),
            ("electron_energy", self.electron_energy),
            ("track_dist_sigma", self.track_dist_sigma),
            ("pair_mass", self.pair_mass),
            ("shape.min_m02", self.shape.min_m02),
            ("shape.min_energy", self.shape.min_energy),
            ("shape.min_track_dist", self.shape.min_track_dist),
            ("shape.regime_split_energy", self.shape.regime_split_energy),
            ("shape.low_regime_offset", self.shape.low_regime_offset),
            ("shape.high_regime_offset", self.shape.high_regime_offset),
        ];
        for (name, value) in thresholds {
            if !value.is_finite() {
                return Err(ConfigError::NonFiniteThreshold { name, value });
            }
        }
        Ok(())
    }
}

/// Pseudorapidity and transverse-momentum window for tracks.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct KinematicCuts {
    pub eta_min: f64,
    pub eta_max: f64,
    pub pt_min: f64,
    pub pt_max: f64,
}

impl Default for KinematicCuts {
    fn default() -> Self {
        Self {
            eta_min: -0.8,
            eta_max: 0.8,
            pt_min: 0.5,
            pt_max: 4.0,
        }
    }
}

impl KinematicCuts {
    /// Open-interval acceptance on eta and pt.
    #[inline]
    #[must_use]
    pub fn accepts(&self, particle: &ParticleRecord) -> bool {
        particle.eta > self.eta_min
            && particle.eta < self.eta_max
            && particle.pt > self.pt_min
            && particle.pt < self.pt_max
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.eta_min > self.eta_max {
            return Err(ConfigError::InvalidRange {
                name: "eta",
                min: self.eta_min,
                max: self.eta_max,
            });
        }
        if self.pt_min > self.pt_max {
            return Err(ConfigError::InvalidRange {
                name: "pt",
                min: self.pt_min,
                max: self.pt_max,
            });
        }
        Ok(())
    }
}

/// Open window on the collision's primary vertex z (cm).
///
/// Applied only to groups whose records carry a vertex position.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct VertexCut {
    pub z_min: f64,
    pub z_max: f64,
}

impl Default for VertexCut {
    fn default() -> Self {
        Self {
            z_min: -10.0,
            z_max: 10.0,
        }
    }
}

impl VertexCut {
    /// True if `z` lies strictly inside the window. NaN is rejected.
    #[inline]
    #[must_use]
    pub fn accepts(&self, z: f64) -> bool {
        z > self.z_min && z < self.z_max
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.z_min > self.z_max {
            return Err(ConfigError::InvalidRange {
                name: "zvtx",
                min: self.z_min,
                max: self.z_max,
            });
        }
        Ok(())
    }
}

/// Selection defining one particle partition.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PartitionSelection {
    /// Mass hypothesis; `None` uses each record's own PDG code.
    pub pdg_code: Option<i32>,
    /// Required particle type.
    pub particle_type: u8,
    /// Track-quality bits that must all be set.
    pub cut_bits: u32,
    /// PID bits required below `pid_threshold`.
    pub pid_tpc_bits: u32,
    /// PID bits required at or above `pid_threshold`.
    pub pid_tpctof_bits: u32,
    /// Momentum switching between TPC and TPC+TOF identification (GeV/c).
    pub pid_threshold: f64,
}

impl Default for PartitionSelection {
    fn default() -> Self {
        Self {
            pdg_code: Some(2212),
            particle_type: 0,
            cut_bits: 3_191_978,
            pid_tpc_bits: 2,
            pid_tpctof_bits: 4,
            pid_threshold: 0.75,
        }
    }
}

impl PartitionSelection {
    /// Sets the mass hypothesis.
    #[must_use]
    pub fn with_pdg_code(mut self, pdg_code: Option<i32>) -> Self {
        self.pdg_code = pdg_code;
        self
    }

    /// Sets the required selection bits.
    #[must_use]
    pub fn with_cut_bits(mut self, cut_bits: u32) -> Self {
        self.cut_bits = cut_bits;
        self
    }

    /// Sets the PID bits and the momentum threshold between them.
    #[must_use]
    pub fn with_pid(mut self, tpc_bits: u32, tpctof_bits: u32, threshold: f64) -> Self {
        self.pid_tpc_bits = tpc_bits;
        self.pid_tpctof_bits = tpctof_bits;
        self.pid_threshold = threshold;
        self
    }

    #[must_use]
    pub fn accepts(&self, particle: &ParticleRecord) -> bool {
        let pid_bits = if particle.pt < self.pid_threshold {
            self.pid_tpc_bits
        } else {
            self.pid_tpctof_bits
        };
        particle.particle_type == self.particle_type
            && particle.cut_bits & self.cut_bits == self.cut_bits
            && particle.pid_bits & pid_bits == pid_bits
    }
}

/// Configuration of the same-event pair analysis.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PairConfig {
    pub policy: PairCombinationPolicy,
    pub metric: PairMetric,
    pub first: PartitionSelection,
    pub second: PartitionSelection,
    pub kinematics: KinematicCuts,
    pub vertex: VertexCut,
    /// Number of prior groups a mixed-event consumer should retain.
    pub mixing_depth: usize,
    /// Fail with a precondition violation when a closed group reappears.
    pub validate_ordering: bool,
}

impl Default for PairConfig {
    fn default() -> Self {
        let second = PartitionSelection::default().with_pid(0, 0, 0.75);
        Self {
            policy: PairCombinationPolicy::CrossPairs,
            metric: PairMetric::RelativeMomentum,
            first: PartitionSelection::default(),
            second,
            kinematics: KinematicCuts::default(),
            vertex: VertexCut::default(),
            mixing_depth: 10,
            validate_ordering: cfg!(debug_assertions),
        }
    }
}

impl PairConfig {
    /// Sets the combination policy.
    #[must_use]
    pub fn with_policy(mut self, policy: PairCombinationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the pair metric.
    #[must_use]
    pub fn with_metric(mut self, metric: PairMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Sets both partition selections.
    #[must_use]
    pub fn with_partitions(
        mut self,
        first: PartitionSelection,
        second: PartitionSelection,
    ) -> Self {
        self.first = first;
        self.second = second;
        self
    }

    /// Sets the kinematic window.
    #[must_use]
    pub fn with_kinematics(mut self, kinematics: KinematicCuts) -> Self {
        self.kinematics = kinematics;
        self
    }

    /// Sets the vertex window.
    #[must_use]
    pub fn with_vertex(mut self, vertex: VertexCut) -> Self {
        self.vertex = vertex;
        self
    }

    /// Enables or disables the sortedness check.
    #[must_use]
    pub fn with_validate_ordering(mut self, validate: bool) -> Self {
        self.validate_ordering = validate;
        self
    }

    /// Validates the kinematic and vertex ranges.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidRange`] for an inverted window.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.kinematics.validate()?;
        self.vertex.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_config_builder() {
        let config = TriggerConfig::new()
            .with_photon_energy(3.0)
            .with_electron_energy(1.5)
            .with_pair_mass(0.1)
            .with_detector_type(2)
            .with_validate_ordering(true);

        assert!((config.photon_energy - 3.0).abs() < f64::EPSILON);
        assert!((config.electron_energy - 1.5).abs() < f64::EPSILON);
        assert!((config.pair_mass - 0.1).abs() < f64::EPSILON);
        assert_eq!(config.detector_type, 2);
        assert!(config.validate_ordering);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_non_finite_threshold_rejected() {
        let config = TriggerConfig::new().with_pair_mass(f64::NAN);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonFiniteThreshold {
                name: "pair_mass",
                ..
            })
        ));
    }

    #[test]
    fn test_inverted_kinematic_window_rejected() {
        let config = PairConfig::default().with_kinematics(KinematicCuts {
            pt_min: 3.0,
            pt_max: 1.0,
            ..KinematicCuts::default()
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRange { name: "pt", .. })
        ));
    }

    #[test]
    fn test_partition_switches_pid_at_threshold() {
        let selection = PartitionSelection::default()
            .with_cut_bits(0b11)
            .with_pid(0b10, 0b100, 0.75);

        let slow = ParticleRecord::new(1, 0.6, 0.0, 0.0, 2212).with_bits(0b111, 0b10);
        let fast = ParticleRecord::new(1, 1.2, 0.0, 0.0, 2212).with_bits(0b11, 0b10);
        let fast_tof = ParticleRecord::new(1, 1.2, 0.0, 0.0, 2212).with_bits(0b11, 0b110);
        let bad_cut = ParticleRecord::new(1, 0.6, 0.0, 0.0, 2212).with_bits(0b01, 0b10);

        assert!(selection.accepts(&slow));
        assert!(!selection.accepts(&fast));
        assert!(selection.accepts(&fast_tof));
        assert!(!selection.accepts(&bad_cut));
    }

    #[test]
    fn test_vertex_window() {
        let cut = VertexCut::default();
        assert!(cut.accepts(0.0));
        assert!(!cut.accepts(10.0));
        assert!(!cut.accepts(-12.0));
        assert!(!cut.accepts(f64::NAN));

        let inverted = PairConfig::default().with_vertex(VertexCut {
            z_min: 5.0,
            z_max: -5.0,
        });
        assert!(matches!(
            inverted.validate(),
            Err(ConfigError::InvalidRange { name: "zvtx", .. })
        ));
    }

    #[test]
    fn test_kinematic_window_is_open() {
        let cuts = KinematicCuts::default();
        assert!(cuts.accepts(&ParticleRecord::new(1, 1.0, 0.0, 0.0, 2212)));
        assert!(!cuts.accepts(&ParticleRecord::new(1, 0.5, 0.0, 0.0, 2212)));
        assert!(!cuts.accepts(&ParticleRecord::new(1, 1.0, 0.8, 0.0, 2212)));
    }
}
