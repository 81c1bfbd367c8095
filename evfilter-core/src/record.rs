//! Record types consumed by the trigger scanner and the pair engine.

use crate::error::DataError;
use crate::kinematics::{FourMomentum, LorentzVector};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identifier shared by all records of one collision.
///
/// Only equality is meaningful: the input stream is already sorted so that
/// records of one group are contiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GroupKey(pub i64);

impl GroupKey {
    /// Creates a new group key.
    #[inline]
    #[must_use]
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw identifier.
    #[inline]
    #[must_use]
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for GroupKey {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Common interface for records that arrive grouped by collision.
pub trait Record: Send + Sync {
    /// Returns the collision this record belongs to.
    fn group_key(&self) -> GroupKey;

    /// Checks that every numeric attribute is finite.
    ///
    /// # Errors
    /// Returns [`DataError::NonFinite`] naming the first offending field.
    fn validate(&self) -> Result<(), DataError>;
}

fn check_finite(key: GroupKey, fields: &[(&'static str, f64)]) -> Result<(), DataError> {
    match fields.iter().find(|(_, value)| !value.is_finite()) {
        Some(&(field, value)) => Err(DataError::NonFinite { key, field, value }),
        None => Ok(()),
    }
}

/// A calorimeter cluster.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClusterRecord {
    /// Collision id.
    pub key: GroupKey,
    /// Global bunch-crossing id.
    pub bc: u64,
    /// Cluster energy (GeV).
    pub e: f64,
    /// Momentum x component (GeV/c).
    pub px: f64,
    /// Momentum y component (GeV/c).
    pub py: f64,
    /// Momentum z component (GeV/c).
    pub pz: f64,
    /// Long axis of the shower ellipse.
    pub m02: f64,
    /// Short axis of the shower ellipse.
    pub m20: f64,
    /// Number of cells in the cluster.
    pub n_cells: u16,
    /// Distance to the nearest charged-track hit, in sigmas.
    pub track_dist: f64,
    /// Calorimeter subtype.
    pub detector_type: u8,
}

impl ClusterRecord {
    /// Creates a cluster with the given energy and momentum.
    ///
    /// Shape parameters are zero, the track distance is large (neutral) and
    /// the bunch crossing equals the collision id.
    #[must_use]
    pub fn new(key: i64, e: f64, px: f64, py: f64, pz: f64) -> Self {
        Self {
            key: GroupKey(key),
            bc: key.unsigned_abs(),
            e,
            px,
            py,
            pz,
            m02: 0.0,
            m20: 0.0,
            n_cells: 1,
            track_dist: f64::MAX,
            detector_type: 0,
        }
    }

    /// Sets the shower shape.
    #[must_use]
    pub fn with_shape(mut self, n_cells: u16, m02: f64, m20: f64) -> Self {
        self.n_cells = n_cells;
        self.m02 = m02;
        self.m20 = m20;
        self
    }

    /// Sets the track distance.
    #[must_use]
    pub fn with_track_dist(mut self, track_dist: f64) -> Self {
        self.track_dist = track_dist;
        self
    }

    /// Sets the bunch-crossing id.
    #[must_use]
    pub fn with_bc(mut self, bc: u64) -> Self {
        self.bc = bc;
        self
    }

    /// Sets the calorimeter subtype.
    #[must_use]
    pub fn with_detector_type(mut self, detector_type: u8) -> Self {
        self.detector_type = detector_type;
        self
    }
}

impl Record for ClusterRecord {
    #[inline]
    fn group_key(&self) -> GroupKey {
        self.key
    }

    fn validate(&self) -> Result<(), DataError> {
        // track_dist may legitimately be f64::MAX, but not NaN.
        if self.track_dist.is_nan() {
            return Err(DataError::NonFinite {
                key: self.key,
                field: "track_dist",
                value: self.track_dist,
            });
        }
        check_finite(
            self.key,
            &[
                ("e", self.e),
                ("px", self.px),
                ("py", self.py),
                ("pz", self.pz),
                ("m02", self.m02),
                ("m20", self.m20),
            ],
        )
    }
}

impl FourMomentum for ClusterRecord {
    /// Clusters carry a measured energy; the mass hypothesis is not used.
    fn four_momentum(&self, _mass: f64) -> LorentzVector {
        LorentzVector::new(self.e, self.px, self.py, self.pz)
    }
}

/// A reconstructed particle used for femtoscopic pairing.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ParticleRecord {
    /// Collision id.
    pub key: GroupKey,
    /// Transverse momentum (GeV/c).
    pub pt: f64,
    /// Pseudorapidity.
    pub eta: f64,
    /// Azimuth (rad).
    pub phi: f64,
    /// PDG code of the identity hypothesis.
    pub pdg_code: i32,
    /// Track-quality selection bits.
    pub cut_bits: u32,
    /// Particle-identification bits.
    pub pid_bits: u32,
    /// Particle type (0 = track).
    pub particle_type: u8,
    /// Primary vertex z of the collision (cm), when known.
    pub zvtx: Option<f64>,
}

impl ParticleRecord {
    /// Creates a track with no selection bits set.
    #[must_use]
    pub fn new(key: i64, pt: f64, eta: f64, phi: f64, pdg_code: i32) -> Self {
        Self {
            key: GroupKey(key),
            pt,
            eta,
            phi,
            pdg_code,
            cut_bits: 0,
            pid_bits: 0,
            particle_type: 0,
            zvtx: None,
        }
    }

    /// Sets selection and PID bits.
    #[must_use]
    pub fn with_bits(mut self, cut_bits: u32, pid_bits: u32) -> Self {
        self.cut_bits = cut_bits;
        self.pid_bits = pid_bits;
        self
    }

    /// Sets the particle type.
    #[must_use]
    pub fn with_particle_type(mut self, particle_type: u8) -> Self {
        self.particle_type = particle_type;
        self
    }

    /// Sets the collision's vertex z position.
    #[must_use]
    pub fn with_zvtx(mut self, zvtx: f64) -> Self {
        self.zvtx = Some(zvtx);
        self
    }
}

impl Record for ParticleRecord {
    #[inline]
    fn group_key(&self) -> GroupKey {
        self.key
    }

    fn validate(&self) -> Result<(), DataError> {
        check_finite(
            self.key,
            &[("pt", self.pt), ("eta", self.eta), ("phi", self.phi)],
        )
    }
}

impl FourMomentum for ParticleRecord {
    fn four_momentum(&self, mass: f64) -> LorentzVector {
        LorentzVector::from_pt_eta_phi_m(self.pt, self.eta, self.phi, mass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_builder() {
        let clu = ClusterRecord::new(7, 1.5, 0.1, 0.2, 0.3)
            .with_shape(4, 0.5, 0.3)
            .with_track_dist(1.0)
            .with_bc(1234)
            .with_detector_type(1);
        assert_eq!(clu.group_key(), GroupKey(7));
        assert_eq!(clu.n_cells, 4);
        assert_eq!(clu.bc, 1234);
        assert_eq!(clu.detector_type, 1);
        assert!(clu.validate().is_ok());
    }

    #[test]
    fn test_cluster_default_track_dist_is_valid() {
        let clu = ClusterRecord::new(1, 1.0, 0.0, 0.0, 1.0);
        assert!(clu.validate().is_ok());
    }

    #[test]
    fn test_non_finite_cluster_rejected() {
        let clu = ClusterRecord::new(3, f64::NAN, 0.0, 0.0, 0.0);
        let err = clu.validate().unwrap_err();
        assert!(matches!(err, DataError::NonFinite { field: "e", .. }));
    }

    #[test]
    fn test_non_finite_particle_rejected() {
        let part = ParticleRecord::new(3, 1.0, f64::INFINITY, 0.0, 2212);
        assert!(matches!(
            part.validate(),
            Err(DataError::NonFinite { field: "eta", .. })
        ));
    }
}
