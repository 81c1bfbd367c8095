//! Pair combination policies and pair metrics.

use crate::kinematics::{invariant_mass, relative_momentum, LorentzVector};
use crate::record::GroupKey;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Rule selecting which record pairs of a group are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PairCombinationPolicy {
    /// Unordered pairs `(i, j)` with `i < j`; both slices view one partition.
    SelfPairs,
    /// Every `(i, j)` across two partitions, without deduplication.
    CrossPairs,
}

impl PairCombinationPolicy {
    /// Number of pairs produced for partitions of size `n1` and `n2`.
    #[must_use]
    pub fn pair_count(self, n1: usize, n2: usize) -> usize {
        match self {
            PairCombinationPolicy::SelfPairs => {
                // sum over i < n1 of |{j : i < j < n2}|
                let rows = n1.min(n2);
                (0..rows).map(|i| n2 - i - 1).sum()
            }
            PairCombinationPolicy::CrossPairs => n1 * n2,
        }
    }
}

/// Scalar computed from two four-vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PairMetric {
    /// Invariant mass of the pair, clamped at zero.
    #[default]
    InvariantMass,
    /// Relative momentum k* in the pair rest frame.
    RelativeMomentum,
}

impl PairMetric {
    #[inline]
    #[must_use]
    pub fn evaluate(self, p0: &LorentzVector, p1: &LorentzVector) -> f64 {
        match self {
            PairMetric::InvariantMass => invariant_mass(p0, p1),
            PairMetric::RelativeMomentum => relative_momentum(p0, p1),
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            PairMetric::InvariantMass => "mass",
            PairMetric::RelativeMomentum => "kstar",
        }
    }
}

/// A pair metric tagged with the group it was computed in.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PairMetricValue {
    pub key: GroupKey,
    pub value: f64,
}
