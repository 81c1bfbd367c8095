//! Four-vector kinematics for pair metrics.

use std::ops::Add;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Energy-momentum four-vector in natural units (GeV).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LorentzVector {
    pub e: f64,
    pub px: f64,
    pub py: f64,
    pub pz: f64,
}

impl LorentzVector {
    #[inline]
    #[must_use]
    pub fn new(e: f64, px: f64, py: f64, pz: f64) -> Self {
        Self { e, px, py, pz }
    }

    /// Builds a four-vector from collider coordinates and a mass hypothesis.
    #[must_use]
    pub fn from_pt_eta_phi_m(pt: f64, eta: f64, phi: f64, mass: f64) -> Self {
        let px = pt * phi.cos();
        let py = pt * phi.sin();
        let pz = pt * eta.sinh();
        let p = pt * eta.cosh();
        Self {
            e: p.hypot(mass),
            px,
            py,
            pz,
        }
    }

    /// Squared invariant mass; may be slightly negative from cancellation.
    #[inline]
    #[must_use]
    pub fn mass_squared(&self) -> f64 {
        self.e * self.e - self.px * self.px - self.py * self.py - self.pz * self.pz
    }

    /// Invariant mass with the radicand clamped at zero.
    #[inline]
    #[must_use]
    pub fn mass(&self) -> f64 {
        self.mass_squared().max(0.0).sqrt()
    }

    /// Magnitude of the three-momentum.
    #[inline]
    #[must_use]
    pub fn p(&self) -> f64 {
        (self.px * self.px + self.py * self.py + self.pz * self.pz).sqrt()
    }

    /// Velocity of the frame in which this vector is at rest.
    #[must_use]
    pub fn boost_vector(&self) -> [f64; 3] {
        [self.px / self.e, self.py / self.e, self.pz / self.e]
    }

    /// Applies a Lorentz boost with velocity `beta`.
    ///
    /// `|beta|` must be strictly below one.
    #[must_use]
    pub fn boosted(&self, beta: [f64; 3]) -> Self {
        let [bx, by, bz] = beta;
        let b2 = bx * bx + by * by + bz * bz;
        let gamma = 1.0 / (1.0 - b2).sqrt();
        let bp = bx * self.px + by * self.py + bz * self.pz;
        let gamma2 = if b2 > 0.0 { (gamma - 1.0) / b2 } else { 0.0 };

        Self {
            e: gamma * (self.e + bp),
            px: self.px + gamma2 * bp * bx + gamma * bx * self.e,
            py: self.py + gamma2 * bp * by + gamma * by * self.e,
            pz: self.pz + gamma2 * bp * bz + gamma * bz * self.e,
        }
    }
}

impl Add for LorentzVector {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            e: self.e + rhs.e,
            px: self.px + rhs.px,
            py: self.py + rhs.py,
            pz: self.pz + rhs.pz,
        }
    }
}

/// Records that can be expressed as a four-vector under a mass hypothesis.
pub trait FourMomentum {
    /// Returns the four-momentum assuming the given mass (GeV).
    fn four_momentum(&self, mass: f64) -> LorentzVector;
}

impl FourMomentum for LorentzVector {
    fn four_momentum(&self, _mass: f64) -> LorentzVector {
        *self
    }
}

/// Invariant mass of the pair, `sqrt(max(0, (p0 + p1)^2))`.
#[must_use]
pub fn invariant_mass(p0: &LorentzVector, p1: &LorentzVector) -> f64 {
    (*p0 + *p1).mass()
}

/// Relative momentum k* of the pair in its rest frame.
///
/// Both vectors are boosted into the pair rest frame and half the magnitude
/// of their momentum difference is returned.
#[must_use]
pub fn relative_momentum(p0: &LorentzVector, p1: &LorentzVector) -> f64 {
    let sum = *p0 + *p1;
    if sum.e <= 0.0 {
        return 0.0;
    }
    let [bx, by, bz] = sum.boost_vector();
    // Lightlike pair: no rest frame, and k* = m/2 = 0 for massless members.
    if bx * bx + by * by + bz * bz >= 1.0 {
        return 0.0;
    }
    let beta = [-bx, -by, -bz];
    let q0 = p0.boosted(beta);
    let q1 = p1.boosted(beta);
    let dx = q0.px - q1.px;
    let dy = q0.py - q1.py;
    let dz = q0.pz - q1.pz;
    0.5 * (dx * dx + dy * dy + dz * dz).sqrt()
}
