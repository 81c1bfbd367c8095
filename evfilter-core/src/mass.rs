//! Mass hypotheses keyed by PDG code.

use crate::error::ConfigError;
use std::collections::HashMap;

/// Resolves a PDG identity code to a mass in GeV.
pub trait MassLookup: Send + Sync {
    /// Returns the mass for `pdg_code`.
    ///
    /// # Errors
    /// Returns [`ConfigError::UnknownPdgCode`] when the code is not known.
    fn mass(&self, pdg_code: i32) -> Result<f64, ConfigError>;
}

const KNOWN_MASSES: &[(i32, f64)] = &[
    (11, 0.000_510_999),
    (13, 0.105_658_4),
    (22, 0.0),
    (111, 0.134_976_8),
    (211, 0.139_570_39),
    (310, 0.497_611),
    (321, 0.493_677),
    (2112, 0.939_565_42),
    (2212, 0.938_272_08),
    (3122, 1.115_683),
    (3312, 1.321_71),
    (3334, 1.672_45),
    (1_000_010_020, 1.875_612_94),
];

/// Mass table with common hadrons, leptons and light nuclei.
///
/// Antiparticles resolve through the absolute value of the code.
#[derive(Debug, Clone)]
pub struct MassTable {
    masses: HashMap<i32, f64>,
}

impl Default for MassTable {
    fn default() -> Self {
        Self {
            masses: KNOWN_MASSES.iter().copied().collect(),
        }
    }
}

impl MassTable {
    /// Creates the default table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an entry.
    #[must_use]
    pub fn with_entry(mut self, pdg_code: i32, mass: f64) -> Self {
        self.masses.insert(pdg_code.abs(), mass);
        self
    }
}

impl MassLookup for MassTable {
    fn mass(&self, pdg_code: i32) -> Result<f64, ConfigError> {
        self.masses
            .get(&pdg_code.abs())
            .copied()
            .ok_or(ConfigError::UnknownPdgCode(pdg_code))
    }
}
