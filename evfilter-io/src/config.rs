//! JSON analysis configuration.

use crate::Result;
use evfilter_core::{PairConfig, TriggerConfig};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Combined configuration of the trigger scan and the pair analysis.
///
/// Every field is optional in the JSON document; missing fields keep
/// their defaults:
///
/// ```json
/// {
///   "trigger": { "photon_energy": 2.5, "shape": { "min_cells": 3 } },
///   "pair": { "policy": "self_pairs", "metric": "invariant_mass" }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Thresholds of the group trigger scan.
    pub trigger: TriggerConfig,
    /// Selections of the same-event pair analysis.
    pub pair: PairConfig,
}

impl AnalysisConfig {
    /// Loads and validates a configuration file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// holds an invalid threshold or range.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let config: Self = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a configuration from a JSON string.
    ///
    /// # Errors
    /// Returns an error if the string is not valid JSON or holds an
    /// invalid threshold or range.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks both sections.
    ///
    /// # Errors
    /// Returns the first configuration error found.
    pub fn validate(&self) -> Result<()> {
        self.trigger.validate()?;
        self.pair.validate()?;
        Ok(())
    }
}
