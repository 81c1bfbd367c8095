//! Histogram sink for trigger statistics and pair distributions.
//!
//! The scanning code never owns histograms; it reports `(label, value)`
//! pairs to a [`HistogramSink`] supplied by the caller.

use evfilter_core::ConfigError;
use std::collections::BTreeMap;
use tracing::warn;

/// Receiver of labelled values.
pub trait HistogramSink {
    /// Records `value` under `label`.
    fn fill(&mut self, label: &str, value: f64);
}

impl<F> HistogramSink for F
where
    F: FnMut(&str, f64),
{
    fn fill(&mut self, label: &str, value: f64) {
        self(label, value);
    }
}

/// Fixed-width one-dimensional histogram over `[min, max)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram1D {
    min: f64,
    max: f64,
    counts: Vec<u64>,
    underflow: u64,
    overflow: u64,
}

impl Histogram1D {
    /// Creates a histogram with `bins` equal-width bins.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidBinning`] for zero bins or an empty or
    /// non-finite range.
    pub fn new(bins: usize, min: f64, max: f64) -> Result<Self, ConfigError> {
        if bins == 0 || !min.is_finite() || !max.is_finite() || min >= max {
            return Err(ConfigError::InvalidBinning {
                label: String::new(),
                bins,
                min,
                max,
            });
        }
        Ok(Self {
            min,
            max,
            counts: vec![0; bins],
            underflow: 0,
            overflow: 0,
        })
    }

    /// Adds one entry. NaN counts as overflow.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn fill(&mut self, value: f64) {
        if value < self.min {
            self.underflow += 1;
        } else if value >= self.max || value.is_nan() {
            self.overflow += 1;
        } else {
            let width = (self.max - self.min) / self.counts.len() as f64;
            let bin = (((value - self.min) / width) as usize).min(self.counts.len() - 1);
            self.counts[bin] += 1;
        }
    }

    /// In-range bin contents.
    #[must_use]
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Entries below `min`.
    #[must_use]
    pub fn underflow(&self) -> u64 {
        self.underflow
    }

    /// Entries at or above `max`.
    #[must_use]
    pub fn overflow(&self) -> u64 {
        self.overflow
    }

    /// Total entries including under- and overflow.
    #[must_use]
    pub fn entries(&self) -> u64 {
        self.counts.iter().sum::<u64>() + self.underflow + self.overflow
    }

    /// Lower edge of bin `bin`.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn bin_low_edge(&self, bin: usize) -> f64 {
        self.min + (self.max - self.min) * bin as f64 / self.counts.len() as f64
    }

    /// Adds the contents of a histogram with identical binning.
    ///
    /// Returns false, leaving `self` untouched, if the binning differs.
    pub fn merge(&mut self, other: &Histogram1D) -> bool {
        #[allow(clippy::float_cmp)]
        let same_binning = self.counts.len() == other.counts.len()
            && self.min == other.min
            && self.max == other.max;
        if !same_binning {
            return false;
        }
        for (count, add) in self.counts.iter_mut().zip(&other.counts) {
            *count += add;
        }
        self.underflow += other.underflow;
        self.overflow += other.overflow;
        true
    }
}

/// Named collection of histograms, ordered by label.
#[derive(Debug, Clone, Default)]
pub struct HistogramRegistry {
    histograms: BTreeMap<String, Histogram1D>,
}

impl HistogramRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a histogram; re-registering a label replaces it.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidBinning`] for unusable binning.
    pub fn add(&mut self, label: &str, bins: usize, min: f64, max: f64) -> Result<(), ConfigError> {
        let histogram = Histogram1D::new(bins, min, max).map_err(|err| match err {
            ConfigError::InvalidBinning { bins, min, max, .. } => ConfigError::InvalidBinning {
                label: label.to_string(),
                bins,
                min,
                max,
            },
            other => other,
        })?;
        self.histograms.insert(label.to_string(), histogram);
        Ok(())
    }

    /// Histogram registered under `label`.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&Histogram1D> {
        self.histograms.get(label)
    }

    /// Iterates over `(label, histogram)` in label order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Histogram1D)> {
        self.histograms.iter().map(|(label, h)| (label.as_str(), h))
    }

    /// Number of registered histograms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.histograms.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.histograms.is_empty()
    }

    /// Merges another registry, e.g. the output of a parallel batch.
    ///
    /// Labels missing here are copied; labels with different binning are
    /// skipped with a warning.
    pub fn merge(&mut self, other: &HistogramRegistry) {
        for (label, histogram) in &other.histograms {
            match self.histograms.get_mut(label) {
                Some(existing) => {
                    if !existing.merge(histogram) {
                        warn!(label = %label, "binning mismatch, histogram not merged");
                    }
                }
                None => {
                    self.histograms.insert(label.clone(), histogram.clone());
                }
            }
        }
    }
}

impl HistogramSink for HistogramRegistry {
    fn fill(&mut self, label: &str, value: f64) {
        match self.histograms.get_mut(label) {
            Some(histogram) => histogram.fill(value),
            None => warn!(label, "fill of unregistered histogram dropped"),
        }
    }
}
