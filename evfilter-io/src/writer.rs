//! File writers for trigger decisions, pair metrics and histograms.

use crate::Result;
use evfilter_algorithms::HistogramRegistry;
use evfilter_core::{PairMetricValue, TriggerDecision, TriggerKind};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Output encoding for trigger decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecisionFormat {
    /// One CSV row per group: `key,photon,electron,pair,antineutron,keep`.
    #[default]
    Csv,
    /// Format: for each decision an i64 key followed by a u8 flag mask,
    /// little endian. Total: 9 bytes per decision.
    Binary,
}

/// Streaming writer for trigger decisions.
///
/// Decisions are written as they arrive; call [`DecisionWriter::finish`]
/// to flush the buffer.
pub struct DecisionWriter {
    writer: BufWriter<File>,
    format: DecisionFormat,
    written: usize,
}

impl DecisionWriter {
    /// Creates the output file and writes the CSV header if needed.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P, format: DecisionFormat) -> Result<Self> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        if format == DecisionFormat::Csv {
            write!(writer, "key")?;
            for kind in TriggerKind::ALL {
                write!(writer, ",{}", kind.name())?;
            }
            writeln!(writer, ",keep")?;
        }
        Ok(Self {
            writer,
            format,
            written: 0,
        })
    }

    /// Writes one decision.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    pub fn write(&mut self, decision: &TriggerDecision) -> Result<()> {
        match self.format {
            DecisionFormat::Csv => {
                write!(self.writer, "{}", decision.key)?;
                for kind in TriggerKind::ALL {
                    write!(self.writer, ",{}", u8::from(decision.fired(kind)))?;
                }
                writeln!(self.writer, ",{}", u8::from(decision.keep()))?;
            }
            DecisionFormat::Binary => {
                self.writer.write_all(&decision.key.as_i64().to_le_bytes())?;
                self.writer.write_all(&[decision.flags.bits()])?;
            }
        }
        self.written += 1;
        Ok(())
    }

    /// Number of decisions written so far.
    #[must_use]
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flushes the writer and returns the number of decisions written.
    ///
    /// # Errors
    /// Returns an error if the flush fails.
    pub fn finish(mut self) -> Result<usize> {
        self.writer.flush()?;
        Ok(self.written)
    }
}

/// Streaming CSV writer for per-pair metric values: `key,value`.
pub struct PairMetricWriter {
    writer: BufWriter<File>,
}

impl PairMetricWriter {
    /// Creates the output file with a header naming the metric.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P, metric_name: &str) -> Result<Self> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "key,{metric_name}")?;
        Ok(Self { writer })
    }

    /// Writes one pair value.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    pub fn write(&mut self, value: &PairMetricValue) -> Result<()> {
        writeln!(self.writer, "{},{}", value.key, value.value)?;
        Ok(())
    }

    /// Flushes the writer.
    ///
    /// # Errors
    /// Returns an error if the flush fails.
    pub fn finish(mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Writes every histogram of a registry as CSV: `label,bin,low_edge,count`.
///
/// Underflow and overflow are written as bins `underflow` and `overflow`
/// with an empty low edge.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn write_histograms_csv<P: AsRef<Path>>(path: P, registry: &HistogramRegistry) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writeln!(writer, "label,bin,low_edge,count")?;

    for (label, histogram) in registry.iter() {
        writeln!(writer, "{label},underflow,,{}", histogram.underflow())?;
        for (bin, count) in histogram.counts().iter().enumerate() {
            writeln!(writer, "{label},{bin},{},{count}", histogram.bin_low_edge(bin))?;
        }
        writeln!(writer, "{label},overflow,,{}", histogram.overflow())?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use evfilter_algorithms::HistogramSink;
    use evfilter_core::{GroupKey, TriggerFlags};
    use tempfile::NamedTempFile;

    fn sample_decisions() -> Vec<TriggerDecision> {
        vec![
            TriggerDecision::new(
                GroupKey(1),
                TriggerFlags::from_kinds(&[TriggerKind::Photon, TriggerKind::Pair]),
            ),
            TriggerDecision::new(GroupKey(2), TriggerFlags::NONE),
        ]
    }

    #[test]
    fn test_write_decisions_csv() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = DecisionWriter::create(file.path(), DecisionFormat::Csv).unwrap();
        for decision in &sample_decisions() {
            writer.write(decision).unwrap();
        }
        assert_eq!(writer.finish().unwrap(), 2);

        let content = std::fs::read_to_string(file.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "key,photon,electron,pair,antineutron,keep");
        assert_eq!(lines[1], "1,1,0,1,0,1");
        assert_eq!(lines[2], "2,0,0,0,0,0");
    }

    #[test]
    fn test_write_decisions_binary() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = DecisionWriter::create(file.path(), DecisionFormat::Binary).unwrap();
        for decision in &sample_decisions() {
            writer.write(decision).unwrap();
        }
        writer.finish().unwrap();

        let data = std::fs::read(file.path()).unwrap();
        // 8 (i64) + 1 (u8) bytes per decision
        assert_eq!(data.len(), 18);
        assert_eq!(i64::from_le_bytes(data[9..17].try_into().unwrap()), 2);
        assert_eq!(data[8], sample_decisions()[0].flags.bits());
    }

    #[test]
    fn test_write_pair_metrics() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = PairMetricWriter::create(file.path(), "kstar").unwrap();
        writer
            .write(&PairMetricValue {
                key: GroupKey(4),
                value: 0.25,
            })
            .unwrap();
        writer.finish().unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(content, "key,kstar\n4,0.25\n");
    }

    #[test]
    fn test_write_histograms() {
        let mut registry = HistogramRegistry::new();
        registry.add("events", 2, 0.0, 2.0).unwrap();
        registry.fill("events", 1.0);
        registry.fill("events", 5.0);

        let file = NamedTempFile::new().unwrap();
        write_histograms_csv(file.path(), &registry).unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        assert!(content.starts_with("label,bin,low_edge,count\n"));
        assert!(content.contains("events,underflow,,0\n"));
        assert!(content.contains("events,0,0,0\n"));
        assert!(content.contains("events,1,1,1\n"));
        assert!(content.contains("events,overflow,,1\n"));
    }
}
