//! Memory-mapped record readers.
//!
//! Input tables are comma-separated text with a header row naming the
//! columns. Blank lines and lines starting with `#` are skipped. Column
//! order is free; unknown columns are ignored.
//!
//! Cluster tables require `key,e,px,py,pz` and accept `bc`, `n_cells`,
//! `m02`, `m20`, `track_dist` and `detector_type`. Particle tables require
//! `key,pt,eta,phi,pdg` and accept `cut_bits`, `pid_bits`, `particle_type`
//! and `zvtx`.

use crate::{Error, Result};
use evfilter_core::{ClusterRecord, ParticleRecord};
use memmap2::Mmap;
use std::fmt::Display;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// A memory-mapped file reader.
///
/// Uses memmap2 to access file contents without loading the entire file
/// into memory.
pub struct MappedFileReader {
    mmap: Mmap,
    path: PathBuf,
}

impl MappedFileReader {
    /// Opens a file for memory-mapped reading.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or memory-mapped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        // SAFETY: The file is opened read-only and we assume it is not modified concurrently.
        // This is the standard safety contract for memory mapping.
        #[allow(unsafe_code)]
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self {
            mmap,
            path: path.as_ref().to_path_buf(),
        })
    }

    /// Returns the file contents as a byte slice.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap[..]
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    /// Returns true if the file is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// Path the reader was opened with.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Reads a cluster table from disk.
///
/// # Errors
/// Returns an error if the file cannot be mapped or a row is malformed.
pub fn read_clusters<P: AsRef<Path>>(path: P) -> Result<Vec<ClusterRecord>> {
    let reader = MappedFileReader::open(path)?;
    let clusters = parse_clusters(reader.as_bytes())?;
    debug!(path = %reader.path().display(), records = clusters.len(), "read clusters");
    Ok(clusters)
}

/// Reads a particle table from disk.
///
/// # Errors
/// Returns an error if the file cannot be mapped or a row is malformed.
pub fn read_particles<P: AsRef<Path>>(path: P) -> Result<Vec<ParticleRecord>> {
    let reader = MappedFileReader::open(path)?;
    let particles = parse_particles(reader.as_bytes())?;
    debug!(path = %reader.path().display(), records = particles.len(), "read particles");
    Ok(particles)
}

/// Parses a cluster table from raw bytes.
///
/// # Errors
/// Returns an error if the input is not UTF-8, a required column is
/// missing, or a row does not parse.
pub fn parse_clusters(bytes: &[u8]) -> Result<Vec<ClusterRecord>> {
    let table = Table::new(bytes)?;
    let key = table.require("key")?;
    let e = table.require("e")?;
    let px = table.require("px")?;
    let py = table.require("py")?;
    let pz = table.require("pz")?;
    let bc = table.column("bc");
    let n_cells = table.column("n_cells");
    let m02 = table.column("m02");
    let m20 = table.column("m20");
    let track_dist = table.column("track_dist");
    let detector_type = table.column("detector_type");

    table
        .rows()
        .map(|row| -> Result<ClusterRecord> {
            let row = row?;
            let mut cluster = ClusterRecord::new(
                row.parse(key)?,
                row.parse(e)?,
                row.parse(px)?,
                row.parse(py)?,
                row.parse(pz)?,
            );
            if let Some(value) = row.parse_optional(bc)? {
                cluster = cluster.with_bc(value);
            }
            cluster = cluster.with_shape(
                row.parse_optional(n_cells)?.unwrap_or(cluster.n_cells),
                row.parse_optional(m02)?.unwrap_or(cluster.m02),
                row.parse_optional(m20)?.unwrap_or(cluster.m20),
            );
            if let Some(value) = row.parse_optional(track_dist)? {
                cluster = cluster.with_track_dist(value);
            }
            if let Some(value) = row.parse_optional(detector_type)? {
                cluster = cluster.with_detector_type(value);
            }
            Ok(cluster)
        })
        .collect()
}

/// Parses a particle table from raw bytes.
///
/// # Errors
/// Returns an error if the input is not UTF-8, a required column is
/// missing, or a row does not parse.
pub fn parse_particles(bytes: &[u8]) -> Result<Vec<ParticleRecord>> {
    let table = Table::new(bytes)?;
    let key = table.require("key")?;
    let pt = table.require("pt")?;
    let eta = table.require("eta")?;
    let phi = table.require("phi")?;
    let pdg = table.require("pdg")?;
    let cut_bits = table.column("cut_bits");
    let pid_bits = table.column("pid_bits");
    let particle_type = table.column("particle_type");
    let zvtx = table.column("zvtx");

    table
        .rows()
        .map(|row| -> Result<ParticleRecord> {
            let row = row?;
            let mut particle = ParticleRecord::new(
                row.parse(key)?,
                row.parse(pt)?,
                row.parse(eta)?,
                row.parse(phi)?,
                row.parse(pdg)?,
            )
            .with_bits(
                row.parse_optional(cut_bits)?.unwrap_or(0),
                row.parse_optional(pid_bits)?.unwrap_or(0),
            )
            .with_particle_type(row.parse_optional(particle_type)?.unwrap_or(0));
            if let Some(z) = row.parse_optional(zvtx)? {
                particle = particle.with_zvtx(z);
            }
            Ok(particle)
        })
        .collect()
}

/// Header-indexed view over CSV text.
struct Table<'a> {
    header: Vec<&'a str>,
    header_line: usize,
    text: &'a str,
}

impl<'a> Table<'a> {
    fn new(bytes: &'a [u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|err| Error::InvalidFormat(format!("input is not UTF-8: {err}")))?;
        let (index, line) = content_lines(text)
            .next()
            .ok_or_else(|| Error::InvalidFormat("missing header row".to_string()))?;
        Ok(Self {
            header: line.split(',').map(str::trim).collect(),
            header_line: index,
            text,
        })
    }

    fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|column| *column == name)
    }

    fn require(&self, name: &str) -> Result<usize> {
        self.column(name)
            .ok_or_else(|| Error::InvalidFormat(format!("missing column '{name}'")))
    }

    fn rows(&'a self) -> impl Iterator<Item = Result<Row<'a>>> + 'a {
        let width = self.header.len();
        content_lines(self.text)
            .skip_while(move |(index, _)| *index <= self.header_line)
            .map(move |(index, line)| {
                let fields: Vec<&str> = line.split(',').map(str::trim).collect();
                if fields.len() == width {
                    Ok(Row {
                        line: index + 1,
                        fields,
                        header: &self.header,
                    })
                } else {
                    Err(Error::Parse {
                        line: index + 1,
                        message: format!("expected {width} fields, found {}", fields.len()),
                    })
                }
            })
    }
}

struct Row<'a> {
    line: usize,
    fields: Vec<&'a str>,
    header: &'a [&'a str],
}

impl Row<'_> {
    fn parse<T>(&self, column: usize) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        let field = self.fields[column];
        field.parse().map_err(|err| Error::Parse {
            line: self.line,
            message: format!("column '{}': cannot parse '{field}': {err}", self.header[column]),
        })
    }

    fn parse_optional<T>(&self, column: Option<usize>) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: Display,
    {
        column.map(|column| self.parse(column)).transpose()
    }
}

/// Non-blank, non-comment lines with their zero-based line index.
fn content_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines().enumerate().filter(|(_, line)| {
        let trimmed = line.trim();
        !trimmed.is_empty() && !trimmed.starts_with('#')
    })
}
