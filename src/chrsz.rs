//! Chromosome sizes file parser.
//!
//! Parses 2-column files (tab-delimited: chrom\tlength) as used by the
//! boundary clipper and for deriving an effective genome size.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use rustc_hash::FxHashMap;

use crate::narrowpeak::PeakError;

/// Immutable chromosome length table.
#[derive(Debug, Clone, Default)]
pub struct ChromSizes {
    sizes: FxHashMap<String, u64>,
}

impl ChromSizes {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            sizes: FxHashMap::default(),
        }
    }

    /// Load chromosome sizes from a file.
    /// Format: tab-delimited with chrom\tlength per line.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PeakError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut sizes = FxHashMap::default();

        for (line_num, line_result) in reader.lines().enumerate() {
            let line = line_result?;
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 2 {
                return Err(PeakError::Parse {
                    line: line_num + 1,
                    message: "Chromosome sizes file requires two columns: chrom and length"
                        .to_string(),
                });
            }

            let length: u64 = fields[1].parse().map_err(|_| PeakError::Parse {
                line: line_num + 1,
                message: format!("Invalid chromosome length: {}", fields[1]),
            })?;

            sizes.insert(fields[0].to_string(), length);
        }

        Ok(Self { sizes })
    }

    /// Get the length of a chromosome.
    #[inline]
    pub fn size_of(&self, chrom: &str) -> Option<u64> {
        self.sizes.get(chrom).copied()
    }

    /// Check if a chromosome exists.
    #[inline]
    pub fn contains(&self, chrom: &str) -> bool {
        self.sizes.contains_key(chrom)
    }

    /// Sum of all chromosome lengths (effective genome size fallback).
    pub fn total(&self) -> u64 {
        self.sizes.values().sum()
    }

    /// Get number of chromosomes.
    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    /// Insert a chromosome length.
    pub fn insert(&mut self, chrom: impl Into<String>, length: u64) {
        self.sizes.insert(chrom.into(), length);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_chrsz_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "chr1\t248956422").unwrap();
        writeln!(file, "chr2\t242193529").unwrap();
        writeln!(file, "# comment line").unwrap();
        writeln!(file, "chrM\t16569").unwrap();

        let chrsz = ChromSizes::from_file(file.path()).unwrap();

        assert_eq!(chrsz.size_of("chr1"), Some(248956422));
        assert_eq!(chrsz.size_of("chrM"), Some(16569));
        assert_eq!(chrsz.size_of("chrX_random"), None);
        assert_eq!(chrsz.len(), 3);
        assert_eq!(chrsz.total(), 248956422 + 242193529 + 16569);
    }

    #[test]
    fn test_invalid_length() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "chr1\tnot_a_number").unwrap();

        assert!(ChromSizes::from_file(file.path()).is_err());
    }

    #[test]
    fn test_missing_column() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "chr1").unwrap();

        assert!(ChromSizes::from_file(file.path()).is_err());
    }

    #[test]
    fn test_insert_and_contains() {
        let mut chrsz = ChromSizes::new();
        chrsz.insert("chr1", 1000);

        assert!(chrsz.contains("chr1"));
        assert!(!chrsz.contains("chr2"));
        assert_eq!(chrsz.total(), 1000);
    }
}
