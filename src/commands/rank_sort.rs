//! Significance-ranked peak sorting.
//!
//! Sort order (matches `LC_COLLATE=C sort -k 8gr,8gr`):
//! 1. Column 8 (-log10 p-value), descending, general-numeric
//! 2. Ties: input order preserved (stable sort)
//!
//! Comparison uses `f64::total_cmp`, a plain byte-level total order that is
//! never locale-aware, so output is reproducible across environments.

use memchr::memchr;
use memmap2::Mmap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::narrowpeak::{NarrowPeakRecord, PeakError, PeakWriter, Result};

/// Minimum file size to use mmap (smaller files use buffered I/O)
const MMAP_THRESHOLD: usize = 64 * 1024;

/// Estimated bytes per narrowPeak line, for capacity pre-sizing.
const LINE_SIZE_ESTIMATE: usize = 80;

const MIB: u64 = 1024 * 1024;

/// Working-buffer hint for an external merge sort: twice the input size,
/// rounded up to whole mebibytes. An in-memory sort treats this as a
/// capacity hint only; it never affects ordering.
#[inline]
pub fn sort_mem_mb(input_bytes: u64) -> u64 {
    (2 * input_bytes).div_ceil(MIB)
}

/// Rank sort command.
#[derive(Debug, Clone, Copy, Default)]
pub struct RankSortCommand;

impl RankSortCommand {
    pub fn new() -> Self {
        Self
    }

    /// Stable sort by significance, descending.
    pub fn sort(&self, records: Vec<NarrowPeakRecord>) -> Vec<NarrowPeakRecord> {
        // Decorate with the parsed key once so comparisons stay cheap.
        let mut keyed: Vec<(f64, NarrowPeakRecord)> = records
            .into_iter()
            .map(|r| (r.significance(), r))
            .collect();
        keyed.sort_by(|a, b| b.0.total_cmp(&a.0));
        keyed.into_iter().map(|(_, r)| r).collect()
    }

    /// Load all records from a raw peaks file.
    ///
    /// Files at or above the mmap threshold are memory-mapped; smaller
    /// files are read into a pre-sized buffer.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<Vec<NarrowPeakRecord>> {
        let file = File::open(path)?;
        let file_size = file.metadata()?.len() as usize;

        if file_size >= MMAP_THRESHOLD {
            let mmap = unsafe { Mmap::map(&file)? };
            parse_records(&mmap)
        } else {
            let mut data = Vec::with_capacity(file_size);
            let mut file = file;
            file.read_to_end(&mut data)?;
            parse_records(&data)
        }
    }

    /// Sort a raw peaks file into a writer. Returns the record count.
    pub fn run<P: AsRef<Path>, W: Write>(&self, input: P, output: &mut W) -> Result<usize> {
        let records = self.load(input)?;
        let sorted = self.sort(records);

        let mut writer = PeakWriter::new(output);
        writer.write_records(&sorted)?;
        writer.flush()?;
        Ok(sorted.len())
    }
}

/// Parse every data line in a byte buffer, preserving input order.
fn parse_records(data: &[u8]) -> Result<Vec<NarrowPeakRecord>> {
    let mut records = Vec::with_capacity(data.len() / LINE_SIZE_ESTIMATE);
    let mut pos = 0;
    let mut line_number = 0;

    while pos < data.len() {
        let line_end = match memchr(b'\n', &data[pos..]) {
            Some(offset) => pos + offset,
            None => data.len(),
        };
        line_number += 1;

        let mut end = line_end;
        if end > pos && data[end - 1] == b'\r' {
            end -= 1;
        }

        let line = &data[pos..end];
        if !(line.is_empty() || line[0] == b'#' || line.starts_with(b"track")) {
            let line = std::str::from_utf8(line).map_err(|_| PeakError::Parse {
                line: line_number,
                message: "Line is not valid UTF-8".to_string(),
            })?;
            records.push(NarrowPeakRecord::parse(line, line_number)?);
        }

        pos = line_end + 1;
    }

    Ok(records)
}
