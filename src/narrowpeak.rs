//! Streaming narrowPeak parser and writer.
//!
//! narrowPeak is tab-delimited ENCODE BED6+4: chrom, start, end, name,
//! score, strand, signalValue, pValue, qValue, summit offset. Coordinates
//! are 0-based, half-open. Raw MACS2 output may carry negative coordinates
//! and a `-1` summit sentinel; both are repaired downstream.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Summit sentinel meaning the caller did not estimate a summit.
pub const NO_SUMMIT: i64 = -1;

/// Errors that can occur during peak post-processing.
#[derive(Error, Debug)]
pub enum PeakError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("External process failed ({command}): exit code {code:?}")]
    ExternalProcess {
        command: String,
        code: Option<i32>,
    },

    #[error("Required output file is missing or empty: {0}")]
    EmptyOutput(PathBuf),
}

pub type Result<T> = std::result::Result<T, PeakError>;

/// One narrowPeak record.
///
/// `start`, `end` and `summit` are signed because raw caller output may
/// contain negative values. The remaining numeric columns are validated at
/// parse time but kept as raw text so pass-through fields are re-emitted
/// byte-for-byte, with no re-formatting.
#[derive(Debug, Clone, PartialEq)]
pub struct NarrowPeakRecord {
    pub chrom: String,
    pub start: i64,
    pub end: i64,
    pub name: String,
    pub score: String,
    pub strand: String,
    pub signal_value: String,
    pub p_value: String,
    pub q_value: String,
    pub summit: i64,
    /// Columns beyond the canonical 10, carried through verbatim.
    pub extra: Vec<String>,
}

impl NarrowPeakRecord {
    /// Parse a tab-delimited narrowPeak line.
    pub fn parse(line: &str, line_number: usize) -> Result<Self> {
        let fields: Vec<&str> = line.split('\t').collect();

        if fields.len() < 10 {
            return Err(PeakError::Parse {
                line: line_number,
                message: format!("Expected at least 10 fields, got {}", fields.len()),
            });
        }

        let start = parse_int(fields[1], "start", line_number)?;
        let end = parse_int(fields[2], "end", line_number)?;
        let summit = parse_int(fields[9], "summit", line_number)?;

        // Validate the remaining numeric columns without re-formatting them.
        validate_numeric(fields[4], "score", line_number)?;
        validate_numeric(fields[6], "signalValue", line_number)?;
        validate_numeric(fields[7], "pValue", line_number)?;
        validate_numeric(fields[8], "qValue", line_number)?;

        Ok(Self {
            chrom: fields[0].to_string(),
            start,
            end,
            name: fields[3].to_string(),
            score: fields[4].to_string(),
            strand: fields[5].to_string(),
            signal_value: fields[6].to_string(),
            p_value: fields[7].to_string(),
            q_value: fields[8].to_string(),
            summit,
            extra: fields[10..].iter().map(|s| s.to_string()).collect(),
        })
    }

    /// The ranking key: column 8, MACS2's -log10(p-value).
    #[inline]
    pub fn significance(&self) -> f64 {
        self.p_value.parse().unwrap_or(f64::NEG_INFINITY)
    }

    /// Interval length (clamped at zero for inverted raw records).
    #[inline]
    pub fn len(&self) -> i64 {
        (self.end - self.start).max(0)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

impl std::fmt::Display for NarrowPeakRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.chrom,
            self.start,
            self.end,
            self.name,
            self.score,
            self.strand,
            self.signal_value,
            self.p_value,
            self.q_value,
            self.summit
        )?;
        for field in &self.extra {
            write!(f, "\t{}", field)?;
        }
        Ok(())
    }
}

fn parse_int(s: &str, field_name: &str, line: usize) -> Result<i64> {
    s.parse().map_err(|_| PeakError::Parse {
        line,
        message: format!("Invalid {} value: '{}'", field_name, s),
    })
}

fn validate_numeric(s: &str, field_name: &str, line: usize) -> Result<()> {
    s.parse::<f64>().map(|_| ()).map_err(|_| PeakError::Parse {
        line,
        message: format!("Invalid {} value: '{}'", field_name, s),
    })
}

/// A streaming narrowPeak reader.
pub struct PeakReader<R: Read> {
    reader: BufReader<R>,
    line_number: usize,
    buffer: String,
}

impl PeakReader<File> {
    /// Open a narrowPeak file from a path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(file))
    }
}

impl<R: Read> PeakReader<R> {
    /// Create a new reader from any readable source.
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            line_number: 0,
            buffer: String::with_capacity(1024),
        }
    }

    /// Read the next record, skipping blank and comment lines.
    pub fn read_record(&mut self) -> Result<Option<NarrowPeakRecord>> {
        loop {
            self.buffer.clear();
            let bytes_read = self.reader.read_line(&mut self.buffer)?;
            if bytes_read == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let line = self.buffer.trim_end_matches(['\n', '\r']);
            if line.is_empty() || line.starts_with('#') || line.starts_with("track") {
                continue;
            }

            return NarrowPeakRecord::parse(line, self.line_number).map(Some);
        }
    }

    /// Get an iterator over all records.
    pub fn records(self) -> PeakRecordIter<R> {
        PeakRecordIter { reader: self }
    }
}

/// Iterator over narrowPeak records.
pub struct PeakRecordIter<R: Read> {
    reader: PeakReader<R>,
}

impl<R: Read> Iterator for PeakRecordIter<R> {
    type Item = Result<NarrowPeakRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

/// Read all records from a narrowPeak file.
pub fn read_peaks<P: AsRef<Path>>(path: P) -> Result<Vec<NarrowPeakRecord>> {
    let reader = PeakReader::from_path(path)?;
    reader.records().collect()
}

/// Parse records from a string (useful for testing).
pub fn parse_peaks(content: &str) -> Result<Vec<NarrowPeakRecord>> {
    let reader = PeakReader::new(content.as_bytes());
    reader.records().collect()
}

/// Buffered narrowPeak writer.
///
/// Integer columns are formatted with itoa; text columns are written as-is.
pub struct PeakWriter<W: Write> {
    writer: BufWriter<W>,
    itoa_buf: itoa::Buffer,
}

impl<W: Write> PeakWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(256 * 1024, writer),
            itoa_buf: itoa::Buffer::new(),
        }
    }

    /// Write one record as a tab-delimited line.
    pub fn write_record(&mut self, record: &NarrowPeakRecord) -> Result<()> {
        self.writer.write_all(record.chrom.as_bytes())?;
        self.writer.write_all(b"\t")?;
        self.writer
            .write_all(self.itoa_buf.format(record.start).as_bytes())?;
        self.writer.write_all(b"\t")?;
        self.writer
            .write_all(self.itoa_buf.format(record.end).as_bytes())?;
        self.writer.write_all(b"\t")?;
        self.writer.write_all(record.name.as_bytes())?;
        self.writer.write_all(b"\t")?;
        self.writer.write_all(record.score.as_bytes())?;
        self.writer.write_all(b"\t")?;
        self.writer.write_all(record.strand.as_bytes())?;
        self.writer.write_all(b"\t")?;
        self.writer.write_all(record.signal_value.as_bytes())?;
        self.writer.write_all(b"\t")?;
        self.writer.write_all(record.p_value.as_bytes())?;
        self.writer.write_all(b"\t")?;
        self.writer.write_all(record.q_value.as_bytes())?;
        self.writer.write_all(b"\t")?;
        self.writer
            .write_all(self.itoa_buf.format(record.summit).as_bytes())?;
        for field in &record.extra {
            self.writer.write_all(b"\t")?;
            self.writer.write_all(field.as_bytes())?;
        }
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    /// Write a whole record slice.
    pub fn write_records(&mut self, records: &[NarrowPeakRecord]) -> Result<()> {
        for record in records {
            self.write_record(record)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Write records to a plain-text file.
pub fn write_peaks<P: AsRef<Path>>(path: P, records: &[NarrowPeakRecord]) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = PeakWriter::new(file);
    writer.write_records(records)?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str = "chr1\t100\t200\tPeak_a\t150\t.\t5.04585\t7.21043\t4.11673\t50";

    #[test]
    fn test_parse_narrowpeak() {
        let rec = NarrowPeakRecord::parse(LINE, 1).unwrap();
        assert_eq!(rec.chrom, "chr1");
        assert_eq!(rec.start, 100);
        assert_eq!(rec.end, 200);
        assert_eq!(rec.name, "Peak_a");
        assert_eq!(rec.strand, ".");
        assert_eq!(rec.p_value, "7.21043");
        assert_eq!(rec.summit, 50);
        assert!(rec.extra.is_empty());
    }

    #[test]
    fn test_parse_negative_coordinates() {
        let rec =
            NarrowPeakRecord::parse("chr1\t-5\t10\tp\t0\t.\t1.0\t2.0\t0.5\t-1", 1).unwrap();
        assert_eq!(rec.start, -5);
        assert_eq!(rec.summit, NO_SUMMIT);
    }

    #[test]
    fn test_too_few_fields() {
        let result = NarrowPeakRecord::parse("chr1\t100\t200\tp\t0\t.", 3);
        assert!(matches!(
            result,
            Err(PeakError::Parse { line: 3, .. })
        ));
    }

    #[test]
    fn test_non_numeric_field() {
        let result =
            NarrowPeakRecord::parse("chr1\t100\t200\tp\t0\t.\tNA\t2.0\t0.5\t-1", 1);
        assert!(result.is_err());
    }

    #[test]
    fn test_roundtrip_is_byte_stable() {
        let rec = NarrowPeakRecord::parse(LINE, 1).unwrap();
        assert_eq!(rec.to_string(), LINE);

        let mut out = Vec::new();
        {
            let mut writer = PeakWriter::new(&mut out);
            writer.write_record(&rec).unwrap();
            writer.flush().unwrap();
        }
        assert_eq!(String::from_utf8(out).unwrap(), format!("{}\n", LINE));
    }

    #[test]
    fn test_extra_columns_pass_through() {
        let line = format!("{}\tfoo\tbar", LINE);
        let rec = NarrowPeakRecord::parse(&line, 1).unwrap();
        assert_eq!(rec.extra, vec!["foo".to_string(), "bar".to_string()]);
        assert_eq!(rec.to_string(), line);
    }

    #[test]
    fn test_significance() {
        let rec = NarrowPeakRecord::parse(LINE, 1).unwrap();
        assert!((rec.significance() - 7.21043).abs() < 1e-9);
    }

    #[test]
    fn test_reader_skips_comments_and_blanks() {
        let content = format!("# header\n\n{}\n", LINE);
        let peaks = parse_peaks(&content).unwrap();
        assert_eq!(peaks.len(), 1);
    }

    #[test]
    fn test_malformed_line_is_fatal() {
        let content = format!("{}\nchr1\t100\n", LINE);
        assert!(parse_peaks(&content).is_err());
    }
}
