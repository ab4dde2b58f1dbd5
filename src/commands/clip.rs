//! Boundary clipping against a chromosome size table.
//!
//! Clamps coordinates into `[0, chrom_length)`. Records on chromosomes
//! absent from the table are dropped, not errors; this is how peaks called
//! on contigs outside the reference size file are discarded. Records whose
//! clamped `start > end` are dropped as well. Order-preserving for kept
//! records, and idempotent.

use std::fs::File;
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use log::debug;

use crate::chrsz::ChromSizes;
use crate::narrowpeak::{read_peaks, NarrowPeakRecord, PeakWriter, Result};

/// Clip command.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClipCommand;

impl ClipCommand {
    pub fn new() -> Self {
        Self
    }

    /// Clamp a single record into `[0, chrom_length)`.
    /// Returns false if the record should be dropped.
    #[inline]
    pub fn clip_record(&self, record: &mut NarrowPeakRecord, chrom_length: u64) -> bool {
        record.start = record.start.max(0);
        record.end = record.end.min(chrom_length as i64 - 1);
        record.start <= record.end
    }

    /// Clip a record sequence, dropping unknown-chromosome and inverted
    /// records.
    pub fn clip(&self, records: Vec<NarrowPeakRecord>, chrsz: &ChromSizes) -> Vec<NarrowPeakRecord> {
        let total = records.len();
        let mut kept = Vec::with_capacity(total);

        for mut record in records {
            let chrom_length = match chrsz.size_of(&record.chrom) {
                Some(length) => length,
                None => {
                    debug!("Dropping peak on unknown chromosome {}", record.chrom);
                    continue;
                }
            };

            if self.clip_record(&mut record, chrom_length) {
                kept.push(record);
            }
        }

        if kept.len() < total {
            debug!("Clipping dropped {} of {} peaks", total - kept.len(), total);
        }
        kept
    }

    /// Clip a peaks file and write the result as a gzip-compressed
    /// narrowPeak file. Returns the number of records kept.
    pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input: P,
        chrsz: &ChromSizes,
        output: Q,
    ) -> Result<usize> {
        let records = read_peaks(input)?;
        let kept = self.clip(records, chrsz);

        let file = File::create(output)?;
        let mut encoder = GzEncoder::new(file, Compression::default());
        {
            let mut writer = PeakWriter::new(&mut encoder);
            writer.write_records(&kept)?;
            writer.flush()?;
        }
        encoder.try_finish()?;
        Ok(kept.len())
    }
}
