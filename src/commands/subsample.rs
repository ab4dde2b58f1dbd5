//! Control TAGALIGN subsampling.
//!
//! Reduces a control tag-alignment file to a fixed read depth before peak
//! calling. Single-end input is sampled one line per read; paired-end input
//! keeps adjacent R1/R2 line pairs together and samples `depth / 2` pairs.
//! Input may be plain or gzipped (detected by extension); output is always
//! gzipped into the output directory.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use log::info;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::narrowpeak::Result;

use super::callpeak::{human_readable_number, strip_ta_ext};

/// Default RNG seed, fixed for reproducible subsampling.
const DEFAULT_SEED: u64 = 12345;

/// Subsample command configuration.
#[derive(Debug, Clone)]
pub struct SubsampleCommand {
    /// Target read depth.
    pub depth: u64,
    /// Sample adjacent line pairs instead of single lines.
    pub paired_end: bool,
    /// RNG seed.
    pub seed: u64,
}

impl SubsampleCommand {
    pub fn new(depth: u64, paired_end: bool) -> Self {
        Self {
            depth,
            paired_end,
            seed: DEFAULT_SEED,
        }
    }

    /// Number of sampling units (reads for SE, pairs for PE).
    fn unit_count(&self) -> usize {
        if self.paired_end {
            (self.depth / 2) as usize
        } else {
            self.depth as usize
        }
    }

    /// Subsample a TAGALIGN file into `out_dir`.
    /// Returns the path of the gzipped subsampled file.
    pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(&self, ta: P, out_dir: Q) -> Result<PathBuf> {
        let ta = ta.as_ref();
        let units = self.sample_units(open_tagalign(ta)?)?;

        let base = strip_ta_ext(&file_name(ta));
        let out_path = out_dir.as_ref().join(format!(
            "{}.subsampled.{}.tagAlign.gz",
            base,
            human_readable_number(self.depth)
        ));

        info!(
            "Subsampling control to {} reads: {}",
            self.depth,
            out_path.display()
        );

        let file = File::create(&out_path)?;
        let mut encoder = GzEncoder::new(file, Compression::default());
        for unit in &units {
            for line in unit {
                encoder.write_all(line.as_bytes())?;
                encoder.write_all(b"\n")?;
            }
        }
        encoder.finish()?;

        Ok(out_path)
    }

    /// Reservoir-sample line units from a reader.
    fn sample_units<R: BufRead>(&self, reader: R) -> Result<Vec<Vec<String>>> {
        let k = self.unit_count();
        let mut rng = SmallRng::seed_from_u64(self.seed);
        let mut reservoir: Vec<Vec<String>> = Vec::with_capacity(k.min(1 << 20));
        let mut seen = 0usize;
        let mut pending: Option<String> = None;

        for line_result in reader.lines() {
            let line = line_result?;
            if line.is_empty() {
                continue;
            }

            let unit = if self.paired_end {
                match pending.take() {
                    None => {
                        pending = Some(line);
                        continue;
                    }
                    Some(first) => vec![first, line],
                }
            } else {
                vec![line]
            };

            if k == 0 {
                continue;
            }
            if seen < k {
                reservoir.push(unit);
            } else {
                let j = rng.gen_range(0..=seen);
                if j < k {
                    reservoir[j] = unit;
                }
            }
            seen += 1;
        }

        // Unpaired trailing line in PE mode is carried through as-is.
        if let Some(last) = pending {
            if k > 0 && seen < k {
                reservoir.push(vec![last]);
            }
        }

        Ok(reservoir)
    }
}

fn open_tagalign(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    let is_gzipped = path
        .extension()
        .map(|ext| ext == "gz" || ext == "gzip")
        .unwrap_or(false);

    let reader: Box<dyn Read> = if is_gzipped {
        Box::new(MultiGzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(Box::new(BufReader::new(reader)))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
