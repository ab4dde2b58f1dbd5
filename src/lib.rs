//! peakcap: MACS2 peak-call post-processing
//!
//! This library turns raw MACS2 narrowPeak output into a ranked, capped,
//! coordinate-clipped, gzip-compressed peak file.
//!
//! # Pipeline
//!
//! - **Rank sort**: stable sort by -log10(p-value), descending
//! - **Normalize**: sequential `Peak_<rank>` names, negative-coordinate
//!   repair, summit-offset backfill
//! - **Cap**: keep the top N peaks
//! - **Clip**: clamp coordinates to chromosome bounds, dropping peaks on
//!   contigs missing from the size table
//!
//! # Example
//!
//! ```rust,no_run
//! use peakcap::chrsz::ChromSizes;
//! use peakcap::commands::{ClipCommand, NormalizeCommand, RankSortCommand};
//! use peakcap::narrowpeak::read_peaks;
//!
//! let chrsz = ChromSizes::from_file("hg38.chrom.sizes").unwrap();
//! let raw = read_peaks("sample_peaks.narrowPeak").unwrap();
//!
//! let mut sorted = RankSortCommand::new().sort(raw);
//! NormalizeCommand::new().normalize(&mut sorted);
//! sorted.truncate(500_000);
//! let clipped = ClipCommand::new().clip(sorted, &chrsz);
//! ```

pub mod chrsz;
pub mod commands;
pub mod narrowpeak;
pub mod runner;

// Re-export commonly used types
pub use chrsz::ChromSizes;
pub use narrowpeak::{NarrowPeakRecord, PeakError, PeakReader, PeakWriter};
pub use runner::{ExternalRunner, ShellRunner};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::chrsz::ChromSizes;
    pub use crate::commands::{
        CallPeakCommand, ClipCommand, NormalizeCommand, RankSortCommand, SubsampleCommand,
    };
    pub use crate::narrowpeak::{NarrowPeakRecord, PeakError, PeakReader, PeakWriter};
    pub use crate::runner::{ExternalRunner, ShellRunner};
}
