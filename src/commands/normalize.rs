//! Record normalization after rank sorting.
//!
//! For the record at 1-based rank `i`:
//! - `name` becomes `Peak_<i>`
//! - negative `start`/`end` are clamped to 0, independently
//! - a `-1` summit sentinel is replaced with the interval midpoint offset
//!
//! Clamping never reorders coordinates: a record left with `start > end` is
//! passed through unchanged and resolved by the boundary clipper. This stage
//! is pure, order-preserving, and never drops records.

use crate::narrowpeak::{NarrowPeakRecord, NO_SUMMIT};

/// Normalize command.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeCommand;

impl NormalizeCommand {
    pub fn new() -> Self {
        Self
    }

    /// Normalize a single record at the given 1-based rank.
    pub fn normalize_record(&self, record: &mut NarrowPeakRecord, rank: usize) {
        record.name = format!("Peak_{}", rank);

        if record.start < 0 {
            record.start = 0;
        }
        if record.end < 0 {
            record.end = 0;
        }

        if record.summit == NO_SUMMIT {
            record.summit = (record.end - record.start + 1) / 2;
        }
    }

    /// Normalize a rank-sorted slice in place, in rank order.
    pub fn normalize(&self, records: &mut [NarrowPeakRecord]) {
        for (i, record) in records.iter_mut().enumerate() {
            self.normalize_record(record, i + 1);
        }
    }
}
