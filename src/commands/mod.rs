//! Pipeline stage implementations for peakcap.

pub mod callpeak;
pub mod clip;
pub mod normalize;
pub mod rank_sort;
pub mod subsample;

pub use callpeak::{human_readable_number, strip_ta_ext, CallPeakCommand};
pub use clip::ClipCommand;
pub use normalize::NormalizeCommand;
pub use rank_sort::{sort_mem_mb, RankSortCommand};
pub use subsample::SubsampleCommand;
