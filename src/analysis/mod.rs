//! Analysis module for replicate summaries and data export.

pub mod export;
pub mod summary;

pub use export::{ExportManifest, ExportSystem};
pub use summary::{column_names, ReplicateSummary, RECORD_WIDTH};
