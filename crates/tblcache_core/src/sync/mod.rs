//! Write-behind synchronization.
//!
//! - [`DumpSynchronizer`] - per-table dump passes, gate and watermark
//! - [`is_stale`] - the rule deciding which rows a pass evicts

mod dump;
mod staleness;

pub use dump::{DumpOutcome, DumpState, DumpSynchronizer};
pub use staleness::{is_stale, next_guaranteed_sync};
