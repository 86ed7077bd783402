//! Star-schema warehouse core for scraped Telegram channel data.
//!
//! Raw scrape records flow through four stages, each a pure function of the
//! previous stage's output: deduplication, dimension building, fact
//! assembly, integrity validation. A run publishes its result as an
//! immutable snapshot behind an atomic swap; a failed run leaves the
//! previous snapshot untouched.

pub mod dedup;
pub mod dimensions;
pub mod facts;
pub mod ingest;
pub mod pipeline;
pub mod run_log;
pub mod snapshot;
pub mod stats;
pub mod validate;

pub use dimensions::KeyRegistry;
pub use pipeline::{Pipeline, RunOutcome};
pub use snapshot::{WarehouseSnapshot, WarehouseStore};
pub use stats::RunStats;
pub use validate::{CheckResult, CheckSeverity, ValidationReport};
