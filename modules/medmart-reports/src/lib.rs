//! Read-side aggregate queries over a published warehouse snapshot.
//!
//! Pure functions: whatever serving layer the deployment owns (HTTP, CLI,
//! notebook) calls these against `WarehouseStore::load_full()`.

pub mod queries;
pub mod schemas;

pub use queries::*;
pub use schemas::*;
