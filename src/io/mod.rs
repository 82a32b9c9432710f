//! Input/output helpers.
//!
//! - exchange row parsing + normalization (`ingest`)
//! - dated snapshot and latest envelope files (`snapshot`)

pub mod ingest;
pub mod snapshot;

pub use ingest::*;
pub use snapshot::*;
