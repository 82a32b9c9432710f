//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the exchanges we ingest from (`Exchange`) and their raw payload (`RawSourceResponse`)
//! - the normalized record (`CbPriceRecord`)
//! - the persisted latest envelope (`LatestPriceEnvelope`)

pub mod types;

pub use types::*;
