//! Exchange data sources.
//!
//! - adapter contract and outcomes (`source`)
//! - HTTP implementation for TWSE / TPEx (`client`)

pub mod client;
pub mod source;

pub use client::{ExchangeClient, interpret_response};
pub use source::{FetchError, FetchOutcome, PriceSource};
