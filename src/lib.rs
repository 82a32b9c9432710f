//! `cb-prices` library crate.
//!
//! The binary (`cb-prices`) is a thin wrapper around this library so that:
//!
//! - the pipeline is testable without network access or spawning processes
//! - exchanges, the parser and the snapshot writer can be driven independently

pub mod app;
pub mod cli;
pub mod clock;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod report;
