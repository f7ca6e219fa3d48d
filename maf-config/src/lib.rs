//! Configuration, error taxonomy, and tracing/CLI bootstrap shared by the MAF query engine.
//!

pub mod config;
pub mod error;

pub use config::{Config, MafTabixLocation, SampleDescriptor, SampleSelection, TafLocation, USAGE};
pub use error::{Error, Result};
