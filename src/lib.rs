//! Data connectors: pluggable backends behind one lifecycle contract.

pub mod communication;
pub mod config;
pub mod connector;
pub mod connectors;
pub mod error;
pub mod finder;
pub mod registry;
pub mod transport;

pub use error::{Error, Result};
