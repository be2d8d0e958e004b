//! Utility types for the vbx exporter.
//!
//! - [`Error`] / [`Result`] - Error handling

mod error;

pub use error::*;
