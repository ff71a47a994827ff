#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Input plumbing shared by every pipeline stage.
//!
//! Reads source bytes from disk or over HTTP (bounded timeout, one retry),
//! resolves candidate column labels in priority order, parses numeric and
//! coordinate cells, and loads pipeline configs from TOML, including the
//! configs embedded at compile time.

pub mod columns;
pub mod config;
pub mod fetch;
pub mod parsing;
pub mod progress;
pub mod registry;
pub mod table;

use thiserror::Error;

/// Errors that can occur while reading a source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source could not be read or fetched.
    #[error("Source unavailable: {location}: {reason}")]
    Unavailable {
        /// File path or URL.
        location: String,
        /// What went wrong.
        reason: String,
    },

    /// The source was readable but lacks a required column or attribute.
    #[error("Schema error: {message}")]
    Schema {
        /// Description of what is missing.
        message: String,
    },

    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl SourceError {
    /// Creates an [`SourceError::Unavailable`] for `location`.
    pub fn unavailable(location: impl ToString, reason: impl ToString) -> Self {
        Self::Unavailable {
            location: location.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Returns `true` if the source is readable but has the wrong shape.
    #[must_use]
    pub const fn is_schema(&self) -> bool {
        matches!(self, Self::Schema { .. })
    }
}
