//! Error taxonomy for runway.
//!
//! Everything travels as a `color_eyre::Report`; these variants are the
//! failures callers may want to tell apart (via `downcast_ref`).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunwayError {
  /// Required settings are missing. Raised before any network call.
  #[error("Not configured (missing {}). Run: runway --configure", .missing.join(", "))]
  NotConfigured { missing: Vec<&'static str> },

  /// The service answered with a non-success status.
  #[error("API Error: {status} - {body}")]
  Service { status: u16, body: String },

  #[error("No updates specified")]
  NoUpdates,

  /// A `prioritize` argument that isn't `<id>=<priority>`.
  #[error("Invalid assignment '{0}', expected <id>=<priority>")]
  InvalidAssignment(String),
}
