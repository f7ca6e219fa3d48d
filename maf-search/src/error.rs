//! Error taxonomy for the MAF query engine (§7 of `spec.md`).
//!

use thiserror::Error;

/// The result type used throughout this crate.
pub type Result<T> = core::result::Result<T, MafError>;

/// Errors produced while querying an alignment file.
///
/// Each variant corresponds to one bucket of §7's taxonomy: `NotFound` and `Malformed` are
/// recovered locally by the producing component (an empty sequence, or a skipped line/token);
/// `Io` and `Cancelled` are surfaced to the caller as a terminal event on the block stream;
/// `Invariant` is a programmer error and aborts the query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MafError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("malformed input: {0}")]
  Malformed(String),

  #[error("io error: {0}")]
  Io(String),

  #[error("query cancelled")]
  Cancelled,

  #[error("invariant violated: {0}")]
  Invariant(String),
}

impl MafError {
  pub fn not_found<S: Into<String>>(message: S) -> Self {
    Self::NotFound(message.into())
  }

  pub fn malformed<S: Into<String>>(message: S) -> Self {
    Self::Malformed(message.into())
  }

  pub fn io<S: Into<String>>(message: S) -> Self {
    Self::Io(message.into())
  }

  pub fn invariant<S: Into<String>>(message: S) -> Self {
    Self::Invariant(message.into())
  }

  /// Whether this error should be recovered from locally (§7), as opposed to surfaced as a
  /// terminal event on the block stream.
  pub fn is_recoverable(&self) -> bool {
    matches!(self, Self::NotFound(_) | Self::Malformed(_))
  }
}

impl From<std::io::Error> for MafError {
  fn from(err: std::io::Error) -> Self {
    Self::Io(err.to_string())
  }
}
