//! External collaborator traits (§1 "Out of scope"): the core consumes these, it never
//! implements them. Grounded on the teacher's `StorageTrait` — an async, object-safe boundary
//! between the engine and whatever I/O backend the host wires in.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Random-access reads of byte ranges over a bgzf file, returning already-decompressed bytes.
/// BGZF decompression itself is out of scope (§1); an implementation typically wraps
/// `noodles::bgzf::Reader` or an equivalent remote-range client.
#[async_trait]
pub trait CompressedFileReader: Send + Sync {
  /// Reads and decompresses the bytes covering `[offset, offset + len)` of the *compressed*
  /// file, returning the decompressed payload.
  async fn read_range(&self, offset: u64, len: u64) -> Result<Bytes>;
}

/// One BigBed feature returned by a [`BigBedQuery`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BigBedFeature {
  pub ref_name: String,
  pub start: u32,
  pub end: u32,
  /// The feature's extra (non-BED3) column, carrying the `mafBlock` string for BigMaf (§4.6).
  pub extra_column: String,
}

/// BigBed R-tree interval lookup. The R-tree traversal itself is out of scope (§1).
#[async_trait]
pub trait BigBedQuery: Send + Sync {
  async fn query(&self, ref_name: &str, start: u32, end: u32) -> Result<Vec<BigBedFeature>>;
}

/// One BED-like row returned by a [`TabixQuery`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabixRow {
  pub ref_name: String,
  pub start: u32,
  pub end: u32,
  /// The row's 5th field, carrying the MafTabix alignment tuples (§4.7).
  pub field5: String,
}

/// Tabix interval lookup. The Tabix index traversal itself is out of scope (§1).
#[async_trait]
pub trait TabixQuery: Send + Sync {
  async fn query(&self, ref_name: &str, start: u32, end: u32) -> Result<Vec<TabixRow>>;
}
