//! Streaming query driver (§4.9, C9): the unified front door. Resolves the adapter kind, fetches
//! and decompresses bytes through the chunk cache, and produces a lazy block sequence filtered to
//! `[queryStart, queryEnd)`. Cancellation is checked before each external fetch and before each
//! yielded block (§5).

use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::bigmaf;
use crate::cache::{raw_voffset, ChunkCache};
use crate::capability::{BigBedQuery, CompressedFileReader, TabixQuery};
use crate::error::{MafError, Result};
use crate::maftabix;
use crate::model::AlignmentBlock;
use crate::status::{report, StatusCallback};
use crate::tai::TaiIndex;
use crate::taf::TafReconstructor;

/// A genomic interval query, resolved against one adapter instance.
#[derive(Debug, Clone)]
pub struct Region {
  pub assembly_name: Option<String>,
  pub ref_name: String,
  pub start: u32,
  pub end: u32,
}

/// The capability this crate exposes to callers (§1): `query(region) -> LazySequence<Block>`.
/// `status`, if supplied, receives the coarse phase markers from §7 (`"Downloading index"`,
/// `"Downloading alignments"`, `"Processing line N"`) as they occur.
#[async_trait::async_trait]
pub trait MafBlockSource: Send + Sync {
  async fn query(
    &self,
    region: Region,
    cancel: CancellationToken,
    status: Option<StatusCallback>,
  ) -> BoxStream<'static, Result<AlignmentBlock>>;
}

/// One 64 KB bgzf block's worth of slack, added to every TAF read so a block boundary is
/// guaranteed to lie beyond the query interval (§4.9 step 2).
const BGZF_SLACK: u64 = 65536;

/// The TAF adapter: `.tai` index lookup, cached decompression, row-instruction replay.
pub struct TafSource {
  reader: Arc<dyn CompressedFileReader>,
  tai: Arc<TaiIndex>,
  cache: Arc<ChunkCache>,
  configured_ref: Option<String>,
}

impl TafSource {
  pub fn new(
    reader: Arc<dyn CompressedFileReader>,
    tai: Arc<TaiIndex>,
    cache: Arc<ChunkCache>,
    configured_ref: Option<String>,
  ) -> Self {
    Self { reader, tai, cache, configured_ref }
  }
}

#[async_trait::async_trait]
impl MafBlockSource for TafSource {
  #[instrument(level = "trace", skip(self, cancel, status))]
  async fn query(
    &self,
    region: Region,
    cancel: CancellationToken,
    status: Option<StatusCallback>,
  ) -> BoxStream<'static, Result<AlignmentBlock>> {
    if cancel.is_cancelled() {
      return stream::once(async { Err(MafError::Cancelled) }).boxed();
    }

    report(status.as_ref(), "Downloading index");
    let Some((first, next)) = self.tai.lookup(&region.ref_name, region.start, region.end) else {
      return stream::empty().boxed();
    };

    let first_block_pos = first.voffset.compressed();
    let next_block_pos = next.voffset.compressed();
    let read_len = if next_block_pos > first_block_pos {
      (next_block_pos - first_block_pos) + BGZF_SLACK
    } else {
      BGZF_SLACK
    };
    let read_offset = first_block_pos;

    let key = (raw_voffset(first.voffset), raw_voffset(next.voffset));
    let reader = self.reader.clone();
    let cache = self.cache.clone();

    report(status.as_ref(), "Downloading alignments");
    let fetch_result = cache
      .get_or_fetch(key, move || async move { reader.read_range(read_offset, read_len).await })
      .await;

    let bytes = match fetch_result {
      Ok(bytes) => bytes,
      Err(err) => return stream::once(async move { Err(err) }).boxed(),
    };

    if cancel.is_cancelled() {
      return stream::once(async { Err(MafError::Cancelled) }).boxed();
    }

    let data_pos = first.voffset.uncompressed() as usize;
    let end_offset = if first_block_pos == next_block_pos && next.voffset.uncompressed() > first.voffset.uncompressed()
    {
      next.voffset.uncompressed() as usize
    } else {
      bytes.len()
    };

    let slice = bytes.get(data_pos..end_offset.max(data_pos).min(bytes.len())).unwrap_or(&[]);
    let text = String::from_utf8_lossy(slice).into_owned();

    let mut reconstructor = TafReconstructor::new(
      text,
      region.start,
      region.end,
      self.configured_ref.clone(),
      region.assembly_name.clone(),
    );
    if let Some(status) = status {
      reconstructor = reconstructor.with_status(status);
    }

    stream::iter(reconstructor.map(Ok::<AlignmentBlock, MafError>))
      .take_while(move |_| {
        let cancelled = cancel.is_cancelled();
        async move { !cancelled }
      })
      .boxed()
  }
}

/// The BigMaf adapter: an external R-tree lookup, then §4.6 per-feature decoding.
pub struct BigMafSource {
  bigbed: Arc<dyn BigBedQuery>,
}

impl BigMafSource {
  pub fn new(bigbed: Arc<dyn BigBedQuery>) -> Self {
    Self { bigbed }
  }
}

#[async_trait::async_trait]
impl MafBlockSource for BigMafSource {
  #[instrument(level = "trace", skip(self, cancel, status))]
  async fn query(
    &self,
    region: Region,
    cancel: CancellationToken,
    status: Option<StatusCallback>,
  ) -> BoxStream<'static, Result<AlignmentBlock>> {
    if cancel.is_cancelled() {
      return stream::once(async { Err(MafError::Cancelled) }).boxed();
    }

    // One R-tree lookup covers both the index traversal and the feature fetch; there is no
    // separate index phase to report the way TAF has.
    report(status.as_ref(), "Downloading alignments");
    let features = match self.bigbed.query(&region.ref_name, region.start, region.end).await {
      Ok(features) => features,
      Err(err) => return stream::once(async move { Err(err) }).boxed(),
    };

    stream::iter(features.into_iter().map(|feature| {
      Ok(bigmaf::decode_feature(
        &feature.ref_name,
        feature.start,
        feature.end,
        &feature.extra_column,
      ))
    }))
    .take_while(move |_| {
      let cancelled = cancel.is_cancelled();
      async move { !cancelled }
    })
    .boxed()
  }
}

/// The MafTabix adapter: an external Tabix lookup, then §4.7 per-row decoding.
pub struct MafTabixSource {
  tabix: Arc<dyn TabixQuery>,
  configured_ref: Option<String>,
}

impl MafTabixSource {
  pub fn new(tabix: Arc<dyn TabixQuery>, configured_ref: Option<String>) -> Self {
    Self { tabix, configured_ref }
  }
}

#[async_trait::async_trait]
impl MafBlockSource for MafTabixSource {
  #[instrument(level = "trace", skip(self, cancel, status))]
  async fn query(
    &self,
    region: Region,
    cancel: CancellationToken,
    status: Option<StatusCallback>,
  ) -> BoxStream<'static, Result<AlignmentBlock>> {
    if cancel.is_cancelled() {
      return stream::once(async { Err(MafError::Cancelled) }).boxed();
    }

    report(status.as_ref(), "Downloading alignments");
    let rows = match self.tabix.query(&region.ref_name, region.start, region.end).await {
      Ok(rows) => rows,
      Err(err) => return stream::once(async move { Err(err) }).boxed(),
    };

    let configured_ref = self.configured_ref.clone();
    let query_assembly = region.assembly_name.clone();

    stream::iter(rows.into_iter().map(move |row| {
      Ok(maftabix::decode_row(
        &row.ref_name,
        row.start,
        row.end,
        &row.field5,
        configured_ref.as_deref(),
        query_assembly.as_deref(),
      ))
    }))
    .take_while(move |_| {
      let cancelled = cancel.is_cancelled();
      async move { !cancelled }
    })
    .boxed()
  }
}
