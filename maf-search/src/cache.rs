//! Bounded LRU chunk cache with promise-coalescing (§4.8, C8).
//!
//! Concurrent queries for the same `(firstVOff, nextVOff)` pair must share one decompression. The
//! in-flight fetch is spawned onto the runtime so that a cancelled caller's `.await` does not
//! cancel work that other callers are still waiting on (§9's "model the cache value as a shared
//! future" note).

use std::future::Future;
use std::num::NonZeroUsize;
use std::pin::Pin;

use bytes::Bytes;
use futures::future::Shared;
use futures::FutureExt;
use noodles::bgzf::VirtualPosition;
use tokio::sync::Mutex;

use crate::error::MafError;

/// The cache key: a pair of raw virtual offsets bounding a decompressed chunk.
pub type ChunkKey = (u64, u64);

/// Packs a [`VirtualPosition`] into the raw `u64` layout used as half of a [`ChunkKey`].
pub fn raw_voffset(position: VirtualPosition) -> u64 {
  (position.compressed() << 16) | position.uncompressed() as u64
}

type BoxedFetch = Pin<Box<dyn Future<Output = Result<Bytes, MafError>> + Send>>;
type ChunkFuture = Shared<BoxedFetch>;

/// A bounded LRU over decompressed byte ranges, keyed by virtual-offset pair.
pub struct ChunkCache {
  entries: Mutex<lru::LruCache<ChunkKey, ChunkFuture>>,
}

impl ChunkCache {
  pub fn new(capacity: usize) -> Self {
    let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
    Self { entries: Mutex::new(lru::LruCache::new(capacity)) }
  }

  /// Returns the cached chunk for `key`, or runs `fetch` to produce it. `fetch` is spawned as an
  /// independent task so that dropping this call's future does not cancel the fetch itself —
  /// other concurrent callers waiting on the same key still receive the result.
  pub async fn get_or_fetch<F, Fut>(&self, key: ChunkKey, fetch: F) -> Result<Bytes, MafError>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Bytes, MafError>> + Send + 'static,
  {
    let mut guard = self.entries.lock().await;
    if let Some(existing) = guard.get(&key) {
      let shared = existing.clone();
      drop(guard);
      return shared.await;
    }

    let handle = tokio::spawn(fetch());
    let boxed: BoxedFetch = Box::pin(async move {
      match handle.await {
        Ok(result) => result,
        Err(_join_error) => Err(MafError::io("background chunk fetch panicked")),
      }
    });
    let shared: ChunkFuture = boxed.shared();
    guard.put(key, shared.clone());
    drop(guard);

    shared.await
  }

  /// Number of entries currently resident, for test/diagnostic use.
  pub async fn len(&self) -> usize {
    self.entries.lock().await.len()
  }
}
