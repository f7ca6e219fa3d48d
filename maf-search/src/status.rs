//! Cooperative status reporting (§7): coarse phase markers ("Downloading index", "Downloading
//! alignments", "Processing line N") surfaced to a host-supplied callback. The callback is an
//! adapter over the same `tracing` events the engine already emits on these paths, so the two
//! can't drift apart — there is no second, independently-maintained set of checkpoints.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

/// A host-supplied progress sink. Invoked with one phase marker at a time, at the coarse
/// intervals each call site already rate-limits to (e.g. once per ~1000 TAF lines).
#[derive(Clone)]
pub struct StatusCallback(Arc<dyn Fn(&str) + Send + Sync>);

impl StatusCallback {
  pub fn new<F>(callback: F) -> Self
  where
    F: Fn(&str) + Send + Sync + 'static,
  {
    Self(Arc::new(callback))
  }

  fn call(&self, message: &str) {
    (self.0)(message);
  }
}

impl fmt::Debug for StatusCallback {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("StatusCallback(..)")
  }
}

/// The single choke point every phase marker in this crate goes through: always a `debug!` span,
/// and — if the caller supplied one — a call to `callback`.
pub fn report(callback: Option<&StatusCallback>, message: &str) {
  debug!(status = message);
  if let Some(callback) = callback {
    callback.call(message);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};

  #[test]
  fn report_invokes_the_callback_with_the_message() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let callback = {
      let calls = calls.clone();
      let seen = seen.clone();
      StatusCallback::new(move |message| {
        calls.fetch_add(1, Ordering::SeqCst);
        seen.lock().unwrap().push(message.to_string());
      })
    };

    report(Some(&callback), "Downloading index");
    report(Some(&callback), "Downloading alignments");

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(*seen.lock().unwrap(), vec!["Downloading index", "Downloading alignments"]);
  }

  #[test]
  fn report_with_no_callback_does_not_panic() {
    report(None, "Processing line 1000");
  }
}
