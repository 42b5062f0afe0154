//! Request fingerprinting and the in-flight entry map.
//!
//! The map enforces the core invariant: at most one live transport call per
//! fingerprint. The check-then-insert sequence runs under one lock before
//! any suspension point, so the guarantee holds under real parallelism and
//! under reentrant single-threaded scheduling alike.

use crate::abort::AbortController;
use crate::config::MergedConfig;
use crate::error::Result;
use crate::response::Payload;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tokio::time::Instant;

/// Where a settled value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// A fresh transport call.
    Network,
    /// The in-process de-duplication map.
    MemoryCache,
    /// The external persistent store.
    StoreCache,
}

/// A settled request: the payload plus its provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct Settled {
    /// The value the request resolved with.
    pub payload: Payload,
    /// Which tier produced it.
    pub source: Source,
}

/// The settlement future shared by every caller of one fingerprint.
pub(crate) type SharedSettlement = Shared<BoxFuture<'static, Result<Settled>>>;

/// One tracked request.
pub(crate) struct InFlightEntry {
    pub settlement: SharedSettlement,
    /// Absent when the caller supplied an external signal.
    pub controller: Option<AbortController>,
    pub exclude_from_abort_all: bool,
    /// Set at settlement under a `Retain` policy; `None` means the entry
    /// lives until settlement bookkeeping (or forever, under `Forever`).
    pub expires_at: Option<Instant>,
}

/// Compute the fingerprint of a merged configuration.
///
/// Two logically identical requests map to the same digest; distinguishable
/// requests must not. Headers arrive sorted (BTreeMap iteration order), so
/// header insertion order never splits a fingerprint.
pub(crate) fn fingerprint(config: &MergedConfig) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(base_url) = &config.base_url {
        parts.push(base_url.clone());
    }
    parts.push(config.url.clone());
    parts.push(config.method.to_string());
    if let Some(data) = &config.data {
        parts.push(data.to_string());
    }
    for (key, value) in &config.headers {
        parts.push(format!("{key}={value}"));
    }

    let mut hasher = Sha256::new();
    hasher.update(parts.join("_").as_bytes());
    hex::encode(hasher.finalize())
}

/// Fingerprint-keyed map of in-flight (and retained) entries. Doubles as
/// the cancellation registry for `abort_all`.
#[derive(Default)]
pub(crate) struct InFlightMap {
    entries: Mutex<HashMap<String, InFlightEntry>>,
}

impl InFlightMap {
    /// Return the existing live entry for `key`, or insert the one built by
    /// `make`. The whole check-then-insert runs under the map lock.
    ///
    /// Returns the shared settlement, its controller, and whether this was
    /// a hit.
    pub(crate) fn get_or_insert_with(
        &self,
        key: &str,
        make: impl FnOnce() -> InFlightEntry,
    ) -> (SharedSettlement, Option<AbortController>, bool) {
        let mut entries = self.entries.lock();

        if let Some(entry) = entries.get(key) {
            if entry.expires_at.is_some_and(|at| at <= Instant::now()) {
                entries.remove(key);
            } else {
                return (entry.settlement.clone(), entry.controller.clone(), true);
            }
        }

        let entry = make();
        let settlement = entry.settlement.clone();
        let controller = entry.controller.clone();
        entries.insert(key.to_string(), entry);
        (settlement, controller, false)
    }

    /// Drop the entry for `key`, if any.
    pub(crate) fn remove(&self, key: &str) {
        self.entries.lock().remove(key);
    }

    /// Keep the entry for `key` until `at`, then let lazy eviction or
    /// `evict_expired` reclaim it.
    pub(crate) fn set_expiry(&self, key: &str, at: Instant) {
        if let Some(entry) = self.entries.lock().get_mut(key) {
            entry.expires_at = Some(at);
        }
    }

    /// Abort every tracked call that has not opted out.
    pub(crate) fn abort_all(&self) {
        let entries = self.entries.lock();
        for entry in entries.values() {
            if entry.exclude_from_abort_all {
                continue;
            }
            if let Some(controller) = &entry.controller {
                controller.abort();
            }
        }
    }

    /// Drop every entry whose retention window has passed.
    pub(crate) fn evict_expired(&self) {
        let now = Instant::now();
        self.entries
            .lock()
            .retain(|_, entry| !entry.expires_at.is_some_and(|at| at <= now));
    }

    /// Number of tracked entries.
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }
}
