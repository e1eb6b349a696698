//! Single-flight image cache.
//!
//! Every locator is fetched at most once per cache lifetime. Failed
//! fetches are remembered too, so a known-bad image is not retried on
//! every relayout. There is no eviction.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use crate::image::DecodedImage;
use crate::url::Locator;

/// A cached fetch outcome: `None` marks a failed fetch.
pub type CachedImage = Option<Arc<DecodedImage>>;

/// Memoizes decoded images by locator.
///
/// Each key owns a [`OnceLock`]; the map lock is held only long enough
/// to find or create that slot. Concurrent callers for the same key
/// block on the one fetch in progress, while other keys proceed.
#[derive(Default)]
pub struct ImageCache {
    entries: Mutex<HashMap<Locator, Arc<OnceLock<CachedImage>>>>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached outcome for `locator`, invoking `fetch` only if
    /// no earlier call has stored one.
    pub fn get_image<F>(&self, locator: &Locator, fetch: F) -> CachedImage
    where
        F: FnOnce(&Locator) -> Option<DecodedImage>,
    {
        let slot = Arc::clone(self.lock().entry(locator.clone()).or_default());

        let mut fetched = false;
        let outcome = slot.get_or_init(|| {
            fetched = true;
            log::debug!("image cache miss: {locator}");
            fetch(locator).map(Arc::new)
        });
        if !fetched {
            log::trace!("image cache hit: {locator}");
        }
        outcome.clone()
    }

    /// Whether a fetch for `locator` has completed (successfully or not).
    pub fn contains(&self, locator: &Locator) -> bool {
        self.lock()
            .get(locator)
            .is_some_and(|slot| slot.get().is_some())
    }

    /// Number of keys with a slot, including fetches still in flight.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Forget every entry. Fetches already in flight finish into their
    /// detached slots.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Locator, Arc<OnceLock<CachedImage>>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
