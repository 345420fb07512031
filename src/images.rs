//! Image cache resolver: turns a [`PhotoMap`] into name → bytes, fetching
//! in parallel and dropping entries that fail.

use crate::debug::DebugLogger;
use crate::error::{FetchError, ReportError};
use crate::record::PhotoMap;
use rayon::prelude::*;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Resolves a URL to raw image bytes.
pub trait ImageFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Cooperative cancellation flag shared between the caller and a render.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Fetched images keyed by logical photo name, in photo-map order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedImageMap {
    entries: Vec<(String, Arc<[u8]>)>,
}

impl ResolvedImageMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an entry; a replaced entry keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, data: impl Into<Arc<[u8]>>) {
        let name = name.into();
        let data = data.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = data,
            None => self.entries.push((name, data)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<[u8]>> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, data)| data)
    }

    pub fn first(&self) -> Option<(&str, &Arc<[u8]>)> {
        self.entries.first().map(|(name, data)| (name.as_str(), data))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<[u8]>)> {
        self.entries.iter().map(|(name, data)| (name.as_str(), data))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    pub requested: usize,
    pub resolved: usize,
    pub failed: usize,
    pub skipped_blank: usize,
}

enum Attempt {
    Fetched(Arc<[u8]>),
    Failed(FetchError),
    Skipped,
}

/// Fetches every non-blank entry of `photos`. Failed entries are left out;
/// a cancelled resolve yields [`ReportError::Cancelled`] and no map.
pub fn resolve(
    photos: &PhotoMap,
    fetcher: &dyn ImageFetcher,
    cancel: &CancelToken,
) -> Result<ResolvedImageMap, ReportError> {
    resolve_with_stats(photos, fetcher, cancel, None).map(|(images, _)| images)
}

pub(crate) fn resolve_with_stats(
    photos: &PhotoMap,
    fetcher: &dyn ImageFetcher,
    cancel: &CancelToken,
    debug: Option<&DebugLogger>,
) -> Result<(ResolvedImageMap, FetchStats), ReportError> {
    let mut stats = FetchStats::default();
    let mut candidates: Vec<(&str, &str)> = Vec::with_capacity(photos.len());
    for (name, url) in photos.iter() {
        let url = url.trim();
        if url.is_empty() {
            stats.skipped_blank += 1;
            continue;
        }
        candidates.push((name, url));
    }
    stats.requested = candidates.len();

    if cancel.is_cancelled() {
        return Err(ReportError::Cancelled);
    }

    // Indexed parallel collect keeps candidate order regardless of which
    // fetch finishes first.
    let attempts: Vec<Attempt> = candidates
        .par_iter()
        .map(|(_, url)| {
            if cancel.is_cancelled() {
                return Attempt::Skipped;
            }
            match fetcher.fetch(url) {
                Ok(bytes) => Attempt::Fetched(Arc::from(bytes)),
                Err(err) => Attempt::Failed(err),
            }
        })
        .collect();

    if cancel.is_cancelled() {
        if let Some(logger) = debug {
            logger.event("images.cancelled", json!({ "requested": stats.requested }));
        }
        return Err(ReportError::Cancelled);
    }

    let mut images = ResolvedImageMap::new();
    for ((name, url), attempt) in candidates.into_iter().zip(attempts) {
        match attempt {
            Attempt::Fetched(data) => {
                images.insert(name, data);
                stats.resolved += 1;
            }
            Attempt::Failed(err) => {
                stats.failed += 1;
                if let Some(logger) = debug {
                    logger.event(
                        "images.fetch_failed",
                        json!({ "name": name, "url": url, "error": err.to_string() }),
                    );
                    logger.increment("images.fetch_failed", 1);
                }
            }
            Attempt::Skipped => {}
        }
    }

    if let Some(logger) = debug {
        logger.event(
            "images.resolved",
            json!({
                "requested": stats.requested,
                "resolved": stats.resolved,
                "failed": stats.failed,
                "skipped_blank": stats.skipped_blank,
            }),
        );
        logger.increment("images.resolved", stats.resolved as u64);
    }
    Ok((images, stats))
}

/// Fixed URL → bytes table. Unknown URLs fail with [`FetchError::NotFound`].
#[derive(Debug, Default)]
pub struct MemoryImageFetcher {
    images: HashMap<String, Vec<u8>>,
    statuses: HashMap<String, u16>,
    calls: AtomicUsize,
}

impl MemoryImageFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, url: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.images.insert(url.into(), data.into());
        self
    }

    /// Makes `url` answer with a non-success HTTP status.
    pub fn with_status(mut self, url: impl Into<String>, status: u16) -> Self {
        self.statuses.insert(url.into(), status);
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ImageFetcher for MemoryImageFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(status) = self.statuses.get(url) {
            return Err(FetchError::Status(*status));
        }
        self.images.get(url).cloned().ok_or(FetchError::NotFound)
    }
}

/// Blocking HTTP fetcher. Non-2xx responses are failures.
#[cfg(feature = "http")]
pub struct HttpImageFetcher {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "http")]
impl HttpImageFetcher {
    pub fn new() -> Result<Self, ReportError> {
        Self::build(reqwest::blocking::Client::builder())
    }

    pub fn with_timeout(timeout: std::time::Duration) -> Result<Self, ReportError> {
        Self::build(reqwest::blocking::Client::builder().timeout(timeout))
    }

    fn build(builder: reqwest::blocking::ClientBuilder) -> Result<Self, ReportError> {
        let client = builder.build().map_err(|err| {
            ReportError::InvalidConfiguration(format!("failed to build http client: {}", err))
        })?;
        Ok(Self { client })
    }
}

#[cfg(feature = "http")]
impl ImageFetcher for HttpImageFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| FetchError::Transport(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        let body = response
            .bytes()
            .map_err(|err| FetchError::Transport(err.to_string()))?;
        Ok(body.to_vec())
    }
}
