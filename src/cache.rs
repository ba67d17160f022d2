//! Versioned, cache-first resource store for running offline.
//!
//! Lifecycle mirrors a page worker: `install` precaches a fixed manifest,
//! `activate` evicts caches from older versions and `fetch` answers requests
//! from the cache before falling back to the network. The network is injected
//! through [`Network`], so any transport (or a test double) can sit behind it.

use std::collections::BTreeMap;
use url::Url;

pub const CACHE_NAME: &str = "nightglow-v3";

pub const PRECACHE_MANIFEST: &[&str] = &[
    "./",
    "./index.html",
    "./css/style.css",
    "./js/app.js",
    "./js/starfield.js",
    "./js/spiral.js",
    "./js/trail.js",
    "./js/ripple.js",
    "./img/icon-192.png",
    "./img/icon-512.png",
    "./img/bg-pattern.svg",
    "./img/canvas-texture.svg",
];

const OFFLINE_PAGE: &str = "./index.html";
const OFFLINE_MESSAGE: &str = "Offline: resource unavailable";
pub const SYNC_TAG: &str = "sync-data";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("network error fetching {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("precache of {url} failed with status {status}")]
    BadStatus { url: String, status: u16 },

    #[error("cannot resolve {url}: {source}")]
    InvalidUrl { url: String, source: url::ParseError },
}

impl CacheError {
    pub fn network(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestMode {
    Navigate,
    SameOrigin,
    Cors,
    NoCors,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    pub url: String,
    pub mode: RequestMode,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            mode: RequestMode::SameOrigin,
        }
    }

    pub fn navigate(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            mode: RequestMode::Navigate,
        }
    }

    // Only http(s) requests are intercepted
    fn http_url(&self) -> Option<Url> {
        let url = Url::parse(&self.url).ok()?;
        matches!(url.scheme(), "http" | "https").then_some(url)
    }
}

/// How the response was obtained; only `Basic` (same-origin) responses are
/// safe to store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseType {
    Basic,
    Cors,
    Opaque,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub status_text: String,
    pub kind: ResponseType,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            status_text: "OK".to_string(),
            kind: ResponseType::Basic,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn service_unavailable() -> Self {
        Self {
            status: 503,
            status_text: "Service Unavailable".to_string(),
            kind: ResponseType::Basic,
            headers: vec![("Content-Type".to_string(), "text/plain".to_string())],
            body: OFFLINE_MESSAGE.as_bytes().to_vec(),
        }
    }

    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

pub trait Network {
    fn fetch(&mut self, request: &Request) -> Result<Response, CacheError>;
}

/// One named cache: request URL to stored response.
#[derive(Clone, Debug, Default)]
pub struct Cache {
    entries: BTreeMap<String, Response>,
}

impl Cache {
    pub fn put(&mut self, url: impl Into<String>, response: Response) {
        self.entries.insert(url.into(), response);
    }

    pub fn get(&self, url: &str) -> Option<&Response> {
        self.entries.get(url)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// All caches of an origin, kept in creation order so lookups across caches
/// prefer the oldest, like `caches.match`.
#[derive(Clone, Debug, Default)]
pub struct CacheStorage {
    caches: Vec<(String, Cache)>,
}

impl CacheStorage {
    pub fn open(&mut self, name: &str) -> &mut Cache {
        let idx = match self.caches.iter().position(|(n, _)| n == name) {
            Some(idx) => idx,
            None => {
                self.caches.push((name.to_string(), Cache::default()));
                self.caches.len() - 1
            }
        };
        &mut self.caches[idx].1
    }

    pub fn get(&self, name: &str) -> Option<&Cache> {
        self.caches.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }

    pub fn keys(&self) -> Vec<String> {
        self.caches.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn delete(&mut self, name: &str) -> bool {
        let before = self.caches.len();
        self.caches.retain(|(n, _)| n != name);
        self.caches.len() != before
    }

    pub fn match_url(&self, url: &str) -> Option<&Response> {
        self.caches.iter().find_map(|(_, cache)| cache.get(url))
    }
}

/// Cache-first request handler bound to one origin and scope.
///
/// Cache keys are serialized [`Url`]s, so spellings that differ only in host
/// case or an explicit default port share one entry.
pub struct OfflineCache<N: Network> {
    name: String,
    manifest: Vec<String>,
    scope: Url,
    storage: CacheStorage,
    network: N,
}

impl<N: Network> OfflineCache<N> {
    /// `scope` is the URL manifest paths resolve against, e.g.
    /// `https://example.org/app/`. A missing trailing slash is added.
    pub fn new(scope: Url, network: N) -> Self {
        Self::with_manifest(scope, CACHE_NAME, PRECACHE_MANIFEST, network)
    }

    pub fn with_manifest(scope: Url, name: &str, manifest: &[&str], network: N) -> Self {
        Self::with_storage(scope, name, manifest, CacheStorage::default(), network)
    }

    /// Starts from existing storage, as a newly deployed version would.
    pub fn with_storage(
        mut scope: Url,
        name: &str,
        manifest: &[&str],
        storage: CacheStorage,
        network: N,
    ) -> Self {
        if !scope.path().ends_with('/') {
            let path = format!("{}/", scope.path());
            scope.set_path(&path);
        }
        Self {
            name: name.to_string(),
            manifest: manifest.iter().map(|p| p.to_string()).collect(),
            scope,
            storage,
            network,
        }
    }

    pub fn storage(&self) -> &CacheStorage {
        &self.storage
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn into_storage(self) -> CacheStorage {
        self.storage
    }

    pub fn resolve(&self, path: &str) -> Result<Url, CacheError> {
        self.scope.join(path).map_err(|source| CacheError::InvalidUrl {
            url: path.to_string(),
            source,
        })
    }

    /// Precaches the whole manifest. Nothing is stored unless every entry
    /// was fetched successfully.
    pub fn install(&mut self) -> Result<usize, CacheError> {
        tracing::info!(cache = %self.name, entries = self.manifest.len(), "precaching assets");
        let mut fetched = Vec::with_capacity(self.manifest.len());
        for path in &self.manifest {
            let url = self.resolve(path)?;
            let response = self.network.fetch(&Request::get(url.as_str()))?;
            if !response.is_ok() {
                return Err(CacheError::BadStatus {
                    url: url.into(),
                    status: response.status,
                });
            }
            fetched.push((url, response));
        }

        let count = fetched.len();
        let cache = self.storage.open(&self.name);
        for (url, response) in fetched {
            cache.put(url, response);
        }
        Ok(count)
    }

    /// Deletes every cache left behind by other versions.
    pub fn activate(&mut self) -> Vec<String> {
        let stale: Vec<String> = self
            .storage
            .keys()
            .into_iter()
            .filter(|name| *name != self.name)
            .collect();
        for name in &stale {
            tracing::info!(cache = %name, "deleting stale cache");
            self.storage.delete(name);
        }
        stale
    }

    /// Answers `request` cache-first. Returns `None` for requests this layer
    /// does not intercept (anything that is not HTTP or HTTPS).
    pub fn fetch(&mut self, request: &Request) -> Option<Response> {
        let url = request.http_url()?;
        if let Some(hit) = self.storage.match_url(url.as_str()) {
            return Some(hit.clone());
        }

        match self.network.fetch(request) {
            Ok(response) => {
                if self.is_cacheable(&url, &response) {
                    self.storage.open(&self.name).put(url, response.clone());
                }
                Some(response)
            }
            Err(err) => {
                tracing::warn!(url = %request.url, %err, "network fetch failed, serving offline fallback");
                Some(self.offline_fallback(request))
            }
        }
    }

    fn is_cacheable(&self, url: &Url, response: &Response) -> bool {
        response.status == 200
            && response.kind == ResponseType::Basic
            && url.origin() == self.scope.origin()
    }

    fn offline_fallback(&self, request: &Request) -> Response {
        if request.mode == RequestMode::Navigate {
            let page = self
                .resolve(OFFLINE_PAGE)
                .ok()
                .and_then(|index| self.storage.match_url(index.as_str()));
            if let Some(page) = page {
                return page.clone();
            }
        }
        Response::service_unavailable()
    }

    /// Background sync hook; returns whether the tag was recognised.
    pub fn sync(&mut self, tag: &str) -> bool {
        if tag == SYNC_TAG {
            tracing::info!(tag, "running background sync");
            true
        } else {
            tracing::debug!(tag, "ignoring unknown sync tag");
            false
        }
    }
}
