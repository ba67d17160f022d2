use nightglow::cache::{
    CacheError, CacheStorage, Network, OfflineCache, Request, Response, CACHE_NAME,
    PRECACHE_MANIFEST,
};
use std::collections::HashMap;
use url::Url;

const SCOPE: &str = "https://stars.example/app/";

fn scope() -> Url {
    Url::parse(SCOPE).unwrap()
}

/// Serves every URL it knows with a 200, counts calls and can be switched off.
#[derive(Default)]
struct StaticSite {
    pages: HashMap<String, Vec<u8>>,
    offline: bool,
    calls: usize,
}

impl StaticSite {
    fn serving(urls: impl IntoIterator<Item = String>) -> Self {
        Self {
            pages: urls
                .into_iter()
                .map(|url| {
                    let body = format!("body of {url}").into_bytes();
                    (url, body)
                })
                .collect(),
            ..Self::default()
        }
    }
}

impl Network for StaticSite {
    fn fetch(&mut self, request: &Request) -> Result<Response, CacheError> {
        self.calls += 1;
        if self.offline {
            return Err(CacheError::network(&request.url, "connection refused"));
        }
        match self.pages.get(&request.url) {
            Some(body) => Ok(Response::ok(body.clone())),
            None => Ok(Response {
                status: 404,
                status_text: "Not Found".to_string(),
                ..Response::ok(Vec::new())
            }),
        }
    }
}

fn manifest_urls(manifest: &[&str]) -> Vec<String> {
    let probe = OfflineCache::with_manifest(scope(), "probe", manifest, StaticSite::default());
    manifest.iter().map(|p| probe.resolve(p).unwrap().to_string()).collect()
}

#[test]
fn install_stores_exactly_the_manifest() {
    let manifest = ["./", "./index.html", "./css/style.css", "./js/app.js"];
    let site = StaticSite::serving(manifest_urls(&manifest));
    let mut worker = OfflineCache::with_manifest(scope(), "v1", &manifest, site);

    assert_eq!(worker.install(), Ok(4));
    let cache = worker.storage().get("v1").unwrap();
    assert_eq!(cache.len(), 4);
    let mut keys: Vec<&str> = cache.keys().collect();
    keys.sort();
    let mut expected = manifest_urls(&manifest);
    expected.sort();
    assert_eq!(keys, expected);
}

#[test]
fn default_manifest_installs_under_versioned_name() {
    let site = StaticSite::serving(manifest_urls(PRECACHE_MANIFEST));
    let mut worker = OfflineCache::new(scope(), site);
    assert_eq!(worker.install(), Ok(PRECACHE_MANIFEST.len()));
    assert_eq!(worker.storage().keys(), vec![CACHE_NAME.to_string()]);
}

#[test]
fn install_is_all_or_nothing() {
    let manifest = ["./index.html", "./missing.css"];
    let site = StaticSite::serving(manifest_urls(&manifest[..1]));
    let mut worker = OfflineCache::with_manifest(scope(), "v1", &manifest, site);

    let err = worker.install().unwrap_err();
    assert!(matches!(err, CacheError::BadStatus { status: 404, .. }));
    assert!(worker.storage().get("v1").is_none());
}

#[test]
fn activating_a_new_version_deletes_the_old_cache() {
    let manifest = ["./index.html", "./js/app.js"];
    let urls = manifest_urls(&manifest);

    let mut old = OfflineCache::with_manifest(scope(), "nightglow-v2", &manifest, StaticSite::serving(urls.clone()));
    old.install().unwrap();
    old.activate();
    let storage: CacheStorage = old.into_storage();
    assert_eq!(storage.get("nightglow-v2").map(|c| c.len()), Some(2));

    let mut new = OfflineCache::with_storage(scope(), "nightglow-v3", &manifest, storage, StaticSite::serving(urls));
    new.install().unwrap();
    assert_eq!(new.activate(), vec!["nightglow-v2".to_string()]);
    assert_eq!(new.storage().keys(), vec!["nightglow-v3".to_string()]);
    assert!(new.storage().get("nightglow-v2").is_none());
}

#[test]
fn fetch_is_cache_first_and_populates_on_miss() {
    let page = format!("{SCOPE}gallery.html");
    let mut worker = OfflineCache::with_manifest(scope(), "v1", &[], StaticSite::serving([page.clone()]));

    let first = worker.fetch(&Request::get(&page)).unwrap();
    assert_eq!(first.status, 200);
    assert_eq!(worker.storage().get("v1").map(|c| c.len()), Some(1));

    // Served from the store: the network is not consulted again
    let second = worker.fetch(&Request::get(&page)).unwrap();
    assert_eq!(second, first);
    assert_eq!(worker.network().calls, 1);
    let storage = worker.into_storage();
    assert!(storage.match_url(&page).is_some());
}

#[test]
fn offline_navigation_falls_back_to_cached_index() {
    let manifest = ["./index.html"];
    let site = StaticSite::serving(manifest_urls(&manifest));
    let mut worker = OfflineCache::with_manifest(scope(), "v1", &manifest, site);
    worker.install().unwrap();

    let storage = worker.into_storage();
    let offline = StaticSite {
        offline: true,
        ..StaticSite::default()
    };
    let mut worker = OfflineCache::with_storage(scope(), "v1", &manifest, storage, offline);

    let page = worker.fetch(&Request::navigate(format!("{SCOPE}timeline"))).unwrap();
    assert_eq!(page.status, 200);
    assert_eq!(page.body, format!("body of {SCOPE}index.html").into_bytes());

    let asset = worker.fetch(&Request::get(format!("{SCOPE}img/photo.png"))).unwrap();
    assert_eq!(asset.status, 503);
    assert_eq!(asset.header("Content-Type"), Some("text/plain"));
}

#[test]
fn offline_navigation_without_cached_index_gets_503() {
    let offline = StaticSite {
        offline: true,
        ..StaticSite::default()
    };
    let mut worker = OfflineCache::with_manifest(scope(), "v1", &[], offline);
    let response = worker.fetch(&Request::navigate(SCOPE)).unwrap();
    assert_eq!(response.status, 503);
    assert_eq!(response.status_text, "Service Unavailable");
}

#[test]
fn same_origin_spellings_are_stored_under_one_key() {
    let default_port = "https://stars.example:443/app/a.js".to_string();
    let upper_host = "https://STARS.example/app/a.js".to_string();
    let site = StaticSite::serving([default_port.clone(), upper_host.clone()]);
    let mut worker = OfflineCache::with_manifest(scope(), "v1", &[], site);

    assert_eq!(worker.fetch(&Request::get(&default_port)).unwrap().status, 200);
    let cache = worker.storage().get("v1").unwrap();
    assert_eq!(cache.keys().collect::<Vec<_>>(), vec!["https://stars.example/app/a.js"]);

    // The other spelling is answered from the same entry
    assert_eq!(worker.fetch(&Request::get(&upper_host)).unwrap().status, 200);
    assert_eq!(worker.network().calls, 1);
    assert_eq!(worker.storage().get("v1").map(|c| c.len()), Some(1));
}

#[test]
fn query_without_path_is_same_origin() {
    let bare = "https://stars.example?v=2".to_string();
    let root = Url::parse("https://stars.example/").unwrap();
    let mut worker = OfflineCache::with_manifest(root, "v1", &[], StaticSite::serving([bare.clone()]));

    worker.fetch(&Request::get(&bare)).unwrap();
    assert!(worker.storage().match_url("https://stars.example/?v=2").is_some());
}
