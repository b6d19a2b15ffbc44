//! Remote resource access.
//!
//! Everything the pipeline reads over the network goes through
//! [Fetch], so tests can substitute fixtures and production can
//! layer on memoization and retries.

use crate::{BearerToken, Config, NightlightsError};
use dashmap::DashMap;
use log::{debug, warn};
use reqwest::blocking::{Client, Response};
use std::{
    fs::{self, File},
    path::Path,
    sync::Arc,
    thread,
    time::Duration,
};

pub trait Fetch: Send + Sync {
    /// Returns the body of the resource at `url`.
    fn fetch(&self, url: &str, auth: Option<&BearerToken>) -> Result<Vec<u8>, NightlightsError>;

    /// Writes the body of the resource at `url` to `dest`, creating
    /// parent directories as needed. Returns the number of bytes
    /// written.
    fn fetch_to(
        &self,
        url: &str,
        auth: Option<&BearerToken>,
        dest: &Path,
    ) -> Result<u64, NightlightsError> {
        let body = self.fetch(url, auth)?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(dest, &body)?;
        Ok(body.len() as u64)
    }
}

impl<F: Fetch + ?Sized> Fetch for Arc<F> {
    fn fetch(&self, url: &str, auth: Option<&BearerToken>) -> Result<Vec<u8>, NightlightsError> {
        (**self).fetch(url, auth)
    }

    fn fetch_to(
        &self,
        url: &str,
        auth: Option<&BearerToken>,
        dest: &Path,
    ) -> Result<u64, NightlightsError> {
        (**self).fetch_to(url, auth, dest)
    }
}

/// Blocking HTTP(S) fetcher with retries.
pub struct HttpFetch {
    client: Client,
    attempts: u32,
    retry_delay: Duration,
}

impl HttpFetch {
    pub fn new(config: &Config) -> Result<Self, NightlightsError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(concat!("nightlights/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            attempts: config.attempts.max(1),
            retry_delay: config.retry_delay,
        })
    }
}

/// Private API.
impl HttpFetch {
    fn send(&self, url: &str, auth: Option<&BearerToken>) -> Result<Response, NightlightsError> {
        let mut request = self.client.get(url);
        if let Some(token) = auth {
            request = request.bearer_auth(token.secret());
        }
        let response = request.send()?;
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(NightlightsError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            })
        }
    }

    fn with_retries<T>(
        &self,
        url: &str,
        mut f: impl FnMut() -> Result<T, NightlightsError>,
    ) -> Result<T, NightlightsError> {
        let mut delay = self.retry_delay;
        let mut attempt = 1;
        loop {
            match f() {
                Err(e) if attempt < self.attempts && e.is_transient() => {
                    warn!("GET {url} failed ({e}), retrying in {delay:?}");
                    thread::sleep(delay);
                    delay *= 2;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

impl Fetch for HttpFetch {
    fn fetch(&self, url: &str, auth: Option<&BearerToken>) -> Result<Vec<u8>, NightlightsError> {
        debug!("GET {url}");
        self.with_retries(url, || {
            let body = self.send(url, auth)?.bytes()?;
            Ok(body.to_vec())
        })
    }

    fn fetch_to(
        &self,
        url: &str,
        auth: Option<&BearerToken>,
        dest: &Path,
    ) -> Result<u64, NightlightsError> {
        debug!("GET {url} -> {dest:?}");
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let partial = dest.with_extension("partial");
        self.with_retries(url, || {
            let mut response = self.send(url, auth)?;
            let mut file = File::create(&partial)?;
            let len = response.copy_to(&mut file)?;
            fs::rename(&partial, dest)?;
            Ok(len)
        })
    }
}

/// Memoizes successful fetches of another [Fetch].
///
/// Keys on URL alone, so it is only meant for public resources that
/// don't change during a run, such as the tile grid and catalog
/// listings. Large downloads via [Fetch::fetch_to] pass straight
/// through.
pub struct CachedFetch<F> {
    inner: F,
    cache: DashMap<String, Arc<[u8]>>,
}

impl<F: Fetch> CachedFetch<F> {
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            cache: DashMap::new(),
        }
    }

    /// Returns the number of memoized resources.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl<F: Fetch> Fetch for CachedFetch<F> {
    fn fetch(&self, url: &str, auth: Option<&BearerToken>) -> Result<Vec<u8>, NightlightsError> {
        self.cache
            .entry(url.to_string())
            .or_try_insert_with(|| self.inner.fetch(url, auth).map(Arc::from))
            .map(|body| body.to_vec())
    }

    fn fetch_to(
        &self,
        url: &str,
        auth: Option<&BearerToken>,
        dest: &Path,
    ) -> Result<u64, NightlightsError> {
        self.inner.fetch_to(url, auth, dest)
    }
}

#[cfg(test)]
mod tests {
    use super::{CachedFetch, Fetch};
    use crate::{BearerToken, NightlightsError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    impl Fetch for Counting {
        fn fetch(
            &self,
            url: &str,
            _auth: Option<&BearerToken>,
        ) -> Result<Vec<u8>, NightlightsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if url.ends_with("missing") {
                Err(NightlightsError::NotFound(url.to_string()))
            } else {
                Ok(url.as_bytes().to_vec())
            }
        }
    }

    #[test]
    fn test_cache_memoizes_success() {
        let fetch = CachedFetch::new(Counting::default());
        assert_eq!(fetch.fetch("a", None).unwrap(), b"a");
        assert_eq!(fetch.fetch("a", None).unwrap(), b"a");
        assert_eq!(fetch.fetch("b", None).unwrap(), b"b");
        assert_eq!(fetch.inner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(fetch.len(), 2);
    }

    #[test]
    fn test_cache_skips_errors() {
        let fetch = CachedFetch::new(Counting::default());
        assert!(fetch.fetch("missing", None).is_err());
        assert!(fetch.fetch("missing", None).is_err());
        assert_eq!(fetch.inner.calls.load(Ordering::SeqCst), 2);
        assert!(fetch.is_empty());
    }

    #[test]
    fn test_default_fetch_to_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a/b/c.txt");
        let n = Counting::default().fetch_to("hello", None, &dest).unwrap();
        assert_eq!(n, 5);
        assert_eq!(std::fs::read(dest).unwrap(), b"hello");
    }
}
