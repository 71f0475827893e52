//! # Downloaders — Fetching Raw Bytes by Scheme
//!
//! A downloader turns an absolute locator into bytes. The registry picks
//! one by URI scheme; callers may register their own for any scheme.
//!
//! Shipped implementations:
//!
//! - [`FileDownloader`] for `file:` URIs.
//! - [`HttpDownloader`] for `http:` and `https:`, with bounded retry on
//!   transport failures.
//! - [`ResourceDownloader`] for `resource:` URIs served from documents
//!   compiled into the binary.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use jsref_core::JsonRef;
use parking_lot::Mutex;

use crate::bundled::BUNDLED_SCHEMAS;
use crate::error::DownloadError;

/// Fetch the bytes behind an absolute locator.
///
/// Implementations receive the locator only (no fragment) and must be safe
/// to call from several threads at once.
pub trait UriDownloader: Send + Sync + fmt::Debug {
    /// Fetch the raw bytes of the document at `uri`.
    fn fetch(&self, uri: &JsonRef) -> Result<Vec<u8>, DownloadError>;
}

/// Reads `file:` URIs from the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileDownloader;

impl UriDownloader for FileDownloader {
    fn fetch(&self, uri: &JsonRef) -> Result<Vec<u8>, DownloadError> {
        let url = url::Url::parse(uri.locator()).map_err(|e| DownloadError::InvalidLocation {
            uri: uri.to_string(),
            reason: e.to_string(),
        })?;
        let path = url
            .to_file_path()
            .map_err(|()| DownloadError::InvalidLocation {
                uri: uri.to_string(),
                reason: "not a local file path".to_string(),
            })?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(DownloadError::NotFound {
                location: path.display().to_string(),
            }),
            Err(e) => Err(DownloadError::Io(e)),
        }
    }
}

/// Maximum number of retry attempts after the initial request.
const MAX_RETRIES: u32 = 3;

/// Base delay between retries (doubles each attempt: 200ms, 400ms, 800ms).
const BASE_DELAY_MS: u64 = 200;

/// Default request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Fetches `http:` and `https:` URIs with a blocking client.
///
/// The client is built on first use, so a configuration that never touches
/// the network never starts one. Transport failures are retried with
/// exponential backoff; HTTP status errors are returned immediately.
pub struct HttpDownloader {
    timeout: Duration,
    max_retries: u32,
    base_delay: Duration,
    client: Mutex<Option<reqwest::blocking::Client>>,
}

impl HttpDownloader {
    /// A downloader with the default timeout and retry policy.
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: MAX_RETRIES,
            base_delay: Duration::from_millis(BASE_DELAY_MS),
            client: Mutex::new(None),
        }
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set how many times a transport failure is retried, and the first delay.
    pub fn with_retries(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.base_delay = base_delay;
        self
    }

    fn client(&self) -> Result<reqwest::blocking::Client, reqwest::Error> {
        let mut slot = self.client.lock();
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("jsref/", env!("CARGO_PKG_VERSION")))
            .build()?;
        *slot = Some(client.clone());
        Ok(client)
    }
}

impl Default for HttpDownloader {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HttpDownloader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpDownloader")
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .finish_non_exhaustive()
    }
}

impl UriDownloader for HttpDownloader {
    fn fetch(&self, uri: &JsonRef) -> Result<Vec<u8>, DownloadError> {
        let client = self.client()?;
        let locator = uri.locator();
        let response = with_retry(self.max_retries, self.base_delay, locator, || {
            client.get(locator).send()
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DownloadError::NotFound {
                location: locator.to_string(),
            });
        }
        if !status.is_success() {
            return Err(DownloadError::Status {
                status: status.as_u16(),
            });
        }
        Ok(response.bytes()?.to_vec())
    }
}

/// Call `f` up to `max_retries + 1` times, sleeping between failed attempts.
///
/// Delays double from `base_delay`. The last error is returned unchanged.
fn with_retry<T, E, F>(max_retries: u32, base_delay: Duration, what: &str, mut f: F) -> Result<T, E>
where
    E: fmt::Display,
    F: FnMut() -> Result<T, E>,
{
    for attempt in 0..max_retries {
        match f() {
            Ok(value) => return Ok(value),
            Err(e) => {
                let delay = base_delay * 2u32.saturating_pow(attempt);
                tracing::warn!(
                    attempt = attempt + 1,
                    max_retries,
                    uri = what,
                    "fetch failed, retrying in {delay:?}: {e}"
                );
                std::thread::sleep(delay);
            }
        }
    }
    f()
}

/// Serves `resource:` URIs from an in-memory table keyed by path.
///
/// [`ResourceDownloader::bundled`] is preloaded with the meta-schemas that
/// ship with this crate.
#[derive(Debug, Clone, Default)]
pub struct ResourceDownloader {
    resources: HashMap<String, &'static str>,
}

impl ResourceDownloader {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// A table holding every bundled meta-schema.
    pub fn bundled() -> Self {
        let mut this = Self::new();
        for schema in BUNDLED_SCHEMAS {
            this = this.with_resource(schema.resource_path, schema.text);
        }
        this
    }

    /// Add or replace a resource at `path` (for example `/my/schema`).
    pub fn with_resource(mut self, path: &str, text: &'static str) -> Self {
        self.resources.insert(path.to_string(), text);
        self
    }
}

impl UriDownloader for ResourceDownloader {
    fn fetch(&self, uri: &JsonRef) -> Result<Vec<u8>, DownloadError> {
        let path = uri.uri().path();
        self.resources
            .get(path)
            .map(|text| text.as_bytes().to_vec())
            .ok_or_else(|| DownloadError::NotFound {
                location: uri.locator().to_string(),
            })
    }
}
