//! Cache coherence, redirect precedence and concurrent loading, observed
//! through a downloader that records every fetch.

use std::collections::HashMap;
use std::sync::Arc;

use jsref_core::JsonRef;
use jsref_loader::{
    DownloadError, LoadError, LoadingConfigurationBuilder, SchemaLoader, UriDownloader,
};
use parking_lot::Mutex;

#[derive(Debug, Default)]
struct RecordingDownloader {
    documents: HashMap<String, String>,
    fetched: Mutex<Vec<String>>,
}

impl RecordingDownloader {
    fn with(mut self, uri: &str, text: &str) -> Self {
        self.documents.insert(uri.to_string(), text.to_string());
        self
    }

    fn fetched(&self) -> Vec<String> {
        self.fetched.lock().clone()
    }
}

impl UriDownloader for RecordingDownloader {
    fn fetch(&self, uri: &JsonRef) -> Result<Vec<u8>, DownloadError> {
        self.fetched.lock().push(uri.locator().to_string());
        self.documents
            .get(uri.locator())
            .map(|text| text.as_bytes().to_vec())
            .ok_or_else(|| DownloadError::NotFound {
                location: uri.locator().to_string(),
            })
    }
}

fn loader_with(downloader: Arc<RecordingDownloader>) -> SchemaLoader {
    let mut builder = LoadingConfigurationBuilder::bare();
    builder.register_scheme("mem", downloader).unwrap();
    SchemaLoader::new(builder.freeze())
}

#[test]
fn repeated_get_downloads_once_and_shares_the_document() {
    let downloader = Arc::new(
        RecordingDownloader::default().with("mem:/a.json", r#"{"type": "object"}"#),
    );
    let loader = loader_with(Arc::clone(&downloader));

    let first = loader.get("mem:/a.json").unwrap();
    let second = loader.get("mem:/a.json#").unwrap();

    assert_eq!(first.base(), second.base());
    assert!(Arc::ptr_eq(first.base(), second.base()));
    assert_eq!(downloader.fetched(), vec!["mem:/a.json"]);
}

#[test]
fn redirect_fetches_target_and_never_source() {
    let downloader = Arc::new(
        RecordingDownloader::default()
            .with("mem:/a.json", r#"{"from": "a"}"#)
            .with("mem:/b.json", r#"{"from": "b"}"#),
    );
    let mut builder = LoadingConfigurationBuilder::bare();
    builder
        .register_scheme("mem", Arc::clone(&downloader) as Arc<dyn UriDownloader>)
        .unwrap()
        .add_schema_redirect("mem:/a.json", "mem:/b.json")
        .unwrap();
    let loader = SchemaLoader::new(builder.freeze());

    let tree = loader.get("mem:/a.json").unwrap();
    assert_eq!(tree.node().unwrap()["from"], "b");
    assert_eq!(tree.loading_ref(), &JsonRef::parse("mem:/a.json").unwrap());

    let direct = loader.get("mem:/b.json").unwrap();
    assert!(Arc::ptr_eq(tree.base(), direct.base()));
    assert_eq!(downloader.fetched(), vec!["mem:/b.json"]);
}

#[test]
fn failed_fetch_is_retried_on_next_get() {
    let downloader = Arc::new(RecordingDownloader::default());
    let loader = loader_with(Arc::clone(&downloader));

    for _ in 0..2 {
        match loader.get("mem:/missing.json").unwrap_err() {
            LoadError::Download { uri, source } => {
                assert_eq!(uri, "mem:/missing.json");
                assert!(matches!(source, DownloadError::NotFound { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(downloader.fetched().len(), 2);
}

#[test]
fn non_json_content_wraps_parser_error() {
    let downloader =
        Arc::new(RecordingDownloader::default().with("mem:/bad.json", "{not json"));
    let loader = loader_with(downloader);
    match loader.get("mem:/bad.json").unwrap_err() {
        LoadError::NotJson { uri, source } => {
            assert_eq!(uri, "mem:/bad.json");
            assert!(source.is_syntax());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn eviction_forces_refetch() {
    let downloader = Arc::new(
        RecordingDownloader::default()
            .with("mem:/a.json", "{}")
            .with("mem:/b.json", "[]"),
    );
    let mut builder = LoadingConfigurationBuilder::bare();
    builder
        .register_scheme("mem", Arc::clone(&downloader) as Arc<dyn UriDownloader>)
        .unwrap()
        .set_cache_size(1);
    let loader = SchemaLoader::new(builder.freeze());

    loader.get("mem:/a.json").unwrap();
    loader.get("mem:/b.json").unwrap();
    loader.get("mem:/a.json").unwrap();
    assert_eq!(
        downloader.fetched(),
        vec!["mem:/a.json", "mem:/b.json", "mem:/a.json"]
    );
}

#[test]
fn concurrent_gets_share_one_fetch() {
    let downloader = Arc::new(
        RecordingDownloader::default().with("mem:/shared.json", r#"{"shared": true}"#),
    );
    let loader = Arc::new(loader_with(Arc::clone(&downloader)));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let loader = Arc::clone(&loader);
            std::thread::spawn(move || loader.get("mem:/shared.json").map(|t| Arc::clone(t.base())))
        })
        .collect();
    let documents: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().unwrap().unwrap())
        .collect();

    assert_eq!(downloader.fetched().len(), 1);
    assert!(documents.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
}
