//! Fetching and parsing of the GeoJSON documents shown on the map.

use bytes::Bytes;
use futures::future::try_join_all;
use geojson::{FeatureCollection, GeoJson};
use maybe_sync::{MaybeSend, MaybeSync};
use serde::{Deserialize, Serialize};

use crate::error::{FetchError, MapError};

/// Named GeoJSON document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSource {
    /// Name the document is registered under.
    pub name: String,
    /// `http(s)://` url, `file://` url or a filesystem path.
    pub url: String,
}

impl DataSource {
    /// Creates a new data source.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Loads raw document bytes.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait DataFetcher: MaybeSend + MaybeSync {
    /// Loads the document at `url`.
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError>;
}

/// Fetcher that loads `http(s)` urls with `reqwest` and everything else from the filesystem.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Creates a new fetcher.
    pub fn new() -> Result<Self, MapError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("isomap/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    async fn fetch_http(&self, url: &str) -> Result<Bytes, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| FetchError::Network(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            log::debug!("Failed to load {url}: {status}");
            return Err(FetchError::Status(status.as_u16()));
        }

        response
            .bytes()
            .await
            .map_err(|err| FetchError::Network(err.to_string()))
    }

    #[cfg(not(target_arch = "wasm32"))]
    async fn fetch_file(&self, path: &str) -> Result<Bytes, FetchError> {
        tokio::fs::read(path)
            .await
            .map(Bytes::from)
            .map_err(|err| FetchError::File(format!("{path}: {err}")))
    }

    #[cfg(target_arch = "wasm32")]
    async fn fetch_file(&self, path: &str) -> Result<Bytes, FetchError> {
        Err(FetchError::File(format!(
            "{path}: filesystem is not available in the browser"
        )))
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
impl DataFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        if url.starts_with("http://") || url.starts_with("https://") {
            self.fetch_http(url).await
        } else {
            self.fetch_file(url.strip_prefix("file://").unwrap_or(url))
                .await
        }
    }
}

/// Documents of one successful load pass, in configuration order.
#[derive(Debug, Clone, Default)]
pub struct LoadedData {
    /// Source name and parsed document.
    pub sources: Vec<(String, FeatureCollection)>,
}

/// Loads all configured data sources at once.
#[derive(Debug, Clone)]
pub struct DataLoader<F> {
    fetcher: F,
    sources: Vec<DataSource>,
}

impl<F: DataFetcher> DataLoader<F> {
    /// Creates a new loader.
    pub fn new(fetcher: F, sources: Vec<DataSource>) -> Self {
        Self { fetcher, sources }
    }

    /// Fetches and parses every source concurrently.
    ///
    /// Resolves only if every document was loaded. The first failure aborts the pass.
    pub async fn load(&self) -> Result<LoadedData, MapError> {
        let sources = try_join_all(self.sources.iter().map(|source| self.load_source(source)))
            .await?;

        log::info!("Loaded {} data sources", sources.len());
        Ok(LoadedData { sources })
    }

    async fn load_source(
        &self,
        source: &DataSource,
    ) -> Result<(String, FeatureCollection), MapError> {
        log::trace!("Loading source '{}' from {}", source.name, source.url);

        let load_error = |reason| MapError::Load {
            source_name: source.name.clone(),
            url: source.url.clone(),
            reason,
        };

        let bytes = self
            .fetcher
            .fetch(&source.url)
            .await
            .map_err(load_error)?;

        let collection = parse_feature_collection(&bytes).map_err(load_error)?;
        log::debug!(
            "Source '{}' has {} features",
            source.name,
            collection.features.len()
        );

        Ok((source.name.clone(), collection))
    }
}

/// Parses a GeoJSON document that must be a feature collection.
pub fn parse_feature_collection(bytes: &[u8]) -> Result<FeatureCollection, FetchError> {
    let text = std::str::from_utf8(bytes).map_err(|err| FetchError::Decode(err.to_string()))?;
    match text
        .parse::<GeoJson>()
        .map_err(|err| FetchError::Decode(err.to_string()))?
    {
        GeoJson::FeatureCollection(collection) => Ok(collection),
        _ => Err(FetchError::NotFeatureCollection),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use assert_matches::assert_matches;

    use super::*;

    /// Serves documents from memory and counts requests.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct StaticFetcher {
        pub documents: HashMap<String, Result<String, FetchError>>,
        pub calls: Arc<AtomicUsize>,
    }

    impl StaticFetcher {
        pub fn with(mut self, url: &str, body: &str) -> Self {
            self.documents.insert(url.to_string(), Ok(body.to_string()));
            self
        }

        pub fn with_error(mut self, url: &str, error: FetchError) -> Self {
            self.documents.insert(url.to_string(), Err(error));
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl DataFetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.documents.get(url) {
                Some(Ok(body)) => Ok(Bytes::from(body.clone())),
                Some(Err(err)) => Err(err.clone()),
                None => Err(FetchError::Status(404)),
            }
        }
    }

    pub(crate) const EMPTY_COLLECTION: &str = r#"{"type": "FeatureCollection", "features": []}"#;

    #[test]
    fn loads_all_sources_in_order() {
        let fetcher = StaticFetcher::default()
            .with("a.geojson", EMPTY_COLLECTION)
            .with(
                "b.geojson",
                r#"{"type": "FeatureCollection", "features": [
                    {"type": "Feature", "properties": {}, "geometry": {"type": "Point", "coordinates": [1, 2]}}
                ]}"#,
            );
        let loader = DataLoader::new(
            fetcher.clone(),
            vec![
                DataSource::new("b", "b.geojson"),
                DataSource::new("a", "a.geojson"),
            ],
        );

        let data = tokio_test::block_on(loader.load()).unwrap();
        let names: Vec<&str> = data.sources.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(data.sources[0].1.features.len(), 1);
        assert_eq!(fetcher.call_count(), 2);
    }

    #[test]
    fn missing_document_fails_the_pass() {
        let fetcher = StaticFetcher::default().with("a.geojson", EMPTY_COLLECTION);
        let loader = DataLoader::new(
            fetcher,
            vec![
                DataSource::new("a", "a.geojson"),
                DataSource::new("b", "b.geojson"),
            ],
        );

        let result = tokio_test::block_on(loader.load());
        assert_matches!(
            result,
            Err(MapError::Load { source_name, reason: FetchError::Status(404), .. }) if source_name == "b"
        );
    }

    #[test]
    fn transport_error_fails_the_pass() {
        let fetcher = StaticFetcher::default()
            .with("a.geojson", EMPTY_COLLECTION)
            .with_error("b.geojson", FetchError::Network("connection refused".into()));
        let loader = DataLoader::new(
            fetcher,
            vec![
                DataSource::new("a", "a.geojson"),
                DataSource::new("b", "b.geojson"),
            ],
        );

        assert_matches!(
            tokio_test::block_on(loader.load()),
            Err(MapError::Load {
                reason: FetchError::Network(_),
                ..
            })
        );
    }

    #[test]
    fn parse_errors() {
        assert_matches!(
            parse_feature_collection(b"not json"),
            Err(FetchError::Decode(_))
        );
        assert_matches!(
            parse_feature_collection(br#"{"type": "Point", "coordinates": [1, 2]}"#),
            Err(FetchError::NotFeatureCollection)
        );
        assert_matches!(
            parse_feature_collection(EMPTY_COLLECTION.as_bytes()),
            Ok(collection) if collection.features.is_empty()
        );
    }

    #[test]
    fn reads_local_files() {
        let path = std::env::temp_dir().join(format!("isomap-loader-{}.geojson", std::process::id()));
        std::fs::write(&path, EMPTY_COLLECTION).unwrap();

        let fetcher = HttpFetcher::new().unwrap();
        let url = format!("file://{}", path.display());
        let bytes = tokio_test::block_on(fetcher.fetch(&url)).unwrap();
        assert_eq!(&bytes[..], EMPTY_COLLECTION.as_bytes());

        let missing = tokio_test::block_on(fetcher.fetch("/definitely/not/here.geojson"));
        assert_matches!(missing, Err(FetchError::File(_)));

        std::fs::remove_file(path).unwrap();
    }
}
