//! Error types used by the crate.

use thiserror::Error;

/// Reason a single GeoJSON document could not be obtained.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The server answered with a non-success status.
    #[error("server responded with status {0}")]
    Status(u16),
    /// Could not connect to the server or read the response.
    #[error("network error: {0}")]
    Network(String),
    /// Could not read a local file.
    #[error("failed to read file: {0}")]
    File(String),
    /// The body is not valid GeoJSON.
    #[error("invalid GeoJSON: {0}")]
    Decode(String),
    /// The body is valid GeoJSON but not a feature collection.
    #[error("document is not a FeatureCollection")]
    NotFeatureCollection,
}

/// Isomap error type.
#[derive(Debug, Error)]
pub enum MapError {
    /// One of the documents of a load pass failed. The whole pass is abandoned.
    #[error("failed to load source '{source_name}' from {url}: {reason}")]
    Load {
        /// Name of the data source.
        source_name: String,
        /// Url the source was loaded from.
        url: String,
        /// What went wrong.
        reason: FetchError,
    },
    /// A source with this name is already registered with the map.
    #[error("source '{0}' already exists")]
    DuplicateSource(String),
    /// No source with this name is registered with the map.
    #[error("source '{0}' does not exist")]
    UnknownSource(String),
    /// A layer with this id is already registered with the map.
    #[error("layer '{0}' already exists")]
    DuplicateLayer(String),
    /// No layer with this id is registered with the map.
    #[error("layer '{0}' does not exist")]
    UnknownLayer(String),
    /// No basemap with this index is configured.
    #[error("basemap {0} is not configured")]
    UnknownBasemap(usize),
    /// Configuration is inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// Configuration file could not be parsed.
    #[error("failed to parse configuration")]
    Json(#[from] serde_json::Error),
    /// Error reading a file.
    #[error("failed to read file")]
    Io(#[from] std::io::Error),
    /// HTTP client could not be created.
    #[error("failed to create http client")]
    HttpClient(#[from] reqwest::Error),
}
