use thiserror::Error;

#[derive(Error, Debug)]
pub enum AtlasError {
    #[error("geojson not found: {url} ({status})")]
    AssetNotFound { url: String, status: u16 },

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid geojson: {0}")]
    InvalidGeoJson(String),

    #[error("remote query failed: {0}")]
    RemoteQuery(String),

    #[error("bad Content-Range header: {0}")]
    ContentRange(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
