//! Network edges of the viewer: static asset fetches and the hosted row
//! table. Wire formats are built and parsed in `geo_join`; this module only
//! drives `gloo::net` and maps transport failures into `AtlasError`.

use std::collections::{BTreeSet, HashMap};

use gloo::net::http::{Request, RequestBuilder, Response};

use geo_join::config::BackendConfig;
use geo_join::error::AtlasError;
use geo_join::ident::normalize_id;
use geo_join::pager::PageWindow;
use geo_join::query::{parse_content_range, QuerySpec, Row, TableQuery};
use geo_join::AtlasConfig;

pub async fn fetch_config(url: &str) -> Result<AtlasConfig, AtlasError> {
    AtlasConfig::from_json(&fetch_text(url).await?)
}

/// Fetch a static GeoJSON document. A non-success status is a hard error
/// carrying the URL and status code.
pub async fn fetch_geojson(url: &str) -> Result<String, AtlasError> {
    fetch_text(url).await
}

async fn fetch_text(url: &str) -> Result<String, AtlasError> {
    let resp = Request::get(url)
        .send()
        .await
        .map_err(|e| AtlasError::Network(e.to_string()))?;
    if !resp.ok() {
        return Err(AtlasError::AssetNotFound {
            url: url.to_string(),
            status: resp.status(),
        });
    }
    resp.text()
        .await
        .map_err(|e| AtlasError::Network(e.to_string()))
}

// ─── Row client ─────────────────────────────────────────────────────

pub struct PageResult {
    pub rows: Vec<Row>,
    pub total: u64,
}

#[derive(Clone, PartialEq)]
pub struct RowClient {
    query: TableQuery,
    join_column: String,
}

impl RowClient {
    pub fn new(backend: &BackendConfig) -> Self {
        Self {
            query: TableQuery {
                base_url: backend.url.clone(),
                table: backend.table.clone(),
                join_column: backend.join_column.clone(),
                api_key: backend.anon_key.clone(),
            },
            join_column: backend.join_column.clone(),
        }
    }

    /// One page of rows for one join key, plus the exact total count.
    pub async fn fetch_page(&self, key: &str, window: PageWindow) -> Result<PageResult, AtlasError> {
        let resp = send(self.query.page(key, window)).await?;
        let total = match resp.headers().get("Content-Range") {
            Some(value) => parse_content_range(&value)?,
            None => return Err(AtlasError::ContentRange("(missing header)".to_string())),
        };
        let rows: Vec<Row> = resp
            .json()
            .await
            .map_err(|e| AtlasError::RemoteQuery(e.to_string()))?;
        Ok(PageResult { rows, total })
    }

    /// Eager-join startup query: every row matching any of `keys`, mapped by
    /// normalized join key. The first row per key wins.
    pub async fn fetch_all(&self, keys: &BTreeSet<String>) -> Result<HashMap<String, Row>, AtlasError> {
        let resp = send(self.query.all(keys)).await?;
        let rows: Vec<Row> = resp
            .json()
            .await
            .map_err(|e| AtlasError::RemoteQuery(e.to_string()))?;
        let mut by_key = HashMap::new();
        for row in rows {
            if let Some(key) = normalize_id(row.get(&self.join_column)) {
                by_key.entry(key).or_insert(row);
            }
        }
        Ok(by_key)
    }
}

async fn send(spec: QuerySpec) -> Result<Response, AtlasError> {
    let mut builder: RequestBuilder = Request::get(&spec.url)
        .query(spec.params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    for (name, value) in &spec.headers {
        builder = builder.header(name, value);
    }
    let resp = builder
        .send()
        .await
        .map_err(|e| AtlasError::Network(e.to_string()))?;
    if resp.ok() {
        return Ok(resp);
    }
    // PostgREST error bodies carry a "message" field; fall back to the
    // status line when there isn't one.
    let status = resp.status();
    let message = resp
        .text()
        .await
        .ok()
        .and_then(|body| serde_json::from_str::<serde_json::Value>(&body).ok())
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| format!("HTTP {status}"));
    Err(AtlasError::RemoteQuery(message))
}
