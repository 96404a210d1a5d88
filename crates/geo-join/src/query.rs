//! PostgREST-style request construction for the hosted row table.
//!
//! The backend speaks the Supabase REST dialect: an equality filter on the
//! join column, `Range`/`Range-Unit` headers for offset pagination, and
//! `Prefer: count=exact` so the response's `Content-Range` carries the total
//! row count. Everything here is pure string work; the transport lives in
//! the viewer.

use std::collections::BTreeSet;

use crate::error::AtlasError;
use crate::pager::PageWindow;

/// One backend row, as returned by the table endpoint.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// A fully described HTTP GET: the caller appends `params` as the query
/// string (URL-encoded by the HTTP client) and sets `headers` verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    pub url: String,
    pub params: Vec<(String, String)>,
    pub headers: Vec<(&'static str, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableQuery {
    pub base_url: String,
    pub table: String,
    pub join_column: String,
    pub api_key: String,
}

impl TableQuery {
    fn endpoint(&self) -> String {
        format!(
            "{}/rest/v1/{}",
            self.base_url.trim_end_matches('/'),
            self.table
        )
    }

    fn auth_headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("apikey", self.api_key.clone()),
            ("Authorization", format!("Bearer {}", self.api_key)),
            ("Accept", "application/json".to_string()),
        ]
    }

    /// One page of rows for one join key, with an exact total count.
    pub fn page(&self, key: &str, window: PageWindow) -> QuerySpec {
        let mut headers = self.auth_headers();
        headers.push(("Range-Unit", "items".to_string()));
        headers.push(("Range", format!("{}-{}", window.from, window.to)));
        headers.push(("Prefer", "count=exact".to_string()));
        QuerySpec {
            url: self.endpoint(),
            params: vec![
                ("select".to_string(), "*".to_string()),
                (self.join_column.clone(), format!("eq.{key}")),
            ],
            headers,
        }
    }

    /// Every row whose join column matches any of `keys`, in one request.
    /// Used by the eager-join startup path; `keys` is already deduplicated
    /// by construction.
    pub fn all(&self, keys: &BTreeSet<String>) -> QuerySpec {
        let list = keys
            .iter()
            .map(|k| quote_in_value(k))
            .collect::<Vec<_>>()
            .join(",");
        QuerySpec {
            url: self.endpoint(),
            params: vec![
                ("select".to_string(), "*".to_string()),
                (self.join_column.clone(), format!("in.({list})")),
            ],
            headers: self.auth_headers(),
        }
    }
}

/// PostgREST `in.()` values containing reserved characters must be wrapped
/// in double quotes, with embedded quotes and backslashes escaped.
fn quote_in_value(value: &str) -> String {
    let reserved = value
        .chars()
        .any(|c| matches!(c, ',' | '.' | ':' | '(' | ')' | '"' | '\\' | ' '));
    if !reserved {
        return value.to_string();
    }
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Total row count from a `Content-Range` header such as `0-7/10` or `*/0`.
pub fn parse_content_range(value: &str) -> Result<u64, AtlasError> {
    let (_, total) = value
        .split_once('/')
        .ok_or_else(|| AtlasError::ContentRange(value.to_string()))?;
    total
        .trim()
        .parse::<u64>()
        .map_err(|_| AtlasError::ContentRange(value.to_string()))
}
