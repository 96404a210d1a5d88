//! Row-to-display projection for popup cards.
//!
//! Which columns feed the card title and subtitle is configuration, not
//! code, and the configuration is checked once at load instead of failing
//! silently per missing field.

use serde::Deserialize;

use crate::error::AtlasError;
use crate::query::Row;

pub const UNTITLED: &str = "(untitled)";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RowProjection {
    pub title_column: String,
    #[serde(default)]
    pub subtitle_column: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisplayFields {
    pub title: String,
    pub subtitle: Option<String>,
}

impl RowProjection {
    pub fn validate(&self) -> Result<(), AtlasError> {
        if self.title_column.trim().is_empty() {
            return Err(AtlasError::Config("display.title_column is empty".into()));
        }
        if let Some(sub) = &self.subtitle_column {
            if sub.trim().is_empty() {
                return Err(AtlasError::Config("display.subtitle_column is empty".into()));
            }
            if sub == &self.title_column {
                return Err(AtlasError::Config(format!(
                    "display columns must differ, both are {sub:?}"
                )));
            }
        }
        Ok(())
    }

    pub fn project(&self, row: &Row) -> DisplayFields {
        DisplayFields {
            title: cell_text(row, &self.title_column).unwrap_or_else(|| UNTITLED.to_string()),
            subtitle: self
                .subtitle_column
                .as_deref()
                .and_then(|col| cell_text(row, col)),
        }
    }
}

fn cell_text(row: &Row, column: &str) -> Option<String> {
    let text = match row.get(column)? {
        serde_json::Value::Null => return None,
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: serde_json::Value) -> Row {
        value.as_object().unwrap().clone()
    }

    fn projection() -> RowProjection {
        RowProjection {
            title_column: "titre".to_string(),
            subtitle_column: Some("artiste".to_string()),
        }
    }

    #[test]
    fn test_project_full_row() {
        let fields = projection().project(&row(json!({
            "titre": "La Javanaise",
            "artiste": "Serge Gainsbourg",
        })));
        assert_eq!(fields.title, "La Javanaise");
        assert_eq!(fields.subtitle.as_deref(), Some("Serge Gainsbourg"));
    }

    #[test]
    fn test_missing_title_falls_back() {
        let fields = projection().project(&row(json!({ "artiste": "Barbara" })));
        assert_eq!(fields.title, UNTITLED);
    }

    #[test]
    fn test_empty_subtitle_omitted() {
        let fields = projection().project(&row(json!({ "titre": "Göttingen", "artiste": "" })));
        assert_eq!(fields.subtitle, None);
    }

    #[test]
    fn test_numeric_cells_stringified() {
        let fields = projection().project(&row(json!({ "titre": 1964 })));
        assert_eq!(fields.title, "1964");
    }

    #[test]
    fn test_validation() {
        assert!(projection().validate().is_ok());
        assert!(RowProjection {
            title_column: "".to_string(),
            subtitle_column: None,
        }
        .validate()
        .is_err());
        assert!(RowProjection {
            title_column: "titre".to_string(),
            subtitle_column: Some("titre".to_string()),
        }
        .validate()
        .is_err());
    }
}
