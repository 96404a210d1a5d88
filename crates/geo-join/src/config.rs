//! Runtime configuration, fetched by the viewer as `config.json` and
//! validated once at startup instead of failing field-by-field later.

use serde::Deserialize;

use crate::display::RowProjection;
use crate::error::AtlasError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AtlasConfig {
    pub map: MapConfig,
    pub sources: Vec<SourceConfig>,
    pub backend: BackendConfig,
    pub display: RowProjection,
    #[serde(default)]
    pub debug_overlay: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MapConfig {
    /// lng, lat
    pub center: [f64; 2],
    pub zoom: f64,
    pub basemap: BasemapConfig,
    #[serde(default)]
    pub gestures: GestureConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BasemapConfig {
    /// Raster XYZ template with `{z}`/`{x}`/`{y}` and optional `{s}`.
    pub tile_url: String,
    pub attribution: String,
    #[serde(default)]
    pub subdomains: Vec<String>,
    #[serde(default = "default_max_zoom")]
    pub max_zoom: u8,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Drag-to-pan. Off turns the wheel/buttons into the only navigation.
    pub pan: bool,
    /// Multiplier applied to drag deltas when pan is on.
    pub pan_linearity: f64,
    /// Show the +/- navigation control.
    pub nav_control: bool,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            pan: true,
            pan_linearity: 1.0,
            nav_control: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SourceConfig {
    pub key: String,
    pub url: String,
    /// Property holding the join key on each feature.
    pub id_property: String,
    #[serde(default = "default_line_color")]
    pub color: String,
    #[serde(default = "default_line_width")]
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BackendConfig {
    pub url: String,
    pub anon_key: String,
    pub table: String,
    pub join_column: String,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default)]
    pub join_mode: JoinMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JoinMode {
    /// Query the table when a feature is clicked (paginated popup).
    #[default]
    PerClick,
    /// One bulk query at startup; features carry their matched row.
    Eager,
}

fn default_max_zoom() -> u8 {
    19
}

fn default_line_color() -> String {
    "#2266cc".to_string()
}

fn default_line_width() -> f64 {
    4.0
}

fn default_page_size() -> usize {
    8
}

impl AtlasConfig {
    pub fn from_json(raw: &str) -> Result<Self, AtlasError> {
        let config: AtlasConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AtlasError> {
        if self.sources.is_empty() {
            return Err(AtlasError::Config("no geojson sources configured".into()));
        }
        for (i, source) in self.sources.iter().enumerate() {
            if source.key.trim().is_empty() {
                return Err(AtlasError::Config(format!("sources[{i}].key is empty")));
            }
            if self.sources[..i].iter().any(|s| s.key == source.key) {
                return Err(AtlasError::Config(format!(
                    "duplicate source key {:?}",
                    source.key
                )));
            }
            if source.id_property.trim().is_empty() {
                return Err(AtlasError::Config(format!(
                    "sources[{i}].id_property is empty"
                )));
            }
        }
        for placeholder in ["{z}", "{x}", "{y}"] {
            if !self.map.basemap.tile_url.contains(placeholder) {
                return Err(AtlasError::Config(format!(
                    "basemap.tile_url is missing {placeholder}"
                )));
            }
        }
        if self.backend.url.trim().is_empty() || self.backend.table.trim().is_empty() {
            return Err(AtlasError::Config("backend.url and backend.table are required".into()));
        }
        if self.backend.join_column.trim().is_empty() {
            return Err(AtlasError::Config("backend.join_column is required".into()));
        }
        if self.backend.page_size == 0 {
            return Err(AtlasError::Config("backend.page_size must be positive".into()));
        }
        if self.map.gestures.pan_linearity <= 0.0 {
            return Err(AtlasError::Config(
                "gestures.pan_linearity must be positive".into(),
            ));
        }
        self.display.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> String {
        r##"{
            "map": {
                "center": [2.35, 48.86],
                "zoom": 6,
                "basemap": {
                    "tile_url": "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png",
                    "attribution": "© OpenStreetMap contributors",
                    "subdomains": ["a", "b", "c"]
                }
            },
            "sources": [
                { "key": "dep", "url": "data/dep.geojson", "id_property": "ID" },
                { "key": "fleuves", "url": "data/fleuves.geojson", "id_property": "ID", "color": "#1d7a99", "width": 3 }
            ],
            "backend": {
                "url": "https://example.supabase.co",
                "anon_key": "anon",
                "table": "chansons",
                "join_column": "anciens_id"
            },
            "display": { "title_column": "titre", "subtitle_column": "artiste" }
        }"##
        .to_string()
    }

    #[test]
    fn test_parse_with_defaults() {
        let config = AtlasConfig::from_json(&sample()).unwrap();
        assert_eq!(config.backend.page_size, 8);
        assert_eq!(config.backend.join_mode, JoinMode::PerClick);
        assert_eq!(config.map.basemap.max_zoom, 19);
        assert!(config.map.gestures.pan);
        assert_eq!(config.sources[0].width, 4.0);
        assert_eq!(config.sources[1].color, "#1d7a99");
        assert!(!config.debug_overlay);
    }

    #[test]
    fn test_join_mode_spelling() {
        let raw = sample().replace(
            "\"join_column\": \"anciens_id\"",
            "\"join_column\": \"anciens_id\", \"join_mode\": \"eager\"",
        );
        let config = AtlasConfig::from_json(&raw).unwrap();
        assert_eq!(config.backend.join_mode, JoinMode::Eager);
    }

    #[test]
    fn test_rejects_duplicate_source_keys() {
        let raw = sample().replace("\"key\": \"fleuves\"", "\"key\": \"dep\"");
        assert!(matches!(
            AtlasConfig::from_json(&raw),
            Err(AtlasError::Config(_))
        ));
    }

    #[test]
    fn test_rejects_bad_tile_template() {
        let raw = sample().replace("/{z}/{x}/{y}.png", "/tiles.png");
        assert!(matches!(
            AtlasConfig::from_json(&raw),
            Err(AtlasError::Config(_))
        ));
    }

    #[test]
    fn test_rejects_zero_page_size() {
        let raw = sample().replace(
            "\"join_column\": \"anciens_id\"",
            "\"join_column\": \"anciens_id\", \"page_size\": 0",
        );
        assert!(matches!(
            AtlasConfig::from_json(&raw),
            Err(AtlasError::Config(_))
        ));
    }

    #[test]
    fn test_rejects_colliding_display_columns() {
        let raw = sample().replace("\"subtitle_column\": \"artiste\"", "\"subtitle_column\": \"titre\"");
        assert!(matches!(
            AtlasConfig::from_json(&raw),
            Err(AtlasError::Config(_))
        ));
    }
}
