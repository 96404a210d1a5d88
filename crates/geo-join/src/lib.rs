//! Core logic for the songlines map viewer: GeoJSON feature flattening,
//! join-key normalization, popup pagination, PostgREST query construction,
//! and web-mercator camera math. Everything here is transport- and
//! DOM-free so it runs (and is tested) natively as well as in wasm.

pub mod config;
pub mod display;
pub mod error;
pub mod features;
pub mod ident;
pub mod mercator;
pub mod pager;
pub mod query;

pub use config::{AtlasConfig, JoinMode};
pub use display::{DisplayFields, RowProjection};
pub use error::AtlasError;
pub use features::MapFeature;
pub use mercator::{Camera, TileId};
pub use pager::{Pager, PagerView};
pub use query::{Row, TableQuery};
