//! Canvas painting for the map surface: raster tiles first, then the
//! GeoJSON line layers.
//!
//! Layer geometry is projected once into unit-world pixels (the 256px
//! zoom-0 world) and cached as `Path2d`s; every frame only swaps the affine
//! transform, so pan/zoom never rebuilds paths.

use std::rc::Rc;

use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlElement, Path2d};

use geo_join::config::SourceConfig;
use geo_join::features::{path_within, MapFeature};
use geo_join::mercator::{project_unit, Camera};

use crate::tiles::TileCache;

/// Extra slack around a line for click/hover hit-testing, in screen px.
const HIT_SLACK_PX: f64 = 4.0;

pub struct PreparedFeature {
    pub id: Option<String>,
    pub unit_paths: Vec<Vec<[f64; 2]>>,
    pub path: Path2d,
}

pub struct PreparedLayer {
    pub key: String,
    pub color: String,
    pub width: f64,
    pub features: Vec<PreparedFeature>,
}

pub fn prepare_layer(source: &SourceConfig, features: Vec<MapFeature>) -> PreparedLayer {
    let features = features
        .into_iter()
        .map(|feature| {
            let unit_paths: Vec<Vec<[f64; 2]>> = feature
                .paths
                .iter()
                .map(|path| path.iter().map(|p| project_unit(p[0], p[1])).collect())
                .collect();
            let path = build_path(&unit_paths);
            PreparedFeature {
                id: feature.id,
                unit_paths,
                path,
            }
        })
        .collect();
    PreparedLayer {
        key: source.key.clone(),
        color: source.color.clone(),
        width: source.width,
        features,
    }
}

fn build_path(paths: &[Vec<[f64; 2]>]) -> Path2d {
    let path = Path2d::new().unwrap();
    for polyline in paths {
        if let Some(first) = polyline.first() {
            path.move_to(first[0], first[1]);
            for p in &polyline[1..] {
                path.line_to(p[0], p[1]);
            }
        }
    }
    path
}

/// Match the canvas buffer to its container. Returns the css size.
pub fn resize_canvas(canvas: &HtmlCanvasElement, dpr: f64) -> (f64, f64) {
    let parent: HtmlElement = canvas.parent_element().unwrap().dyn_into().unwrap();
    let width = parent.client_width() as f64;
    let height = parent.client_height() as f64;
    canvas.set_width((width * dpr) as u32);
    canvas.set_height((height * dpr) as u32);
    (width, height)
}

pub fn draw_map(
    canvas: &HtmlCanvasElement,
    camera: &Camera,
    tiles: &mut TileCache,
    layers: &[Rc<PreparedLayer>],
    dpr: f64,
) {
    let (width, height) = resize_canvas(canvas, dpr);
    let ctx: CanvasRenderingContext2d = canvas
        .get_context("2d")
        .unwrap()
        .unwrap()
        .dyn_into()
        .unwrap();

    ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0).unwrap();
    ctx.set_fill_style_str("#dde8ef");
    ctx.fill_rect(0.0, 0.0, width * dpr, height * dpr);

    // unit world → canvas px
    let k = camera.scale() * dpr;
    let origin = camera.unit_to_screen([0.0, 0.0], width, height);
    ctx.set_transform(k, 0.0, 0.0, k, origin[0] * dpr, origin[1] * dpr)
        .unwrap();

    for id in camera.visible_tiles(width, height) {
        if let Some(img) = tiles.get(id) {
            let (pos, size) = id.unit_rect();
            let _ = ctx
                .draw_image_with_html_image_element_and_dw_and_dh(img, pos[0], pos[1], size, size);
        }
    }

    for layer in layers {
        ctx.set_stroke_style_str(&layer.color);
        ctx.set_line_cap("round");
        ctx.set_line_join("round");
        ctx.set_line_width(layer.width * dpr / k);
        for feature in &layer.features {
            ctx.stroke_with_path(&feature.path);
        }
    }
}

/// Topmost feature within hit tolerance of a screen point, as
/// (layer index, feature index).
pub fn hit_feature(
    layers: &[Rc<PreparedLayer>],
    camera: &Camera,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
) -> Option<(usize, usize)> {
    let p = camera.screen_to_unit(x, y, width, height);
    // Layers draw bottom-up, so scan top-down.
    for (li, layer) in layers.iter().enumerate().rev() {
        let tolerance = (layer.width / 2.0 + HIT_SLACK_PX) / camera.scale();
        for (fi, feature) in layer.features.iter().enumerate() {
            if feature
                .unit_paths
                .iter()
                .any(|path| path_within(path, p, tolerance))
            {
                return Some((li, fi));
            }
        }
    }
    None
}
