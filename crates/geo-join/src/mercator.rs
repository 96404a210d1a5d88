//! Web-mercator math: unit-world projection, the map camera, and visible
//! raster tile enumeration.
//!
//! Coordinates live in "unit world" pixels — the 256px world of zoom 0 —
//! so projected geometry never has to be recomputed when the camera moves;
//! only the affine screen transform changes.

use std::f64::consts::PI;

pub const TILE_SIZE: f64 = 256.0;

/// Mercator pole cutoff; latitudes beyond this are pinned.
pub const MAX_LATITUDE: f64 = 85.051_128_78;

pub const MIN_ZOOM: f64 = 1.0;

/// lng/lat → unit-world pixels (zoom 0, 256px world).
pub fn project_unit(lng: f64, lat: f64) -> [f64; 2] {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let x = (lng + 180.0) / 360.0 * TILE_SIZE;
    let lat_rad = lat.to_radians();
    let y = (1.0 - ((lat_rad.tan() + 1.0 / lat_rad.cos()).ln()) / PI) / 2.0 * TILE_SIZE;
    [x, y]
}

/// unit-world pixels → lng/lat.
pub fn unproject_unit(p: [f64; 2]) -> (f64, f64) {
    let lng = p[0] / TILE_SIZE * 360.0 - 180.0;
    let n = PI * (1.0 - 2.0 * p[1] / TILE_SIZE);
    let lat = n.sinh().atan().to_degrees();
    (lng, lat)
}

/// One raster basemap tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileId {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileId {
    /// Top-left corner and edge length of this tile, in unit-world pixels.
    pub fn unit_rect(&self) -> ([f64; 2], f64) {
        let size = TILE_SIZE / (1u32 << self.z) as f64;
        ([self.x as f64 * size, self.y as f64 * size], size)
    }
}

/// Fill a `{z}/{x}/{y}` template, rotating `{s}` through `subdomains`.
pub fn tile_url(template: &str, subdomains: &[String], id: TileId) -> String {
    let mut url = template
        .replace("{z}", &id.z.to_string())
        .replace("{x}", &id.x.to_string())
        .replace("{y}", &id.y.to_string());
    if url.contains("{s}") {
        let sub = if subdomains.is_empty() {
            ""
        } else {
            &subdomains[(id.x + id.y) as usize % subdomains.len()]
        };
        url = url.replace("{s}", sub);
    }
    url
}

/// The single map viewport: a geographic center and a fractional zoom.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub lng: f64,
    pub lat: f64,
    pub zoom: f64,
    pub max_zoom: f64,
}

impl Camera {
    pub fn new(lng: f64, lat: f64, zoom: f64, max_zoom: f64) -> Self {
        let mut cam = Self {
            lng,
            lat,
            zoom: 0.0,
            max_zoom,
        };
        cam.set_zoom(zoom);
        cam
    }

    /// Screen pixels per unit-world pixel.
    pub fn scale(&self) -> f64 {
        self.zoom.exp2()
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(MIN_ZOOM, self.max_zoom);
    }

    fn center_unit(&self) -> [f64; 2] {
        project_unit(self.lng, self.lat)
    }

    fn set_center_unit(&mut self, p: [f64; 2]) {
        let (lng, lat) = unproject_unit(p);
        self.lng = lng;
        self.lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    }

    pub fn screen_to_unit(&self, x: f64, y: f64, width: f64, height: f64) -> [f64; 2] {
        let c = self.center_unit();
        let k = self.scale();
        [
            c[0] + (x - width / 2.0) / k,
            c[1] + (y - height / 2.0) / k,
        ]
    }

    pub fn unit_to_screen(&self, p: [f64; 2], width: f64, height: f64) -> [f64; 2] {
        let c = self.center_unit();
        let k = self.scale();
        [
            (p[0] - c[0]) * k + width / 2.0,
            (p[1] - c[1]) * k + height / 2.0,
        ]
    }

    pub fn screen_to_lng_lat(&self, x: f64, y: f64, width: f64, height: f64) -> (f64, f64) {
        unproject_unit(self.screen_to_unit(x, y, width, height))
    }

    pub fn lng_lat_to_screen(&self, lng: f64, lat: f64, width: f64, height: f64) -> [f64; 2] {
        self.unit_to_screen(project_unit(lng, lat), width, height)
    }

    /// Move the map content by a drag delta in screen pixels.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        let k = self.scale();
        let c = self.center_unit();
        self.set_center_unit([c[0] - dx / k, c[1] - dy / k]);
    }

    /// Change zoom while keeping the geography under the anchor point fixed.
    pub fn zoom_about(&mut self, new_zoom: f64, anchor_x: f64, anchor_y: f64, width: f64, height: f64) {
        let anchor_unit = self.screen_to_unit(anchor_x, anchor_y, width, height);
        self.set_zoom(new_zoom);
        let k = self.scale();
        self.set_center_unit([
            anchor_unit[0] - (anchor_x - width / 2.0) / k,
            anchor_unit[1] - (anchor_y - height / 2.0) / k,
        ]);
    }

    /// Tiles covering the viewport, at the integer level nearest the
    /// current zoom (clamped to what the tile source offers).
    pub fn visible_tiles(&self, width: f64, height: f64) -> Vec<TileId> {
        let z = self.zoom.round().clamp(0.0, self.max_zoom) as u8;
        let n = 1u32 << z;
        let tile_unit = TILE_SIZE / n as f64;

        let min = self.screen_to_unit(0.0, 0.0, width, height);
        let max = self.screen_to_unit(width, height, width, height);

        let clamp_idx = |v: f64| -> u32 { (v.floor().max(0.0) as u32).min(n - 1) };
        let x0 = clamp_idx(min[0] / tile_unit);
        let x1 = clamp_idx(max[0] / tile_unit);
        let y0 = clamp_idx(min[1] / tile_unit);
        let y1 = clamp_idx(max[1] / tile_unit);

        let mut tiles = Vec::with_capacity(((x1 - x0 + 1) * (y1 - y0 + 1)) as usize);
        for y in y0..=y1 {
            for x in x0..=x1 {
                tiles.push(TileId { z, x, y });
            }
        }
        tiles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_origin_projects_to_world_center() {
        let p = project_unit(0.0, 0.0);
        assert_relative_eq!(p[0], 128.0, epsilon = 1e-9);
        assert_relative_eq!(p[1], 128.0, epsilon = 1e-9);
    }

    #[test]
    fn test_project_roundtrip() {
        // Paris
        let (lng, lat) = unproject_unit(project_unit(2.35, 48.86));
        assert_relative_eq!(lng, 2.35, epsilon = 1e-9);
        assert_relative_eq!(lat, 48.86, epsilon = 1e-9);
    }

    #[test]
    fn test_center_maps_to_viewport_center() {
        let cam = Camera::new(2.35, 48.86, 6.0, 19.0);
        let p = cam.lng_lat_to_screen(2.35, 48.86, 800.0, 600.0);
        assert_relative_eq!(p[0], 400.0, epsilon = 1e-9);
        assert_relative_eq!(p[1], 300.0, epsilon = 1e-9);
    }

    #[test]
    fn test_screen_roundtrip() {
        let cam = Camera::new(2.35, 48.86, 6.0, 19.0);
        let (lng, lat) = cam.screen_to_lng_lat(123.0, 456.0, 800.0, 600.0);
        let p = cam.lng_lat_to_screen(lng, lat, 800.0, 600.0);
        assert_relative_eq!(p[0], 123.0, epsilon = 1e-6);
        assert_relative_eq!(p[1], 456.0, epsilon = 1e-6);
    }

    #[test]
    fn test_zoom_about_keeps_anchor_fixed() {
        let mut cam = Camera::new(2.35, 48.86, 6.0, 19.0);
        let before = cam.screen_to_lng_lat(100.0, 50.0, 800.0, 600.0);
        cam.zoom_about(8.0, 100.0, 50.0, 800.0, 600.0);
        let after = cam.screen_to_lng_lat(100.0, 50.0, 800.0, 600.0);
        assert_relative_eq!(before.0, after.0, epsilon = 1e-9);
        assert_relative_eq!(before.1, after.1, epsilon = 1e-9);
    }

    #[test]
    fn test_pan_moves_content_with_drag() {
        let mut cam = Camera::new(2.35, 48.86, 6.0, 19.0);
        let anchor = cam.screen_to_lng_lat(400.0, 300.0, 800.0, 600.0);
        cam.pan_by(50.0, -20.0);
        // The point formerly at the center is now 50px right, 20px up.
        let p = cam.lng_lat_to_screen(anchor.0, anchor.1, 800.0, 600.0);
        assert_relative_eq!(p[0], 450.0, epsilon = 1e-6);
        assert_relative_eq!(p[1], 280.0, epsilon = 1e-6);
    }

    #[test]
    fn test_zoom_clamped() {
        let mut cam = Camera::new(0.0, 0.0, 6.0, 10.0);
        cam.set_zoom(25.0);
        assert_relative_eq!(cam.zoom, 10.0);
        cam.set_zoom(-3.0);
        assert_relative_eq!(cam.zoom, MIN_ZOOM);
    }

    #[test]
    fn test_visible_tiles_cover_viewport() {
        let cam = Camera::new(2.35, 48.86, 6.0, 19.0);
        let tiles = cam.visible_tiles(800.0, 600.0);
        assert!(!tiles.is_empty());
        assert!(tiles.iter().all(|t| t.z == 6));
        // 800x600 css px at zoom 6 is at most a 5x4 tile window.
        assert!(tiles.len() <= 20);
        // The center tile must be present.
        let c = project_unit(2.35, 48.86);
        let tile_unit = TILE_SIZE / 64.0;
        let center = TileId {
            z: 6,
            x: (c[0] / tile_unit) as u32,
            y: (c[1] / tile_unit) as u32,
        };
        assert!(tiles.contains(&center));
    }

    #[test]
    fn test_tile_indices_clamped_at_world_edge() {
        let cam = Camera::new(-179.9, 84.0, 1.0, 19.0);
        for t in cam.visible_tiles(1600.0, 1200.0) {
            assert!(t.x < 2 && t.y < 2);
        }
    }

    #[test]
    fn test_tile_url_template() {
        let id = TileId { z: 6, x: 32, y: 22 };
        assert_eq!(
            tile_url("https://tile.osm.org/{z}/{x}/{y}.png", &[], id),
            "https://tile.osm.org/6/32/22.png"
        );
        let subs = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let url = tile_url("https://{s}.tile.osm.org/{z}/{x}/{y}.png", &subs, id);
        assert_eq!(url, "https://a.tile.osm.org/6/32/22.png");
    }

    #[test]
    fn test_tile_unit_rect() {
        let (pos, size) = TileId { z: 1, x: 1, y: 0 }.unit_rect();
        assert_relative_eq!(pos[0], 128.0);
        assert_relative_eq!(pos[1], 0.0);
        assert_relative_eq!(size, 128.0);
    }
}
