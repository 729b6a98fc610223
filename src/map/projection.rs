use crate::map::bounds::LngLatBounds;
use std::f64::consts::PI;

const MIN_ZOOM: f64 = 0.5;
const MAX_ZOOM: f64 = 100.0;

/// Viewport representing the visible map area and zoom level
#[derive(Clone)]
pub struct Viewport {
    /// Center longitude (-180 to 180)
    pub center_lon: f64,
    /// Center latitude (-90 to 90)
    pub center_lat: f64,
    /// Zoom level (higher = more zoomed in)
    pub zoom: f64,
    /// Canvas pixel width
    pub width: usize,
    /// Canvas pixel height
    pub height: usize,
}

/// Web Mercator normalized y for a latitude in degrees
fn mercator_y(lat: f64) -> f64 {
    let lat_rad = lat * PI / 180.0;
    (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0
}

impl Viewport {
    pub fn new(center_lon: f64, center_lat: f64, zoom: f64, width: usize, height: usize) -> Self {
        Self {
            center_lon,
            center_lat,
            zoom,
            width,
            height,
        }
    }

    /// Pan the viewport by pixel delta
    pub fn pan(&mut self, dx: i32, dy: i32) {
        let scale = 360.0 / (self.zoom * self.width as f64);
        self.center_lon += dx as f64 * scale;
        self.center_lat -= dy as f64 * scale * 0.5; // Mercator distortion

        // Wrap longitude
        if self.center_lon > 180.0 {
            self.center_lon -= 360.0;
        } else if self.center_lon < -180.0 {
            self.center_lon += 360.0;
        }

        // Clamp latitude
        self.center_lat = self.center_lat.clamp(-85.0, 85.0);
    }

    /// Zoom in by a factor
    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom * 1.5).min(MAX_ZOOM);
    }

    /// Zoom out by a factor
    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom / 1.5).max(MIN_ZOOM);
    }

    /// Zoom in towards a specific pixel location
    pub fn zoom_in_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.5);
    }

    /// Zoom out from a specific pixel location
    pub fn zoom_out_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.0 / 1.5);
    }

    /// Zoom by factor towards a specific pixel location
    fn zoom_at(&mut self, px: i32, py: i32, factor: f64) {
        // Get the geographic coordinates under the cursor
        let (lon, lat) = self.unproject(px, py);

        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);

        // Pan so the same point lands back under the cursor
        let (new_px, new_py) = self.project(lon, lat);
        self.pan(new_px - px, new_py - py);
    }

    /// Move and zoom the viewport so the box is fully visible with a
    /// pixel padding margin on every side
    pub fn fit_bounds(&mut self, bounds: &LngLatBounds, padding: f64) {
        let span_x = (bounds.east - bounds.west).abs() / 360.0;
        let span_y = (mercator_y(bounds.south) - mercator_y(bounds.north)).abs();

        let avail_w = (self.width as f64 - 2.0 * padding).max(1.0);
        let avail_h = (self.height as f64 - 2.0 * padding).max(1.0);

        // Projection scale is zoom * width on both axes
        let zoom_x = if span_x > 0.0 {
            avail_w / (span_x * self.width as f64)
        } else {
            MAX_ZOOM
        };
        let zoom_y = if span_y > 0.0 {
            avail_h / (span_y * self.width as f64)
        } else {
            MAX_ZOOM
        };
        self.zoom = zoom_x.min(zoom_y).clamp(MIN_ZOOM, MAX_ZOOM);

        // Center on the box, midpoint taken in Mercator space vertically
        self.center_lon = (bounds.west + bounds.east) / 2.0;
        let mid_y = (mercator_y(bounds.south) + mercator_y(bounds.north)) / 2.0;
        let lat_rad = (PI * (1.0 - 2.0 * mid_y)).sinh().atan();
        self.center_lat = (lat_rad * 180.0 / PI).clamp(-85.0, 85.0);
    }

    /// Unproject pixel coordinates back to geographic coordinates (lon, lat)
    pub fn unproject(&self, px: i32, py: i32) -> (f64, f64) {
        let scale = self.zoom * self.width as f64;

        let center_x = (self.center_lon + 180.0) / 360.0;
        let center_y = mercator_y(self.center_lat);

        let x = (px as f64 - self.width as f64 / 2.0) / scale + center_x;
        let y = (py as f64 - self.height as f64 / 2.0) / scale + center_y;

        let lon = x * 360.0 - 180.0;
        let lat_rad = (PI * (1.0 - 2.0 * y)).sinh().atan();
        let lat = lat_rad * 180.0 / PI;

        (lon, lat)
    }

    /// Project a geographic coordinate (lon, lat) to pixel coordinates
    pub fn project(&self, lon: f64, lat: f64) -> (i32, i32) {
        // Web Mercator projection
        let x = (lon + 180.0) / 360.0;
        let y = mercator_y(lat);

        let center_x = (self.center_lon + 180.0) / 360.0;
        let center_y = mercator_y(self.center_lat);

        let scale = self.zoom * self.width as f64;

        let px = ((x - center_x) * scale + self.width as f64 / 2.0) as i32;
        let py = ((y - center_y) * scale + self.height as f64 / 2.0) as i32;

        (px, py)
    }

    /// Check if a line segment might be visible (rough bounding box check)
    pub fn line_might_be_visible(&self, p1: (i32, i32), p2: (i32, i32)) -> bool {
        let min_x = p1.0.min(p2.0);
        let max_x = p1.0.max(p2.0);
        let min_y = p1.1.min(p2.1);
        let max_y = p1.1.max(p2.1);

        max_x >= 0 && min_x < self.width as i32 && max_y >= 0 && min_y < self.height as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_center() {
        let vp = Viewport::new(0.0, 0.0, 1.0, 100, 100);
        let (x, y) = vp.project(0.0, 0.0);
        assert_eq!(x, 50);
        assert_eq!(y, 50);
    }

    #[test]
    fn test_pan() {
        let mut vp = Viewport::new(0.0, 0.0, 1.0, 100, 100);
        vp.pan(10, 0);
        assert!(vp.center_lon > 0.0);
    }

    #[test]
    fn test_project_unproject_roundtrip() {
        let vp = Viewport::new(46.5, -19.0, 50.0, 200, 120);
        let (px, py) = vp.project(46.8, -19.2);
        let (lon, lat) = vp.unproject(px, py);
        assert!((lon - 46.8).abs() < 0.1);
        assert!((lat + 19.2).abs() < 0.1);
    }

    #[test]
    fn test_fit_bounds_makes_box_visible() {
        let mut vp = Viewport::new(0.0, 20.0, 1.0, 200, 120);
        let mut bounds = LngLatBounds::new(10.0, 10.0);
        bounds.extend(20.0, 20.0);
        vp.fit_bounds(&bounds, 20.0);

        for (lon, lat) in [(10.0, 10.0), (20.0, 10.0), (20.0, 20.0), (10.0, 20.0)] {
            let (px, py) = vp.project(lon, lat);
            assert!(px >= 0 && px < 200, "x {px} out of canvas");
            assert!(py >= 0 && py < 120, "y {py} out of canvas");
        }
    }

    #[test]
    fn test_fit_bounds_respects_padding() {
        let mut vp = Viewport::new(0.0, 0.0, 1.0, 200, 200);
        let mut bounds = LngLatBounds::new(-10.0, -10.0);
        bounds.extend(10.0, 10.0);
        vp.fit_bounds(&bounds, 20.0);

        let (west_px, _) = vp.project(-10.0, 0.0);
        let (east_px, _) = vp.project(10.0, 0.0);
        assert!(west_px >= 19, "west edge {west_px} inside padding");
        assert!(east_px <= 181, "east edge {east_px} inside padding");
    }
}
