use crate::braille::BrailleCanvas;
use crate::map::bounds::LngLatBounds;
use crate::map::geometry::{draw_line, draw_ring, fill_rings, point_in_rings, PixelRing};
use crate::map::projection::Viewport;
use crate::map::surface::{CursorIcon, FillPaint, MapSurface, SurfaceError, SurfaceEvent};
use geojson::{Feature, FeatureCollection, Value};
use std::collections::VecDeque;

/// A named fill layer bound to a registered source
struct FillLayer {
    id: String,
    source: String,
    paint: FillPaint,
}

/// Transient info popup anchored at a geographic location
#[derive(Clone, Debug, PartialEq)]
pub struct Popup {
    pub lng_lat: (f64, f64),
    pub body: String,
}

/// One rendered frame: the base outline canvas plus one canvas per fill
/// layer, in draw order (base first)
pub struct SurfaceFrame {
    pub base: BrailleCanvas,
    pub fills: Vec<(FillPaint, BrailleCanvas)>,
}

/// Braille-canvas map surface. Owns the viewport, the registered
/// sources/layers, pointer hit-testing, and the popup/cursor state.
/// Created once per session and mutated in place.
pub struct TerminalSurface {
    pub viewport: Viewport,
    base: Vec<Vec<(f64, f64)>>,
    sources: Vec<(String, FeatureCollection)>,
    layers: Vec<FillLayer>,
    events: VecDeque<SurfaceEvent>,
    ready_emitted: bool,
    cursor: CursorIcon,
    popup: Option<Popup>,
    hovered_layer: Option<String>,
}

impl TerminalSurface {
    /// Build a surface with an initial center/zoom and pixel dimensions.
    /// The base style (built-in coastline outlines) loads synchronously;
    /// the one-time `Ready` event is still delivered through the event
    /// queue so hosts cannot depend on it beating the first fit request.
    pub fn new(center_lon: f64, center_lat: f64, zoom: f64, width: usize, height: usize) -> Self {
        Self {
            viewport: Viewport::new(center_lon, center_lat, zoom, width, height),
            base: world_outlines(),
            sources: Vec::new(),
            layers: Vec::new(),
            events: VecDeque::new(),
            ready_emitted: false,
            cursor: CursorIcon::Default,
            popup: None,
            hovered_layer: None,
        }
    }

    /// Update pixel dimensions when the terminal resizes
    pub fn resize(&mut self, width: usize, height: usize) {
        self.viewport.width = width;
        self.viewport.height = height;
    }

    pub fn cursor(&self) -> CursorIcon {
        self.cursor
    }

    pub fn popup(&self) -> Option<&Popup> {
        self.popup.as_ref()
    }

    pub fn close_popup(&mut self) {
        self.popup = None;
    }

    /// Pointer moved to a pixel position: update hover state and emit
    /// enter/leave events scoped to the hovered layer
    pub fn pointer_moved(&mut self, px: i32, py: i32) {
        let hit = self.hit_test(px, py).map(|(layer, _)| layer);
        if hit == self.hovered_layer {
            return;
        }
        if let Some(layer) = self.hovered_layer.take() {
            self.events.push_back(SurfaceEvent::PointerLeave { layer });
        }
        if let Some(layer) = &hit {
            self.events.push_back(SurfaceEvent::PointerEnter {
                layer: layer.clone(),
            });
        }
        self.hovered_layer = hit;
    }

    /// Pointer clicked at a pixel position: emit a click event if a
    /// feature of some layer was hit
    pub fn pointer_clicked(&mut self, px: i32, py: i32) {
        if let Some((layer, feature)) = self.hit_test(px, py) {
            let lng_lat = self.viewport.unproject(px, py);
            self.events.push_back(SurfaceEvent::Click {
                layer,
                lng_lat,
                feature,
            });
        }
    }

    /// Topmost layer and feature index under a pixel position
    fn hit_test(&self, px: i32, py: i32) -> Option<(String, usize)> {
        let (lon, lat) = self.viewport.unproject(px, py);
        for layer in self.layers.iter().rev() {
            let Some((_, data)) = self.sources.iter().find(|(id, _)| *id == layer.source) else {
                continue;
            };
            for (idx, feature) in data.features.iter().enumerate() {
                if feature_contains(feature, lon, lat) {
                    return Some((layer.id.clone(), idx));
                }
            }
        }
        None
    }

    /// Rasterize the base outlines and every fill layer for the current
    /// viewport. Canvas dimensions follow the viewport's pixel size.
    pub fn render_frame(&self) -> SurfaceFrame {
        let chars_w = self.viewport.width / 2;
        let chars_h = self.viewport.height / 4;

        let mut base = BrailleCanvas::new(chars_w, chars_h);
        for line in &self.base {
            self.stroke_path(&mut base, line);
        }

        let mut fills = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            let mut canvas = BrailleCanvas::new(chars_w, chars_h);
            if let Some((_, data)) = self.sources.iter().find(|(id, _)| *id == layer.source) {
                for feature in &data.features {
                    self.rasterize_feature(&mut canvas, feature);
                }
            }
            fills.push((layer.paint, canvas));
        }

        SurfaceFrame { base, fills }
    }

    /// Draw a lon/lat path with viewport culling
    fn stroke_path(&self, canvas: &mut BrailleCanvas, line: &[(f64, f64)]) {
        if line.len() < 2 {
            return;
        }
        let mut prev: Option<(i32, i32)> = None;
        for &(lon, lat) in line {
            let (px, py) = self.viewport.project(lon, lat);
            if let Some((prev_x, prev_y)) = prev {
                let dist = ((px - prev_x).abs() + (py - prev_y).abs()) as usize;
                if dist < self.viewport.width
                    && self.viewport.line_might_be_visible((prev_x, prev_y), (px, py))
                {
                    draw_line(canvas, prev_x, prev_y, px, py);
                }
            }
            prev = Some((px, py));
        }
    }

    /// Project and fill every polygon of a feature, holes included
    fn rasterize_feature(&self, canvas: &mut BrailleCanvas, feature: &Feature) {
        let Some(geometry) = &feature.geometry else {
            return;
        };
        match &geometry.value {
            Value::Polygon(rings) => self.rasterize_polygon(canvas, rings),
            Value::MultiPolygon(polygons) => {
                for rings in polygons {
                    self.rasterize_polygon(canvas, rings);
                }
            }
            _ => {}
        }
    }

    fn rasterize_polygon(&self, canvas: &mut BrailleCanvas, rings: &[Vec<Vec<f64>>]) {
        let projected: Vec<PixelRing> = rings
            .iter()
            .map(|ring| {
                ring.iter()
                    .filter(|c| c.len() >= 2)
                    .map(|c| self.viewport.project(c[0], c[1]))
                    .collect()
            })
            .collect();

        fill_rings(canvas, &projected);
        if let Some(exterior) = projected.first() {
            draw_ring(canvas, exterior);
        }
    }
}

impl MapSurface for TerminalSurface {
    fn fit_bounds(&mut self, bounds: LngLatBounds, padding: f64) {
        self.viewport.fit_bounds(&bounds, padding);
    }

    fn add_source(&mut self, id: &str, data: FeatureCollection) -> Result<(), SurfaceError> {
        if self.has_source(id) {
            return Err(SurfaceError::DuplicateSource { id: id.to_string() });
        }
        self.sources.push((id.to_string(), data));
        Ok(())
    }

    fn add_fill_layer(
        &mut self,
        id: &str,
        source: &str,
        paint: FillPaint,
    ) -> Result<(), SurfaceError> {
        if self.has_layer(id) {
            return Err(SurfaceError::DuplicateLayer { id: id.to_string() });
        }
        if !self.has_source(source) {
            return Err(SurfaceError::UnknownSource {
                id: source.to_string(),
            });
        }
        self.layers.push(FillLayer {
            id: id.to_string(),
            source: source.to_string(),
            paint,
        });
        Ok(())
    }

    fn has_source(&self, id: &str) -> bool {
        self.sources.iter().any(|(s, _)| s == id)
    }

    fn has_layer(&self, id: &str) -> bool {
        self.layers.iter().any(|l| l.id == id)
    }

    fn poll_events(&mut self) -> Vec<SurfaceEvent> {
        if !self.ready_emitted {
            self.ready_emitted = true;
            self.events.push_front(SurfaceEvent::Ready);
        }
        self.events.drain(..).collect()
    }

    fn set_cursor(&mut self, cursor: CursorIcon) {
        self.cursor = cursor;
    }

    fn show_popup(&mut self, at: (f64, f64), body: String) {
        self.popup = Some(Popup { lng_lat: at, body });
    }
}

/// Even-odd containment over a feature's polygon geometry
fn feature_contains(feature: &Feature, lon: f64, lat: f64) -> bool {
    let Some(geometry) = &feature.geometry else {
        return false;
    };
    match &geometry.value {
        Value::Polygon(rings) => point_in_rings(rings, lon, lat),
        Value::MultiPolygon(polygons) => polygons
            .iter()
            .any(|rings| point_in_rings(rings, lon, lat)),
        _ => false,
    }
}

/// Simplified continent outlines used as the built-in base style
fn world_outlines() -> Vec<Vec<(f64, f64)>> {
    vec![
        // North America
        vec![
            (-168.0, 65.0), (-166.0, 60.0), (-141.0, 60.0), (-130.0, 55.0),
            (-125.0, 48.0), (-124.0, 40.0), (-117.0, 32.0), (-110.0, 25.0),
            (-97.0, 25.0), (-97.0, 28.0), (-82.0, 24.0), (-80.0, 25.0),
            (-81.0, 31.0), (-75.0, 35.0), (-70.0, 41.0), (-67.0, 45.0),
            (-65.0, 47.0), (-55.0, 47.0), (-52.0, 47.0), (-55.0, 52.0),
            (-58.0, 55.0), (-64.0, 60.0), (-73.0, 62.0), (-80.0, 63.0),
            (-95.0, 62.0), (-110.0, 68.0), (-130.0, 70.0), (-145.0, 70.0),
            (-168.0, 65.0),
        ],
        // South America
        vec![
            (-80.0, 10.0), (-75.0, 5.0), (-70.0, 5.0), (-60.0, 5.0),
            (-50.0, 0.0), (-35.0, -5.0), (-35.0, -10.0), (-38.0, -15.0),
            (-40.0, -22.0), (-48.0, -25.0), (-55.0, -34.0), (-58.0, -38.0),
            (-65.0, -42.0), (-68.0, -50.0), (-75.0, -52.0), (-75.0, -45.0),
            (-72.0, -40.0), (-72.0, -30.0), (-70.0, -20.0), (-70.0, -15.0),
            (-80.0, -5.0), (-80.0, 0.0), (-80.0, 10.0),
        ],
        // Europe
        vec![
            (-10.0, 36.0), (-5.0, 36.0), (0.0, 38.0), (5.0, 43.0),
            (10.0, 44.0), (15.0, 45.0), (20.0, 40.0), (25.0, 37.0),
            (30.0, 40.0), (35.0, 42.0), (40.0, 43.0), (40.0, 55.0),
            (30.0, 60.0), (25.0, 65.0), (20.0, 70.0), (10.0, 71.0),
            (5.0, 62.0), (5.0, 58.0), (-5.0, 58.0), (-10.0, 52.0),
            (-5.0, 48.0), (-5.0, 43.0), (-10.0, 36.0),
        ],
        // Africa
        vec![
            (-17.0, 15.0), (-17.0, 20.0), (-15.0, 28.0), (-5.0, 35.0),
            (10.0, 37.0), (20.0, 33.0), (25.0, 32.0), (35.0, 30.0),
            (35.0, 20.0), (42.0, 12.0), (50.0, 12.0), (45.0, 5.0),
            (40.0, -5.0), (38.0, -15.0), (35.0, -20.0), (35.0, -25.0),
            (30.0, -30.0), (20.0, -35.0), (18.0, -35.0), (15.0, -30.0),
            (10.0, -15.0), (10.0, 0.0), (5.0, 5.0), (-5.0, 5.0),
            (-10.0, 10.0), (-17.0, 15.0),
        ],
        // Madagascar
        vec![
            (49.3, -12.1), (50.2, -15.5), (47.5, -24.6), (45.2, -25.5),
            (43.9, -21.5), (44.5, -16.2), (46.3, -15.9), (48.0, -13.0),
            (49.3, -12.1),
        ],
        // Asia
        vec![
            (35.0, 42.0), (40.0, 43.0), (50.0, 40.0), (55.0, 37.0),
            (60.0, 25.0), (65.0, 25.0), (70.0, 20.0), (75.0, 15.0),
            (80.0, 8.0), (80.0, 15.0), (88.0, 22.0), (92.0, 22.0),
            (95.0, 16.0), (100.0, 14.0), (105.0, 10.0), (110.0, 20.0),
            (115.0, 22.0), (120.0, 22.0), (122.0, 25.0), (125.0, 30.0),
            (130.0, 35.0), (135.0, 35.0), (140.0, 40.0), (145.0, 45.0),
            (145.0, 50.0), (140.0, 55.0), (135.0, 55.0), (130.0, 52.0),
            (130.0, 43.0), (120.0, 40.0), (110.0, 45.0), (90.0, 50.0),
            (70.0, 55.0), (60.0, 55.0), (50.0, 50.0), (40.0, 43.0),
        ],
        // Australia
        vec![
            (115.0, -20.0), (120.0, -18.0), (130.0, -12.0), (140.0, -12.0),
            (145.0, -15.0), (150.0, -25.0), (153.0, -30.0), (150.0, -35.0),
            (145.0, -38.0), (140.0, -38.0), (135.0, -35.0), (130.0, -32.0),
            (125.0, -32.0), (115.0, -35.0), (115.0, -25.0), (115.0, -20.0),
        ],
    ]
}
