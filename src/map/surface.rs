use crate::map::bounds::LngLatBounds;
use geojson::FeatureCollection;

/// Errors from named source/layer registration on a surface
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("source `{id}` is already registered")]
    DuplicateSource { id: String },
    #[error("layer `{id}` is already registered")]
    DuplicateLayer { id: String },
    #[error("layer references unknown source `{id}`")]
    UnknownSource { id: String },
}

/// Fixed styling for a fill layer (no per-feature styling)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FillPaint {
    pub color: (u8, u8, u8),
    pub opacity: f64,
}

impl Default for FillPaint {
    fn default() -> Self {
        Self {
            color: (255, 0, 0),
            opacity: 0.5,
        }
    }
}

/// Pointer affordance requested by the pipeline
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CursorIcon {
    #[default]
    Default,
    Pointer,
}

/// Events a surface delivers to its host.
/// `Ready` fires exactly once, after the base style has finished loading.
#[derive(Clone, Debug, PartialEq)]
pub enum SurfaceEvent {
    Ready,
    /// Pointer click that hit a feature of the named layer.
    /// `feature` indexes into the layer's source features.
    Click {
        layer: String,
        lng_lat: (f64, f64),
        feature: usize,
    },
    PointerEnter {
        layer: String,
    },
    PointerLeave {
        layer: String,
    },
}

/// The capabilities this viewer requires from a map rendering backend.
/// Any conforming surface can be substituted, including a fake in tests.
pub trait MapSurface {
    /// Move the viewport to fit a bounding box with a pixel padding margin
    fn fit_bounds(&mut self, bounds: LngLatBounds, padding: f64);

    /// Register a named GeoJSON data source. Duplicate names are rejected.
    fn add_source(&mut self, id: &str, data: FeatureCollection) -> Result<(), SurfaceError>;

    /// Register a named fill layer bound to a registered source
    fn add_fill_layer(&mut self, id: &str, source: &str, paint: FillPaint)
        -> Result<(), SurfaceError>;

    fn has_source(&self, id: &str) -> bool;

    fn has_layer(&self, id: &str) -> bool;

    /// Drain pending surface events (Ready, pointer interactions)
    fn poll_events(&mut self) -> Vec<SurfaceEvent>;

    fn set_cursor(&mut self, cursor: CursorIcon);

    /// Open a transient popup anchored at a geographic location
    fn show_popup(&mut self, at: (f64, f64), body: String);
}
