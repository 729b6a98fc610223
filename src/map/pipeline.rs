use crate::map::bounds::feature_bounds;
use crate::map::surface::{CursorIcon, FillPaint, MapSurface, SurfaceError, SurfaceEvent};
use geojson::{Feature, FeatureCollection};
use serde_json::Value;

/// Name of the vector source holding the project's site features
pub const SITES_SOURCE: &str = "sites";
/// Name of the fill layer bound to [`SITES_SOURCE`]
pub const SITES_LAYER: &str = "sites-fill";
/// Pixel margin around the fitted bounding box
pub const FIT_PADDING: f64 = 20.0;

/// Drives one feature set onto a map surface: fits the viewport to the
/// first feature's outer ring, registers the features as a source plus a
/// fill layer once the surface is ready, and reacts to pointer events
/// scoped to that layer.
pub struct SiteRenderer {
    paint: FillPaint,
    features: Vec<Feature>,
    staged: bool,
    ready_seen: bool,
    registered: bool,
}

impl SiteRenderer {
    pub fn new(paint: FillPaint) -> Self {
        Self {
            paint,
            features: Vec::new(),
            staged: false,
            ready_seen: false,
            registered: false,
        }
    }

    /// Hand a feature set to the surface. An empty set is a no-op: nothing
    /// is fitted and nothing is registered. A second non-empty call fails
    /// with a duplicate error instead of re-adding overlapping layers.
    ///
    /// The viewport fit is requested immediately; source/layer registration
    /// waits for the surface's one-time `Ready` event, which may already
    /// have fired.
    pub fn render(
        &mut self,
        surface: &mut dyn MapSurface,
        features: Vec<Feature>,
    ) -> Result<(), SurfaceError> {
        if features.is_empty() {
            tracing::debug!("no site features to render");
            return Ok(());
        }

        if self.staged || surface.has_layer(SITES_LAYER) {
            return Err(SurfaceError::DuplicateLayer {
                id: SITES_LAYER.to_string(),
            });
        }
        if surface.has_source(SITES_SOURCE) {
            return Err(SurfaceError::DuplicateSource {
                id: SITES_SOURCE.to_string(),
            });
        }

        // Fit to the first feature's outer ring only. Later features and
        // holes are intentionally not part of the fit.
        match feature_bounds(&features[0]) {
            Some(bounds) => surface.fit_bounds(bounds, FIT_PADDING),
            None => tracing::warn!("first feature has no polygon ring, skipping viewport fit"),
        }

        self.features = features;
        self.staged = true;

        if self.ready_seen {
            self.register(surface)?;
        }
        Ok(())
    }

    /// Feed one surface event through the pipeline
    pub fn handle_event(
        &mut self,
        surface: &mut dyn MapSurface,
        event: SurfaceEvent,
    ) -> Result<(), SurfaceError> {
        match event {
            SurfaceEvent::Ready => {
                self.ready_seen = true;
                if self.staged && !self.registered {
                    self.register(surface)?;
                }
            }
            SurfaceEvent::Click {
                layer,
                lng_lat,
                feature,
            } if layer == SITES_LAYER => {
                let body = self
                    .features
                    .get(feature)
                    .and_then(|f| f.properties.as_ref())
                    .and_then(|p| p.get("description"))
                    .map(describe)
                    .unwrap_or_default();
                surface.show_popup(lng_lat, body);
            }
            SurfaceEvent::PointerEnter { layer } if layer == SITES_LAYER => {
                surface.set_cursor(CursorIcon::Pointer);
            }
            SurfaceEvent::PointerLeave { layer } if layer == SITES_LAYER => {
                surface.set_cursor(CursorIcon::Default);
            }
            _ => {}
        }
        Ok(())
    }

    fn register(&mut self, surface: &mut dyn MapSurface) -> Result<(), SurfaceError> {
        // The collection envelope is rebuilt fresh from the feature list
        let data = FeatureCollection {
            bbox: None,
            features: self.features.clone(),
            foreign_members: None,
        };
        surface.add_source(SITES_SOURCE, data)?;
        surface.add_fill_layer(SITES_LAYER, SITES_SOURCE, self.paint)?;
        self.registered = true;
        tracing::info!(features = self.features.len(), "site layer registered");
        Ok(())
    }
}

/// Popup body for a `description` property value. Strings render bare,
/// anything else renders as JSON; no validation beyond that.
fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::bounds::LngLatBounds;
    use geojson::{Geometry, JsonObject};

    /// Recording surface: stores every call in order, never renders
    #[derive(Default)]
    struct FakeSurface {
        calls: Vec<Call>,
        sources: Vec<String>,
        layers: Vec<String>,
        events: Vec<SurfaceEvent>,
    }

    #[derive(Debug, PartialEq)]
    enum Call {
        FitBounds { bounds: LngLatBounds, padding: f64 },
        AddSource { id: String, features: usize },
        AddFillLayer { id: String, source: String },
        SetCursor(CursorIcon),
        ShowPopup { at: (f64, f64), body: String },
    }

    impl MapSurface for FakeSurface {
        fn fit_bounds(&mut self, bounds: LngLatBounds, padding: f64) {
            self.calls.push(Call::FitBounds { bounds, padding });
        }

        fn add_source(&mut self, id: &str, data: FeatureCollection) -> Result<(), SurfaceError> {
            if self.has_source(id) {
                return Err(SurfaceError::DuplicateSource { id: id.to_string() });
            }
            self.sources.push(id.to_string());
            self.calls.push(Call::AddSource {
                id: id.to_string(),
                features: data.features.len(),
            });
            Ok(())
        }

        fn add_fill_layer(
            &mut self,
            id: &str,
            source: &str,
            _paint: FillPaint,
        ) -> Result<(), SurfaceError> {
            if self.has_layer(id) {
                return Err(SurfaceError::DuplicateLayer { id: id.to_string() });
            }
            if !self.has_source(source) {
                return Err(SurfaceError::UnknownSource {
                    id: source.to_string(),
                });
            }
            self.layers.push(id.to_string());
            self.calls.push(Call::AddFillLayer {
                id: id.to_string(),
                source: source.to_string(),
            });
            Ok(())
        }

        fn has_source(&self, id: &str) -> bool {
            self.sources.iter().any(|s| s == id)
        }

        fn has_layer(&self, id: &str) -> bool {
            self.layers.iter().any(|l| l == id)
        }

        fn poll_events(&mut self) -> Vec<SurfaceEvent> {
            std::mem::take(&mut self.events)
        }

        fn set_cursor(&mut self, cursor: CursorIcon) {
            self.calls.push(Call::SetCursor(cursor));
        }

        fn show_popup(&mut self, at: (f64, f64), body: String) {
            self.calls.push(Call::ShowPopup { at, body });
        }
    }

    fn plot_a() -> Feature {
        let mut props = JsonObject::new();
        props.insert("description".into(), "Plot A".into());
        Feature {
            bbox: None,
            geometry: Some(Geometry::new(geojson::Value::Polygon(vec![vec![
                vec![10.0, 10.0],
                vec![10.0, 20.0],
                vec![20.0, 20.0],
                vec![20.0, 10.0],
                vec![10.0, 10.0],
            ]]))),
            id: None,
            properties: Some(props),
            foreign_members: None,
        }
    }

    fn far_away_plot() -> Feature {
        Feature {
            bbox: None,
            geometry: Some(Geometry::new(geojson::Value::Polygon(vec![vec![
                vec![-120.0, -40.0],
                vec![-120.0, -30.0],
                vec![-110.0, -30.0],
                vec![-120.0, -40.0],
            ]]))),
            id: None,
            properties: None,
            foreign_members: None,
        }
    }

    #[test]
    fn empty_feature_list_is_a_no_op() {
        let mut surface = FakeSurface::default();
        let mut renderer = SiteRenderer::new(FillPaint::default());
        renderer.render(&mut surface, vec![]).unwrap();
        renderer
            .handle_event(&mut surface, SurfaceEvent::Ready)
            .unwrap();
        assert!(surface.calls.is_empty());
    }

    #[test]
    fn fit_then_registration_after_ready() {
        let mut surface = FakeSurface::default();
        let mut renderer = SiteRenderer::new(FillPaint::default());

        renderer.render(&mut surface, vec![plot_a()]).unwrap();
        // Fit is requested up front, registration waits for Ready
        assert_eq!(surface.calls.len(), 1);
        let expected = LngLatBounds {
            west: 10.0,
            south: 10.0,
            east: 20.0,
            north: 20.0,
        };
        assert_eq!(
            surface.calls[0],
            Call::FitBounds {
                bounds: expected,
                padding: 20.0
            }
        );

        renderer
            .handle_event(&mut surface, SurfaceEvent::Ready)
            .unwrap();
        assert_eq!(
            surface.calls[1],
            Call::AddSource {
                id: SITES_SOURCE.to_string(),
                features: 1
            }
        );
        assert_eq!(
            surface.calls[2],
            Call::AddFillLayer {
                id: SITES_LAYER.to_string(),
                source: SITES_SOURCE.to_string()
            }
        );
    }

    #[test]
    fn ready_before_render_is_tolerated() {
        let mut surface = FakeSurface::default();
        let mut renderer = SiteRenderer::new(FillPaint::default());

        renderer
            .handle_event(&mut surface, SurfaceEvent::Ready)
            .unwrap();
        renderer.render(&mut surface, vec![plot_a()]).unwrap();

        assert!(surface.has_source(SITES_SOURCE));
        assert!(surface.has_layer(SITES_LAYER));
        // Fit still comes before registration
        assert!(matches!(surface.calls[0], Call::FitBounds { .. }));
    }

    #[test]
    fn second_render_fails_with_duplicate_layer() {
        let mut surface = FakeSurface::default();
        let mut renderer = SiteRenderer::new(FillPaint::default());

        renderer
            .handle_event(&mut surface, SurfaceEvent::Ready)
            .unwrap();
        renderer.render(&mut surface, vec![plot_a()]).unwrap();

        let err = renderer
            .render(&mut surface, vec![far_away_plot()])
            .unwrap_err();
        assert!(matches!(err, SurfaceError::DuplicateLayer { .. }));
    }

    #[test]
    fn fit_depends_only_on_first_feature() {
        let mut with_one = FakeSurface::default();
        let mut renderer = SiteRenderer::new(FillPaint::default());
        renderer.render(&mut with_one, vec![plot_a()]).unwrap();

        let mut with_two = FakeSurface::default();
        let mut renderer = SiteRenderer::new(FillPaint::default());
        renderer
            .render(&mut with_two, vec![plot_a(), far_away_plot()])
            .unwrap();

        assert_eq!(with_one.calls[0], with_two.calls[0]);
    }

    #[test]
    fn click_opens_popup_with_description() {
        let mut surface = FakeSurface::default();
        let mut renderer = SiteRenderer::new(FillPaint::default());
        renderer
            .handle_event(&mut surface, SurfaceEvent::Ready)
            .unwrap();
        renderer.render(&mut surface, vec![plot_a()]).unwrap();

        renderer
            .handle_event(
                &mut surface,
                SurfaceEvent::Click {
                    layer: SITES_LAYER.to_string(),
                    lng_lat: (15.0, 15.0),
                    feature: 0,
                },
            )
            .unwrap();

        assert_eq!(
            surface.calls.last().unwrap(),
            &Call::ShowPopup {
                at: (15.0, 15.0),
                body: "Plot A".to_string()
            }
        );
    }

    #[test]
    fn click_without_description_opens_empty_popup() {
        let mut surface = FakeSurface::default();
        let mut renderer = SiteRenderer::new(FillPaint::default());
        renderer
            .handle_event(&mut surface, SurfaceEvent::Ready)
            .unwrap();
        renderer.render(&mut surface, vec![far_away_plot()]).unwrap();

        renderer
            .handle_event(
                &mut surface,
                SurfaceEvent::Click {
                    layer: SITES_LAYER.to_string(),
                    lng_lat: (-115.0, -35.0),
                    feature: 0,
                },
            )
            .unwrap();

        assert_eq!(
            surface.calls.last().unwrap(),
            &Call::ShowPopup {
                at: (-115.0, -35.0),
                body: String::new()
            }
        );
    }

    #[test]
    fn pointer_enter_and_leave_toggle_cursor() {
        let mut surface = FakeSurface::default();
        let mut renderer = SiteRenderer::new(FillPaint::default());

        renderer
            .handle_event(
                &mut surface,
                SurfaceEvent::PointerEnter {
                    layer: SITES_LAYER.to_string(),
                },
            )
            .unwrap();
        renderer
            .handle_event(
                &mut surface,
                SurfaceEvent::PointerLeave {
                    layer: SITES_LAYER.to_string(),
                },
            )
            .unwrap();

        assert_eq!(
            surface.calls,
            vec![
                Call::SetCursor(CursorIcon::Pointer),
                Call::SetCursor(CursorIcon::Default)
            ]
        );
    }

    #[test]
    fn events_for_other_layers_are_ignored() {
        let mut surface = FakeSurface::default();
        let mut renderer = SiteRenderer::new(FillPaint::default());
        renderer
            .handle_event(
                &mut surface,
                SurfaceEvent::PointerEnter {
                    layer: "roads".to_string(),
                },
            )
            .unwrap();
        assert!(surface.calls.is_empty());
    }
}
