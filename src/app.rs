use crate::config::Config;
use crate::fetch::{FetchError, FetchHandle};
use crate::map::{FillPaint, MapSurface, SiteRenderer, TerminalSurface};

/// Where the site fetch currently stands, for the status bar
pub enum FetchState {
    Loading,
    Loaded(usize),
    Failed(FetchError),
}

/// Application state: the surface, the render pipeline and the in-flight
/// fetch, plus pointer bookkeeping for pan/drag.
pub struct App {
    pub surface: TerminalSurface,
    pub renderer: SiteRenderer,
    pub fetch: Option<FetchHandle>,
    pub fetch_state: FetchState,
    pub should_quit: bool,
    /// Last mouse position for drag tracking
    pub last_mouse: Option<(u16, u16)>,
    /// Current mouse position for the cursor marker
    pub mouse_pos: Option<(u16, u16)>,
}

impl App {
    pub fn new(config: &Config, width: usize, height: usize, fetch: FetchHandle) -> Self {
        let (pixel_width, pixel_height) = braille_dims(width, height);
        let surface = TerminalSurface::new(
            config.initial_center.0,
            config.initial_center.1,
            config.initial_zoom,
            pixel_width,
            pixel_height,
        );
        let paint = FillPaint {
            color: config.fill_color,
            opacity: config.fill_opacity,
        };
        Self {
            surface,
            renderer: SiteRenderer::new(paint),
            fetch: Some(fetch),
            fetch_state: FetchState::Loading,
            should_quit: false,
            last_mouse: None,
            mouse_pos: None,
        }
    }

    /// Advance one frame: collect the fetch outcome if it arrived, then
    /// run pending surface events through the pipeline. A failed fetch or
    /// a failed render pass leaves the base map usable.
    pub fn tick(&mut self) {
        let outcome = self.fetch.as_mut().and_then(|handle| handle.poll());
        if let Some(outcome) = outcome {
            self.fetch = None;
            match outcome {
                Ok(features) => {
                    self.fetch_state = FetchState::Loaded(features.len());
                    if let Err(e) = self.renderer.render(&mut self.surface, features) {
                        tracing::error!(error = %e, "render pass aborted");
                    }
                }
                Err(e) => {
                    self.fetch_state = FetchState::Failed(e);
                }
            }
        }

        for event in self.surface.poll_events() {
            if let Err(e) = self.renderer.handle_event(&mut self.surface, event) {
                tracing::error!(error = %e, "surface event handling failed");
            }
        }
    }

    /// Update viewport size when the terminal resizes
    pub fn resize(&mut self, width: usize, height: usize) {
        let (pixel_width, pixel_height) = braille_dims(width, height);
        self.surface.resize(pixel_width, pixel_height);
    }

    /// Pan the map
    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.surface.viewport.pan(dx, dy);
    }

    pub fn zoom_in(&mut self) {
        self.surface.viewport.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.surface.viewport.zoom_out();
    }

    /// Zoom in towards a screen position (terminal column/row)
    pub fn zoom_in_at(&mut self, col: u16, row: u16) {
        let (px, py) = pixel_pos(col, row);
        self.surface.viewport.zoom_in_at(px, py);
    }

    /// Zoom out from a screen position (terminal column/row)
    pub fn zoom_out_at(&mut self, col: u16, row: u16) {
        let (px, py) = pixel_pos(col, row);
        self.surface.viewport.zoom_out_at(px, py);
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Pointer moved: track for the marker and feed the surface hit-test
    pub fn set_mouse_pos(&mut self, col: u16, row: u16) {
        self.mouse_pos = Some((col, row));
        let (px, py) = pixel_pos(col, row);
        self.surface.pointer_moved(px, py);
    }

    /// Left click: surface hit-test decides whether a feature was hit
    pub fn click(&mut self, col: u16, row: u16) {
        let (px, py) = pixel_pos(col, row);
        self.surface.pointer_clicked(px, py);
    }

    /// Handle mouse drag panning
    pub fn handle_drag(&mut self, x: u16, y: u16) {
        if let Some((last_x, last_y)) = self.last_mouse {
            let dx = last_x as i32 - x as i32;
            let dy = last_y as i32 - y as i32;
            // Less sensitive when zoomed out
            let scale = if self.surface.viewport.zoom < 2.0 {
                2
            } else if self.surface.viewport.zoom < 4.0 {
                3
            } else {
                4
            };
            self.pan(dx * scale, dy * scale);
        }
        self.last_mouse = Some((x, y));
    }

    /// Reset drag state when the mouse button is released
    pub fn end_drag(&mut self) {
        self.last_mouse = None;
    }

    /// Mouse position in braille pixel coordinates (for the marker)
    pub fn mouse_pixel_pos(&self) -> Option<(i32, i32)> {
        self.mouse_pos.map(|(col, row)| pixel_pos(col, row))
    }

    /// Current zoom level as a string
    pub fn zoom_level(&self) -> String {
        format!("{:.1}x", self.surface.viewport.zoom)
    }

    /// Current center coordinates as a string
    pub fn center_coords(&self) -> String {
        let vp = &self.surface.viewport;
        format!(
            "{:.1}°{}, {:.1}°{}",
            vp.center_lat.abs(),
            if vp.center_lat >= 0.0 { "N" } else { "S" },
            vp.center_lon.abs(),
            if vp.center_lon >= 0.0 { "E" } else { "W" }
        )
    }

    /// Status bar summary of the fetch
    pub fn fetch_status(&self) -> String {
        match &self.fetch_state {
            FetchState::Loading => "loading sites...".to_string(),
            FetchState::Loaded(n) => format!("{n} site{}", if *n == 1 { "" } else { "s" }),
            FetchState::Failed(e) => format!("fetch failed: {e}"),
        }
    }
}

/// Inner braille pixel dimensions for a terminal of `width` x `height`
/// characters. Accounts for the border (2 chars) and status bar (1 char);
/// braille gives 2x4 dots per character.
fn braille_dims(width: usize, height: usize) -> (usize, usize) {
    let inner_width = width.saturating_sub(2);
    let inner_height = height.saturating_sub(3);
    (inner_width * 2, inner_height * 4)
}

/// Convert a terminal cell position to braille pixel coordinates,
/// accounting for the one-cell border offset
fn pixel_pos(col: u16, row: u16) -> (i32, i32) {
    let px = ((col.saturating_sub(1)) as i32) * 2;
    let py = ((row.saturating_sub(1)) as i32) * 4;
    (px, py)
}
