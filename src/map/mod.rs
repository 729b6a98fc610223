pub mod bounds;
mod geometry;
pub mod pipeline;
mod projection;
pub mod surface;
mod term;

pub use pipeline::SiteRenderer;
pub use projection::Viewport;
pub use surface::{CursorIcon, FillPaint, MapSurface, SurfaceEvent};
pub use term::{Popup, SurfaceFrame, TerminalSurface};
