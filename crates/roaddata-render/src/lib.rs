//! Road map rendering: WKB decoding, category palette and PNG output.

pub mod canvas;
mod glyphs;
pub mod palette;
pub mod renderer;
pub mod wkb;

pub use palette::Palette;
pub use renderer::{LegendEntry, RenderOutcome, RoadMap, RoadMapRenderer};
pub use wkb::WkbError;
