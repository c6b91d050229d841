//! Road map renderer: plots line geometries colored by road class.
//!
//! Flow: resolve columns -> decode every row -> collect line features ->
//! compute bounds and layout -> draw lines, border, title, legend -> PNG.
//! Rows that fail to decode, or that hold anything other than a line,
//! are skipped without aborting the render.

use std::borrow::Cow;

use geo_types::Geometry;
use roaddata_core::{Color, QueryResult, RoadDataError, RoadMapStyle, Value};
use tracing::{debug, info};

use crate::canvas::{Canvas, Rect};
use crate::glyphs::{text_height, text_width};
use crate::palette::Palette;
use crate::wkb;

const TITLE_SCALE: u32 = 3;
const LEGEND_SCALE: u32 = 2;
/// Fraction of the data span added on each side of the plot.
const DATA_MARGIN: f64 = 0.05;

/// One legend row as drawn on the map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegendEntry {
    pub label: String,
    pub color: Color,
}

/// A rendered road map.
#[derive(Debug, Clone)]
pub struct RoadMap {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub lines_plotted: usize,
    pub rows_skipped: usize,
    pub legend: Vec<LegendEntry>,
}

#[derive(Debug, Clone)]
pub enum RenderOutcome {
    /// Nothing to draw: either no rows, or no row held a plottable line.
    NoResults { rows: usize },
    Rendered(RoadMap),
}

struct Feature {
    points: Vec<(f64, f64)>,
    color: Color,
}

#[derive(Debug, Clone, Copy)]
struct Extent {
    min_x: f64,
    max_x: f64,
    min_y: f64,
    max_y: f64,
}

impl Extent {
    fn of(features: &[Feature]) -> Self {
        let mut e = Extent {
            min_x: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            min_y: f64::INFINITY,
            max_y: f64::NEG_INFINITY,
        };
        for &(x, y) in features.iter().flat_map(|f| f.points.iter()) {
            e.min_x = e.min_x.min(x);
            e.max_x = e.max_x.max(x);
            e.min_y = e.min_y.min(y);
            e.max_y = e.max_y.max(y);
        }
        e.padded()
    }

    fn padded(self) -> Self {
        let pad = |lo: f64, hi: f64| {
            let span = hi - lo;
            if span > 0.0 {
                span * DATA_MARGIN
            } else {
                0.5
            }
        };
        let px = pad(self.min_x, self.max_x);
        let py = pad(self.min_y, self.max_y);
        Extent {
            min_x: self.min_x - px,
            max_x: self.max_x + px,
            min_y: self.min_y - py,
            max_y: self.max_y + py,
        }
    }

    /// Map data coordinates into `plot`, y axis pointing up.
    fn project(&self, plot: Rect, (x, y): (f64, f64)) -> (f64, f64) {
        let w = f64::from((plot.w - 1).max(1));
        let h = f64::from((plot.h - 1).max(1));
        let px = f64::from(plot.x) + (x - self.min_x) / (self.max_x - self.min_x) * w;
        let py = f64::from(plot.bottom() - 1) - (y - self.min_y) / (self.max_y - self.min_y) * h;
        (px, py)
    }
}

struct Layout {
    pad: i32,
    plot: Rect,
    legend: Option<Rect>,
}

pub struct RoadMapRenderer<'a> {
    style: &'a RoadMapStyle,
    palette: Palette,
}

impl<'a> RoadMapRenderer<'a> {
    pub fn new(style: &'a RoadMapStyle) -> Self {
        Self {
            style,
            palette: Palette::from_style(style),
        }
    }

    pub fn render(&self, result: &QueryResult) -> Result<RenderOutcome, RoadDataError> {
        if result.is_empty() {
            return Ok(RenderOutcome::NoResults { rows: 0 });
        }

        let geom_idx = self.column(result, &self.style.geometry_column)?;
        let class_idx = self.column(result, &self.style.category_column)?;

        let mut features = Vec::new();
        let mut plotted = vec![false; self.palette.classes().len()];
        let mut skipped = 0usize;

        for (n, row) in result.rows.iter().enumerate() {
            let Some(points) = row.get(geom_idx).and_then(|v| line_points(n, v)) else {
                skipped += 1;
                continue;
            };
            let category = row.get(class_idx).and_then(category_text);
            let resolved = self.palette.resolve(category.as_deref());
            if let Some(class) = resolved.class {
                plotted[class] = true;
            }
            features.push(Feature {
                points,
                color: resolved.color,
            });
        }

        if features.is_empty() {
            info!(rows = result.len(), skipped, "no plottable line geometries");
            return Ok(RenderOutcome::NoResults { rows: result.len() });
        }

        let legend: Vec<LegendEntry> = self
            .palette
            .classes()
            .iter()
            .zip(&plotted)
            .filter(|(_, hit)| **hit)
            .map(|(class, _)| LegendEntry {
                label: class.display_label().to_string(),
                color: class.color,
            })
            .collect();

        let (width, height) = self.style.pixel_size();
        let canvas = self.draw(width, height, &features, &legend);
        let png = canvas
            .encode_png()
            .map_err(|e| RoadDataError::Encoding(e.to_string()))?;

        info!(
            rows = result.len(),
            plotted = features.len(),
            skipped,
            bytes = png.len(),
            "road map rendered"
        );

        Ok(RenderOutcome::Rendered(RoadMap {
            png,
            width,
            height,
            lines_plotted: features.len(),
            rows_skipped: skipped,
            legend,
        }))
    }

    fn column(&self, result: &QueryResult, name: &str) -> Result<usize, RoadDataError> {
        result
            .column_index(name)
            .ok_or_else(|| RoadDataError::MissingColumn {
                column: name.to_string(),
            })
    }

    fn layout(&self, width: u32, height: u32, legend: &[LegendEntry]) -> Layout {
        let (w, h) = (width as i32, height as i32);
        let pad = (self.style.dpi as i32 / 5).max(4);
        let plot_top = pad + text_height(TITLE_SCALE) as i32 + pad;
        let plot_h = (h - pad - plot_top).max(1);
        let min_plot_w = (w / 3).max(1);

        if legend.is_empty() {
            let plot = Rect::new(pad, plot_top, (w - 2 * pad).max(min_plot_w), plot_h);
            return Layout {
                pad,
                plot,
                legend: None,
            };
        }

        let inner = pad / 2;
        let row_h = text_height(LEGEND_SCALE) as i32 + inner;
        let swatch = 2 * pad;
        let widest_label = legend
            .iter()
            .map(|e| text_width(&e.label, LEGEND_SCALE) as i32)
            .max()
            .unwrap_or(0);
        let title_w = text_width(&self.style.legend_title, LEGEND_SCALE) as i32;
        let legend_w = 2 * inner + title_w.max(swatch + inner + widest_label);
        let legend_h = 2 * inner + row_h * (legend.len() as i32 + 1) - inner;

        let plot_w = (w - pad - legend_w - 2 * pad).max(min_plot_w);
        let plot = Rect::new(pad, plot_top, plot_w, plot_h);
        let legend_rect = Rect::new(
            plot.right() + pad,
            plot.y + plot.h / 2 - legend_h / 2,
            legend_w,
            legend_h,
        );
        Layout {
            pad,
            plot,
            legend: Some(legend_rect),
        }
    }

    fn draw(&self, width: u32, height: u32, features: &[Feature], legend: &[LegendEntry]) -> Canvas {
        let layout = self.layout(width, height, legend);
        let plot = layout.plot;
        let extent = Extent::of(features);
        let mut canvas = Canvas::new(width, height, Color::WHITE);

        canvas.set_clip(Some(plot));
        for feature in features {
            let points: Vec<(f64, f64)> = feature
                .points
                .iter()
                .map(|&p| extent.project(plot, p))
                .collect();
            canvas.draw_polyline(&points, feature.color, self.style.line_width);
        }
        canvas.set_clip(None);
        canvas.stroke_rect(plot, Color::BLACK);

        let title_w = text_width(&self.style.title, TITLE_SCALE) as i32;
        canvas.draw_text(
            plot.x + (plot.w - title_w) / 2,
            layout.pad,
            &self.style.title,
            TITLE_SCALE,
            Color::BLACK,
        );

        if let Some(rect) = layout.legend {
            self.draw_legend(&mut canvas, rect, layout.pad, legend);
        }
        canvas
    }

    fn draw_legend(&self, canvas: &mut Canvas, rect: Rect, pad: i32, legend: &[LegendEntry]) {
        let inner = pad / 2;
        let text_h = text_height(LEGEND_SCALE) as i32;
        let row_h = text_h + inner;
        let swatch = 2 * pad;

        canvas.fill_rect(rect, Color::WHITE);
        canvas.stroke_rect(rect, Color::LIGHT_GRAY);

        let title_w = text_width(&self.style.legend_title, LEGEND_SCALE) as i32;
        canvas.draw_text(
            rect.x + (rect.w - title_w) / 2,
            rect.y + inner,
            &self.style.legend_title,
            LEGEND_SCALE,
            Color::BLACK,
        );

        for (i, entry) in legend.iter().enumerate() {
            let top = rect.y + inner + row_h * (i as i32 + 1);
            let mid = f64::from(top + text_h / 2);
            let x0 = f64::from(rect.x + inner);
            canvas.draw_line(
                (x0, mid),
                (x0 + f64::from(swatch), mid),
                entry.color,
                self.style.line_width,
            );
            canvas.draw_text(
                rect.x + inner + swatch + inner,
                top,
                &entry.label,
                LEGEND_SCALE,
                Color::BLACK,
            );
        }
    }
}

/// Points of a plottable line, or `None` when the row must be skipped.
fn line_points(row: usize, value: &Value) -> Option<Vec<(f64, f64)>> {
    let line = match wkb::decode_value(value) {
        Ok(Geometry::LineString(line)) => line,
        Ok(other) => {
            debug!(row, kind = geometry_kind(&other), "skipping non-line geometry");
            return None;
        }
        Err(e) => {
            debug!(row, error = %e, "skipping undecodable geometry");
            return None;
        }
    };
    let points: Vec<(f64, f64)> = line.0.iter().map(|c| (c.x, c.y)).collect();
    if points.len() < 2 || points.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
        debug!(row, points = points.len(), "skipping degenerate line");
        return None;
    }
    Some(points)
}

fn category_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::Null => None,
        Value::Text(s) => Some(Cow::Borrowed(s.as_str())),
        Value::Bytes(b) => Some(String::from_utf8_lossy(b)),
    }
}

fn geometry_kind(g: &Geometry<f64>) -> &'static str {
    match g {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}
