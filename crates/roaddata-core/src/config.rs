use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::types::Color;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: &str = "5432";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
/// Largest canvas side, in pixels, the renderer will allocate.
pub const MAX_CANVAS_SIDE: u32 = 8192;

/// Top-level config (roaddata.toml + ROADDATA_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoadDataConfig {
    #[serde(default)]
    pub database: DatabaseDefaults,
    #[serde(default)]
    pub road_map: RoadMapStyle,
}

/// Fallbacks for connection parameters the caller leaves blank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseDefaults {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: String,
    /// Give up on connecting after this many seconds (0 disables the limit).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for DatabaseDefaults {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

/// Everything the road map renderer needs besides the rows themselves.
///
/// `classes` is both the category→color table and the legend order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadMapStyle {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_legend_title")]
    pub legend_title: String,
    #[serde(default = "default_geometry_column")]
    pub geometry_column: String,
    #[serde(default = "default_category_column")]
    pub category_column: String,
    /// Canvas width in size units.
    #[serde(default = "default_width")]
    pub width: f32,
    /// Canvas height in size units.
    #[serde(default = "default_height")]
    pub height: f32,
    /// Pixels per size unit.
    #[serde(default = "default_dpi")]
    pub dpi: u32,
    /// Stroke width in pixels.
    #[serde(default = "default_line_width")]
    pub line_width: u32,
    /// Color for categories missing from `classes`.
    #[serde(default = "default_color")]
    pub default_color: Color,
    #[serde(default = "default_classes")]
    pub classes: Vec<CategoryClass>,
}

impl Default for RoadMapStyle {
    fn default() -> Self {
        Self {
            title: default_title(),
            legend_title: default_legend_title(),
            geometry_column: default_geometry_column(),
            category_column: default_category_column(),
            width: default_width(),
            height: default_height(),
            dpi: default_dpi(),
            line_width: default_line_width(),
            default_color: default_color(),
            classes: default_classes(),
        }
    }
}

impl RoadMapStyle {
    /// Canvas size in pixels, clamped to `1..=MAX_CANVAS_SIDE` on each side.
    pub fn pixel_size(&self) -> (u32, u32) {
        let px = |units: f32| {
            let raw = (units * self.dpi as f32).round();
            if raw.is_nan() {
                1
            } else {
                (raw.clamp(1.0, MAX_CANVAS_SIDE as f32)) as u32
            }
        };
        (px(self.width), px(self.height))
    }

    /// Reject canvas settings that would exceed `MAX_CANVAS_SIDE` pixels.
    pub fn validate(&self) -> crate::error::Result<()> {
        for (name, units) in [("width", self.width), ("height", self.height)] {
            let px = units * self.dpi as f32;
            if !units.is_finite() || units <= 0.0 || px > MAX_CANVAS_SIDE as f32 {
                return Err(crate::error::RoadDataError::Config(format!(
                    "road_map.{name} = {units} at {} dpi is outside 1..={MAX_CANVAS_SIDE} pixels",
                    self.dpi
                )));
            }
        }
        if self.dpi == 0 {
            return Err(crate::error::RoadDataError::Config(
                "road_map.dpi must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Classes whose legend text the ASCII font cannot draw.
    pub fn unreadable_labels(&self) -> impl Iterator<Item = &CategoryClass> + '_ {
        self.classes.iter().filter(|c| !c.display_label().is_ascii())
    }
}

/// One entry of the category table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryClass {
    /// Category value as stored in the database; `None` matches NULL.
    #[serde(default)]
    pub value: Option<String>,
    /// Legend text. Falls back to `value`, or "None" for the null class.
    /// The legend font is ASCII-only, so set this when `value` is not.
    #[serde(default)]
    pub label: Option<String>,
    pub color: Color,
}

impl CategoryClass {
    pub fn new(value: Option<&str>, label: &str, color: Color) -> Self {
        Self {
            value: value.map(str::to_string),
            label: Some(label.to_string()),
            color,
        }
    }

    pub fn display_label(&self) -> &str {
        self.label
            .as_deref()
            .or(self.value.as_deref())
            .unwrap_or("None")
    }
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
fn default_port() -> String {
    DEFAULT_PORT.to_string()
}
fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}
fn default_title() -> String {
    "Road Map".to_string()
}
fn default_legend_title() -> String {
    "Road Class".to_string()
}
fn default_geometry_column() -> String {
    "geom".to_string()
}
fn default_category_column() -> String {
    "tech_class_name".to_string()
}
fn default_width() -> f32 {
    10.0
}
fn default_height() -> f32 {
    8.0
}
fn default_dpi() -> u32 {
    100
}
fn default_line_width() -> u32 {
    2
}
fn default_color() -> Color {
    Color::GRAY
}

/// Technical road classes in legend order, then the unclassified (NULL) class.
fn default_classes() -> Vec<CategoryClass> {
    vec![
        CategoryClass::new(Some("高速"), "Expressway", Color::RED),
        CategoryClass::new(Some("一级"), "Class I", Color::GREEN),
        CategoryClass::new(Some("二级"), "Class II", Color::YELLOW),
        CategoryClass::new(Some("三级"), "Class III", Color::ORANGE),
        CategoryClass::new(Some("四级"), "Class IV", Color::BLUE),
        CategoryClass::new(None, "Unclassified", Color::GRAY),
    ]
}

impl RoadDataConfig {
    /// Load config from a TOML file with ROADDATA_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ROADDATA_CONFIG env var
    ///   3. ~/.roaddata/roaddata.toml
    ///
    /// Nested keys use a double underscore, e.g.
    /// `ROADDATA_ROAD_MAP__TITLE="Network"`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .or_else(|| std::env::var("ROADDATA_CONFIG").ok())
            .unwrap_or_else(default_config_path);

        tracing::debug!(path = %path, "loading roaddata config");

        let config: RoadDataConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("ROADDATA_").split("__"))
            .extract()
            .map_err(|e| crate::error::RoadDataError::Config(e.to_string()))?;

        config.road_map.validate()?;
        for class in config.road_map.unreadable_labels() {
            tracing::warn!(
                label = class.display_label(),
                "legend label is not ASCII and will render as boxes; set `label` for this class"
            );
        }

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.roaddata/roaddata.toml", home)
}
