use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::DatabaseDefaults;
use crate::error::{Result, RoadDataError};

/// RGB display color. Deserialises from a CSS-style name (`"red"`) or `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 128, 0);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);
    pub const ORANGE: Color = Color::rgb(255, 165, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const GRAY: Color = Color::rgb(128, 128, 128);
    pub const LIGHT_GRAY: Color = Color::rgb(204, 204, 204);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    fn named(name: &str) -> Option<Self> {
        let color = match name {
            "white" => Self::WHITE,
            "black" => Self::BLACK,
            "red" => Self::RED,
            "green" => Self::GREEN,
            "yellow" => Self::YELLOW,
            "orange" => Self::ORANGE,
            "blue" => Self::BLUE,
            "gray" | "grey" => Self::GRAY,
            "lightgray" | "lightgrey" => Self::LIGHT_GRAY,
            "purple" => Self::rgb(128, 0, 128),
            "brown" => Self::rgb(165, 42, 42),
            "pink" => Self::rgb(255, 192, 203),
            "cyan" => Self::rgb(0, 255, 255),
            "magenta" => Self::rgb(255, 0, 255),
            _ => return None,
        };
        Some(color)
    }
}

impl FromStr for Color {
    type Err = RoadDataError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            if hex.len() == 6 && hex.is_ascii() {
                let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16);
                if let (Ok(r), Ok(g), Ok(b)) = (channel(0), channel(2), channel(4)) {
                    return Ok(Self::rgb(r, g, b));
                }
            }
            return Err(RoadDataError::Config(format!("invalid hex color: {s}")));
        }
        Self::named(&s.to_ascii_lowercase())
            .ok_or_else(|| RoadDataError::Config(format!("unknown color name: {s}")))
    }
}

impl TryFrom<String> for Color {
    type Error = RoadDataError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        c.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// PostgreSQL connection parameters for a single tool invocation.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub dbname: String,
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: String,
}

impl ConnectionParams {
    /// Read connection parameters from a host-supplied parameter bag.
    ///
    /// `dbname`, `user` and `password` must be non-empty after trimming.
    /// Blank `host`/`port` fall back to `defaults`. `port` may be a JSON
    /// number as well as a string.
    pub fn from_input(input: &serde_json::Value, defaults: &DatabaseDefaults) -> Result<Self> {
        let dbname = string_param(input, "dbname");
        let user = string_param(input, "user");
        let password = string_param(input, "password");

        if dbname.is_empty() || user.is_empty() || password.is_empty() {
            return Err(RoadDataError::MissingConnectionParams);
        }

        let host = Some(string_param(input, "host"))
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| defaults.host.clone());
        let port = Some(string_param(input, "port"))
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| defaults.port.clone());

        Ok(Self {
            dbname,
            user,
            password,
            host,
            port,
        })
    }

    /// Port as a number; a non-numeric port is a configuration error.
    pub fn port_number(&self) -> Result<u16> {
        self.port
            .parse()
            .map_err(|_| RoadDataError::Config(format!("invalid port: {}", self.port)))
    }
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("password", &"***")
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

/// Trimmed string parameter; numbers are accepted and rendered as text.
pub fn string_param(input: &serde_json::Value, key: &str) -> String {
    match input.get(key) {
        Some(serde_json::Value::String(s)) => s.trim().to_string(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// A single column value as fetched from the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<Option<&str>> for Value {
    fn from(v: Option<&str>) -> Self {
        v.map_or(Value::Null, |s| Value::Text(s.to_string()))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Bytes(b) => write!(f, "\\x{}", hex::encode(b)),
        }
    }
}

/// Fully fetched result set: column names plus rows in column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}
