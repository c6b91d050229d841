//! Tool system for the host platform.
//!
//! Defines the `Tool` trait that all tools implement, the message types the
//! host understands, and a registry of the built-in tools.

pub mod execute_sql;
pub mod get_schema;
pub mod road_map;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use roaddata_core::{RoadDataConfig, RoadDataError};
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

pub use execute_sql::ExecuteSqlTool;
pub use get_schema::GetSchemaTool;
pub use road_map::RoadMapPlotTool;

/// A single message handed back to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolMessage {
    Text {
        text: String,
    },
    /// Binary payload; serialised as base64.
    Blob {
        mime_type: String,
        #[serde(with = "base64_bytes")]
        data: Vec<u8>,
    },
}

impl ToolMessage {
    pub fn text(text: impl Into<String>) -> Self {
        ToolMessage::Text { text: text.into() }
    }

    pub fn blob(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        ToolMessage::Blob {
            mime_type: mime_type.into(),
            data,
        }
    }
}

/// Result of executing a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub messages: Vec<ToolMessage>,
    /// Whether the tool execution failed.
    pub is_error: bool,
}

impl ToolOutput {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            messages: vec![ToolMessage::text(text)],
            is_error: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            messages: vec![ToolMessage::text(message)],
            is_error: true,
        }
    }

    pub fn with_blob(mut self, data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        self.messages.push(ToolMessage::blob(data, mime_type));
        self
    }

    /// All text messages joined by newlines.
    pub fn text(&self) -> String {
        self.messages
            .iter()
            .filter_map(|m| match m {
                ToolMessage::Text { text } => Some(text.as_str()),
                ToolMessage::Blob { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl From<RoadDataError> for ToolOutput {
    fn from(e: RoadDataError) -> Self {
        ToolOutput::error(e.to_string())
    }
}

/// API-level description of a tool, as advertised to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// Trait that all tools must implement.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name for this tool (e.g. "execute_sql").
    fn name(&self) -> &str;
    /// Human-readable description of what this tool does.
    fn description(&self) -> &str;
    /// JSON Schema for the tool's input parameters.
    fn input_schema(&self) -> serde_json::Value;
    /// Execute the tool with the given input. Never panics on bad input;
    /// failures come back as an error `ToolOutput`.
    async fn execute(&self, input: serde_json::Value) -> ToolOutput;
}

/// Static catalog of all built-in tools (name, description).
pub fn tool_catalog() -> Vec<(&'static str, &'static str)> {
    vec![
        (get_schema::NAME, "List tables and columns of the public schema"),
        (execute_sql::NAME, "Execute SQL and return rows or the affected row count"),
        (road_map::NAME, "Render road geometries returned by SQL as a PNG map"),
    ]
}

/// Instantiate every built-in tool against a shared config.
pub fn builtin_tools(config: Arc<RoadDataConfig>) -> Vec<Box<dyn Tool>> {
    vec![
        Box::new(GetSchemaTool::new(Arc::clone(&config))),
        Box::new(ExecuteSqlTool::new(Arc::clone(&config))),
        Box::new(RoadMapPlotTool::new(config)),
    ]
}

pub fn find_tool<'a>(tools: &'a [Box<dyn Tool>], name: &str) -> Option<&'a dyn Tool> {
    tools.iter().find(|t| t.name() == name).map(|t| t.as_ref())
}

/// Convert a slice of tools to API-level tool definitions.
pub fn to_definitions(tools: &[Box<dyn Tool>]) -> Vec<ToolDefinition> {
    tools
        .iter()
        .map(|t| ToolDefinition {
            name: t.name().to_string(),
            description: t.description().to_string(),
            input_schema: t.input_schema(),
        })
        .collect()
}

/// JSON Schema properties shared by every tool: the connection parameters.
pub(crate) fn connection_properties() -> serde_json::Map<String, serde_json::Value> {
    let schema = serde_json::json!({
        "dbname":   { "type": "string", "description": "Database name." },
        "user":     { "type": "string", "description": "Database user." },
        "password": { "type": "string", "description": "Database password." },
        "host":     { "type": "string", "description": "Database host (default: localhost)." },
        "port":     { "type": ["string", "integer"], "description": "Database port (default: 5432)." }
    });
    match schema {
        serde_json::Value::Object(map) => map,
        _ => serde_json::Map::new(),
    }
}

/// Non-empty `sql_query` parameter.
pub(crate) fn sql_query(input: &serde_json::Value) -> Result<String, RoadDataError> {
    let sql = roaddata_core::types::string_param(input, "sql_query");
    if sql.is_empty() {
        return Err(RoadDataError::MissingQuery);
    }
    Ok(sql)
}

/// Run one invocation inside a correlated span and flatten its error into
/// an error output.
pub(crate) async fn invoke<F>(tool: &str, fut: F) -> ToolOutput
where
    F: Future<Output = Result<ToolOutput, RoadDataError>>,
{
    let invocation = Uuid::now_v7();
    let span = info_span!("tool", tool, %invocation);
    async {
        match fut.await {
            Ok(output) => {
                info!(messages = output.messages.len(), "tool finished");
                output
            }
            Err(e) => {
                warn!(code = e.code(), error = %e, "tool failed");
                ToolOutput::from(e)
            }
        }
    }
    .instrument(span)
    .await
}

mod base64_bytes {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(d)?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(serde::de::Error::custom)
    }
}
