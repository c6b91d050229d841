//! PostgreSQL road-data tools for a host AI-orchestration platform.

pub mod db;
pub mod tools;

pub use tools::{
    builtin_tools, find_tool, to_definitions, tool_catalog, Tool, ToolDefinition, ToolMessage,
    ToolOutput,
};
