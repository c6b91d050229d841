//! Tool: get_schema: list every table of the public schema with its columns.

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use roaddata_core::{ConnectionParams, RoadDataConfig, RoadDataError};

use super::{connection_properties, invoke, Tool, ToolOutput};
use crate::db;

pub const NAME: &str = "get_schema";

pub struct GetSchemaTool {
    config: Arc<RoadDataConfig>,
}

impl GetSchemaTool {
    pub fn new(config: Arc<RoadDataConfig>) -> Self {
        Self { config }
    }

    async fn run(&self, input: &serde_json::Value) -> Result<ToolOutput, RoadDataError> {
        let params = ConnectionParams::from_input(input, &self.config.database)?;
        let client = db::connect(&params, &self.config.database).await?;

        let tables = db::list_tables(&client).await?;
        if tables.is_empty() {
            return Ok(ToolOutput::success("No tables found in the database"));
        }

        let mut out = String::from("Tables in database:\n");
        for table in &tables {
            let columns = db::list_columns(&client, table).await?;
            let _ = writeln!(out, "- {table}");
            out.push_str("  Columns:\n");
            for (name, data_type) in &columns {
                let _ = writeln!(out, "    - {name} ({data_type})");
            }
        }
        tracing::debug!(tables = tables.len(), "schema listed");
        Ok(ToolOutput::success(out))
    }
}

#[async_trait]
impl Tool for GetSchemaTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "List all tables in the public schema of a PostgreSQL database, \
         with each table's column names and data types. \
         Use this before writing SQL against an unfamiliar database."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": connection_properties(),
            "required": ["dbname", "user", "password"]
        })
    }

    async fn execute(&self, input: serde_json::Value) -> ToolOutput {
        invoke(NAME, self.run(&input)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roaddata_core::DatabaseDefaults;

    fn tool() -> GetSchemaTool {
        GetSchemaTool::new(Arc::new(RoadDataConfig {
            database: DatabaseDefaults {
                connect_timeout_secs: 2,
                ..DatabaseDefaults::default()
            },
            ..RoadDataConfig::default()
        }))
    }

    #[tokio::test]
    async fn missing_credentials_abort_before_connecting() {
        let out = tool()
            .execute(serde_json::json!({"dbname": "roads", "user": "gis"}))
            .await;
        assert!(out.is_error);
        assert_eq!(
            out.text(),
            "Missing required database connection parameters: dbname, user or password"
        );
    }

    #[tokio::test]
    async fn invalid_port_is_a_configuration_error() {
        let out = tool()
            .execute(serde_json::json!({
                "dbname": "roads", "user": "gis", "password": "pw", "port": "fifty"
            }))
            .await;
        assert!(out.is_error);
        assert_eq!(out.text(), "Configuration error: invalid port: fifty");
    }

    #[tokio::test]
    async fn unreachable_server_reports_connection_failure() {
        let out = tool()
            .execute(serde_json::json!({
                "dbname": "roads", "user": "gis", "password": "pw",
                "host": "127.0.0.1", "port": 1
            }))
            .await;
        assert!(out.is_error);
        assert!(
            out.text().starts_with("Failed to connect to PostgreSQL database:"),
            "{}",
            out.text()
        );
    }
}
