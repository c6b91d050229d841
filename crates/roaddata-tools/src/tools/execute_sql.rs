//! Tool: execute_sql: run arbitrary SQL and format rows or the affected count.
//!
//! Statements go through the simple query protocol, so each one autocommits
//! and every value comes back as text.

use std::sync::Arc;

use async_trait::async_trait;
use roaddata_core::{ConnectionParams, QueryResult, RoadDataConfig, RoadDataError};
use tracing::debug;

use super::{connection_properties, invoke, sql_query, Tool, ToolOutput};
use crate::db::{self, QueryOutcome};

pub const NAME: &str = "execute_sql";

pub struct ExecuteSqlTool {
    config: Arc<RoadDataConfig>,
}

impl ExecuteSqlTool {
    pub fn new(config: Arc<RoadDataConfig>) -> Self {
        Self { config }
    }

    async fn run(&self, input: &serde_json::Value) -> Result<ToolOutput, RoadDataError> {
        let params = ConnectionParams::from_input(input, &self.config.database)?;
        let sql = sql_query(input)?;
        let client = db::connect(&params, &self.config.database).await?;

        match db::run_simple(&client, &sql).await? {
            QueryOutcome::Rows(result) if result.is_empty() => {
                Ok(ToolOutput::success("Query returned no results"))
            }
            QueryOutcome::Rows(result) => {
                debug!(rows = result.len(), "query returned rows");
                Ok(ToolOutput::success(format_rows(&result)))
            }
            QueryOutcome::Affected(n) => {
                debug!(affected = n, "statement executed");
                Ok(ToolOutput::success(format!(
                    "SQL executed successfully, rows affected: {n}"
                )))
            }
        }
    }
}

/// Header tuple of column names, then one tuple per row.
pub fn format_rows(result: &QueryResult) -> String {
    let mut out = String::from("Query results:\n");
    out.push_str(&format!("({})\n", result.columns.join(", ")));
    for row in &result.rows {
        let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        out.push_str(&format!("({})\n", cells.join(", ")));
    }
    out
}

#[async_trait]
impl Tool for ExecuteSqlTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Execute a SQL statement against a PostgreSQL database. \
         SELECT-style queries return every row; other statements are committed \
         and report the number of affected rows. No validation is applied."
    }

    fn input_schema(&self) -> serde_json::Value {
        let mut properties = connection_properties();
        properties.insert(
            "sql_query".to_string(),
            serde_json::json!({
                "type": "string",
                "description": "The SQL statement to execute."
            }),
        );
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": ["dbname", "user", "password", "sql_query"]
        })
    }

    async fn execute(&self, input: serde_json::Value) -> ToolOutput {
        invoke(NAME, self.run(&input)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roaddata_core::Value;

    fn tool() -> ExecuteSqlTool {
        ExecuteSqlTool::new(Arc::new(RoadDataConfig::default()))
    }

    #[test]
    fn rows_format_as_tuples() {
        let result = QueryResult {
            columns: vec!["id".into(), "name".into()],
            rows: vec![
                vec![Value::from("1"), Value::from("Ring Road")],
                vec![Value::from("2"), Value::Null],
            ],
        };
        assert_eq!(
            format_rows(&result),
            "Query results:\n(id, name)\n(1, Ring Road)\n(2, NULL)\n"
        );
    }

    #[tokio::test]
    async fn missing_query_aborts_before_connecting() {
        let out = tool()
            .execute(serde_json::json!({
                "dbname": "roads", "user": "gis", "password": "pw", "sql_query": "  "
            }))
            .await;
        assert!(out.is_error);
        assert_eq!(out.text(), "Missing SQL query");
    }

    #[tokio::test]
    async fn credentials_are_checked_before_query() {
        let out = tool().execute(serde_json::json!({})).await;
        assert!(out.is_error);
        assert!(out.text().starts_with("Missing required database connection parameters"));
    }

    #[test]
    fn schema_requires_sql_query() {
        let schema = tool().input_schema();
        let required = schema["required"].as_array().unwrap();
        assert!(required.iter().any(|r| r == "sql_query"));
        assert_eq!(schema["properties"]["sql_query"]["type"], "string");
    }
}
