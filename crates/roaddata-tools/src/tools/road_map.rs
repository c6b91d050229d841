//! Tool: road_map_plot: run SQL returning road geometries and render them.
//!
//! The query must return the configured geometry column (WKB/EWKB, `geom`
//! by default) and category column (`tech_class_name` by default). Lines
//! are colored by road class; the legend follows the configured class order.

use std::sync::Arc;

use async_trait::async_trait;
use roaddata_core::{ConnectionParams, RoadDataConfig, RoadDataError};
use roaddata_render::{RenderOutcome, RoadMapRenderer};

use super::{connection_properties, invoke, sql_query, Tool, ToolOutput};
use crate::db::{self, QueryOutcome};

pub const NAME: &str = "road_map_plot";
pub const PNG_MIME: &str = "image/png";

const NO_RESULTS: &str = "Query returned no results";
const RENDERED: &str = "Road map rendered successfully; the image is attached.";

pub struct RoadMapPlotTool {
    config: Arc<RoadDataConfig>,
    description: String,
}

impl RoadMapPlotTool {
    pub fn new(config: Arc<RoadDataConfig>) -> Self {
        let style = &config.road_map;
        let description = format!(
            "Execute a SQL query that returns road geometries and draw them on a map image. \
             The result must include a '{}' column with line geometries (WKB) and a '{}' \
             column with the road class, which selects each line's color.",
            style.geometry_column, style.category_column
        );
        Self {
            config,
            description,
        }
    }

    async fn run(&self, input: &serde_json::Value) -> Result<ToolOutput, RoadDataError> {
        let params = ConnectionParams::from_input(input, &self.config.database)?;
        let sql = sql_query(input)?;
        let client = db::connect(&params, &self.config.database).await?;

        let result = match db::run_simple(&client, &sql).await? {
            QueryOutcome::Rows(result) => result,
            QueryOutcome::Affected(_) => return Ok(ToolOutput::success(NO_RESULTS)),
        };
        drop(client);

        Ok(outcome_output(
            RoadMapRenderer::new(&self.config.road_map).render(&result)?,
        ))
    }
}

/// Host messages for a render outcome.
pub fn outcome_output(outcome: RenderOutcome) -> ToolOutput {
    match outcome {
        RenderOutcome::NoResults { rows: 0 } => ToolOutput::success(NO_RESULTS),
        RenderOutcome::NoResults { rows } => ToolOutput::success(format!(
            "Query returned {rows} rows but none contained a plottable line geometry"
        )),
        RenderOutcome::Rendered(map) => ToolOutput::success(RENDERED).with_blob(map.png, PNG_MIME),
    }
}

#[async_trait]
impl Tool for RoadMapPlotTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> serde_json::Value {
        let mut properties = connection_properties();
        properties.insert(
            "sql_query".to_string(),
            serde_json::json!({
                "type": "string",
                "description": format!(
                    "SELECT returning the '{}' geometry column and the '{}' class column.",
                    self.config.road_map.geometry_column, self.config.road_map.category_column
                )
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
    use crate::tools::ToolMessage;
    use roaddata_render::RoadMap;

    #[test]
    fn empty_outcomes_are_plain_text() {
        let out = outcome_output(RenderOutcome::NoResults { rows: 0 });
        assert!(!out.is_error);
        assert_eq!(out.text(), NO_RESULTS);

        let out = outcome_output(RenderOutcome::NoResults { rows: 4 });
        assert_eq!(
            out.text(),
            "Query returned 4 rows but none contained a plottable line geometry"
        );
        assert_eq!(out.messages.len(), 1);
    }

    #[test]
    fn rendered_map_is_text_then_png_blob() {
        let out = outcome_output(RenderOutcome::Rendered(RoadMap {
            png: vec![0x89, b'P', b'N', b'G'],
            width: 10,
            height: 8,
            lines_plotted: 1,
            rows_skipped: 0,
            legend: Vec::new(),
        }));
        assert!(!out.is_error);
        assert_eq!(out.messages[0], ToolMessage::text(RENDERED));
        match &out.messages[1] {
            ToolMessage::Blob { mime_type, data } => {
                assert_eq!(mime_type, PNG_MIME);
                assert_eq!(&data[1..4], b"PNG");
            }
            other => panic!("expected blob, got {other:?}"),
        }
    }

    #[test]
    fn description_names_configured_columns() {
        let mut config = RoadDataConfig::default();
        config.road_map.geometry_column = "shape".into();
        let tool = RoadMapPlotTool::new(Arc::new(config));
        assert!(tool.description().contains("'shape'"));
        assert!(tool.input_schema()["properties"]["sql_query"]["description"]
            .as_str()
            .unwrap()
            .contains("'tech_class_name'"));
    }

    #[tokio::test]
    async fn missing_query_is_reported() {
        let tool = RoadMapPlotTool::new(Arc::new(RoadDataConfig::default()));
        let out = tool
            .execute(serde_json::json!({"dbname": "d", "user": "u", "password": "p"}))
            .await;
        assert!(out.is_error);
        assert_eq!(out.text(), "Missing SQL query");
    }
}
