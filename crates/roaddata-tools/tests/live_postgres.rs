// Live tests against a real PostgreSQL server. Run with:
//   ROADDATA_TEST_DBNAME=.. ROADDATA_TEST_USER=.. ROADDATA_TEST_PASSWORD=.. \
//   cargo test -p roaddata-tools --test live_postgres -- --ignored
// Only `road_map_renders_postgis_lines` needs the PostGIS extension.

use std::sync::Arc;

use roaddata_core::RoadDataConfig;
use roaddata_tools::{builtin_tools, find_tool, ToolMessage, ToolOutput};

fn connection() -> serde_json::Value {
    let var = |k: &str| std::env::var(k).unwrap_or_default();
    serde_json::json!({
        "dbname": var("ROADDATA_TEST_DBNAME"),
        "user": var("ROADDATA_TEST_USER"),
        "password": var("ROADDATA_TEST_PASSWORD"),
        "host": var("ROADDATA_TEST_HOST"),
        "port": var("ROADDATA_TEST_PORT"),
    })
}

async fn call(tool: &str, sql: Option<&str>) -> ToolOutput {
    let tools = builtin_tools(Arc::new(RoadDataConfig::default()));
    let mut input = connection();
    if let Some(sql) = sql {
        input["sql_query"] = serde_json::Value::String(sql.to_string());
    }
    find_tool(&tools, tool).unwrap().execute(input).await
}

#[tokio::test]
#[ignore]
async fn execute_sql_select_and_write() {
    let out = call("execute_sql", Some("SELECT 1 AS one, NULL AS nothing")).await;
    assert!(!out.is_error, "{}", out.text());
    assert!(out.text().contains("(one, nothing)"));
    assert!(out.text().contains("(1, NULL)"));

    let out = call(
        "execute_sql",
        Some("CREATE TEMP TABLE roaddata_scratch (id int); INSERT INTO roaddata_scratch VALUES (1), (2)"),
    )
    .await;
    assert!(!out.is_error, "{}", out.text());
    assert_eq!(out.text(), "SQL executed successfully, rows affected: 2");

    let out = call("execute_sql", Some("SELECT 1 WHERE false")).await;
    assert_eq!(out.text(), "Query returned no results");
}

#[tokio::test]
#[ignore]
async fn execute_sql_empty_select_after_comment() {
    let out = call("execute_sql", Some("-- nothing matches\nSELECT 1 WHERE false")).await;
    assert!(!out.is_error, "{}", out.text());
    assert_eq!(out.text(), "Query returned no results");

    let out = call("execute_sql", Some("/* block */ SELECT 1 AS id WHERE false")).await;
    assert_eq!(out.text(), "Query returned no results");
}

#[tokio::test]
#[ignore]
async fn execute_sql_keeps_first_row_set_only() {
    let out = call(
        "execute_sql",
        Some("SELECT 1 AS id; SELECT 'x' AS a, 'y' AS b, 'z' AS c"),
    )
    .await;
    assert!(!out.is_error, "{}", out.text());
    assert_eq!(out.text(), "Query results:\n(id)\n(1)\n");

    let out = call(
        "execute_sql",
        Some("CREATE TEMP TABLE roaddata_scratch2 (id int); SELECT 'x' AS a, 'y' AS b"),
    )
    .await;
    assert!(!out.is_error, "{}", out.text());
    assert_eq!(out.text(), "Query results:\n(a, b)\n(x, y)\n");
}

#[tokio::test]
#[ignore]
async fn execute_sql_reports_server_error() {
    let out = call("execute_sql", Some("SELEC 1")).await;
    assert!(out.is_error);
    assert!(out.text().starts_with("Error executing SQL: syntax error"));
}

#[tokio::test]
#[ignore]
async fn get_schema_lists_public_tables() {
    let out = call("get_schema", None).await;
    assert!(!out.is_error, "{}", out.text());
    assert!(
        out.text().starts_with("Tables in database:") || out.text() == "No tables found in the database"
    );
}

fn assert_png_attached(out: &ToolOutput) {
    assert!(!out.is_error, "{}", out.text());
    assert_eq!(out.messages.len(), 2);
    match &out.messages[1] {
        ToolMessage::Blob { mime_type, data } => {
            assert_eq!(mime_type, "image/png");
            assert_eq!(&data[..4], b"\x89PNG");
        }
        other => panic!("expected blob, got {other:?}"),
    }
}

#[tokio::test]
#[ignore]
async fn road_map_renders_hex_wkb_text() {
    // LINESTRING(116.30 39.90, 116.40 40.00), a three-point line and a POINT.
    let sql = "SELECT '0102000000020000003333333333135d403333333333f343409a99999999195d400000000000004440'::text AS geom, \
               '高速'::text AS tech_class_name \
               UNION ALL \
               SELECT '0102000000030000003333333333135d4066666666660644406666666666165d40cdcccccccc0c4440cdcccccccc1c5d400ad7a3703d0a4440', NULL \
               UNION ALL \
               SELECT '01010000006666666666165d409a99999999f94340', '一级'";
    let out = call("road_map_plot", Some(sql)).await;
    assert_png_attached(&out);

    let out = call(
        "road_map_plot",
        Some("SELECT '01010000006666666666165d409a99999999f94340'::text AS geom, '一级'::text AS tech_class_name"),
    )
    .await;
    assert_eq!(
        out.text(),
        "Query returned 1 rows but none contained a plottable line geometry"
    );

    let out = call("road_map_plot", Some("SELECT 1 AS geom")).await;
    assert!(out.is_error);
    assert_eq!(out.text(), "Missing required column: tech_class_name");
}

#[tokio::test]
#[ignore]
async fn road_map_renders_postgis_lines() {
    let sql = "SELECT ST_GeomFromText('LINESTRING(116.30 39.90, 116.40 40.00)', 4326) AS geom, \
               '高速'::text AS tech_class_name \
               UNION ALL \
               SELECT ST_GeomFromText('POINT(116.35 39.95)', 4326), '一级'";
    let out = call("road_map_plot", Some(sql)).await;
    assert_png_attached(&out);
}
