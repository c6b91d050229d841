//! PostgreSQL access for the tools: one connection per invocation, no pooling.

use std::time::Duration;

use roaddata_core::{ConnectionParams, DatabaseDefaults, QueryResult, Result, RoadDataError, Value};
use tokio_postgres::{Client, NoTls, SimpleQueryMessage};
use tracing::{debug, warn};

/// What a statement produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    Rows(QueryResult),
    Affected(u64),
}

/// Open a connection. The driver task ends when the returned client is dropped.
pub async fn connect(params: &ConnectionParams, defaults: &DatabaseDefaults) -> Result<Client> {
    let mut config = tokio_postgres::Config::new();
    config
        .dbname(&params.dbname)
        .user(&params.user)
        .password(&params.password)
        .host(&params.host)
        .port(params.port_number()?);
    if defaults.connect_timeout_secs > 0 {
        config.connect_timeout(Duration::from_secs(defaults.connect_timeout_secs));
    }

    debug!(host = %params.host, port = %params.port, dbname = %params.dbname, "connecting to postgres");
    let (client, connection) = config
        .connect(NoTls)
        .await
        .map_err(|e| RoadDataError::Connection(describe(&e)))?;

    tokio::spawn(async move {
        if let Err(e) = connection.await {
            warn!(error = %e, "postgres connection closed with error");
        }
    });

    Ok(client)
}

/// Run `sql` over the simple query protocol; every value arrives as text.
///
/// Only the first row-returning statement contributes rows. Later statements
/// still run, and the affected count is taken from the last one.
pub async fn run_simple(client: &Client, sql: &str) -> Result<QueryOutcome> {
    let messages = client
        .simple_query(sql)
        .await
        .map_err(|e| RoadDataError::Execution(describe(&e)))?;
    Ok(collect_outcome(messages))
}

fn collect_outcome(messages: Vec<SimpleQueryMessage>) -> QueryOutcome {
    let mut result: Option<QueryResult> = None;
    let mut closed = false;
    let mut affected = 0u64;
    for message in messages {
        match message {
            SimpleQueryMessage::RowDescription(columns) => {
                if result.is_none() {
                    result = Some(QueryResult::new(
                        columns.iter().map(|c| c.name().to_string()).collect(),
                    ));
                }
            }
            SimpleQueryMessage::Row(row) if !closed => {
                let result = result.get_or_insert_with(|| {
                    QueryResult::new(row.columns().iter().map(|c| c.name().to_string()).collect())
                });
                result
                    .rows
                    .push((0..row.len()).map(|i| Value::from(row.get(i))).collect());
            }
            SimpleQueryMessage::CommandComplete(n) => {
                affected = n;
                closed = result.is_some();
            }
            _ => {}
        }
    }

    match result {
        Some(rows) => QueryOutcome::Rows(rows),
        None => QueryOutcome::Affected(affected),
    }
}

/// Tables of the `public` schema, by name.
pub async fn list_tables(client: &Client) -> Result<Vec<String>> {
    let rows = client
        .query(
            "SELECT table_name::text FROM information_schema.tables
             WHERE table_schema = 'public'
             ORDER BY table_name",
            &[],
        )
        .await
        .map_err(|e| RoadDataError::Execution(describe(&e)))?;
    Ok(rows.iter().map(|r| r.get::<_, String>(0)).collect())
}

/// `(column_name, data_type)` pairs of a `public` table, in column order.
pub async fn list_columns(client: &Client, table: &str) -> Result<Vec<(String, String)>> {
    let rows = client
        .query(
            "SELECT column_name::text, data_type::text FROM information_schema.columns
             WHERE table_schema = 'public' AND table_name = $1
             ORDER BY ordinal_position",
            &[&table],
        )
        .await
        .map_err(|e| RoadDataError::Execution(describe(&e)))?;
    Ok(rows
        .iter()
        .map(|r| (r.get::<_, String>(0), r.get::<_, String>(1)))
        .collect())
}

/// Prefer the server's own message over the driver's generic "db error".
pub fn describe(e: &tokio_postgres::Error) -> String {
    match e.as_db_error() {
        Some(db) => db.message().to_string(),
        None => e.to_string(),
    }
}
