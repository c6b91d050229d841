use thiserror::Error;

/// Coarse classification of a failure, used by hosts and tests that only
/// care about which stage of an invocation went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Required input (connection parameters, query text, config) missing or invalid.
    Configuration,
    /// The database refused the connection or the statement.
    Execution,
    /// The result set could not be turned into output.
    Decoding,
}

#[derive(Debug, Error)]
pub enum RoadDataError {
    #[error("Missing required database connection parameters: dbname, user or password")]
    MissingConnectionParams,

    #[error("Missing SQL query")]
    MissingQuery,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to connect to PostgreSQL database: {0}")]
    Connection(String),

    #[error("Error executing SQL: {0}")]
    Execution(String),

    #[error("Missing required column: {column}")]
    MissingColumn { column: String },

    #[error("Failed to encode road map image: {0}")]
    Encoding(String),
}

impl RoadDataError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RoadDataError::MissingConnectionParams
            | RoadDataError::MissingQuery
            | RoadDataError::Config(_) => ErrorKind::Configuration,
            RoadDataError::Connection(_) | RoadDataError::Execution(_) => ErrorKind::Execution,
            RoadDataError::MissingColumn { .. } | RoadDataError::Encoding(_) => {
                ErrorKind::Decoding
            }
        }
    }

    /// Short error code string, stable across message wording changes.
    pub fn code(&self) -> &'static str {
        match self {
            RoadDataError::MissingConnectionParams => "MISSING_CONNECTION_PARAMS",
            RoadDataError::MissingQuery => "MISSING_QUERY",
            RoadDataError::Config(_) => "CONFIG_ERROR",
            RoadDataError::Connection(_) => "CONNECTION_ERROR",
            RoadDataError::Execution(_) => "EXECUTION_ERROR",
            RoadDataError::MissingColumn { .. } => "MISSING_COLUMN",
            RoadDataError::Encoding(_) => "ENCODING_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, RoadDataError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_invocation_stage() {
        assert_eq!(
            RoadDataError::MissingConnectionParams.kind(),
            ErrorKind::Configuration
        );
        assert_eq!(RoadDataError::MissingQuery.kind(), ErrorKind::Configuration);
        assert_eq!(
            RoadDataError::Connection("refused".into()).kind(),
            ErrorKind::Execution
        );
        assert_eq!(
            RoadDataError::Execution("syntax".into()).kind(),
            ErrorKind::Execution
        );
        assert_eq!(
            RoadDataError::MissingColumn {
                column: "geom".into()
            }
            .kind(),
            ErrorKind::Decoding
        );
    }

    #[test]
    fn messages_carry_underlying_cause() {
        let err = RoadDataError::Execution("relation \"roads\" does not exist".into());
        assert_eq!(
            err.to_string(),
            "Error executing SQL: relation \"roads\" does not exist"
        );
        let err = RoadDataError::MissingColumn {
            column: "tech_class_name".into(),
        };
        assert_eq!(err.to_string(), "Missing required column: tech_class_name");
        assert_eq!(err.code(), "MISSING_COLUMN");
    }
}
