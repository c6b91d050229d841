//! Shared configuration, error taxonomy and data types for the roaddata tools.

pub mod config;
pub mod error;
pub mod types;

pub use config::{CategoryClass, DatabaseDefaults, RoadDataConfig, RoadMapStyle};
pub use error::{ErrorKind, Result, RoadDataError};
pub use types::{Color, ConnectionParams, QueryResult, Value};
