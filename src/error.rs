use thiserror::Error;

use crate::store::StoreError;

/// Fatal failures of a single conversion. Per-cell coercion failures never
/// show up here; they are absorbed as nulls by the coercer.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("invalid event payload: {0}")]
    InvalidEvent(String),

    #[error("source object {container}/{key} unavailable: {source}")]
    SourceUnavailable {
        container: String,
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("columns {first:?} and {second:?} both normalize to {name:?}")]
    SchemaConflict {
        name: String,
        first: String,
        second: String,
    },

    #[error("column {column:?} is listed under more than one coercion rule")]
    ConflictingRule { column: String },

    #[error("parquet encoding failed: {0}")]
    Encode(String),

    #[error("writing {container}/{key} failed: {source}")]
    DestinationWriteFailure {
        container: String,
        key: String,
        #[source]
        source: StoreError,
    },
}

impl From<arrow::error::ArrowError> for ConvertError {
    fn from(err: arrow::error::ArrowError) -> Self {
        ConvertError::Encode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
