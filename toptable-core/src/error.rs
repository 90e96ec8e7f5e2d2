//! Error types of the table.
//!
//! Configuration errors are fatal to table construction. Sort selection errors leave the
//! table untouched. Missing event values are not errors at all, and consistency faults
//! between the schema and the type catalog panic instead of returning an error.

use thiserror::Error;

use crate::aggregation::Aggregation;
use crate::param_type::ParamType;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("empty table initializer")]
    EmptyFormat,

    #[error("invalid table configuration: more than one key marker")]
    DuplicateKey,

    #[error("invalid table token {0}")]
    UnresolvableField(String),

    #[error("table is missing a key")]
    MissingKey,

    #[error("table has no values")]
    NoValues,

    #[error("field {name} has type {ty}, which cannot be a table field")]
    UnsupportedFieldType { name: String, ty: ParamType },

    #[error("field {name} has type {ty}, which cannot be aggregated with {aggregation}")]
    InvalidAggregation {
        name: String,
        ty: ParamType,
        aggregation: Aggregation,
    },

    #[error("refresh interval must be greater than zero")]
    InvalidRefreshInterval,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("invalid table configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid table sorting column {0}")]
    InvalidSortColumn(u32),
}

pub type Result<T> = std::result::Result<T, TableError>;
