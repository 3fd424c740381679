//! Error types for reqplan.
//!
//! Two layers:
//! - [`PlanError`]: fatal errors. Conversion stops and nothing is returned.
//! - [`RequestError`]: problems with the incoming request data. These never abort a
//!   conversion; the offending item is dropped and the error is collected on the
//!   [`RequestModel`](crate::RequestModel) for the caller to surface.

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Result type alias for reqplan operations.
pub type PlanResult<T> = Result<T, PlanError>;

/// Fatal error types.
#[derive(Debug, Error)]
pub enum PlanError {
    /// The metadata provider has no entry for the requested main resource type.
    ///
    /// This is a caller configuration error, not a request-data error.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// A `show` conversion was requested without an id.
    #[error("Missing id for show action on {0}")]
    MissingId(String),

    /// Invalid identifier or metadata.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Query execution error
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl PlanError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Check if this is an unknown-resource error
    pub fn is_unknown_resource(&self) -> bool {
        matches!(self, Self::UnknownResource(_))
    }
}

/// A non-fatal problem found while validating a request.
///
/// Serializes as its human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// Sort key not in the resource's sortable allow-list.
    #[error("cannot sort by '{field}'")]
    UnknownSortField { field: String },

    /// Field not in the resource's selectable allow-list.
    #[error("field '{field}' is not selectable on '{resource}'")]
    UnknownField { resource: String, field: String },

    /// `fields[...]` key that does not name a known resource.
    #[error("unknown resource '{resource}' in field selection")]
    UnknownResource { resource: String },

    /// Key that is not a declared relation of the main resource.
    #[error("'{relation}' is not a relation of '{resource}'")]
    UnknownRelation { resource: String, relation: String },

    /// `limit[...]` key that was not selected.
    #[error("limit given for '{relation}', which is not selected")]
    UnknownLimit { relation: String },

    /// `limit[...]` keyed by the main resource.
    #[error("limit is only supported on relations, not on '{resource}'")]
    LimitOnMainResource { resource: String },

    /// `limit[...]` value that is not a positive integer.
    #[error("invalid limit '{value}' for '{relation}'")]
    InvalidLimit { relation: String, value: String },

    /// `page` / `per_page` value that is not a positive integer.
    #[error("invalid {param} '{value}'")]
    InvalidPagination { param: &'static str, value: String },

    /// Filter on a field outside the allow-list (strict mode only).
    #[error("cannot filter '{resource}' by '{field}'")]
    UnknownFilterField { resource: String, field: String },
}

impl Serialize for RequestError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_error_serializes_as_message() {
        let err = RequestError::UnknownSortField {
            field: "age".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&err).unwrap(),
            r#""cannot sort by 'age'""#
        );
    }

    #[test]
    fn plan_error_display() {
        let err = PlanError::UnknownResource("Post".to_string());
        assert_eq!(err.to_string(), "Unknown resource type: Post");
        assert!(err.is_unknown_resource());
    }
}
