use serde_json::json;
use thiserror::Error;

/// Failures surfaced by the grade store and the averaging engine.
#[derive(Error, Debug)]
pub enum GradeError {
    /// The id is not 24 lowercase hex characters. Raised before the store is touched.
    #[error("invalid id format: {raw}")]
    MalformedIdentifier { raw: String },

    /// A lookup matched nothing, or a mutation affected zero records.
    #[error("{what} not found")]
    NotFound { what: &'static str },

    /// A learner/class id parameter that should be an integer is not one.
    #[error("{param} must be an integer")]
    InvalidNumericParameter {
        param: &'static str,
        raw: serde_json::Value,
    },

    /// A non-id request parameter has an unsupported value.
    #[error("{message}")]
    InvalidParameter {
        param: &'static str,
        message: String,
    },

    /// The incoming record or score entry has the wrong shape.
    #[error("invalid grade record: {message}")]
    InvalidRecord { message: String },

    #[error("store operation failed: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("stored scores are not valid json: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GradeError>;

impl GradeError {
    pub fn malformed_identifier(raw: impl Into<String>) -> Self {
        Self::MalformedIdentifier { raw: raw.into() }
    }

    pub fn not_found(what: &'static str) -> Self {
        Self::NotFound { what }
    }

    pub fn invalid_record(message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            message: message.into(),
        }
    }

    pub fn invalid_parameter(param: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            param,
            message: message.into(),
        }
    }

    /// Stable wire code used in IPC error responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedIdentifier { .. } => "bad_id",
            Self::NotFound { .. } => "not_found",
            Self::InvalidNumericParameter { .. }
            | Self::InvalidParameter { .. }
            | Self::InvalidRecord { .. } => "bad_params",
            Self::Store(_) | Self::Serde(_) => "db_query_failed",
        }
    }

    /// Message safe to hand to a caller. Store internals are never included.
    pub fn public_message(&self) -> String {
        match self {
            Self::Store(_) | Self::Serde(_) => "store operation failed".to_string(),
            other => other.to_string(),
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::MalformedIdentifier { raw } => Some(json!({ "id": raw })),
            Self::InvalidNumericParameter { param, raw } => {
                Some(json!({ "param": param, "value": raw }))
            }
            Self::InvalidParameter { param, .. } => Some(json!({ "param": param })),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_failures_hide_internal_detail() {
        let e = GradeError::Store(rusqlite::Error::InvalidQuery);
        assert_eq!(e.code(), "db_query_failed");
        assert_eq!(e.public_message(), "store operation failed");
        assert!(e.details().is_none());
    }

    #[test]
    fn malformed_id_and_not_found_have_distinct_codes() {
        assert_eq!(GradeError::malformed_identifier("xyz").code(), "bad_id");
        assert_eq!(GradeError::not_found("grade entry").code(), "not_found");
        assert_eq!(
            GradeError::not_found("grade entry").public_message(),
            "grade entry not found"
        );
    }
}
