use crate::error::GradeError;
use serde_json::json;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

/// Store failures are logged in full here and reported generically.
pub fn grade_err(id: &str, e: &GradeError) -> serde_json::Value {
    match e {
        GradeError::Store(_) | GradeError::Serde(_) => {
            tracing::error!(request_id = id, error = %e, "store failure");
        }
        _ => tracing::debug!(request_id = id, error = %e, "request rejected"),
    }
    err(id, e.code(), e.public_message(), e.details())
}
