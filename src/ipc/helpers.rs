use crate::error::{GradeError, Result};
use crate::ipc::error::{err, grade_err, ok};
use crate::ipc::types::{AppState, Request};
use crate::store::GradeStore;
use crate::validate::{ParsedParam, RecordId};
use serde_json::Value;

pub fn record_id(params: &Value, key: &str) -> Result<RecordId> {
    match params.get(key) {
        Some(Value::String(s)) => RecordId::parse(s),
        Some(other) => Err(GradeError::malformed_identifier(other.to_string())),
        None => Err(GradeError::malformed_identifier("")),
    }
}

pub fn int_param(params: &Value, key: &'static str) -> Result<i64> {
    let raw = params.get(key).unwrap_or(&Value::Null);
    ParsedParam::from_json(raw).require(key)
}

/// Absent or null means "no filter"; anything else must parse.
pub fn opt_int_param(params: &Value, key: &'static str) -> Result<Option<i64>> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(raw) => ParsedParam::from_json(raw).require(key).map(Some),
    }
}

pub fn object_param(params: &Value, key: &str) -> Result<Value> {
    match params.get(key) {
        Some(v @ Value::Object(_)) => Ok(v.clone()),
        _ => Err(GradeError::invalid_record(format!("missing params.{key}"))),
    }
}

/// Zero affected records is reported as not found.
pub fn require_affected(count: usize, what: &'static str) -> Result<usize> {
    if count == 0 {
        Err(GradeError::not_found(what))
    } else {
        Ok(count)
    }
}

/// Runs `f` against the open workspace store and wraps the outcome in a
/// response envelope.
pub fn with_store<F>(state: &AppState, req: &Request, f: F) -> Value
where
    F: FnOnce(GradeStore<'_>) -> Result<Value>,
{
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match f(GradeStore::new(conn)) {
        Ok(result) => ok(&req.id, result),
        Err(e) => grade_err(&req.id, &e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_id_param_rejects_non_strings() {
        let params = json!({ "id": 12 });
        assert_eq!(record_id(&params, "id").unwrap_err().code(), "bad_id");
        assert_eq!(record_id(&json!({}), "id").unwrap_err().code(), "bad_id");
    }

    #[test]
    fn optional_numeric_filter() {
        let params = json!({ "classId": "301", "learnerId": null, "bad": "x1" });
        assert_eq!(opt_int_param(&params, "classId").unwrap(), Some(301));
        assert_eq!(opt_int_param(&params, "learnerId").unwrap(), None);
        assert_eq!(opt_int_param(&params, "missing").unwrap(), None);
        assert_eq!(opt_int_param(&params, "bad").unwrap_err().code(), "bad_params");
        assert_eq!(int_param(&params, "missing").unwrap_err().code(), "bad_params");
    }

    #[test]
    fn zero_affected_is_not_found() {
        assert_eq!(require_affected(2, "grade entry").unwrap(), 2);
        assert_eq!(
            require_affected(0, "grade entry").unwrap_err().code(),
            "not_found"
        );
    }
}
