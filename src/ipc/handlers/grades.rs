use crate::ipc::helpers::{
    int_param, object_param, opt_int_param, record_id, require_affected, with_store,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{NewGradeRecord, ScoreEntry};
use serde_json::json;

fn handle_grades_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let id = record_id(&req.params, "id")?;
        Ok(json!({ "record": store.require(&id)? }))
    })
}

// An empty match set is a successful empty list, not not_found.
fn handle_grades_by_learner(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let learner_id = int_param(&req.params, "learnerId")?;
        let class_id = opt_int_param(&req.params, "classId")?;
        let records = store.get_by_learner(learner_id, class_id)?;
        Ok(json!({ "records": records }))
    })
}

fn handle_grades_by_class(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let class_id = int_param(&req.params, "classId")?;
        let learner_id = opt_int_param(&req.params, "learnerId")?;
        let records = store.get_by_class(class_id, learner_id)?;
        Ok(json!({ "records": records }))
    })
}

fn handle_grades_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let body = object_param(&req.params, "record")?;
        let record = store.insert(NewGradeRecord::from_json(body)?)?;
        Ok(json!({ "record": record }))
    })
}

fn handle_grades_add_score(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let id = record_id(&req.params, "id")?;
        let entry = ScoreEntry::from_json(object_param(&req.params, "entry")?)?;
        let modified = require_affected(store.push_score(&id, &entry)?, "grade entry")?;
        Ok(json!({ "modifiedCount": modified }))
    })
}

fn handle_grades_remove_score(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let id = record_id(&req.params, "id")?;
        let matcher = ScoreEntry::from_json(object_param(&req.params, "entry")?)?;
        let modified = require_affected(store.pull_score(&id, &matcher)?, "matching score")?;
        Ok(json!({ "modifiedCount": modified }))
    })
}

fn handle_grades_reassign_class(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let class_id = int_param(&req.params, "classId")?;
        let new_class_id = int_param(&req.params, "newClassId")?;
        let modified = require_affected(
            store.reassign_class(class_id, new_class_id)?,
            "class grade entries",
        )?;
        Ok(json!({ "modifiedCount": modified }))
    })
}

fn handle_grades_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let id = record_id(&req.params, "id")?;
        let deleted = require_affected(store.delete_by_id(&id)?, "grade entry")?;
        Ok(json!({ "deletedCount": deleted }))
    })
}

fn handle_grades_delete_by_learner(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let learner_id = int_param(&req.params, "learnerId")?;
        let deleted = require_affected(store.delete_by_learner(learner_id)?, "learner grade entries")?;
        Ok(json!({ "deletedCount": deleted }))
    })
}

fn handle_grades_delete_by_class(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let class_id = int_param(&req.params, "classId")?;
        let deleted = require_affected(store.delete_by_class(class_id)?, "class grade entries")?;
        Ok(json!({ "deletedCount": deleted }))
    })
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grades.get" => Some(handle_grades_get(state, req)),
        // grades.byStudent is kept for clients written before the learner rename.
        "grades.byLearner" | "grades.byStudent" => Some(handle_grades_by_learner(state, req)),
        "grades.byClass" => Some(handle_grades_by_class(state, req)),
        "grades.create" => Some(handle_grades_create(state, req)),
        "grades.addScore" => Some(handle_grades_add_score(state, req)),
        "grades.removeScore" => Some(handle_grades_remove_score(state, req)),
        "grades.reassignClass" => Some(handle_grades_reassign_class(state, req)),
        "grades.delete" => Some(handle_grades_delete(state, req)),
        "grades.deleteByLearner" => Some(handle_grades_delete_by_learner(state, req)),
        "grades.deleteByClass" => Some(handle_grades_delete_by_class(state, req)),
        _ => None,
    }
}
