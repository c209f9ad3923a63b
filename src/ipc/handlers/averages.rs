use crate::averaging::{AveragingEngine, Strategy};
use crate::error::GradeError;
use crate::ipc::helpers::{int_param, with_store};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_learner_class_averages(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let learner_id = int_param(&req.params, "learnerId")?;
        let averages = AveragingEngine::new(store).simple_per_class_average(learner_id)?;
        Ok(json!({ "averages": averages }))
    })
}

fn handle_learner_average(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let learner_id = int_param(&req.params, "learnerId")?;
        let average = AveragingEngine::new(store).overall_average(learner_id)?;
        Ok(json!({
            "average": average,
            "text": format!("Overall average: {average}"),
        }))
    })
}

fn handle_learner_weighted_class_averages(state: &mut AppState, req: &Request) -> serde_json::Value {
    with_store(state, req, |store| {
        let learner_id = int_param(&req.params, "learnerId")?;
        let strategy = match req.params.get("strategy") {
            None => Strategy::default(),
            Some(v) => v
                .as_str()
                .ok_or_else(|| GradeError::invalid_parameter("strategy", "strategy must be a string"))?
                .parse()?,
        };
        let rows = AveragingEngine::new(store).weighted_per_class_average(learner_id, strategy)?;
        Ok(json!({ "rows": rows }))
    })
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grades.learnerClassAverages" => Some(handle_learner_class_averages(state, req)),
        "grades.learnerAverage" => Some(handle_learner_average(state, req)),
        "grades.learnerWeightedClassAverages" => {
            Some(handle_learner_weighted_class_averages(state, req))
        }
        _ => None,
    }
}
