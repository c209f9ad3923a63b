use crate::error::{GradeError, Result};
use crate::pipeline::{ClassWeightedAverage, WeightedPipeline};
use crate::store::GradeStore;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Where the weighted pipeline runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Compiled to SQL and reduced inside the store.
    #[default]
    Pipeline,
    /// Records fetched, then reduced by the in-process stage functions.
    InMemory,
}

impl FromStr for Strategy {
    type Err = GradeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pipeline" => Ok(Self::Pipeline),
            "inMemory" | "in_memory" => Ok(Self::InMemory),
            other => Err(GradeError::invalid_parameter(
                "strategy",
                format!("strategy must be one of: pipeline, inMemory (got {other})"),
            )),
        }
    }
}

/// Read-only averages over a learner's grade records.
#[derive(Debug, Clone, Copy)]
pub struct AveragingEngine<'a> {
    store: GradeStore<'a>,
}

impl<'a> AveragingEngine<'a> {
    pub fn new(store: GradeStore<'a>) -> Self {
        Self { store }
    }

    /// Mean of the numeric scores of each record, keyed by class. Classes
    /// with no numeric score are left out. When a learner has several records
    /// in one class, the last one fetched wins.
    pub fn simple_per_class_average(&self, learner_id: i64) -> Result<BTreeMap<i64, f64>> {
        let records = self.store.get_by_learner(learner_id, None)?;
        let mut averages = BTreeMap::new();
        for record in records {
            let valid: Vec<f64> = record.scores.iter().filter_map(|s| s.numeric_score()).collect();
            if valid.is_empty() {
                continue;
            }
            let sum: f64 = valid.iter().sum();
            averages.insert(record.class_id, sum / valid.len() as f64);
        }
        Ok(averages)
    }

    /// Flat mean of every numeric score across all classes; 0 when there are none.
    pub fn overall_average(&self, learner_id: i64) -> Result<f64> {
        let records = self.store.get_by_learner(learner_id, None)?;
        let mut sum = 0.0;
        let mut count: usize = 0;
        for score in records
            .iter()
            .flat_map(|r| r.scores.iter())
            .filter_map(|s| s.numeric_score())
        {
            sum += score;
            count += 1;
        }
        Ok(if count > 0 { sum / count as f64 } else { 0.0 })
    }

    pub fn weighted_per_class_average(
        &self,
        learner_id: i64,
        strategy: Strategy,
    ) -> Result<Vec<ClassWeightedAverage>> {
        let pipeline = WeightedPipeline::for_learner(learner_id);
        match strategy {
            Strategy::Pipeline => self.store.aggregate(&pipeline),
            Strategy::InMemory => {
                let records = self.store.get_by_learner(learner_id, None)?;
                Ok(pipeline.run_in_memory(records))
            }
        }
    }
}
