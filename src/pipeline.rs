//! Weighted per-class average as a four-stage declarative pipeline:
//! match learner, unwind scores, group by class into category buckets,
//! project the weighted composite.
//!
//! The same stage values drive two executors: `run_in_memory` reduces
//! fetched records in process, `to_sql` compiles the stages into one
//! SQLite query so the reduction runs inside the store.

use crate::model::{Category, GradeRecord, ScoreEntry};
use rusqlite::types::Value;
use serde::Serialize;
use std::collections::BTreeMap;

/// Exam 50%, quiz 30%, homework 20%.
pub const CATEGORY_WEIGHTS: [(Category, f64); 3] = [
    (Category::Exam, 0.5),
    (Category::Quiz, 0.3),
    (Category::Homework, 0.2),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassWeightedAverage {
    pub class_id: i64,
    pub avg: f64,
}

/// One score entry paired with the class of the record it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRow {
    pub class_id: i64,
    pub entry: ScoreEntry,
}

/// Numeric scores of one class, split by category.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClassBuckets {
    pub class_id: i64,
    pub buckets: BTreeMap<Category, Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchLearner {
    pub learner_id: i64,
}

impl MatchLearner {
    pub fn apply(&self, records: Vec<GradeRecord>) -> Vec<GradeRecord> {
        records
            .into_iter()
            .filter(|r| r.learner_id == self.learner_id)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnwindScores;

impl UnwindScores {
    /// Records with an empty `scores` array produce no rows.
    pub fn apply(&self, records: Vec<GradeRecord>) -> Vec<ScoreRow> {
        records
            .into_iter()
            .flat_map(|r| {
                let class_id = r.class_id;
                r.scores
                    .into_iter()
                    .map(move |entry| ScoreRow { class_id, entry })
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupByClass {
    pub categories: Vec<Category>,
}

impl GroupByClass {
    /// Every class seen in `rows` gets a group, even when all of its entries
    /// are discarded for a missing numeric score or an unknown type.
    pub fn apply(&self, rows: Vec<ScoreRow>) -> Vec<ClassBuckets> {
        let mut groups: BTreeMap<i64, ClassBuckets> = BTreeMap::new();
        for row in rows {
            let group = groups.entry(row.class_id).or_insert_with(|| ClassBuckets {
                class_id: row.class_id,
                buckets: BTreeMap::new(),
            });
            let (Some(category), Some(score)) = (row.entry.category(), row.entry.numeric_score())
            else {
                continue;
            };
            if self.categories.contains(&category) {
                group.buckets.entry(category).or_default().push(score);
            }
        }
        groups.into_values().collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectWeighted {
    pub weights: Vec<(Category, f64)>,
}

impl ProjectWeighted {
    /// Empty buckets add no term. Weights are not renormalised.
    pub fn apply(&self, groups: Vec<ClassBuckets>) -> Vec<ClassWeightedAverage> {
        groups
            .into_iter()
            .map(|g| {
                let mut avg = 0.0;
                for (category, weight) in &self.weights {
                    if let Some(mean) = g.buckets.get(category).and_then(|v| mean(v)) {
                        avg += weight * mean;
                    }
                }
                ClassWeightedAverage {
                    class_id: g.class_id,
                    avg,
                }
            })
            .collect()
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeightedPipeline {
    pub matcher: MatchLearner,
    pub unwind: UnwindScores,
    pub group: GroupByClass,
    pub project: ProjectWeighted,
}

impl WeightedPipeline {
    pub fn for_learner(learner_id: i64) -> Self {
        Self {
            matcher: MatchLearner { learner_id },
            unwind: UnwindScores,
            group: GroupByClass {
                categories: CATEGORY_WEIGHTS.iter().map(|(c, _)| *c).collect(),
            },
            project: ProjectWeighted {
                weights: CATEGORY_WEIGHTS.to_vec(),
            },
        }
    }

    /// Rows come back sorted by class id.
    pub fn run_in_memory(&self, records: Vec<GradeRecord>) -> Vec<ClassWeightedAverage> {
        let matched = self.matcher.apply(records);
        let rows = self.unwind.apply(matched);
        let groups = self.group.apply(rows);
        self.project.apply(groups)
    }

    /// Compiles the stages into one query over the `grades` table. Binds are
    /// returned in placeholder order. Result columns: `class_id`, `avg`.
    pub fn to_sql(&self) -> (String, Vec<Value>) {
        let mut bind = Vec::new();

        // project
        let terms: Vec<String> = self
            .project
            .weights
            .iter()
            .map(|(category, weight)| {
                bind.push(Value::Real(*weight));
                format!("COALESCE(? * {}, 0.0)", bucket_column(*category))
            })
            .collect();
        let project_expr = if terms.is_empty() {
            "0.0".to_string()
        } else {
            terms.join(" + ")
        };

        // group
        let bucket_cols: Vec<String> = self
            .group
            .categories
            .iter()
            .map(|category| {
                bind.push(Value::Text(category.as_str().to_string()));
                format!(
                    "AVG(CASE WHEN json_extract(s.value, '$.type') = ?
                              AND json_type(s.value, '$.score') IN ('integer', 'real')
                         THEN json_extract(s.value, '$.score') END) AS {}",
                    bucket_column(*category)
                )
            })
            .collect();
        // Categories projected but never grouped still need a (NULL) column.
        let missing_cols: Vec<String> = self
            .project
            .weights
            .iter()
            .filter(|(c, _)| !self.group.categories.contains(c))
            .map(|(c, _)| format!("NULL AS {}", bucket_column(*c)))
            .collect();
        let mut group_cols = vec!["g.class_id AS class_id".to_string()];
        group_cols.extend(bucket_cols);
        group_cols.extend(missing_cols);

        // match
        bind.push(Value::Integer(self.matcher.learner_id));

        // unwind: json_each yields nothing for an empty array.
        let sql = format!(
            "SELECT class_id, {project_expr} AS avg
             FROM (
               SELECT {}
               FROM grades g, json_each(g.scores) s
               WHERE g.learner_id = ?
               GROUP BY g.class_id
             )
             ORDER BY class_id",
            group_cols.join(",\n                      ")
        );
        (sql, bind)
    }
}

fn bucket_column(category: Category) -> &'static str {
    match category {
        Category::Exam => "exam_avg",
        Category::Quiz => "quiz_avg",
        Category::Homework => "homework_avg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::RecordId;
    use serde_json::json;

    fn record(learner_id: i64, class_id: i64, scores: serde_json::Value) -> GradeRecord {
        GradeRecord {
            id: RecordId::generate(),
            learner_id,
            class_id,
            scores: serde_json::from_value(scores).expect("scores"),
        }
    }

    #[test]
    fn missing_homework_contributes_no_term() {
        let p = WeightedPipeline::for_learner(1);
        let out = p.run_in_memory(vec![record(
            1,
            300,
            json!([
                { "type": "exam", "score": 90 },
                { "type": "exam", "score": 80 },
                { "type": "quiz", "score": 70 }
            ]),
        )]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].class_id, 300);
        assert!((out[0].avg - 63.5).abs() < 1e-9);
    }

    #[test]
    fn unknown_types_and_non_numeric_scores_are_discarded() {
        let p = WeightedPipeline::for_learner(1);
        let out = p.run_in_memory(vec![
            record(
                1,
                7,
                json!([
                    { "type": "lab", "score": 10 },
                    { "type": "exam", "score": "late" },
                    { "type": "exam" },
                    { "score": 99 },
                    { "type": "homework", "score": 50 }
                ]),
            ),
            record(2, 7, json!([{ "type": "exam", "score": 0 }])),
        ]);
        assert_eq!(out, vec![ClassWeightedAverage { class_id: 7, avg: 10.0 }]);
    }

    #[test]
    fn classes_without_entries_produce_no_row_and_unusable_entries_give_zero() {
        let p = WeightedPipeline::for_learner(1);
        let out = p.run_in_memory(vec![
            record(1, 1, json!([])),
            record(1, 2, json!([{ "type": "lab", "score": 80 }])),
            record(1, 3, json!([{ "type": "quiz", "score": 80 }])),
        ]);
        assert_eq!(
            out,
            vec![
                ClassWeightedAverage { class_id: 2, avg: 0.0 },
                ClassWeightedAverage { class_id: 3, avg: 24.0 },
            ]
        );
    }

    #[test]
    fn entries_from_several_records_pool_per_class() {
        let p = WeightedPipeline::for_learner(4);
        let out = p.run_in_memory(vec![
            record(4, 9, json!([{ "type": "exam", "score": 100 }])),
            record(4, 9, json!([{ "type": "exam", "score": 50 }, { "type": "homework", "score": 100 }])),
        ]);
        assert_eq!(out.len(), 1);
        assert!((out[0].avg - (0.5 * 75.0 + 0.2 * 100.0)).abs() < 1e-9);
    }

    #[test]
    fn sql_binds_follow_placeholder_order() {
        let (sql, bind) = WeightedPipeline::for_learner(12).to_sql();
        assert_eq!(sql.matches('?').count(), bind.len());
        assert_eq!(bind.first(), Some(&Value::Real(0.5)));
        assert_eq!(bind.get(3), Some(&Value::Text("exam".to_string())));
        assert_eq!(bind.last(), Some(&Value::Integer(12)));
    }
}
