use crate::error::{GradeError, Result};
use crate::validate::RecordId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// Key accepted on insert for records written by older clients.
const LEGACY_LEARNER_KEY: &str = "student_id";
const LEARNER_KEY: &str = "learner_id";

/// A stored score value. Numbers keep their JSON form, so `90` is written
/// back as `90`. Anything that is not a JSON number is kept as-is but never
/// takes part in an average.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScoreValue {
    Numeric(Number),
    Other(Value),
}

impl ScoreValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Numeric(n) => n.as_f64(),
            Self::Other(_) => None,
        }
    }
}

/// Numbers compare by value: `80` matches `80.0`.
impl PartialEq for ScoreValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Numeric(a), Self::Numeric(b)) => a.as_f64() == b.as_f64(),
            (Self::Other(a), Self::Other(b)) => a == b,
            _ => false,
        }
    }
}

/// One entry of a record's `scores` array. Keys other than `type` and
/// `score` are kept in `extra`, stored, and take part in equality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<ScoreValue>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ScoreEntry {
    #[cfg(test)]
    pub fn new(kind: &str, score: f64) -> Self {
        Self {
            kind: Some(kind.to_string()),
            score: Number::from_f64(score).map(ScoreValue::Numeric),
            extra: Map::new(),
        }
    }

    pub fn numeric_score(&self) -> Option<f64> {
        self.score.as_ref().and_then(ScoreValue::as_f64)
    }

    pub fn category(&self) -> Option<Category> {
        self.kind.as_deref().and_then(Category::from_type)
    }

    pub fn from_json(raw: Value) -> Result<Self> {
        if !raw.is_object() {
            return Err(GradeError::invalid_record("score entry must be an object"));
        }
        serde_json::from_value(raw).map_err(|e| GradeError::invalid_record(e.to_string()))
    }
}

/// Score categories recognised by the weighted average. The store itself
/// accepts any `type` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Exam,
    Quiz,
    Homework,
}

impl Category {
    pub fn from_type(raw: &str) -> Option<Self> {
        match raw {
            "exam" => Some(Self::Exam),
            "quiz" => Some(Self::Quiz),
            "homework" => Some(Self::Homework),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exam => "exam",
            Self::Quiz => "quiz",
            Self::Homework => "homework",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeRecord {
    pub id: RecordId,
    pub learner_id: i64,
    pub class_id: i64,
    pub scores: Vec<ScoreEntry>,
}

/// Record body as received on insert, before an id is assigned.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewGradeRecord {
    pub learner_id: i64,
    pub class_id: i64,
    #[serde(default)]
    pub scores: Vec<ScoreEntry>,
}

impl NewGradeRecord {
    /// Parses an insert body. A `student_id` key is renamed to `learner_id`
    /// and the legacy key is dropped.
    pub fn from_json(raw: Value) -> Result<Self> {
        let Value::Object(mut obj) = raw else {
            return Err(GradeError::invalid_record("record must be an object"));
        };
        if let Some(legacy) = obj.remove(LEGACY_LEARNER_KEY) {
            if !legacy.is_null() {
                obj.insert(LEARNER_KEY.to_string(), legacy);
            }
        }
        serde_json::from_value(Value::Object(obj))
            .map_err(|e| GradeError::invalid_record(e.to_string()))
    }

    pub fn into_record(self, id: RecordId) -> GradeRecord {
        GradeRecord {
            id,
            learner_id: self.learner_id,
            class_id: self.class_id,
            scores: self.scores,
        }
    }
}
