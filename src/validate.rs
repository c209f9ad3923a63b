use crate::error::{GradeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

const IDENTIFIER_LEN: usize = 24;

/// True iff `s` is exactly 24 lowercase hex characters.
pub fn is_valid_identifier(s: &str) -> bool {
    s.len() == IDENTIFIER_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Opaque grade record id. Only constructible from a string that passed
/// `is_valid_identifier`, so id-keyed store calls never see malformed input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordId(String);

impl RecordId {
    pub fn parse(raw: &str) -> Result<Self> {
        if is_valid_identifier(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(GradeError::malformed_identifier(raw))
        }
    }

    /// ObjectId-shaped: 8 hex digits of unix seconds, then 16 random hex digits.
    pub fn generate() -> Self {
        let secs = chrono::Utc::now().timestamp() as u32;
        let random = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("{:08x}{}", secs, &random[..16]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RecordId {
    type Error = GradeError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<RecordId> for String {
    fn from(value: RecordId) -> Self {
        value.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of reading a learner/class id parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedParam {
    Valid(i64),
    Invalid(serde_json::Value),
}

impl ParsedParam {
    /// Integer JSON numbers and decimal integer strings are accepted.
    pub fn from_json(raw: &serde_json::Value) -> Self {
        if let Some(n) = raw.as_i64() {
            return Self::Valid(n);
        }
        if let Some(n) = raw.as_f64() {
            if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                return Self::Valid(n as i64);
            }
        }
        if let Some(s) = raw.as_str() {
            if let Ok(n) = s.trim().parse::<i64>() {
                return Self::Valid(n);
            }
        }
        Self::Invalid(raw.clone())
    }

    /// Malformed numeric parameters are a client error, never an empty match.
    pub fn require(self, param: &'static str) -> Result<i64> {
        match self {
            Self::Valid(n) => Ok(n),
            Self::Invalid(raw) => Err(GradeError::InvalidNumericParameter { param, raw }),
        }
    }
}
