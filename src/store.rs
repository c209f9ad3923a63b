use crate::error::{GradeError, Result};
use crate::model::{GradeRecord, NewGradeRecord, ScoreEntry};
use crate::pipeline::{ClassWeightedAverage, WeightedPipeline};
use crate::validate::RecordId;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};

/// Persistence for grade records over an explicitly opened connection.
///
/// Every read goes straight to SQLite, so a mutation is visible to the
/// next call. Multi-record reads come back in insertion order.
#[derive(Debug, Clone, Copy)]
pub struct GradeStore<'a> {
    conn: &'a Connection,
}

const SELECT_GRADES: &str = "SELECT id, learner_id, class_id, scores FROM grades";

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<(String, i64, i64, String)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn decode_record(raw: (String, i64, i64, String)) -> Result<GradeRecord> {
    let (id, learner_id, class_id, scores) = raw;
    Ok(GradeRecord {
        id: RecordId::parse(&id)?,
        learner_id,
        class_id,
        scores: serde_json::from_str(&scores)?,
    })
}

impl<'a> GradeStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn get_by_id(&self, id: &RecordId) -> Result<Option<GradeRecord>> {
        let raw = self
            .conn
            .query_row(
                &format!("{SELECT_GRADES} WHERE id = ?"),
                [id.as_str()],
                row_to_record,
            )
            .optional()?;
        raw.map(decode_record).transpose()
    }

    pub fn get_by_learner(&self, learner_id: i64, class_id: Option<i64>) -> Result<Vec<GradeRecord>> {
        self.find(learner_id, "learner_id", class_id, "class_id")
    }

    pub fn get_by_class(&self, class_id: i64, learner_id: Option<i64>) -> Result<Vec<GradeRecord>> {
        self.find(class_id, "class_id", learner_id, "learner_id")
    }

    fn find(
        &self,
        key: i64,
        key_col: &str,
        narrow: Option<i64>,
        narrow_col: &str,
    ) -> Result<Vec<GradeRecord>> {
        let mut sql = format!("{SELECT_GRADES} WHERE {key_col} = ?");
        let mut bind = vec![Value::Integer(key)];
        if let Some(n) = narrow {
            sql.push_str(&format!(" AND {narrow_col} = ?"));
            bind.push(Value::Integer(n));
        }
        sql.push_str(" ORDER BY rowid");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(bind), row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(decode_record).collect()
    }

    pub fn count_all(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM grades", [], |r| r.get(0))?)
    }

    pub fn insert(&self, new: NewGradeRecord) -> Result<GradeRecord> {
        let record = new.into_record(RecordId::generate());
        let scores = serde_json::to_string(&record.scores)?;
        self.conn.execute(
            "INSERT INTO grades(id, learner_id, class_id, scores, created_at)
             VALUES(?, ?, ?, ?, ?)",
            (
                record.id.as_str(),
                record.learner_id,
                record.class_id,
                &scores,
                chrono::Utc::now().to_rfc3339(),
            ),
        )?;
        tracing::debug!(id = %record.id, learner_id = record.learner_id, class_id = record.class_id, "grade entry inserted");
        Ok(record)
    }

    /// Appends `entry` to the record's scores. Zero means the id did not resolve.
    pub fn push_score(&self, id: &RecordId, entry: &ScoreEntry) -> Result<usize> {
        let entry_json = serde_json::to_string(entry)?;
        let modified = self.conn.execute(
            "UPDATE grades SET scores = json_insert(scores, '$[#]', json(?)) WHERE id = ?",
            (&entry_json, id.as_str()),
        )?;
        tracing::debug!(%id, modified, "score pushed");
        Ok(modified)
    }

    /// Removes every entry structurally equal to `matcher`. Zero means the
    /// record is missing or nothing matched; scores are then left untouched.
    pub fn pull_score(&self, id: &RecordId, matcher: &ScoreEntry) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let current: Option<String> = tx
            .query_row("SELECT scores FROM grades WHERE id = ?", [id.as_str()], |r| {
                r.get(0)
            })
            .optional()?;
        let Some(current) = current else {
            return Ok(0);
        };

        let scores: Vec<ScoreEntry> = serde_json::from_str(&current)?;
        let before = scores.len();
        let kept: Vec<ScoreEntry> = scores.into_iter().filter(|s| s != matcher).collect();
        if kept.len() == before {
            return Ok(0);
        }

        let modified = tx.execute(
            "UPDATE grades SET scores = ? WHERE id = ?",
            (serde_json::to_string(&kept)?, id.as_str()),
        )?;
        tx.commit()?;
        tracing::debug!(%id, removed = before - kept.len(), "score pulled");
        Ok(modified)
    }

    /// Moves every record of `old_class` to `new_class` in one statement.
    /// Records already in `new_class` do not count as modified.
    pub fn reassign_class(&self, old_class: i64, new_class: i64) -> Result<usize> {
        let modified = self.conn.execute(
            "UPDATE grades SET class_id = ?2 WHERE class_id = ?1 AND class_id <> ?2",
            (old_class, new_class),
        )?;
        tracing::debug!(old_class, new_class, modified, "class reassigned");
        Ok(modified)
    }

    pub fn delete_by_id(&self, id: &RecordId) -> Result<usize> {
        let deleted = self
            .conn
            .execute("DELETE FROM grades WHERE id = ?", [id.as_str()])?;
        tracing::debug!(%id, deleted, "grade entry deleted");
        Ok(deleted)
    }

    pub fn delete_by_learner(&self, learner_id: i64) -> Result<usize> {
        let deleted = self
            .conn
            .execute("DELETE FROM grades WHERE learner_id = ?", [learner_id])?;
        tracing::debug!(learner_id, deleted, "learner grade entries deleted");
        Ok(deleted)
    }

    pub fn delete_by_class(&self, class_id: i64) -> Result<usize> {
        let deleted = self
            .conn
            .execute("DELETE FROM grades WHERE class_id = ?", [class_id])?;
        tracing::debug!(class_id, deleted, "class grade entries deleted");
        Ok(deleted)
    }

    /// Executes a weighted pipeline inside SQLite without materialising the
    /// learner's records here.
    pub fn aggregate(&self, pipeline: &WeightedPipeline) -> Result<Vec<ClassWeightedAverage>> {
        let (sql, bind) = pipeline.to_sql();
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(bind), |r| {
                Ok(ClassWeightedAverage {
                    class_id: r.get(0)?,
                    avg: r.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Like `get_by_id`, but a missing record is an error.
    pub fn require(&self, id: &RecordId) -> Result<GradeRecord> {
        self.get_by_id(id)?
            .ok_or_else(|| GradeError::not_found("grade entry"))
    }
}
