use anyhow::Context;
use rusqlite::Connection;
use std::path::Path;

pub const DB_FILE: &str = "grades.sqlite3";

/// Lookup indexes over the learner/class fields. Performance only; every
/// query is correct without them.
const GRADE_INDEXES: [(&str, &str); 3] = [
    ("idx_grades_class", "class_id"),
    ("idx_grades_learner", "learner_id"),
    ("idx_grades_learner_class", "learner_id, class_id"),
];

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace).with_context(|| {
        format!(
            "failed to create workspace {}",
            workspace.to_string_lossy()
        )
    })?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.to_string_lossy()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    // scores holds a JSON array of {type, score} entries.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS grades(
            id TEXT PRIMARY KEY,
            learner_id INTEGER NOT NULL,
            class_id INTEGER NOT NULL,
            scores TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

/// Idempotent, best-effort. Failures are logged and skipped; returns the
/// names of the indexes that are in place afterwards.
pub fn ensure_indexes(conn: &Connection) -> Vec<String> {
    let mut ensured = Vec::new();
    for (name, columns) in GRADE_INDEXES {
        let sql = format!("CREATE INDEX IF NOT EXISTS {name} ON grades({columns})");
        match conn.execute(&sql, []) {
            Ok(_) => ensured.push(name.to_string()),
            Err(e) => tracing::warn!(index = name, error = %e, "index creation failed, continuing"),
        }
    }
    tracing::info!(count = ensured.len(), "grade indexes ensured");
    ensured
}

#[cfg(test)]
pub fn open_in_memory() -> Connection {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    init_schema(&conn).expect("init schema");
    ensure_indexes(&conn);
    conn
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = 'grades' AND name LIKE 'idx_%' ORDER BY name")
            .expect("prepare");
        stmt.query_map([], |r| r.get(0))
            .expect("query")
            .collect::<Result<Vec<String>, _>>()
            .expect("collect")
    }

    #[test]
    fn ensure_indexes_is_idempotent() {
        let conn = open_in_memory();
        let again = ensure_indexes(&conn);
        assert_eq!(again.len(), 3);
        assert_eq!(
            index_names(&conn),
            vec![
                "idx_grades_class".to_string(),
                "idx_grades_learner".to_string(),
                "idx_grades_learner_class".to_string(),
            ]
        );
    }

    #[test]
    fn missing_table_does_not_abort_index_step() {
        let conn = Connection::open_in_memory().expect("open");
        assert!(ensure_indexes(&conn).is_empty());
    }
}
