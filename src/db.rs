use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

pub const DB_FILE_NAME: &str = "rosterd.sqlite3";
pub const SCHEMA_VERSION: i64 = 2;

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS documents(
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            body TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY(collection, id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    // v1 workspaces stored student status as a boolean flag.
    migrate_student_statuses(&conn)?;
    settings_set_json(&conn, "schema.version", &serde_json::json!(SCHEMA_VERSION))?;

    Ok(conn)
}

fn migrate_student_statuses(conn: &Connection) -> anyhow::Result<usize> {
    let n = conn.execute(
        "UPDATE documents
         SET body = json_set(
           body,
           '$.status',
           CASE json_type(body, '$.status') WHEN 'true' THEN 'active' ELSE 'inactive' END
         )
         WHERE collection = 'students'
           AND json_type(body, '$.status') IN ('true', 'false')",
        [],
    )?;
    if n > 0 {
        tracing::info!(migrated = n, "converted boolean student statuses");
    }
    Ok(n)
}

pub fn settings_get_json(
    conn: &Connection,
    key: &str,
) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    Ok(match raw {
        Some(s) => Some(serde_json::from_str(&s)?),
        None => None,
    })
}

pub fn settings_set_json(
    conn: &Connection,
    key: &str,
    value: &serde_json::Value,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, serde_json::to_string(value)?),
    )?;
    Ok(())
}
