//! Database schema for the hosted (libSQL/Turso) storage adapter.

pub const CREATE_TRACES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS traces (
    id TEXT PRIMARY KEY NOT NULL,
    task TEXT NOT NULL,
    workspace_id TEXT NOT NULL,
    outcome TEXT NOT NULL,
    timestamp_unix INTEGER NOT NULL,
    payload TEXT NOT NULL
)
"#;

pub const CREATE_MEMORIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS memories (
    id TEXT PRIMARY KEY NOT NULL,
    workspace_id TEXT NOT NULL,
    domain_category TEXT NOT NULL,
    has_error_context INTEGER NOT NULL,
    created_at_unix INTEGER NOT NULL,
    payload TEXT NOT NULL
)
"#;

pub const CREATE_TRACES_WORKSPACE_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_traces_workspace ON traces(workspace_id)
"#;

pub const CREATE_MEMORIES_WORKSPACE_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_memories_workspace ON memories(workspace_id)
"#;
