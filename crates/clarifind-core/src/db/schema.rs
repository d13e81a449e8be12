//! SQLite schema definition.

/// Complete database schema for clarifind.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Local Storage (key -> serialized document)
-- ============================================================================

CREATE TABLE IF NOT EXISTS local_storage (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,                         -- JSON document, rewritten whole
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;
