/// MIGRATION 0001: durable key/value slots.
pub const MIGRATION_0001: &str = r#"
-- Slots Table: one serialized document per key (state blob, language preference, ...).
CREATE TABLE IF NOT EXISTS slots (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL,
    updated_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
);
"#;
