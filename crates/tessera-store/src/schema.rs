//! SQL schema definitions.

/// Schema v1: a single ordered key-value table.
///
/// `WITHOUT ROWID` stores rows clustered by primary key, and BLOB keys
/// compare with `memcmp`, so `ORDER BY key` matches the byte ordering of
/// the in-memory backend.
pub const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS kv (
    key BLOB PRIMARY KEY NOT NULL,
    value BLOB NOT NULL
) WITHOUT ROWID;
"#;
