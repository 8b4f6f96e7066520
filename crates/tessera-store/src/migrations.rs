//! Database migration system.
//!
//! Schema version stored in `PRAGMA user_version`. Migrations are forward-only;
//! key encodings must never change in a migration, since iteration order is
//! consensus-relevant.

use rusqlite::Connection;

use crate::{schema, Result, StoreError, SCHEMA_VERSION};

/// Run all pending migrations.
pub fn run(conn: &Connection) -> Result<()> {
    let current_version: u32 =
        conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if current_version == 0 {
        tracing::info!("Initializing store schema v{SCHEMA_VERSION}");
        conn.execute_batch(schema::SCHEMA_V1)?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    } else if current_version > SCHEMA_VERSION {
        return Err(StoreError::Migration(format!(
            "store version {current_version} is newer than supported {SCHEMA_VERSION}"
        )));
    }

    Ok(())
}
