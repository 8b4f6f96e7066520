//! SQLite backend.
//!
//! One database file holds the whole key space in the `kv` table. The
//! connection is configured the same way on every open so that replicas
//! running on different hosts behave identically.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension, Rows};

use crate::{migrations, prefix_end, KvStore, Order, Result, Visitor};

/// Store backed by a single SQLite connection.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open or create the store at the given path.
    ///
    /// Configures WAL mode and runs any pending migrations.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        configure(&conn)?;
        migrations::run(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory store (for testing).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        configure(&conn)?;
        migrations::run(&conn)?;
        Ok(Self { conn })
    }

    /// Borrow the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Configure SQLite pragmas.
fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;
         PRAGMA cache_size = -8000;",
    )?;
    Ok(())
}

fn drive(mut rows: Rows<'_>, visit: Visitor<'_>) -> Result<()> {
    while let Some(row) = rows.next()? {
        let key: Vec<u8> = row.get(0)?;
        let value: Vec<u8> = row.get(1)?;
        if visit(&key, &value)?.is_break() {
            break;
        }
    }
    Ok(())
}

impl KvStore for SqliteStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.conn.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(())
    }

    fn walk(&self, prefix: &[u8], order: Order, visit: Visitor<'_>) -> Result<()> {
        let direction = match order {
            Order::Ascending => "ASC",
            Order::Descending => "DESC",
        };

        match prefix_end(prefix) {
            Some(end) => {
                let sql = format!(
                    "SELECT key, value FROM kv WHERE key >= ?1 AND key < ?2 ORDER BY key {direction}"
                );
                let mut stmt = self.conn.prepare_cached(&sql)?;
                let rows = stmt.query(params![prefix, end])?;
                drive(rows, visit)
            }
            None => {
                let sql =
                    format!("SELECT key, value FROM kv WHERE key >= ?1 ORDER BY key {direction}");
                let mut stmt = self.conn.prepare_cached(&sql)?;
                let rows = stmt.query([prefix])?;
                drive(rows, visit)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::ops::ControlFlow;

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::MemStore;

    fn keys(store: &dyn KvStore, prefix: &[u8], order: Order) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        store
            .walk(prefix, order, &mut |key: &[u8], _: &[u8]| -> Result<ControlFlow<()>> {
                out.push(key.to_vec());
                Ok(ControlFlow::Continue(()))
            })
            .expect("walk");
        out
    }

    #[test]
    fn test_set_get_delete() {
        let mut store = SqliteStore::open_memory().expect("open");
        assert_eq!(store.get(b"k").expect("get"), None);

        store.set(b"k", b"one").expect("set");
        store.set(b"k", b"two").expect("overwrite");
        assert_eq!(store.get(b"k").expect("get"), Some(b"two".to_vec()));

        store.delete(b"k").expect("delete");
        assert!(!store.has(b"k").expect("has"));
    }

    #[test]
    fn test_ordering_matches_memory_backend() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut mem = MemStore::new();
        let mut sql = SqliteStore::open_memory().expect("open");

        for _ in 0..200 {
            let len = rng.gen_range(1..6);
            let key: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
            mem.set(&key, b"x").expect("set mem");
            sql.set(&key, b"x").expect("set sqlite");
        }

        let prefixes: [&[u8]; 4] = [&[], &[0x00], &[0x7f], &[0xff]];
        for prefix in prefixes {
            for order in [Order::Ascending, Order::Descending] {
                assert_eq!(keys(&mem, prefix, order), keys(&sql, prefix, order));
            }
        }
    }

    #[test]
    fn test_walk_high_byte_prefix() {
        let mut store = SqliteStore::open_memory().expect("open");
        store.set(&[0xff, 0x01], b"a").expect("set");
        store.set(&[0xff, 0xff], b"b").expect("set");
        store.set(&[0xfe], b"c").expect("set");

        let found = keys(&store, &[0xff], Order::Ascending);
        assert_eq!(found, vec![vec![0xff, 0x01], vec![0xff, 0xff]]);
    }

    #[test]
    fn test_reopen_persists() {
        let dir = std::env::temp_dir().join(format!("tessera-store-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("mkdir");
        let path = dir.join("state.db");
        let _ = std::fs::remove_file(&path);

        {
            let mut store = SqliteStore::open(&path).expect("open");
            store.set(b"persist", b"yes").expect("set");
        }
        let store = SqliteStore::open(&path).expect("reopen");
        assert_eq!(store.get(b"persist").expect("get"), Some(b"yes".to_vec()));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
