//! SQLite-backed feedbag store.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{Connection, OptionalExtension, params};

use super::{Blocked, FeedbagStore, StoreError, schema};
use oscar_proto::snacs::feedbag::FeedbagItem;
use oscar_proto::tlv::{TlvLBlock, TlvRestBlock};
use oscar_proto::wire::{from_bytes, to_bytes};

/// Buddies/interested-users with both directions of the block relation
/// filtered out in SQL.
const INTERESTED_USERS_SQL: &str = "
SELECT DISTINCT f.screen_name FROM feedbag f
WHERE f.class_id = 0 AND f.name = ?1
AND NOT EXISTS (
    SELECT 1 FROM feedbag b
    WHERE b.class_id = 3
    AND ((b.screen_name = f.screen_name AND b.name = ?1)
      OR (b.screen_name = ?1 AND b.name = f.screen_name))
)";

const BUDDIES_SQL: &str = "
SELECT DISTINCT f.name FROM feedbag f
WHERE f.screen_name = ?1 AND f.class_id = 0
AND NOT EXISTS (
    SELECT 1 FROM feedbag b
    WHERE b.class_id = 3
    AND ((b.screen_name = ?1 AND b.name = f.name)
      OR (b.screen_name = f.name AND b.name = ?1))
)";

fn epoch_now() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64
}

/// Feedbag store over one SQLite connection. Clones share the connection;
/// the mutex serializes access, and each public call is one transaction.
#[derive(Clone)]
pub struct SqliteFeedbagStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteFeedbagStore {
    /// Opens (creating if needed) the database at `path` and applies the
    /// schema.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(schema::CREATE_TABLES)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(schema::CREATE_TABLES)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    #[allow(clippy::expect_used)]
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("feedbag connection lock poisoned")
    }
}

fn attributes_blob(item: &FeedbagItem) -> Result<Vec<u8>, StoreError> {
    // Stored as a plain rest-block; the wire length prefix is re-derived on
    // the way out
    let rest = TlvRestBlock::from(item.attributes.tlvs.clone());
    Ok(to_bytes(&rest)?.to_vec())
}

impl FeedbagStore for SqliteFeedbagStore {
    fn upsert_user(&self, screen_name: &str) -> Result<(), StoreError> {
        self.lock().execute(
            "INSERT OR IGNORE INTO user (screen_name) VALUES (?1)",
            params![screen_name],
        )?;
        Ok(())
    }

    fn upsert(&self, screen_name: &str, items: &[FeedbagItem]) -> Result<(), StoreError> {
        let now = epoch_now();
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO feedbag
                 (screen_name, group_id, item_id, class_id, name, attributes, last_modified)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for item in items {
                let blob = attributes_blob(item)?;
                stmt.execute(params![
                    screen_name,
                    item.group_id,
                    item.item_id,
                    item.class_id,
                    item.name,
                    blob,
                    now
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn delete(&self, screen_name: &str, items: &[FeedbagItem]) -> Result<(), StoreError> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "DELETE FROM feedbag WHERE screen_name = ?1 AND item_id = ?2",
            )?;
            for item in items {
                stmt.execute(params![screen_name, item.item_id])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn retrieve(&self, screen_name: &str) -> Result<Vec<FeedbagItem>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT name, group_id, item_id, class_id, attributes
             FROM feedbag WHERE screen_name = ?1
             ORDER BY group_id, item_id",
        )?;
        let rows = stmt.query_map(params![screen_name], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u16>(1)?,
                row.get::<_, u16>(2)?,
                row.get::<_, u16>(3)?,
                row.get::<_, Option<Vec<u8>>>(4)?,
            ))
        })?;

        let mut items = Vec::new();
        for row in rows {
            let (name, group_id, item_id, class_id, blob) = row?;
            let rest: TlvRestBlock = match blob {
                Some(blob) => from_bytes(&blob)?,
                None => TlvRestBlock::new(),
            };
            items.push(FeedbagItem {
                name,
                group_id,
                item_id,
                class_id,
                attributes: TlvLBlock::from(rest.tlvs),
            });
        }
        Ok(items)
    }

    fn last_modified(&self, screen_name: &str) -> Result<u32, StoreError> {
        let newest: i64 = self.lock().query_row(
            "SELECT IFNULL(MAX(last_modified), 0) FROM feedbag WHERE screen_name = ?1",
            params![screen_name],
            |row| row.get(0),
        )?;
        Ok(newest.clamp(0, i64::from(u32::MAX)) as u32)
    }

    fn interested_users(&self, screen_name: &str) -> Result<Vec<String>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(INTERESTED_USERS_SQL)?;
        let rows = stmt.query_map(params![screen_name], |row| row.get::<_, String>(0))?;
        let mut names = Vec::new();
        for row in rows {
            names.push(row?);
        }
        Ok(names)
    }

    fn buddies(&self, screen_name: &str) -> Result<Vec<String>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(BUDDIES_SQL)?;
        let rows = stmt.query_map(params![screen_name], |row| row.get::<_, String>(0))?;
        let mut names = Vec::new();
        for row in rows {
            names.push(row?);
        }
        Ok(names)
    }

    fn blocked(&self, sn1: &str, sn2: &str) -> Result<Blocked, StoreError> {
        let (a, b): (bool, bool) = self.lock().query_row(
            "SELECT
                EXISTS(SELECT 1 FROM feedbag
                       WHERE screen_name = ?1 AND class_id = 3 AND name = ?2),
                EXISTS(SELECT 1 FROM feedbag
                       WHERE screen_name = ?2 AND class_id = 3 AND name = ?1)",
            params![sn1, sn2],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(if a {
            Blocked::A
        } else if b {
            Blocked::B
        } else {
            Blocked::No
        })
    }

    fn retrieve_profile(&self, screen_name: &str) -> Result<String, StoreError> {
        let conn = self.lock();
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM user WHERE screen_name = ?1)",
            params![screen_name],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(StoreError::UserNotFound(screen_name.to_string()));
        }
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM profile WHERE screen_name = ?1",
                params![screen_name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(body.unwrap_or_default())
    }

    fn upsert_profile(&self, screen_name: &str, body: &str) -> Result<(), StoreError> {
        self.lock().execute(
            "INSERT OR REPLACE INTO profile (screen_name, body) VALUES (?1, ?2)",
            params![screen_name, body],
        )?;
        Ok(())
    }
}
