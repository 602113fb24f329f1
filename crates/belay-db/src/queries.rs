use crate::Database;
use crate::models::{ChannelRow, MessageRow, ReplyRow, UserRow, parse_sent_time};
use anyhow::Result;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};
use tracing::debug;

impl Database {
    // -- Users --

    /// Insert a user. Returns `None` if the name is already taken.
    pub fn create_user(&self, name: &str, password_hash: &str) -> Result<Option<i64>> {
        let id = self.with_tx(|tx| {
            let inserted = tx.execute(
                "INSERT INTO users (name, password_hash) VALUES (?1, ?2)",
                params![name, password_hash],
            );
            if is_unique_violation(&inserted) {
                return Ok(None);
            }
            inserted?;
            Ok(Some(tx.last_insert_rowid()))
        })?;

        if let Some(id) = id {
            debug!("Created user {} ({})", id, name);
        }
        Ok(id)
    }

    pub fn get_user_by_name(&self, name: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, name, password_hash FROM users WHERE name = ?1",
                    [name],
                    |row| {
                        Ok(UserRow {
                            id: row.get(0)?,
                            name: row.get(1)?,
                            password_hash: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    // -- Channels --

    /// Insert a channel. Returns `None` if the name is already taken.
    pub fn create_channel(&self, name: &str) -> Result<Option<i64>> {
        let id = self.with_tx(|tx| {
            let inserted = tx.execute("INSERT INTO channels (name) VALUES (?1)", [name]);
            if is_unique_violation(&inserted) {
                return Ok(None);
            }
            inserted?;
            Ok(Some(tx.last_insert_rowid()))
        })?;

        if let Some(id) = id {
            debug!("Created channel {} ({})", id, name);
        }
        Ok(id)
    }

    pub fn list_channels(&self) -> Result<Vec<ChannelRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM channels ORDER BY name ASC")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(ChannelRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_channel_name(&self, id: i64) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let name = conn
                .query_row("SELECT name FROM channels WHERE id = ?1", [id], |row| row.get(0))
                .optional()?;
            Ok(name)
        })
    }

    // -- Messages --

    /// Append a message. Returns `None` if the channel or the author does not
    /// exist. `sent_time` comes from the store clock.
    pub fn insert_message(&self, channel_id: i64, user_id: i64, body: &str) -> Result<Option<i64>> {
        let id = self.with_tx(|tx| {
            if !exists(tx, "SELECT 1 FROM channels WHERE id = ?1", channel_id)?
                || !exists(tx, "SELECT 1 FROM users WHERE id = ?1", user_id)?
            {
                return Ok(None);
            }

            tx.execute(
                "INSERT INTO messages (body, user_id, channel_id) VALUES (?1, ?2, ?3)",
                params![body, user_id, channel_id],
            )?;
            Ok(Some(tx.last_insert_rowid()))
        })?;

        if let Some(id) = id {
            debug!("Wrote message {} to channel {}", id, channel_id);
        }
        Ok(id)
    }

    /// Messages of a channel in insertion order.
    pub fn messages_for_channel(&self, channel_id: i64) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, channel_id, user_id, user_name, body, sent_time
                 FROM v_messages
                 WHERE channel_id = ?1
                 ORDER BY id ASC",
            )?;
            let rows = stmt
                .query_map([channel_id], message_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Replies --

    /// Append a reply. Returns `None` if the message or the user does not exist.
    pub fn insert_reply(&self, msg_id: i64, user_id: i64, body: &str) -> Result<Option<i64>> {
        let id = self.with_tx(|tx| {
            if !exists(tx, "SELECT 1 FROM messages WHERE id = ?1", msg_id)?
                || !exists(tx, "SELECT 1 FROM users WHERE id = ?1", user_id)?
            {
                return Ok(None);
            }

            tx.execute(
                "INSERT INTO replies (body, msg_id, user_id) VALUES (?1, ?2, ?3)",
                params![body, msg_id, user_id],
            )?;
            Ok(Some(tx.last_insert_rowid()))
        })?;

        if let Some(id) = id {
            debug!("Wrote reply {} to message {}", id, msg_id);
        }
        Ok(id)
    }

    /// Replies to a message in insertion order.
    pub fn replies_for_message(&self, msg_id: i64) -> Result<Vec<ReplyRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_name, body, sent_time
                 FROM v_replies
                 WHERE msg_id = ?1
                 ORDER BY id ASC",
            )?;
            let rows = stmt
                .query_map([msg_id], reply_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn exists(conn: &Connection, sql: &str, id: i64) -> Result<bool> {
    let found: Option<i64> = conn.query_row(sql, [id], |row| row.get(0)).optional()?;
    Ok(found.is_some())
}

fn is_unique_violation<T>(result: &rusqlite::Result<T>) -> bool {
    matches!(
        result,
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn message_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    let sent_time: String = row.get(5)?;
    Ok(MessageRow {
        id: row.get(0)?,
        channel_id: row.get(1)?,
        user_id: row.get(2)?,
        user_name: row.get(3)?,
        body: row.get(4)?,
        sent_time: parse_sent_time(&sent_time),
    })
}

fn reply_row(row: &Row<'_>) -> rusqlite::Result<ReplyRow> {
    let sent_time: String = row.get(3)?;
    Ok(ReplyRow {
        id: row.get(0)?,
        user_name: row.get(1)?,
        body: row.get(2)?,
        sent_time: parse_sent_time(&sent_time),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn db_with_user_and_channel() -> (Database, i64, i64) {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user("ada", "hash").unwrap().unwrap();
        let channel = db.create_channel("general").unwrap().unwrap();
        (db, user, channel)
    }

    #[test]
    fn duplicate_user_name_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        let first = db.create_user("ada", "h1").unwrap();
        let second = db.create_user("ada", "h2").unwrap();

        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(db.get_user_by_name("ada").unwrap().unwrap().password_hash, "h1");
    }

    #[test]
    fn user_names_are_case_sensitive() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.create_user("ada", "h").unwrap().is_some());
        assert!(db.create_user("Ada", "h").unwrap().is_some());
    }

    #[test]
    fn user_ids_are_monotonic() {
        let db = Database::open_in_memory().unwrap();
        let a = db.create_user("a", "h").unwrap().unwrap();
        let b = db.create_user("b", "h").unwrap().unwrap();
        assert!(b > a);
    }

    #[test]
    fn channels_listed_by_name() {
        let db = Database::open_in_memory().unwrap();
        db.create_channel("zeta").unwrap();
        db.create_channel("Alpha").unwrap();
        db.create_channel("beta").unwrap();

        let names: Vec<String> = db.list_channels().unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Alpha", "beta", "zeta"]);
    }

    #[test]
    fn duplicate_channel_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.create_channel("general").unwrap().is_some());
        assert!(db.create_channel("general").unwrap().is_none());
        assert_eq!(db.list_channels().unwrap().len(), 1);
    }

    #[test]
    fn channel_name_lookup() {
        let (db, _, channel) = db_with_user_and_channel();
        assert_eq!(db.get_channel_name(channel).unwrap().as_deref(), Some("general"));
        assert_eq!(db.get_channel_name(channel + 100).unwrap(), None);
    }

    #[test]
    fn message_requires_existing_channel_and_author() {
        let (db, user, channel) = db_with_user_and_channel();
        assert!(db.insert_message(channel + 1, user, "hi").unwrap().is_none());
        assert!(db.insert_message(channel, user + 1, "hi").unwrap().is_none());
        assert!(db.messages_for_channel(channel).unwrap().is_empty());
    }

    #[test]
    fn messages_come_back_in_insertion_order() {
        let (db, user, channel) = db_with_user_and_channel();
        let other = db.create_channel("random").unwrap().unwrap();

        let first = db.insert_message(channel, user, "one").unwrap().unwrap();
        db.insert_message(other, user, "elsewhere").unwrap().unwrap();
        let second = db.insert_message(channel, user, "two").unwrap().unwrap();

        let rows = db.messages_for_channel(channel).unwrap();
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![first, second]);
        assert!(rows[0].sent_time <= rows[1].sent_time);
        assert!(rows.iter().all(|r| r.channel_id == channel && r.user_name == "ada"));
    }

    #[test]
    fn message_body_is_stored_verbatim() {
        let (db, user, channel) = db_with_user_and_channel();
        let body = r#"it's "quoted"'); DROP TABLE messages; --"#;
        db.insert_message(channel, user, body).unwrap().unwrap();

        let rows = db.messages_for_channel(channel).unwrap();
        assert_eq!(rows[0].body, body);
    }

    #[test]
    fn replies_thread_under_their_message() {
        let (db, user, channel) = db_with_user_and_channel();
        let msg = db.insert_message(channel, user, "root").unwrap().unwrap();
        let other = db.insert_message(channel, user, "other").unwrap().unwrap();

        let r1 = db.insert_reply(msg, user, "first").unwrap().unwrap();
        db.insert_reply(other, user, "noise").unwrap().unwrap();
        let r2 = db.insert_reply(msg, user, "second").unwrap().unwrap();

        let rows = db.replies_for_message(msg).unwrap();
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![r1, r2]);
        let bodies: Vec<&str> = rows.iter().map(|r| r.body.as_str()).collect();
        assert_eq!(bodies, vec!["first", "second"]);
        assert!(rows.iter().all(|r| r.user_name == "ada"));
    }

    #[test]
    fn reply_requires_existing_message() {
        let (db, user, _) = db_with_user_and_channel();
        assert!(db.insert_reply(42, user, "orphan").unwrap().is_none());
        assert!(db.replies_for_message(42).unwrap().is_empty());
    }

    #[test]
    fn file_backed_readers_see_committed_writes() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("belay.db"), Duration::from_secs(1)).unwrap();

        let user = db.create_user("ada", "hash").unwrap().unwrap();
        let channel = db.create_channel("general").unwrap().unwrap();
        db.insert_message(channel, user, "hello").unwrap().unwrap();

        // Round-robin across every reader at least once.
        for _ in 0..8 {
            assert_eq!(db.get_user_by_name("ada").unwrap().unwrap().id, user);
            assert_eq!(db.messages_for_channel(channel).unwrap().len(), 1);
        }
    }

    #[test]
    fn concurrent_writers_read_back_their_own_ids() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 25;

        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(Database::open(&dir.path().join("belay.db"), Duration::from_secs(10)).unwrap());
        let author = db.create_user("ada", "hash").unwrap().unwrap();
        let channel = db.create_channel("general").unwrap().unwrap();

        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let db = db.clone();
                thread::spawn(move || {
                    let user = db.create_user(&format!("user-{}", t), "hash").unwrap().unwrap();
                    let messages: Vec<(i64, String)> = (0..PER_THREAD)
                        .map(|i| {
                            let body = format!("t{}-m{}", t, i);
                            let id = db.insert_message(channel, author, &body).unwrap().unwrap();
                            (id, body)
                        })
                        .collect();
                    (t, user, messages)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let stored: HashMap<i64, String> = db
            .messages_for_channel(channel)
            .unwrap()
            .into_iter()
            .map(|row| (row.id, row.body))
            .collect();
        assert_eq!(stored.len(), THREADS * PER_THREAD);

        for (t, user, messages) in results {
            let row = db.get_user_by_name(&format!("user-{}", t)).unwrap().unwrap();
            assert_eq!(row.id, user);
            for (id, body) in messages {
                assert_eq!(stored.get(&id), Some(&body));
            }
        }
    }
}
