use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE users (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                name            TEXT NOT NULL UNIQUE CHECK (length(name) > 0),
                password_hash   TEXT NOT NULL
            );

            CREATE TABLE channels (
                id      INTEGER PRIMARY KEY AUTOINCREMENT,
                name    TEXT NOT NULL UNIQUE CHECK (length(name) > 0)
            );

            CREATE TABLE messages (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                body        TEXT NOT NULL,
                sent_time   TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
                user_id     INTEGER NOT NULL REFERENCES users(id),
                channel_id  INTEGER NOT NULL REFERENCES channels(id)
            );

            CREATE INDEX idx_messages_channel ON messages(channel_id, id);

            CREATE TABLE replies (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                body        TEXT NOT NULL,
                sent_time   TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
                msg_id      INTEGER NOT NULL REFERENCES messages(id),
                user_id     INTEGER NOT NULL REFERENCES users(id)
            );

            CREATE INDEX idx_replies_message ON replies(msg_id, id);

            CREATE VIEW v_messages AS
                SELECT m.id, m.channel_id, m.user_id, u.name AS user_name, m.body, m.sent_time
                FROM messages m
                JOIN users u ON m.user_id = u.id;

            CREATE VIEW v_replies AS
                SELECT r.id, r.msg_id, r.user_id, u.name AS user_name, r.body, r.sent_time
                FROM replies r
                JOIN users u ON r.user_id = u.id;

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
