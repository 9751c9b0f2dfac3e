use anyhow::Result;
use rusqlite::{Connection, params};
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (users and profile fields)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                uid             INTEGER PRIMARY KEY AUTOINCREMENT,
                username        TEXT NOT NULL,
                password        TEXT NOT NULL DEFAULT '',
                salt            TEXT NOT NULL DEFAULT '',
                loginkey        TEXT NOT NULL DEFAULT '',
                email           TEXT NOT NULL DEFAULT '',
                postnum         INTEGER NOT NULL DEFAULT 0,
                avatar          TEXT NOT NULL DEFAULT '',
                avatartype      TEXT NOT NULL DEFAULT '',
                usergroup       INTEGER NOT NULL DEFAULT 0,
                additionalgroups TEXT NOT NULL DEFAULT '',
                displaygroup    INTEGER NOT NULL DEFAULT 0,
                usertitle       TEXT NOT NULL DEFAULT '',
                regdate         INTEGER NOT NULL DEFAULT 0,
                lastactive      INTEGER NOT NULL DEFAULT 0,
                lastvisit       INTEGER NOT NULL DEFAULT 0,
                website         TEXT NOT NULL DEFAULT '',
                icq             INTEGER NOT NULL DEFAULT 0,
                aim             TEXT NOT NULL DEFAULT '',
                yahoo           TEXT NOT NULL DEFAULT '',
                msn             TEXT NOT NULL DEFAULT '',
                birthday        TEXT NOT NULL DEFAULT '',
                signature       TEXT NOT NULL DEFAULT '',
                timezone        TEXT NOT NULL DEFAULT '',
                regip           TEXT NOT NULL DEFAULT '',
                language        TEXT NOT NULL DEFAULT '',
                away            INTEGER NOT NULL DEFAULT 0,
                awaydate        INTEGER NOT NULL DEFAULT 0,
                returndate      TEXT NOT NULL DEFAULT '',
                awayreason      TEXT NOT NULL DEFAULT '',
                referrer        INTEGER NOT NULL DEFAULT 0,
                allownotices    INTEGER NOT NULL DEFAULT 1,
                hideemail       INTEGER NOT NULL DEFAULT 0,
                emailnotify     INTEGER NOT NULL DEFAULT 0,
                receivepms      INTEGER NOT NULL DEFAULT 1,
                pmpopup         INTEGER NOT NULL DEFAULT 1,
                pmnotify        INTEGER NOT NULL DEFAULT 1,
                invisible       INTEGER NOT NULL DEFAULT 0,
                remember        INTEGER NOT NULL DEFAULT 1,
                dst             INTEGER NOT NULL DEFAULT 0,
                showsigs        INTEGER NOT NULL DEFAULT 1,
                showavatars     INTEGER NOT NULL DEFAULT 1,
                showquickreply  INTEGER NOT NULL DEFAULT 1,
                showredirect    INTEGER NOT NULL DEFAULT 1,
                showcodebuttons INTEGER NOT NULL DEFAULT 1,
                threadmode      TEXT NOT NULL DEFAULT 'linear',
                tpp             INTEGER NOT NULL DEFAULT 0,
                ppp             INTEGER NOT NULL DEFAULT 0,
                daysprune       INTEGER NOT NULL DEFAULT 0
            );

            -- uniqueness is case-insensitive and enforced by validation
            CREATE INDEX idx_users_username ON users(username COLLATE NOCASE);

            CREATE TABLE profilefields (
                fid         INTEGER PRIMARY KEY AUTOINCREMENT,
                name        TEXT NOT NULL,
                type        TEXT NOT NULL,
                required    INTEGER NOT NULL DEFAULT 0,
                editable    INTEGER NOT NULL DEFAULT 1,
                disporder   INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE profilefield_schema (
                id          INTEGER PRIMARY KEY CHECK (id = 1),
                revision    INTEGER NOT NULL
            );
            INSERT INTO profilefield_schema (id, revision) VALUES (1, 0);

            CREATE TABLE userfields (
                ufid        INTEGER NOT NULL REFERENCES users(uid) ON DELETE CASCADE,
                fid         INTEGER NOT NULL,
                value       TEXT NOT NULL DEFAULT '',
                PRIMARY KEY (ufid, fid)
            );

            CREATE TABLE banned_usernames (
                name        TEXT PRIMARY KEY,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (content tables and stats)");
        conn.execute_batch(
            "
            CREATE TABLE forums (
                fid             INTEGER PRIMARY KEY AUTOINCREMENT,
                name            TEXT NOT NULL,
                lastposteruid   INTEGER NOT NULL DEFAULT 0,
                lastposter      TEXT NOT NULL DEFAULT ''
            );

            CREATE TABLE threads (
                tid             INTEGER PRIMARY KEY AUTOINCREMENT,
                fid             INTEGER NOT NULL REFERENCES forums(fid),
                subject         TEXT NOT NULL,
                uid             INTEGER NOT NULL DEFAULT 0,
                username        TEXT NOT NULL DEFAULT '',
                lastposteruid   INTEGER NOT NULL DEFAULT 0,
                lastposter      TEXT NOT NULL DEFAULT ''
            );

            CREATE INDEX idx_threads_uid ON threads(uid);
            CREATE INDEX idx_threads_lastposter ON threads(lastposteruid);

            CREATE TABLE posts (
                pid         INTEGER PRIMARY KEY AUTOINCREMENT,
                tid         INTEGER NOT NULL REFERENCES threads(tid),
                uid         INTEGER NOT NULL DEFAULT 0,
                username    TEXT NOT NULL DEFAULT '',
                message     TEXT NOT NULL DEFAULT ''
            );

            CREATE INDEX idx_posts_uid ON posts(uid);

            CREATE TABLE stats (
                id              INTEGER PRIMARY KEY CHECK (id = 1),
                numusers        INTEGER NOT NULL DEFAULT 0,
                lastuid         INTEGER NOT NULL DEFAULT 0,
                lastusername    TEXT NOT NULL DEFAULT '',
                updated_at      INTEGER NOT NULL DEFAULT 0
            );

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    if version < 3 {
        info!("Running migration v3 (case-folded usernames)");
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(
            "ALTER TABLE users ADD COLUMN username_folded TEXT NOT NULL DEFAULT '';
             CREATE INDEX idx_users_username_folded ON users(username_folded);",
        )?;

        // SQLite's LOWER() folds ASCII only
        let names = {
            let mut stmt = tx.prepare("SELECT uid, username FROM users")?;
            let rows = stmt
                .query_map([], |r| Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        };
        for (uid, username) in names {
            tx.execute(
                "UPDATE users SET username_folded = ?1 WHERE uid = ?2",
                params![username.to_lowercase(), uid],
            )?;
        }

        tx.execute("INSERT INTO schema_version (version) VALUES (3)", [])?;
        tx.commit()?;
    }

    info!("Database migrations complete");
    Ok(())
}
