use std::collections::BTreeMap;

use agora_types::{
    AccountFlag, Avatar, AwayStatus, Column, ColumnValue, FieldId, PersistedUser, RenameTarget,
    ThreadMode, Uid, UserChanges, UserOptions, UserRecord, join_groups, split_groups,
};
use anyhow::{Result, bail};
use rusqlite::types::Value;
use rusqlite::{Connection, Row, params, params_from_iter};

use crate::models::{ForumRow, PostRow, ThreadRow};
use crate::Database;

/// Lowercased copy of `username`, kept in step on every write.
const FOLDED_NAME: &str = "username_folded";

impl Database {
    // -- Users --

    pub fn get_user(&self, uid: Uid) -> Result<Option<PersistedUser>> {
        self.with_conn(|conn| query_user(conn, uid))
    }

    pub fn count_users_named(&self, username: &str, except: Option<Uid>) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM users WHERE username_folded = ?1 AND uid != ?2",
                params![username.to_lowercase(), except.unwrap_or(0)],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    /// Case-insensitive, like the uniqueness check.
    pub fn get_uid_by_username(&self, username: &str) -> Result<Option<Uid>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT uid FROM users WHERE username_folded = ?1 ORDER BY uid LIMIT 1",
                [username.to_lowercase()],
                |row| row.get(0),
            )
            .optional()
        })
    }

    pub fn create_user(&self, record: &UserRecord) -> Result<Uid> {
        let columns = full_row(record);
        self.with_conn(|conn| {
            let mut names: Vec<&str> = columns.iter().map(|(c, _)| c.name()).collect();
            names.push(FOLDED_NAME);
            let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "INSERT INTO users ({}) VALUES ({})",
                names.join(", "),
                placeholders.join(", ")
            );
            let values = columns
                .iter()
                .map(|(_, v)| to_sql(v))
                .chain(std::iter::once(Value::Text(record.username.to_lowercase())));
            conn.execute(&sql, params_from_iter(values))?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Write only the given columns.
    pub fn update_user_columns(&self, uid: Uid, changes: &UserChanges) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }

        self.with_conn(|conn| {
            let mut assignments: Vec<String> = changes
                .iter()
                .enumerate()
                .map(|(i, (column, _))| format!("{} = ?{}", column.name(), i + 1))
                .collect();
            let mut values: Vec<Value> = changes.iter().map(|(_, v)| to_sql(v)).collect();

            if let Some(ColumnValue::Text(name)) = changes.get(Column::Username) {
                values.push(Value::Text(name.to_lowercase()));
                assignments.push(format!("{} = ?{}", FOLDED_NAME, values.len()));
            }

            values.push(Value::Integer(uid));
            let sql = format!(
                "UPDATE users SET {} WHERE uid = ?{}",
                assignments.join(", "),
                values.len()
            );
            let updated = conn.execute(&sql, params_from_iter(values))?;
            if updated == 0 {
                bail!("User not found: {}", uid);
            }
            Ok(())
        })
    }

    // -- Extended profile fields --

    pub fn has_user_fields(&self, uid: Uid) -> Result<bool> {
        self.with_conn(|conn| {
            let exists = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM userfields WHERE ufid = ?1)",
                [uid],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    /// Insert or overwrite the given values, leaving other fields alone.
    pub fn upsert_user_fields(&self, uid: Uid, values: &BTreeMap<FieldId, String>) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO userfields (ufid, fid, value) VALUES (?1, ?2, ?3)
                     ON CONFLICT(ufid, fid) DO UPDATE SET value = excluded.value",
                )?;
                for (fid, value) in values {
                    stmt.execute(params![uid, fid, value])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_user_fields(&self, uid: Uid) -> Result<BTreeMap<FieldId, String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT fid, value FROM userfields WHERE ufid = ?1")?;
            let rows = stmt
                .query_map([uid], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<BTreeMap<_, _>, _>>()?;
            Ok(rows)
        })
    }

    // -- Denormalized author names --

    /// Rewrite one copy of the user's name. Returns the number of rows changed.
    pub fn rename_in(&self, target: RenameTarget, uid: Uid, username: &str) -> Result<usize> {
        let sql = match target {
            RenameTarget::PostAuthors => "UPDATE posts SET username = ?1 WHERE uid = ?2",
            RenameTarget::ThreadAuthors => "UPDATE threads SET username = ?1 WHERE uid = ?2",
            RenameTarget::ThreadLastPosters => {
                "UPDATE threads SET lastposter = ?1 WHERE lastposteruid = ?2"
            }
            RenameTarget::ForumLastPosters => {
                "UPDATE forums SET lastposter = ?1 WHERE lastposteruid = ?2"
            }
        };
        self.with_conn(|conn| Ok(conn.execute(sql, params![username, uid])?))
    }

    // -- Content --

    pub fn create_forum(&self, name: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute("INSERT INTO forums (name) VALUES (?1)", [name])?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Start a thread with its first post; the author becomes the last poster
    /// of both thread and forum.
    pub fn create_thread(&self, fid: i64, subject: &str, uid: Uid, username: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "INSERT INTO threads (fid, subject, uid, username, lastposteruid, lastposter)
                 VALUES (?1, ?2, ?3, ?4, ?3, ?4)",
                params![fid, subject, uid, username],
            )?;
            let tid = tx.last_insert_rowid();
            tx.execute(
                "INSERT INTO posts (tid, uid, username, message) VALUES (?1, ?2, ?3, '')",
                params![tid, uid, username],
            )?;
            tx.execute(
                "UPDATE forums SET lastposteruid = ?1, lastposter = ?2 WHERE fid = ?3",
                params![uid, username, fid],
            )?;
            tx.commit()?;
            Ok(tid)
        })
    }

    pub fn get_forum(&self, fid: i64) -> Result<Option<ForumRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT fid, name, lastposteruid, lastposter FROM forums WHERE fid = ?1",
                [fid],
                |row| {
                    Ok(ForumRow {
                        fid: row.get(0)?,
                        name: row.get(1)?,
                        last_poster_uid: row.get(2)?,
                        last_poster: row.get(3)?,
                    })
                },
            )
            .optional()
        })
    }

    pub fn get_thread(&self, tid: i64) -> Result<Option<ThreadRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT tid, fid, subject, uid, username, lastposteruid, lastposter
                 FROM threads WHERE tid = ?1",
                [tid],
                |row| {
                    Ok(ThreadRow {
                        tid: row.get(0)?,
                        fid: row.get(1)?,
                        subject: row.get(2)?,
                        uid: row.get(3)?,
                        username: row.get(4)?,
                        last_poster_uid: row.get(5)?,
                        last_poster: row.get(6)?,
                    })
                },
            )
            .optional()
        })
    }

    pub fn get_posts_in_thread(&self, tid: i64) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT pid, tid, uid, username, message FROM posts WHERE tid = ?1 ORDER BY pid",
            )?;
            let rows = stmt
                .query_map([tid], |row| {
                    Ok(PostRow {
                        pid: row.get(0)?,
                        tid: row.get(1)?,
                        uid: row.get(2)?,
                        username: row.get(3)?,
                        message: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_user(conn: &Connection, uid: Uid) -> Result<Option<PersistedUser>> {
    let mut stmt = conn.prepare("SELECT * FROM users WHERE uid = ?1")?;
    stmt.query_row([uid], user_from_row).optional()
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<PersistedUser> {
    let mut flags = BTreeMap::new();
    for flag in AccountFlag::ALL {
        flags.insert(flag, row.get::<_, bool>(flag.column_name())?);
    }
    let thread_mode: String = row.get("threadmode")?;
    let groups: String = row.get("additionalgroups")?;

    let record = UserRecord {
        username: row.get("username")?,
        password: row.get("password")?,
        salt: row.get("salt")?,
        login_key: row.get("loginkey")?,
        email: row.get("email")?,
        post_count: row.get("postnum")?,
        avatar: Avatar {
            url: row.get("avatar")?,
            kind: row.get("avatartype")?,
        },
        usergroup: row.get("usergroup")?,
        additional_groups: split_groups(&groups),
        display_group: row.get("displaygroup")?,
        user_title: row.get("usertitle")?,
        reg_date: row.get("regdate")?,
        last_active: row.get("lastactive")?,
        last_visit: row.get("lastvisit")?,
        website: row.get("website")?,
        icq: row.get("icq")?,
        aim: row.get("aim")?,
        yahoo: row.get("yahoo")?,
        msn: row.get("msn")?,
        birthday: row.get("birthday")?,
        signature: row.get("signature")?,
        options: UserOptions {
            flags,
            show_code_buttons: row.get("showcodebuttons")?,
            thread_mode: ThreadMode::from_choice(&thread_mode),
            threads_per_page: row.get("tpp")?,
            posts_per_page: row.get("ppp")?,
            days_prune: row.get("daysprune")?,
        },
        timezone: row.get("timezone")?,
        reg_ip: row.get("regip")?,
        language: row.get("language")?,
        away: AwayStatus {
            away: row.get("away")?,
            date: row.get("awaydate")?,
            return_date: row.get("returndate")?,
            reason: row.get("awayreason")?,
        },
        referrer: row.get("referrer")?,
    };

    Ok(PersistedUser {
        uid: row.get("uid")?,
        record,
    })
}

/// Every column of a complete user row.
fn full_row(record: &UserRecord) -> Vec<(Column, ColumnValue)> {
    let mut row = vec![
        (Column::Username, record.username.as_str().into()),
        (Column::Password, record.password.as_str().into()),
        (Column::Salt, record.salt.as_str().into()),
        (Column::LoginKey, record.login_key.as_str().into()),
        (Column::Email, record.email.as_str().into()),
        (Column::PostCount, record.post_count.into()),
        (Column::Avatar, record.avatar.url.as_str().into()),
        (Column::AvatarType, record.avatar.kind.as_str().into()),
        (Column::Usergroup, record.usergroup.into()),
        (
            Column::AdditionalGroups,
            join_groups(&record.additional_groups).into(),
        ),
        (Column::DisplayGroup, record.display_group.into()),
        (Column::UserTitle, record.user_title.as_str().into()),
        (Column::RegDate, record.reg_date.into()),
        (Column::LastActive, record.last_active.into()),
        (Column::LastVisit, record.last_visit.into()),
        (Column::Website, record.website.as_str().into()),
        (Column::Icq, record.icq.into()),
        (Column::Aim, record.aim.as_str().into()),
        (Column::Yahoo, record.yahoo.as_str().into()),
        (Column::Msn, record.msn.as_str().into()),
        (Column::Birthday, record.birthday.as_str().into()),
        (Column::Signature, record.signature.as_str().into()),
        (Column::Timezone, record.timezone.as_str().into()),
        (Column::RegIp, record.reg_ip.as_str().into()),
        (Column::Language, record.language.as_str().into()),
        (Column::Away, record.away.away.into()),
        (Column::AwayDate, record.away.date.into()),
        (Column::ReturnDate, record.away.return_date.as_str().into()),
        (Column::AwayReason, record.away.reason.as_str().into()),
        (Column::Referrer, record.referrer.into()),
    ];

    let options = &record.options;
    for flag in AccountFlag::ALL {
        row.push((Column::Flag(flag), options.flag(flag).into()));
    }
    row.push((Column::ShowCodeButtons, options.show_code_buttons.into()));
    row.push((Column::ThreadMode, options.thread_mode.as_str().into()));
    row.push((Column::ThreadsPerPage, options.threads_per_page.into()));
    row.push((Column::PostsPerPage, options.posts_per_page.into()));
    row.push((Column::DaysPrune, options.days_prune.into()));
    row
}

fn to_sql(value: &ColumnValue) -> Value {
    match value {
        ColumnValue::Int(v) => Value::Integer(*v),
        ColumnValue::Text(v) => Value::Text(v.clone()),
    }
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
