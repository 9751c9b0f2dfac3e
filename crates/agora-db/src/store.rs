use std::collections::BTreeMap;

use agora_types::{
    FieldId, PersistedUser, ProfileFieldDefinition, ProfileSchema, RenameTarget, Uid,
    UserChanges, UserRecord,
};
use agora_users::{BannedNames, ProfileFieldRegistry, StatsCache, UserStore};
use anyhow::{Result, anyhow};
use chrono::Utc;
use rusqlite::params;
use tracing::{debug, info};

use crate::models::StatsRow;
use crate::queries::OptionalExt;
use crate::Database;

impl Database {
    // -- Profile field definitions --

    /// Create a field (`fid <= 0`) or replace an existing one. Either way the
    /// schema revision moves forward. Returns the field id.
    pub fn define_profile_field(&self, field: &ProfileFieldDefinition) -> Result<FieldId> {
        let fid = self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let fid = if field.fid > 0 {
                let updated = tx.execute(
                    "UPDATE profilefields
                     SET name = ?1, type = ?2, required = ?3, editable = ?4, disporder = ?5
                     WHERE fid = ?6",
                    params![
                        field.name,
                        field.kind_spec(),
                        field.required,
                        field.editable,
                        field.display_order,
                        field.fid
                    ],
                )?;
                if updated == 0 {
                    return Err(anyhow!("Profile field not found: {}", field.fid));
                }
                field.fid
            } else {
                tx.execute(
                    "INSERT INTO profilefields (name, type, required, editable, disporder)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        field.name,
                        field.kind_spec(),
                        field.required,
                        field.editable,
                        field.display_order
                    ],
                )?;
                tx.last_insert_rowid()
            };
            tx.execute(
                "UPDATE profilefield_schema SET revision = revision + 1 WHERE id = 1",
                [],
            )?;
            tx.commit()?;
            Ok(fid)
        })?;

        info!(fid, name = %field.name, "profile field defined");
        Ok(fid)
    }

    pub fn load_profile_schema(&self) -> Result<ProfileSchema> {
        self.with_conn(|conn| {
            let revision: i64 = conn.query_row(
                "SELECT revision FROM profilefield_schema WHERE id = 1",
                [],
                |row| row.get(0),
            )?;

            let mut stmt = conn.prepare(
                "SELECT fid, name, type, required, editable, disporder
                 FROM profilefields ORDER BY disporder, fid",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, bool>(3)?,
                        row.get::<_, bool>(4)?,
                        row.get::<_, i64>(5)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let mut fields = Vec::with_capacity(rows.len());
            for (fid, name, spec, required, editable, display_order) in rows {
                let (kind, options) = ProfileFieldDefinition::parse_kind_spec(&spec)
                    .ok_or_else(|| anyhow!("Profile field {} has unknown type {:?}", fid, spec))?;
                fields.push(ProfileFieldDefinition {
                    fid,
                    name,
                    kind,
                    options,
                    required,
                    editable,
                    display_order,
                });
            }

            Ok(ProfileSchema { revision, fields })
        })
    }

    // -- Banned names --

    pub fn add_banned_username(&self, name: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO banned_usernames (name) VALUES (?1)",
                [name.trim()],
            )?;
            Ok(())
        })
    }

    pub fn remove_banned_username(&self, name: &str) -> Result<bool> {
        self.with_conn(|conn| {
            Ok(conn.execute("DELETE FROM banned_usernames WHERE name = ?1", [name.trim()])? > 0)
        })
    }

    pub fn list_banned_usernames(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT name FROM banned_usernames ORDER BY name")?;
            let names = stmt
                .query_map([], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(names)
        })
    }

    // -- Stats --

    /// Recount users and record the newest one.
    pub fn rebuild_stats(&self) -> Result<StatsRow> {
        let now = Utc::now().timestamp();
        let stats = self.with_conn(|conn| {
            let user_count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?;
            let newest: Option<(Uid, String)> = conn
                .query_row(
                    "SELECT uid, username FROM users ORDER BY regdate DESC, uid DESC LIMIT 1",
                    [],
                    |r| Ok((r.get(0)?, r.get(1)?)),
                )
                .optional()?;
            let (newest_uid, newest_username) = newest.unwrap_or_default();

            conn.execute(
                "INSERT INTO stats (id, numusers, lastuid, lastusername, updated_at)
                 VALUES (1, ?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                    numusers = excluded.numusers,
                    lastuid = excluded.lastuid,
                    lastusername = excluded.lastusername,
                    updated_at = excluded.updated_at",
                params![user_count, newest_uid, newest_username, now],
            )?;

            Ok(StatsRow {
                user_count,
                newest_uid,
                newest_username,
                updated_at: now,
            })
        })?;

        debug!(users = stats.user_count, newest = stats.newest_uid, "stats rebuilt");
        Ok(stats)
    }

    pub fn get_stats(&self) -> Result<Option<StatsRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT numusers, lastuid, lastusername, updated_at FROM stats WHERE id = 1",
                [],
                |r| {
                    Ok(StatsRow {
                        user_count: r.get(0)?,
                        newest_uid: r.get(1)?,
                        newest_username: r.get(2)?,
                        updated_at: r.get(3)?,
                    })
                },
            )
            .optional()
        })
    }
}

// -- Ports --

impl UserStore for Database {
    fn find_user(&self, uid: Uid) -> Result<Option<PersistedUser>> {
        self.get_user(uid)
    }

    fn username_taken(&self, username: &str, except: Option<Uid>) -> Result<bool> {
        Ok(self.count_users_named(username, except)? > 0)
    }

    fn find_uid_by_username(&self, username: &str) -> Result<Option<Uid>> {
        self.get_uid_by_username(username)
    }

    fn insert_user(&self, record: &UserRecord) -> Result<Uid> {
        self.create_user(record)
    }

    fn update_user(&self, uid: Uid, changes: &UserChanges) -> Result<()> {
        self.update_user_columns(uid, changes)
    }

    fn user_fields_exist(&self, uid: Uid) -> Result<bool> {
        self.has_user_fields(uid)
    }

    fn insert_user_fields(&self, uid: Uid, values: &BTreeMap<FieldId, String>) -> Result<()> {
        self.upsert_user_fields(uid, values)
    }

    fn update_user_fields(&self, uid: Uid, values: &BTreeMap<FieldId, String>) -> Result<()> {
        self.upsert_user_fields(uid, values)
    }

    fn rename_author(&self, target: RenameTarget, uid: Uid, username: &str) -> Result<usize> {
        self.rename_in(target, uid, username)
    }
}

impl ProfileFieldRegistry for Database {
    fn schema(&self) -> Result<ProfileSchema> {
        self.load_profile_schema()
    }
}

impl BannedNames for Database {
    fn banned_usernames(&self) -> Result<Vec<String>> {
        self.list_banned_usernames()
    }
}

impl StatsCache for Database {
    fn refresh(&self) -> Result<()> {
        self.rebuild_stats().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_types::FieldKind;

    fn color_field() -> ProfileFieldDefinition {
        ProfileFieldDefinition {
            fid: 0,
            name: "Favourite colour".into(),
            kind: FieldKind::Select,
            options: vec!["Red".into(), "Green".into()],
            required: false,
            editable: true,
            display_order: 1,
        }
    }

    #[test]
    fn defining_fields_bumps_revision() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.load_profile_schema().unwrap().revision, 0);

        let fid = db.define_profile_field(&color_field()).unwrap();
        let schema = db.load_profile_schema().unwrap();
        assert_eq!(schema.revision, 1);
        assert_eq!(schema.fields.len(), 1);
        assert_eq!(schema.fields[0].fid, fid);
        assert_eq!(schema.fields[0].kind, FieldKind::Select);
        assert_eq!(schema.fields[0].options, vec!["Red", "Green"]);

        let mut changed = schema.fields[0].clone();
        changed.required = true;
        db.define_profile_field(&changed).unwrap();
        let schema = db.load_profile_schema().unwrap();
        assert_eq!(schema.revision, 2);
        assert!(schema.fields[0].required);

        let mut missing = color_field();
        missing.fid = 99;
        assert!(db.define_profile_field(&missing).is_err());
    }

    #[test]
    fn banned_names_round_trip() {
        let db = Database::open_in_memory().unwrap();
        db.add_banned_username(" admin ").unwrap();
        db.add_banned_username("admin").unwrap();
        db.add_banned_username("root").unwrap();
        assert_eq!(db.banned_usernames().unwrap(), vec!["admin", "root"]);

        assert!(db.remove_banned_username("root").unwrap());
        assert!(!db.remove_banned_username("root").unwrap());
    }

    #[test]
    fn stats_track_newest_user() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_stats().unwrap().is_none());

        db.create_user(&UserRecord {
            username: "alice".into(),
            reg_date: 100,
            ..Default::default()
        })
        .unwrap();
        let bob = db
            .create_user(&UserRecord {
                username: "bob".into(),
                reg_date: 200,
                ..Default::default()
            })
            .unwrap();

        db.refresh().unwrap();
        let stats = db.get_stats().unwrap().unwrap();
        assert_eq!(stats.user_count, 2);
        assert_eq!(stats.newest_uid, bob);
        assert_eq!(stats.newest_username, "bob");
    }
}
