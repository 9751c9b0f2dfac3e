//! Collaborators the pipeline depends on. Storage, profile-field definitions,
//! banned names, statistics and localization are all injected through these
//! traits so the core holds no global state.

use std::collections::BTreeMap;

use agora_types::{
    FieldId, PersistedUser, ProfileSchema, RenameTarget, Uid, UserChanges, UserRecord,
};

/// Storage backend operations the pipeline needs.
pub trait UserStore: Send + Sync {
    /// Point lookup by id.
    fn find_user(&self, uid: Uid) -> anyhow::Result<Option<PersistedUser>>;

    /// Case-insensitive name match against every user except `except`.
    fn username_taken(&self, username: &str, except: Option<Uid>) -> anyhow::Result<bool>;

    /// Exact name lookup, first match only.
    fn find_uid_by_username(&self, username: &str) -> anyhow::Result<Option<Uid>>;

    /// Write a complete row and return the id storage assigned to it.
    fn insert_user(&self, record: &UserRecord) -> anyhow::Result<Uid>;

    fn update_user(&self, uid: Uid, changes: &UserChanges) -> anyhow::Result<()>;

    /// Whether the user has an extended profile-field record yet.
    fn user_fields_exist(&self, uid: Uid) -> anyhow::Result<bool>;

    fn insert_user_fields(&self, uid: Uid, values: &BTreeMap<FieldId, String>)
    -> anyhow::Result<()>;

    /// Merge values into an existing extended record.
    fn update_user_fields(&self, uid: Uid, values: &BTreeMap<FieldId, String>)
    -> anyhow::Result<()>;

    /// Rewrite one denormalized copy of the user's name. Returns rows touched.
    fn rename_author(&self, target: RenameTarget, uid: Uid, username: &str)
    -> anyhow::Result<usize>;
}

/// Source of dynamic profile-field definitions.
pub trait ProfileFieldRegistry: Send + Sync {
    fn schema(&self) -> anyhow::Result<ProfileSchema>;
}

pub trait BannedNames: Send + Sync {
    fn banned_usernames(&self) -> anyhow::Result<Vec<String>>;
}

/// Aggregate board statistics, refreshed after a user is created.
pub trait StatsCache: Send + Sync {
    fn refresh(&self) -> anyhow::Result<()>;
}

pub trait Localization: Send + Sync {
    fn language_exists(&self, name: &str) -> bool;
}
