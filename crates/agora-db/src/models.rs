//! Row types for tables outside the user model. Users map straight to
//! `agora_types::PersistedUser`.

use agora_types::Uid;

pub struct ForumRow {
    pub fid: i64,
    pub name: String,
    pub last_poster_uid: Uid,
    pub last_poster: String,
}

pub struct ThreadRow {
    pub tid: i64,
    pub fid: i64,
    pub subject: String,
    pub uid: Uid,
    pub username: String,
    pub last_poster_uid: Uid,
    pub last_poster: String,
}

pub struct PostRow {
    pub pid: i64,
    pub tid: i64,
    pub uid: Uid,
    pub username: String,
    pub message: String,
}

/// Cached board statistics.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct StatsRow {
    pub user_count: i64,
    pub newest_uid: Uid,
    pub newest_username: String,
    pub updated_at: i64,
}
