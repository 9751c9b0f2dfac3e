use serde::{Deserialize, Serialize};

use crate::Uid;

/// Whether a proposal creates a user or changes an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Insert,
    Update,
}

// -- Write results --

#[derive(Debug, Clone, Serialize)]
pub struct InsertedUser {
    pub uid: Uid,
    pub username: String,
    pub login_key: String,
    pub password_hash: String,
    pub email: String,
    pub usergroup: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rename {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdatedUser {
    pub uid: Uid,
    /// Number of user columns written; 0 when only profile fields changed.
    pub columns_written: usize,
    pub renamed: Option<Rename>,
}
