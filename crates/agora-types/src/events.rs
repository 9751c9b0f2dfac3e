use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::{AccountFlag, UserRecord};
use crate::Uid;

// -- User columns --

/// A writable column of the `users` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Username,
    Password,
    Salt,
    LoginKey,
    Email,
    PostCount,
    Avatar,
    AvatarType,
    Usergroup,
    AdditionalGroups,
    DisplayGroup,
    UserTitle,
    RegDate,
    LastActive,
    LastVisit,
    Website,
    Icq,
    Aim,
    Yahoo,
    Msn,
    Birthday,
    Signature,
    Timezone,
    RegIp,
    Language,
    Away,
    AwayDate,
    ReturnDate,
    AwayReason,
    Referrer,
    Flag(AccountFlag),
    ShowCodeButtons,
    ThreadMode,
    ThreadsPerPage,
    PostsPerPage,
    DaysPrune,
}

impl Column {
    pub fn name(self) -> &'static str {
        match self {
            Column::Username => "username",
            Column::Password => "password",
            Column::Salt => "salt",
            Column::LoginKey => "loginkey",
            Column::Email => "email",
            Column::PostCount => "postnum",
            Column::Avatar => "avatar",
            Column::AvatarType => "avatartype",
            Column::Usergroup => "usergroup",
            Column::AdditionalGroups => "additionalgroups",
            Column::DisplayGroup => "displaygroup",
            Column::UserTitle => "usertitle",
            Column::RegDate => "regdate",
            Column::LastActive => "lastactive",
            Column::LastVisit => "lastvisit",
            Column::Website => "website",
            Column::Icq => "icq",
            Column::Aim => "aim",
            Column::Yahoo => "yahoo",
            Column::Msn => "msn",
            Column::Birthday => "birthday",
            Column::Signature => "signature",
            Column::Timezone => "timezone",
            Column::RegIp => "regip",
            Column::Language => "language",
            Column::Away => "away",
            Column::AwayDate => "awaydate",
            Column::ReturnDate => "returndate",
            Column::AwayReason => "awayreason",
            Column::Referrer => "referrer",
            Column::Flag(flag) => flag.column_name(),
            Column::ShowCodeButtons => "showcodebuttons",
            Column::ThreadMode => "threadmode",
            Column::ThreadsPerPage => "tpp",
            Column::PostsPerPage => "ppp",
            Column::DaysPrune => "daysprune",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnValue {
    Int(i64),
    Text(String),
}

impl From<i64> for ColumnValue {
    fn from(v: i64) -> Self {
        ColumnValue::Int(v)
    }
}

impl From<u32> for ColumnValue {
    fn from(v: u32) -> Self {
        ColumnValue::Int(i64::from(v))
    }
}

impl From<bool> for ColumnValue {
    fn from(v: bool) -> Self {
        ColumnValue::Int(i64::from(v))
    }
}

impl From<String> for ColumnValue {
    fn from(v: String) -> Self {
        ColumnValue::Text(v)
    }
}

impl From<&str> for ColumnValue {
    fn from(v: &str) -> Self {
        ColumnValue::Text(v.to_string())
    }
}

/// Sparse set of column assignments for an update, in insertion order.
/// Setting a column twice keeps its first position and the latest value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserChanges {
    columns: Vec<(Column, ColumnValue)>,
}

impl UserChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, column: Column, value: impl Into<ColumnValue>) {
        let value = value.into();
        match self.columns.iter_mut().find(|(c, _)| *c == column) {
            Some(entry) => entry.1 = value,
            None => self.columns.push((column, value)),
        }
    }

    pub fn get(&self, column: Column) -> Option<&ColumnValue> {
        self.columns
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, v)| v)
    }

    pub fn remove(&mut self, column: Column) -> Option<ColumnValue> {
        let idx = self.columns.iter().position(|(c, _)| *c == column)?;
        Some(self.columns.remove(idx).1)
    }

    pub fn contains(&self, column: Column) -> bool {
        self.get(column).is_some()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Column, ColumnValue)> {
        self.columns.iter()
    }
}

/// What is about to be written; handed to before-write hooks.
#[derive(Debug)]
pub enum WritePayload<'a> {
    Insert(&'a mut UserRecord),
    Update {
        uid: Uid,
        changes: &'a mut UserChanges,
    },
}

// -- Rename propagation --

/// Denormalized copies of a username kept in other tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenameTarget {
    /// `posts.username` where `posts.uid` is the user.
    PostAuthors,
    /// `threads.username` where `threads.uid` is the user.
    ThreadAuthors,
    /// `threads.lastposter` where `threads.lastposteruid` is the user.
    ThreadLastPosters,
    /// `forums.lastposter` where `forums.lastposteruid` is the user.
    ForumLastPosters,
}

impl RenameTarget {
    /// Propagation order.
    pub const ALL: [RenameTarget; 4] = [
        RenameTarget::PostAuthors,
        RenameTarget::ThreadAuthors,
        RenameTarget::ThreadLastPosters,
        RenameTarget::ForumLastPosters,
    ];
}

impl fmt::Display for RenameTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RenameTarget::PostAuthors => "post authors",
            RenameTarget::ThreadAuthors => "thread authors",
            RenameTarget::ThreadLastPosters => "thread last posters",
            RenameTarget::ForumLastPosters => "forum last posters",
        };
        f.write_str(name)
    }
}
