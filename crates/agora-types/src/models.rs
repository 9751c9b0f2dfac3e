use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::profile::FieldValue;
use crate::{FieldId, Uid};

// -- Proposal (caller input) --

/// Attributes a caller wants to set on a user. `None` means "not supplied":
/// on update such attributes are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProposedUser {
    /// Required on update, ignored on insert.
    pub uid: Option<Uid>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub password_confirm: Option<String>,
    pub email: Option<String>,
    pub email_confirm: Option<String>,
    pub usergroup: Option<i64>,
    pub additional_groups: Option<Vec<i64>>,
    pub display_group: Option<i64>,
    pub post_count: Option<u32>,
    pub avatar: Option<Avatar>,
    pub user_title: Option<String>,
    pub signature: Option<String>,
    pub timezone: Option<String>,
    pub reg_ip: Option<String>,
    pub website: Option<String>,
    pub icq: Option<String>,
    pub aim: Option<String>,
    pub yahoo: Option<String>,
    pub msn: Option<String>,
    pub birthday: Option<BirthdayInput>,
    pub options: Option<OptionsInput>,
    pub reg_date: Option<i64>,
    pub last_visit: Option<i64>,
    pub last_active: Option<i64>,
    pub away: Option<AwayInput>,
    pub referrer: Option<String>,
    pub language: Option<String>,
    pub profile_fields: Option<BTreeMap<FieldId, FieldValue>>,
    /// Administrative edits may touch profile fields users cannot edit themselves.
    pub profile_fields_editable: bool,
}

/// Birth date parts. Zero or absent means unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BirthdayInput {
    pub day: Option<u32>,
    pub month: Option<u32>,
    pub year: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AwayInput {
    pub away: bool,
    /// When the user went away; defaults to now.
    pub date: Option<i64>,
    /// `d-m-y` formatted return date.
    pub return_date: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Avatar {
    pub url: String,
    pub kind: String,
}

// -- Account options --

/// Per-account yes/no preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountFlag {
    AllowNotices,
    HideEmail,
    EmailNotify,
    ReceivePms,
    PmPopup,
    PmNotify,
    Invisible,
    Remember,
    Dst,
    ShowSigs,
    ShowAvatars,
    ShowQuickReply,
    ShowRedirect,
}

impl AccountFlag {
    pub const ALL: [AccountFlag; 13] = [
        AccountFlag::AllowNotices,
        AccountFlag::HideEmail,
        AccountFlag::EmailNotify,
        AccountFlag::ReceivePms,
        AccountFlag::PmPopup,
        AccountFlag::PmNotify,
        AccountFlag::Invisible,
        AccountFlag::Remember,
        AccountFlag::Dst,
        AccountFlag::ShowSigs,
        AccountFlag::ShowAvatars,
        AccountFlag::ShowQuickReply,
        AccountFlag::ShowRedirect,
    ];

    /// Value a new account gets when the flag is not supplied.
    pub fn default_value(self) -> bool {
        !matches!(
            self,
            AccountFlag::HideEmail
                | AccountFlag::EmailNotify
                | AccountFlag::Invisible
                | AccountFlag::Dst
        )
    }

    /// Storage column backing this flag.
    pub fn column_name(self) -> &'static str {
        match self {
            AccountFlag::AllowNotices => "allownotices",
            AccountFlag::HideEmail => "hideemail",
            AccountFlag::EmailNotify => "emailnotify",
            AccountFlag::ReceivePms => "receivepms",
            AccountFlag::PmPopup => "pmpopup",
            AccountFlag::PmNotify => "pmnotify",
            AccountFlag::Invisible => "invisible",
            AccountFlag::Remember => "remember",
            AccountFlag::Dst => "dst",
            AccountFlag::ShowSigs => "showsigs",
            AccountFlag::ShowAvatars => "showavatars",
            AccountFlag::ShowQuickReply => "showquickreply",
            AccountFlag::ShowRedirect => "showredirect",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadMode {
    #[default]
    Linear,
    Threaded,
}

impl ThreadMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ThreadMode::Linear => "linear",
            ThreadMode::Threaded => "threaded",
        }
    }

    /// Only an explicit "threaded" selects threaded display.
    pub fn from_choice(choice: &str) -> Self {
        if choice.trim() == "threaded" {
            ThreadMode::Threaded
        } else {
            ThreadMode::Linear
        }
    }
}

/// Option changes as submitted by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionsInput {
    pub flags: BTreeMap<AccountFlag, bool>,
    pub show_code_buttons: Option<i64>,
    pub thread_mode: Option<String>,
    pub threads_per_page: Option<u32>,
    pub posts_per_page: Option<u32>,
    pub days_prune: Option<i64>,
}

/// Options after validation. On insert every entry is filled; on update only
/// the submitted ones are.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedOptions {
    pub flags: BTreeMap<AccountFlag, bool>,
    pub show_code_buttons: Option<bool>,
    pub thread_mode: Option<ThreadMode>,
    pub threads_per_page: Option<u32>,
    pub posts_per_page: Option<u32>,
    pub days_prune: Option<i64>,
}

/// Complete option set stored with a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserOptions {
    pub flags: BTreeMap<AccountFlag, bool>,
    pub show_code_buttons: bool,
    pub thread_mode: ThreadMode,
    /// 0 means "board default".
    pub threads_per_page: u32,
    pub posts_per_page: u32,
    pub days_prune: i64,
}

impl Default for UserOptions {
    fn default() -> Self {
        Self {
            flags: AccountFlag::ALL
                .iter()
                .map(|f| (*f, f.default_value()))
                .collect(),
            show_code_buttons: true,
            thread_mode: ThreadMode::Linear,
            threads_per_page: 0,
            posts_per_page: 0,
            days_prune: 0,
        }
    }
}

impl UserOptions {
    pub fn flag(&self, flag: AccountFlag) -> bool {
        self.flags
            .get(&flag)
            .copied()
            .unwrap_or_else(|| flag.default_value())
    }

    /// Overlay normalized changes on top of this option set.
    pub fn apply(&mut self, changes: &NormalizedOptions) {
        for (flag, value) in &changes.flags {
            self.flags.insert(*flag, *value);
        }
        if let Some(v) = changes.show_code_buttons {
            self.show_code_buttons = v;
        }
        if let Some(v) = changes.thread_mode {
            self.thread_mode = v;
        }
        if let Some(v) = changes.threads_per_page {
            self.threads_per_page = v;
        }
        if let Some(v) = changes.posts_per_page {
            self.posts_per_page = v;
        }
        if let Some(v) = changes.days_prune {
            self.days_prune = v;
        }
    }
}

// -- Normalized proposal --

/// Credentials derived from an accepted secret. The plaintext never appears here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretDigest {
    /// PHC-formatted salted hash.
    pub hash: String,
    pub salt: String,
    pub login_key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwayStatus {
    pub away: bool,
    pub date: i64,
    pub return_date: String,
    pub reason: String,
}

/// A proposal after validation: every supplied attribute in its canonical
/// form plus the derived values. Absent attributes stay `None`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizedUser {
    pub uid: Option<Uid>,
    pub username: Option<String>,
    pub secret: Option<SecretDigest>,
    pub email: Option<String>,
    pub usergroup: Option<i64>,
    pub additional_groups: Option<Vec<i64>>,
    pub display_group: Option<i64>,
    pub post_count: Option<u32>,
    pub avatar: Option<Avatar>,
    pub user_title: Option<String>,
    pub signature: Option<String>,
    pub timezone: Option<String>,
    pub reg_ip: Option<String>,
    pub website: Option<String>,
    pub icq: Option<i64>,
    pub aim: Option<String>,
    pub yahoo: Option<String>,
    pub msn: Option<String>,
    /// `d-m-y`, `d-m-` or empty.
    pub birthday: Option<String>,
    pub options: Option<NormalizedOptions>,
    pub reg_date: Option<i64>,
    pub last_visit: Option<i64>,
    pub last_active: Option<i64>,
    pub away: Option<AwayStatus>,
    /// Resolved referrer id; `Some(0)` when the name was empty.
    pub referrer: Option<Uid>,
    pub language: Option<String>,
    pub user_fields: Option<BTreeMap<FieldId, String>>,
}

// -- Stored user --

/// Full user row as written on insert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    pub password: String,
    pub salt: String,
    pub login_key: String,
    pub email: String,
    pub post_count: u32,
    pub avatar: Avatar,
    pub usergroup: i64,
    pub additional_groups: Vec<i64>,
    pub display_group: i64,
    pub user_title: String,
    pub reg_date: i64,
    pub last_active: i64,
    pub last_visit: i64,
    pub website: String,
    pub icq: i64,
    pub aim: String,
    pub yahoo: String,
    pub msn: String,
    pub birthday: String,
    pub signature: String,
    pub options: UserOptions,
    pub timezone: String,
    pub reg_ip: String,
    pub language: String,
    pub away: AwayStatus,
    /// 0 when the user was not referred.
    pub referrer: Uid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedUser {
    pub uid: Uid,
    #[serde(flatten)]
    pub record: UserRecord,
}

/// Comma-separated group list as stored.
pub fn join_groups(groups: &[i64]) -> String {
    groups
        .iter()
        .map(|g| g.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

pub fn split_groups(raw: &str) -> Vec<i64> {
    raw.split(',')
        .filter_map(|g| g.trim().parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_follow_flag_defaults() {
        let opts = UserOptions::default();
        assert!(opts.flag(AccountFlag::AllowNotices));
        assert!(!opts.flag(AccountFlag::HideEmail));
        assert!(!opts.flag(AccountFlag::Invisible));
        assert!(opts.show_code_buttons);
        assert_eq!(opts.thread_mode, ThreadMode::Linear);
    }

    #[test]
    fn apply_only_touches_supplied_options() {
        let mut opts = UserOptions::default();
        let mut changes = NormalizedOptions::default();
        changes.flags.insert(AccountFlag::Dst, true);
        changes.posts_per_page = Some(20);

        opts.apply(&changes);
        assert!(opts.flag(AccountFlag::Dst));
        assert_eq!(opts.posts_per_page, 20);
        assert_eq!(opts.threads_per_page, 0);
        assert!(opts.flag(AccountFlag::ReceivePms));
    }

    #[test]
    fn thread_mode_only_threaded_when_explicit() {
        assert_eq!(ThreadMode::from_choice("threaded"), ThreadMode::Threaded);
        assert_eq!(ThreadMode::from_choice("nested"), ThreadMode::Linear);
        assert_eq!(ThreadMode::from_choice(""), ThreadMode::Linear);
    }

    #[test]
    fn proposal_from_json_keeps_absent_fields_absent() {
        let proposal: ProposedUser = serde_json::from_str(
            r#"{"uid": 4, "email": "x@y.com", "options": {"flags": {"hide_email": true}}}"#,
        )
        .unwrap();
        assert_eq!(proposal.uid, Some(4));
        assert_eq!(proposal.email.as_deref(), Some("x@y.com"));
        assert!(proposal.username.is_none());
        assert!(proposal.password.is_none());
        let options = proposal.options.unwrap();
        assert_eq!(options.flags.get(&AccountFlag::HideEmail), Some(&true));
        assert!(options.threads_per_page.is_none());
    }

    #[test]
    fn proposal_rejects_unknown_attributes() {
        let result = serde_json::from_str::<ProposedUser>(r#"{"nickname": "bob"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn groups_roundtrip_through_storage_form() {
        assert_eq!(join_groups(&[3, 7]), "3,7");
        assert_eq!(split_groups("3, 7,,x"), vec![3, 7]);
        assert!(split_groups("").is_empty());
    }
}
