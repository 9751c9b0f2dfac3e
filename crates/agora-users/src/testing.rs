//! In-memory collaborators for unit tests.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use agora_types::{
    Column, ColumnValue, FieldId, FieldKind, PersistedUser, ProfileFieldDefinition, ProfileSchema,
    RenameTarget, ThreadMode, Uid, UserChanges, UserRecord, split_groups,
};
use anyhow::bail;

use crate::locales::LanguagePacks;
use crate::ports::{BannedNames, ProfileFieldRegistry, StatsCache, UserStore};
use crate::secret;
use crate::service::{Collaborators, UserService};
use crate::settings::Settings;

#[derive(Default)]
struct State {
    next_uid: Uid,
    users: BTreeMap<Uid, UserRecord>,
    user_fields: BTreeMap<Uid, BTreeMap<FieldId, String>>,
    authors: BTreeMap<(Uid, usize), String>,
    schema: ProfileSchema,
    banned: Vec<String>,
    fail_rename_at: Option<RenameTarget>,
    writes: usize,
    renames: usize,
    lookups: usize,
    stats_refreshes: usize,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

fn target_slot(target: RenameTarget) -> usize {
    RenameTarget::ALL
        .iter()
        .position(|t| *t == target)
        .unwrap()
}

impl MemoryStore {
    pub fn with_text_field(fid: FieldId) -> Self {
        let store = Self::default();
        store.add_text_field(fid);
        store
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn add_text_field(&self, fid: FieldId) {
        let mut state = self.lock();
        state.schema.revision += 1;
        state.schema.fields.push(ProfileFieldDefinition {
            fid,
            name: format!("Field {fid}"),
            kind: FieldKind::Text,
            options: Vec::new(),
            required: false,
            editable: true,
            display_order: fid,
        });
    }

    pub fn ban_username(&self, name: &str) {
        self.lock().banned.push(name.to_string());
    }

    /// Store an existing user directly, bypassing the write counter.
    pub fn seed(&self, username: &str, email: &str) -> Uid {
        let digest = secret::derive("hunter22", None).unwrap();
        let record = UserRecord {
            username: username.into(),
            email: email.into(),
            password: digest.hash,
            salt: digest.salt,
            login_key: digest.login_key,
            usergroup: 2,
            ..Default::default()
        };
        let mut state = self.lock();
        state.next_uid += 1;
        let uid = state.next_uid;
        state.users.insert(uid, record);
        uid
    }

    /// Make the user the author of one row in every rename target.
    pub fn author_everywhere(&self, uid: Uid, name: &str) {
        let mut state = self.lock();
        for target in RenameTarget::ALL {
            state.authors.insert((uid, target_slot(target)), name.to_string());
        }
    }

    pub fn fail_rename_at(&self, target: RenameTarget) {
        self.lock().fail_rename_at = Some(target);
    }

    pub fn user(&self, uid: Uid) -> Option<UserRecord> {
        self.lock().users.get(&uid).cloned()
    }

    pub fn user_fields(&self, uid: Uid) -> Option<BTreeMap<FieldId, String>> {
        self.lock().user_fields.get(&uid).cloned()
    }

    pub fn author(&self, target: RenameTarget, uid: Uid) -> Option<String> {
        self.lock().authors.get(&(uid, target_slot(target))).cloned()
    }

    pub fn writes(&self) -> usize {
        self.lock().writes
    }

    pub fn renames(&self) -> usize {
        self.lock().renames
    }

    /// Uniqueness lookups served so far.
    pub fn lookups(&self) -> usize {
        self.lock().lookups
    }

    pub fn stats_refreshes(&self) -> usize {
        self.lock().stats_refreshes
    }
}

impl UserStore for MemoryStore {
    fn find_user(&self, uid: Uid) -> anyhow::Result<Option<PersistedUser>> {
        Ok(self.user(uid).map(|record| PersistedUser { uid, record }))
    }

    fn username_taken(&self, username: &str, except: Option<Uid>) -> anyhow::Result<bool> {
        let wanted = username.to_lowercase();
        let mut state = self.lock();
        state.lookups += 1;
        Ok(state
            .users
            .iter()
            .any(|(uid, u)| Some(*uid) != except && u.username.to_lowercase() == wanted))
    }

    fn find_uid_by_username(&self, username: &str) -> anyhow::Result<Option<Uid>> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|(_, u)| u.username.to_lowercase() == username.to_lowercase())
            .map(|(uid, _)| *uid))
    }

    fn insert_user(&self, record: &UserRecord) -> anyhow::Result<Uid> {
        let mut state = self.lock();
        state.writes += 1;
        state.next_uid += 1;
        let uid = state.next_uid;
        state.users.insert(uid, record.clone());
        Ok(uid)
    }

    fn update_user(&self, uid: Uid, changes: &UserChanges) -> anyhow::Result<()> {
        let mut state = self.lock();
        state.writes += 1;
        let Some(record) = state.users.get_mut(&uid) else {
            bail!("no user {uid}");
        };
        for (column, value) in changes.iter() {
            apply(record, *column, value);
        }
        Ok(())
    }

    fn user_fields_exist(&self, uid: Uid) -> anyhow::Result<bool> {
        Ok(self.lock().user_fields.contains_key(&uid))
    }

    fn insert_user_fields(
        &self,
        uid: Uid,
        values: &BTreeMap<FieldId, String>,
    ) -> anyhow::Result<()> {
        let mut state = self.lock();
        state.writes += 1;
        state.user_fields.insert(uid, values.clone());
        Ok(())
    }

    fn update_user_fields(
        &self,
        uid: Uid,
        values: &BTreeMap<FieldId, String>,
    ) -> anyhow::Result<()> {
        let mut state = self.lock();
        state.writes += 1;
        state
            .user_fields
            .entry(uid)
            .or_default()
            .extend(values.clone());
        Ok(())
    }

    fn rename_author(
        &self,
        target: RenameTarget,
        uid: Uid,
        username: &str,
    ) -> anyhow::Result<usize> {
        let mut state = self.lock();
        state.renames += 1;
        if state.fail_rename_at == Some(target) {
            bail!("{target} unavailable");
        }
        state.writes += 1;
        Ok(match state.authors.get_mut(&(uid, target_slot(target))) {
            Some(name) => {
                *name = username.to_string();
                1
            }
            None => 0,
        })
    }
}

impl ProfileFieldRegistry for MemoryStore {
    fn schema(&self) -> anyhow::Result<ProfileSchema> {
        Ok(self.lock().schema.clone())
    }
}

impl BannedNames for MemoryStore {
    fn banned_usernames(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.lock().banned.clone())
    }
}

impl StatsCache for MemoryStore {
    fn refresh(&self) -> anyhow::Result<()> {
        self.lock().stats_refreshes += 1;
        Ok(())
    }
}

pub fn service(store: &Arc<MemoryStore>) -> UserService {
    let collaborators = Collaborators {
        store: store.clone(),
        profile_fields: store.clone(),
        banned_names: store.clone(),
        locales: Arc::new(LanguagePacks::new(["english", "deutsch"])),
        stats: store.clone(),
    };
    UserService::new(collaborators, Settings::default())
}

fn apply(record: &mut UserRecord, column: Column, value: &ColumnValue) {
    let int = || match value {
        ColumnValue::Int(v) => *v,
        ColumnValue::Text(s) => s.parse().unwrap_or(0),
    };
    let text = || match value {
        ColumnValue::Text(s) => s.clone(),
        ColumnValue::Int(v) => v.to_string(),
    };

    match column {
        Column::Username => record.username = text(),
        Column::Password => record.password = text(),
        Column::Salt => record.salt = text(),
        Column::LoginKey => record.login_key = text(),
        Column::Email => record.email = text(),
        Column::PostCount => record.post_count = int() as u32,
        Column::Avatar => record.avatar.url = text(),
        Column::AvatarType => record.avatar.kind = text(),
        Column::Usergroup => record.usergroup = int(),
        Column::AdditionalGroups => record.additional_groups = split_groups(&text()),
        Column::DisplayGroup => record.display_group = int(),
        Column::UserTitle => record.user_title = text(),
        Column::RegDate => record.reg_date = int(),
        Column::LastActive => record.last_active = int(),
        Column::LastVisit => record.last_visit = int(),
        Column::Website => record.website = text(),
        Column::Icq => record.icq = int(),
        Column::Aim => record.aim = text(),
        Column::Yahoo => record.yahoo = text(),
        Column::Msn => record.msn = text(),
        Column::Birthday => record.birthday = text(),
        Column::Signature => record.signature = text(),
        Column::Timezone => record.timezone = text(),
        Column::RegIp => record.reg_ip = text(),
        Column::Language => record.language = text(),
        Column::Away => record.away.away = int() != 0,
        Column::AwayDate => record.away.date = int(),
        Column::ReturnDate => record.away.return_date = text(),
        Column::AwayReason => record.away.reason = text(),
        Column::Referrer => record.referrer = int(),
        Column::Flag(flag) => {
            record.options.flags.insert(flag, int() != 0);
        }
        Column::ShowCodeButtons => record.options.show_code_buttons = int() != 0,
        Column::ThreadMode => record.options.thread_mode = ThreadMode::from_choice(&text()),
        Column::ThreadsPerPage => record.options.threads_per_page = int() as u32,
        Column::PostsPerPage => record.options.posts_per_page = int() as u32,
        Column::DaysPrune => record.options.days_prune = int(),
    }
}
