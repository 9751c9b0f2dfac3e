use std::collections::BTreeMap;

use agora_types::{
    Column, ColumnValue, FieldId, InsertedUser, Mode, NormalizedUser, PersistedUser, Rename,
    RenameTarget, Uid, UpdatedUser, UserChanges, UserOptions, UserRecord, WritePayload,
    join_groups,
};
use anyhow::anyhow;
use tracing::{debug, info, instrument, warn};

use crate::error::UserError;
use crate::handler::UserDataHandler;
use crate::service::UserService;

impl UserService {
    /// Write a validated insert. The handler is consumed.
    #[instrument(name = "agora.users.insert", skip_all)]
    pub fn insert_user(&self, handler: &mut UserDataHandler) -> Result<InsertedUser, UserError> {
        let user = handler.take_for_write(Mode::Insert)?;
        let supplied_fields = user.user_fields.clone().unwrap_or_default();
        let mut record = self.build_record(user)?;

        self.hooks
            .before_write(&mut WritePayload::Insert(&mut record));

        let uid = self.store.insert_user(&record)?;

        let fields = self.extended_fields_for(&supplied_fields)?;
        self.store.insert_user_fields(uid, &fields)?;

        if let Err(e) = self.stats.refresh() {
            warn!(uid, error = %e, "stats refresh failed after user insert");
        }

        info!(uid, username = %record.username, "user created");
        Ok(InsertedUser {
            uid,
            username: record.username,
            login_key: record.login_key,
            password_hash: record.password,
            email: record.email,
            usergroup: record.usergroup,
        })
    }

    /// Write a validated update: only supplied attributes are touched. A
    /// changed username is propagated to every denormalized copy.
    #[instrument(name = "agora.users.update", skip_all)]
    pub fn update_user(&self, handler: &mut UserDataHandler) -> Result<UpdatedUser, UserError> {
        let user = handler.take_for_write(Mode::Update)?;
        let uid = user.uid.ok_or(UserError::MissingUid)?;
        let previous = self
            .store
            .find_user(uid)?
            .ok_or(UserError::UserNotFound(uid))?;

        let user_fields = user.user_fields.clone();
        let mut changes = build_changes(user);

        self.hooks.before_write(&mut WritePayload::Update {
            uid,
            changes: &mut changes,
        });

        if !changes.is_empty() {
            self.store.update_user(uid, &changes)?;
            debug!(uid, columns = changes.len(), "user row updated");
        }

        if let Some(values) = user_fields {
            if self.store.user_fields_exist(uid)? {
                self.store.update_user_fields(uid, &values)?;
            } else {
                let fields = self.extended_fields_for(&values)?;
                self.store.insert_user_fields(uid, &fields)?;
            }
        }

        let renamed = match changes.get(Column::Username) {
            Some(ColumnValue::Text(name))
                if !name.is_empty() && *name != previous.record.username =>
            {
                self.propagate_rename(uid, &previous.record.username, name)?;
                Some(Rename {
                    from: previous.record.username.clone(),
                    to: name.clone(),
                })
            }
            _ => None,
        };

        info!(uid, columns = changes.len(), renamed = renamed.is_some(), "user updated");
        Ok(UpdatedUser {
            uid,
            columns_written: changes.len(),
            renamed,
        })
    }

    /// Write the handler in whatever mode it was validated for and read the
    /// stored row back.
    pub fn persist(&self, handler: &mut UserDataHandler) -> Result<PersistedUser, UserError> {
        let uid = match handler.mode() {
            Mode::Insert => self.insert_user(handler)?.uid,
            Mode::Update => self.update_user(handler)?.uid,
        };
        self.store
            .find_user(uid)?
            .ok_or(UserError::UserNotFound(uid))
    }

    fn build_record(&self, user: NormalizedUser) -> Result<UserRecord, UserError> {
        let secret = user
            .secret
            .ok_or_else(|| anyhow!("accepted insert carries no password digest"))?;

        let mut options = UserOptions::default();
        if let Some(changes) = &user.options {
            options.apply(changes);
        }

        Ok(UserRecord {
            username: user.username.unwrap_or_default(),
            password: secret.hash,
            salt: secret.salt,
            login_key: secret.login_key,
            email: user.email.unwrap_or_default(),
            post_count: user.post_count.unwrap_or(0),
            avatar: user.avatar.unwrap_or_default(),
            usergroup: user.usergroup.unwrap_or(self.settings.default_usergroup),
            additional_groups: user.additional_groups.unwrap_or_default(),
            display_group: user.display_group.unwrap_or(0),
            user_title: user.user_title.unwrap_or_default(),
            reg_date: user.reg_date.unwrap_or(0),
            last_active: user.last_active.unwrap_or(0),
            last_visit: user.last_visit.unwrap_or(0),
            website: user.website.unwrap_or_default(),
            icq: user.icq.unwrap_or(0),
            aim: user.aim.unwrap_or_default(),
            yahoo: user.yahoo.unwrap_or_default(),
            msn: user.msn.unwrap_or_default(),
            birthday: user.birthday.unwrap_or_default(),
            signature: user.signature.unwrap_or_default(),
            options,
            timezone: user.timezone.unwrap_or_default(),
            reg_ip: user.reg_ip.unwrap_or_default(),
            language: user.language.unwrap_or_default(),
            away: user.away.unwrap_or_default(),
            referrer: user.referrer.unwrap_or(0),
        })
    }

    /// A full extended record: every field in the current schema, empty
    /// unless supplied.
    fn extended_fields_for(
        &self,
        supplied: &BTreeMap<FieldId, String>,
    ) -> Result<BTreeMap<FieldId, String>, UserError> {
        let schema = self.profile_fields.schema()?;
        let mut fields: BTreeMap<FieldId, String> = schema
            .fields
            .iter()
            .map(|f| (f.fid, String::new()))
            .collect();
        fields.extend(supplied.iter().map(|(fid, v)| (*fid, v.clone())));
        Ok(fields)
    }

    /// Rename every denormalized copy in order. If one target fails, the
    /// targets already done are renamed back (last first), then the user row
    /// itself, so a retry sees a real name change again.
    fn propagate_rename(&self, uid: Uid, old: &str, new: &str) -> Result<(), UserError> {
        let mut completed = Vec::with_capacity(RenameTarget::ALL.len());

        for target in RenameTarget::ALL {
            match self.store.rename_author(target, uid, new) {
                Ok(rows) => {
                    debug!(uid, %target, rows, "rename propagated");
                    completed.push(target);
                }
                Err(cause) => {
                    warn!(uid, %target, error = %cause, "rename propagation failed");
                    let compensated = self.compensate_rename(uid, old, &completed);
                    return Err(UserError::PartialPropagation {
                        uid,
                        completed,
                        failed: target,
                        compensated,
                        cause,
                    });
                }
            }
        }
        Ok(())
    }

    fn compensate_rename(&self, uid: Uid, old: &str, completed: &[RenameTarget]) -> bool {
        let mut clean = true;
        for target in completed.iter().rev() {
            if let Err(e) = self.store.rename_author(*target, uid, old) {
                warn!(uid, %target, error = %e, "could not restore previous name");
                clean = false;
            }
        }

        let mut revert = UserChanges::new();
        revert.set(Column::Username, old);
        if let Err(e) = self.store.update_user(uid, &revert) {
            warn!(uid, error = %e, "could not restore previous name on user row");
            clean = false;
        }
        clean
    }
}

/// Column assignments for every attribute present in an accepted update.
fn build_changes(user: NormalizedUser) -> UserChanges {
    let mut changes = UserChanges::new();

    if let Some(name) = user.username {
        changes.set(Column::Username, name);
    }
    if let Some(secret) = user.secret {
        changes.set(Column::Password, secret.hash);
        changes.set(Column::Salt, secret.salt);
        changes.set(Column::LoginKey, secret.login_key);
    }
    if let Some(email) = user.email {
        changes.set(Column::Email, email);
    }
    if let Some(group) = user.usergroup {
        changes.set(Column::Usergroup, group);
    }
    if let Some(groups) = user.additional_groups {
        changes.set(Column::AdditionalGroups, join_groups(&groups));
    }
    if let Some(group) = user.display_group {
        changes.set(Column::DisplayGroup, group);
    }
    if let Some(count) = user.post_count {
        changes.set(Column::PostCount, count);
    }
    if let Some(avatar) = user.avatar {
        changes.set(Column::Avatar, avatar.url);
        changes.set(Column::AvatarType, avatar.kind);
    }
    if let Some(title) = user.user_title {
        changes.set(Column::UserTitle, title);
    }
    if let Some(signature) = user.signature {
        changes.set(Column::Signature, signature);
    }
    if let Some(tz) = user.timezone {
        changes.set(Column::Timezone, tz);
    }
    if let Some(ip) = user.reg_ip {
        changes.set(Column::RegIp, ip);
    }
    if let Some(website) = user.website {
        changes.set(Column::Website, website);
    }
    if let Some(icq) = user.icq {
        changes.set(Column::Icq, icq);
    }
    if let Some(aim) = user.aim {
        changes.set(Column::Aim, aim);
    }
    if let Some(yahoo) = user.yahoo {
        changes.set(Column::Yahoo, yahoo);
    }
    if let Some(msn) = user.msn {
        changes.set(Column::Msn, msn);
    }
    if let Some(birthday) = user.birthday {
        changes.set(Column::Birthday, birthday);
    }
    if let Some(options) = user.options {
        for (flag, value) in options.flags {
            changes.set(Column::Flag(flag), value);
        }
        if let Some(v) = options.show_code_buttons {
            changes.set(Column::ShowCodeButtons, v);
        }
        if let Some(mode) = options.thread_mode {
            changes.set(Column::ThreadMode, mode.as_str());
        }
        if let Some(tpp) = options.threads_per_page {
            changes.set(Column::ThreadsPerPage, tpp);
        }
        if let Some(ppp) = options.posts_per_page {
            changes.set(Column::PostsPerPage, ppp);
        }
        if let Some(days) = options.days_prune {
            changes.set(Column::DaysPrune, days);
        }
    }
    if let Some(ts) = user.reg_date {
        changes.set(Column::RegDate, ts);
    }
    if let Some(ts) = user.last_visit {
        changes.set(Column::LastVisit, ts);
    }
    if let Some(ts) = user.last_active {
        changes.set(Column::LastActive, ts);
    }
    if let Some(away) = user.away {
        changes.set(Column::Away, away.away);
        changes.set(Column::AwayDate, away.date);
        changes.set(Column::ReturnDate, away.return_date);
        changes.set(Column::AwayReason, away.reason);
    }
    if let Some(referrer) = user.referrer {
        changes.set(Column::Referrer, referrer);
    }
    if let Some(language) = user.language {
        changes.set(Column::Language, language);
    }

    changes
}
