use agora_types::{
    ErrorCode, Mode, NormalizedUser, PersistedUser, ValidationError, ValidationErrors,
};
use chrono::Utc;
use tracing::{debug, info, instrument};

use crate::error::UserError;
use crate::handler::UserDataHandler;
use crate::profile_fields::validate_profile_fields;
use crate::secret;
use crate::service::UserService;
use crate::validators::{self, Checked};

impl UserService {
    /// Run every applicable check on the handler's proposal.
    ///
    /// On insert all attributes are checked (absent ones with their empty
    /// value); on update only the supplied ones. Problems are collected, not
    /// raised: `Ok(false)` means the proposal was rejected and
    /// `handler.errors()` says why. `Err` is reserved for storage failures
    /// and misuse.
    #[instrument(name = "agora.users.validate", skip_all, fields(mode = ?handler.mode()))]
    pub fn validate(&self, handler: &mut UserDataHandler) -> Result<bool, UserError> {
        handler.ensure_not_consumed()?;

        let mode = handler.mode();
        let insert = mode == Mode::Insert;
        let user = handler.proposal();
        let now = Utc::now();
        let timestamp = now.timestamp();

        let previous = match mode {
            Mode::Insert => None,
            Mode::Update => {
                let uid = user.uid.ok_or(UserError::MissingUid)?;
                let found = self
                    .store
                    .find_user(uid)?
                    .ok_or(UserError::UserNotFound(uid))?;
                Some(found)
            }
        };

        let mut errors = ValidationErrors::new();
        let mut out = NormalizedUser {
            uid: previous.as_ref().map(|p| p.uid),
            ..NormalizedUser::default()
        };

        if insert || user.username.is_some() {
            let name = validators::normalize_username(user.username.as_deref().unwrap_or(""));
            out.username = self.check_username_change(name, previous.as_ref(), &mut errors)?;
        }

        if insert || user.password.is_some() {
            let password = user.password.as_deref().unwrap_or("");
            match validators::check_password(
                password,
                user.password_confirm.as_deref(),
                &self.settings,
            ) {
                Ok(()) => {
                    let salt = previous
                        .as_ref()
                        .map(|p| p.record.salt.as_str())
                        .filter(|s| !s.is_empty());
                    out.secret = Some(secret::derive(password, salt)?);
                }
                Err(e) => errors.push(e),
            }
        }

        if insert || user.usergroup.is_some() {
            out.usergroup = Some(user.usergroup.unwrap_or(self.settings.default_usergroup));
        }
        out.additional_groups = user.additional_groups.clone();
        out.display_group = user.display_group;
        out.post_count = user.post_count;
        out.avatar = user.avatar.clone();
        out.user_title = user.user_title.as_deref().map(|t| t.trim().to_string());
        out.signature = user.signature.clone();
        out.timezone = user.timezone.as_deref().map(|t| t.trim().to_string());
        out.reg_ip = user.reg_ip.clone();
        out.aim = user.aim.as_deref().map(|h| h.trim().to_string());
        out.yahoo = user.yahoo.as_deref().map(|h| h.trim().to_string());

        if insert || user.email.is_some() {
            let banned = &self.settings.banned_emails;
            out.email = keep(
                validators::check_email(
                    user.email.as_deref().unwrap_or(""),
                    user.email_confirm.as_deref(),
                    banned,
                ),
                &mut errors,
            );
        }

        if insert || user.website.is_some() {
            out.website = keep(
                validators::normalize_website(user.website.as_deref().unwrap_or("")),
                &mut errors,
            );
        }

        if insert || user.icq.is_some() {
            out.icq = keep(
                validators::check_icq(user.icq.as_deref().unwrap_or("")),
                &mut errors,
            );
        }

        if insert || user.msn.is_some() {
            out.msn = keep(
                validators::check_msn(user.msn.as_deref().unwrap_or("")),
                &mut errors,
            );
        }

        if insert || user.birthday.is_some() {
            out.birthday = keep(
                validators::check_birthday(user.birthday.unwrap_or_default(), now.date_naive()),
                &mut errors,
            );
        }

        if insert || user.profile_fields.is_some() {
            let schema = self.profile_fields.schema()?;
            let empty = Default::default();
            let values = user.profile_fields.as_ref().unwrap_or(&empty);
            out.user_fields = Some(validate_profile_fields(
                &schema,
                values,
                user.profile_fields_editable,
                &mut errors,
            ));
        }

        if insert || user.referrer.is_some() {
            let resolved = validators::resolve_referrer(
                user.referrer.as_deref().unwrap_or(""),
                self.settings.use_referrals,
                |name| self.store.find_uid_by_username(name),
            )?;
            out.referrer = keep(resolved, &mut errors);
        }

        if insert || user.options.is_some() {
            out.options = Some(validators::normalize_options(
                user.options.as_ref(),
                mode,
                &self.settings,
            ));
        }

        if insert || user.reg_date.is_some() {
            out.reg_date = Some(validators::normalize_timestamp(
                user.reg_date.unwrap_or(0),
                timestamp,
            ));
        }
        if insert || user.last_visit.is_some() {
            out.last_visit = Some(validators::normalize_timestamp(
                user.last_visit.unwrap_or(0),
                timestamp,
            ));
        }
        if insert || user.last_active.is_some() {
            out.last_active = Some(validators::normalize_timestamp(
                user.last_active.unwrap_or(0),
                timestamp,
            ));
        }

        if insert || user.away.is_some() {
            let (status, error) =
                validators::check_away(user.away.as_ref(), self.settings.allow_away, timestamp);
            out.away = Some(status);
            errors.extend(error);
        }

        if insert || user.language.is_some() {
            out.language = keep(
                validators::check_language(
                    user.language.as_deref().unwrap_or(""),
                    self.locales.as_ref(),
                ),
                &mut errors,
            );
        }

        self.hooks.post_validate(mode, &mut out, &mut errors);

        let accepted = errors.is_empty();
        if accepted {
            debug!("user data accepted");
        } else {
            info!(errors = errors.len(), "user data rejected");
        }
        handler.finish_validation(out, errors);
        Ok(accepted)
    }

    /// Name checks run only for an actual change; resubmitting the current
    /// name returns `None` so nothing is written for it.
    fn check_username_change(
        &self,
        name: String,
        previous: Option<&PersistedUser>,
        errors: &mut ValidationErrors,
    ) -> Result<Option<String>, UserError> {
        if let Some(prev) = previous {
            if !prev.record.username.is_empty() && prev.record.username == name {
                debug!("username unchanged, skipping checks");
                return Ok(None);
            }
        }

        let banned = self.banned_names.banned_usernames()?;
        let checked = validators::check_username(&name, &self.settings, &banned);
        let syntax_ok = checked.is_ok();
        errors.extend(checked.err());

        if syntax_ok && self.store.username_taken(&name, previous.map(|p| p.uid))? {
            errors.push(ValidationError::with_params(
                ErrorCode::AlreadyExists,
                "username_exists",
                [&name],
            ));
        }

        Ok(Some(name))
    }
}

/// Record a failed check and keep the value of a passing one.
fn keep<T>(checked: Checked<T>, errors: &mut ValidationErrors) -> Option<T> {
    match checked {
        Ok(value) => Some(value),
        Err(e) => {
            errors.push(e);
            None
        }
    }
}
