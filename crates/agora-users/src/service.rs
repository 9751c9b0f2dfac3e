use std::sync::Arc;

use agora_types::{Mode, ProposedUser};

use crate::error::UserError;
use crate::handler::UserDataHandler;
use crate::hooks::{HookBus, UserHook};
use crate::ports::{BannedNames, Localization, ProfileFieldRegistry, StatsCache, UserStore};
use crate::settings::Settings;

/// External collaborators of the pipeline.
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn UserStore>,
    pub profile_fields: Arc<dyn ProfileFieldRegistry>,
    pub banned_names: Arc<dyn BannedNames>,
    pub locales: Arc<dyn Localization>,
    pub stats: Arc<dyn StatsCache>,
}

/// Validation and persistence of user accounts.
///
/// Validation lives in `validate.rs`, writes in `writer.rs`.
#[derive(Clone)]
pub struct UserService {
    pub(crate) store: Arc<dyn UserStore>,
    pub(crate) profile_fields: Arc<dyn ProfileFieldRegistry>,
    pub(crate) banned_names: Arc<dyn BannedNames>,
    pub(crate) locales: Arc<dyn Localization>,
    pub(crate) stats: Arc<dyn StatsCache>,
    pub(crate) hooks: HookBus,
    pub(crate) settings: Settings,
}

impl UserService {
    pub fn new(collaborators: Collaborators, settings: Settings) -> Self {
        Self {
            store: collaborators.store,
            profile_fields: collaborators.profile_fields,
            banned_names: collaborators.banned_names,
            locales: collaborators.locales,
            stats: collaborators.stats,
            hooks: HookBus::new(),
            settings,
        }
    }

    /// Register an extension hook; hooks run in registration order.
    pub fn with_hook(mut self, hook: Arc<dyn UserHook>) -> Self {
        self.hooks.register(hook);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Validate a proposal in one call. The returned handler carries the
    /// normalized values and every error found; pass it to [`Self::persist`]
    /// when `is_valid()`.
    pub fn validate_proposal(
        &self,
        proposal: ProposedUser,
        mode: Mode,
    ) -> Result<UserDataHandler, UserError> {
        let mut handler = UserDataHandler::new(mode, proposal);
        self.validate(&mut handler)?;
        Ok(handler)
    }
}
