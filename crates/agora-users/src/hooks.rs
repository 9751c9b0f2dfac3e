use std::sync::Arc;

use agora_types::{Mode, NormalizedUser, ValidationErrors, WritePayload};
use tracing::debug;

/// Extension point into the pipeline. Both callbacks default to no-ops so a
/// hook implements only what it needs.
pub trait UserHook: Send + Sync {
    /// Runs after the field validators, before the proposal is frozen.
    /// Errors pushed here fail validation like any other.
    fn post_validate(
        &self,
        _mode: Mode,
        _user: &mut NormalizedUser,
        _errors: &mut ValidationErrors,
    ) {
    }

    /// Runs immediately before a user row is written.
    fn before_write(&self, _payload: &mut WritePayload<'_>) {}
}

/// Registered hooks, invoked in registration order.
#[derive(Clone, Default)]
pub struct HookBus {
    hooks: Vec<Arc<dyn UserHook>>,
}

impl HookBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, hook: Arc<dyn UserHook>) {
        self.hooks.push(hook);
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub(crate) fn post_validate(
        &self,
        mode: Mode,
        user: &mut NormalizedUser,
        errors: &mut ValidationErrors,
    ) {
        for hook in &self.hooks {
            hook.post_validate(mode, user, errors);
        }
        debug!(hooks = self.hooks.len(), "post-validate hooks ran");
    }

    pub(crate) fn before_write(&self, payload: &mut WritePayload<'_>) {
        for hook in &self.hooks {
            hook.before_write(payload);
        }
    }
}
