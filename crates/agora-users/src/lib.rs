//! Agora user data handler
//!
//! Validate-then-persist pipeline for user accounts:
//! 1. wrap the caller's `ProposedUser` in a `UserDataHandler`
//! 2. `UserService::validate` runs every applicable field check and collects
//!    all problems at once
//! 3. only a validated, error-free handler may be written with
//!    `UserService::insert_user`, `update_user` or `persist`
pub mod error;
pub mod handler;
pub mod hooks;
pub mod locales;
pub mod ports;
pub mod profile_fields;
pub mod secret;
pub mod service;
pub mod settings;
pub mod validators;

mod validate;
mod writer;

#[cfg(test)]
mod testing;

pub use error::{Precondition, UserError};
pub use handler::{HandlerState, UserDataHandler};
pub use hooks::{HookBus, UserHook};
pub use locales::LanguagePacks;
pub use ports::{BannedNames, Localization, ProfileFieldRegistry, StatsCache, UserStore};
pub use service::{Collaborators, UserService};
pub use settings::Settings;
