//! Agora shared types
//!
//! The user data model as it moves through the pipeline:
//! `ProposedUser` (caller input) -> `NormalizedUser` (validated) ->
//! `UserRecord` / `UserChanges` (write payloads) -> `PersistedUser` (stored row).
pub mod api;
pub mod errors;
pub mod events;
pub mod models;
pub mod profile;

pub use api::{InsertedUser, Mode, Rename, UpdatedUser};
pub use errors::{ErrorCode, ValidationError, ValidationErrors};
pub use events::{Column, ColumnValue, RenameTarget, UserChanges, WritePayload};
pub use models::*;
pub use profile::{FieldKind, FieldValue, ProfileFieldDefinition, ProfileSchema};

/// Numeric user identifier assigned by storage.
pub type Uid = i64;

/// Identifier of a dynamic profile field.
pub type FieldId = i64;
