use agora_types::{Mode, RenameTarget, Uid};

/// Reasons a handler may not be written. Always fatal for the request:
/// no storage write happens once one of these is raised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Precondition {
    #[error("user data must be validated before it is written")]
    NotValidated,
    #[error("user data carries {errors} validation error(s)")]
    Invalid { errors: usize },
    #[error("user data was already handed to the writer")]
    AlreadyPersisted,
    #[error("handler was validated for {actual:?} but written as {expected:?}")]
    WrongMode { expected: Mode, actual: Mode },
}

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("precondition violated: {0}")]
    Precondition(Precondition),

    #[error("proposal can no longer be changed once validated")]
    Frozen,

    #[error("an update needs the uid of the user to change")]
    MissingUid,

    #[error("user {0} not found")]
    UserNotFound(Uid),

    /// Not every denormalized copy took the new name. When `compensated` is
    /// set, the user row and every copy carry the previous name again.
    #[error(
        "rename of user {uid} failed at {failed} after {} of {} targets (compensated: {compensated}): {cause}",
        .completed.len(),
        RenameTarget::ALL.len()
    )]
    PartialPropagation {
        uid: Uid,
        completed: Vec<RenameTarget>,
        failed: RenameTarget,
        compensated: bool,
        cause: anyhow::Error,
    },

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl From<Precondition> for UserError {
    fn from(p: Precondition) -> Self {
        UserError::Precondition(p)
    }
}
