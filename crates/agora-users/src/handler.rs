use agora_types::{Mode, NormalizedUser, ProposedUser, ValidationError, ValidationErrors};

use crate::error::{Precondition, UserError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerState {
    Unvalidated,
    Validated,
    /// Handed to the writer; nothing more can happen to it.
    Consumed,
}

/// Request-scoped carrier for one proposal through validation and persistence.
#[derive(Debug)]
pub struct UserDataHandler {
    mode: Mode,
    proposal: ProposedUser,
    normalized: NormalizedUser,
    errors: ValidationErrors,
    state: HandlerState,
}

impl UserDataHandler {
    pub fn new(mode: Mode, proposal: ProposedUser) -> Self {
        Self {
            mode,
            proposal,
            normalized: NormalizedUser::default(),
            errors: ValidationErrors::new(),
            state: HandlerState::Unvalidated,
        }
    }

    pub fn insert(proposal: ProposedUser) -> Self {
        Self::new(Mode::Insert, proposal)
    }

    pub fn update(proposal: ProposedUser) -> Self {
        Self::new(Mode::Update, proposal)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn state(&self) -> HandlerState {
        self.state
    }

    pub fn proposal(&self) -> &ProposedUser {
        &self.proposal
    }

    /// The proposal may only change before validation.
    pub fn proposal_mut(&mut self) -> Result<&mut ProposedUser, UserError> {
        match self.state {
            HandlerState::Unvalidated => Ok(&mut self.proposal),
            _ => Err(UserError::Frozen),
        }
    }

    /// Validated values; empty until validation ran.
    pub fn normalized(&self) -> &NormalizedUser {
        &self.normalized
    }

    pub fn errors(&self) -> &[ValidationError] {
        self.errors.as_slice()
    }

    pub fn is_validated(&self) -> bool {
        self.state == HandlerState::Validated
    }

    /// Validated with no errors: ready to be written.
    pub fn is_valid(&self) -> bool {
        self.is_validated() && self.errors.is_empty()
    }

    pub(crate) fn ensure_not_consumed(&self) -> Result<(), UserError> {
        if self.state == HandlerState::Consumed {
            return Err(Precondition::AlreadyPersisted.into());
        }
        Ok(())
    }

    pub(crate) fn finish_validation(&mut self, normalized: NormalizedUser, errors: ValidationErrors) {
        self.normalized = normalized;
        self.errors = errors;
        self.state = HandlerState::Validated;
    }

    /// Check the write precondition and hand the normalized user to the
    /// writer. The handler is consumed even if the write later fails.
    pub(crate) fn take_for_write(&mut self, expected: Mode) -> Result<NormalizedUser, UserError> {
        match self.state {
            HandlerState::Consumed => return Err(Precondition::AlreadyPersisted.into()),
            HandlerState::Unvalidated => return Err(Precondition::NotValidated.into()),
            HandlerState::Validated => {}
        }
        if !self.errors.is_empty() {
            return Err(Precondition::Invalid {
                errors: self.errors.len(),
            }
            .into());
        }
        if self.mode != expected {
            return Err(Precondition::WrongMode {
                expected,
                actual: self.mode,
            }
            .into());
        }

        self.state = HandlerState::Consumed;
        Ok(std::mem::take(&mut self.normalized))
    }
}
