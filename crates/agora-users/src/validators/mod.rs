//! Per-attribute checks. Each one is a pure function of its input, the
//! settings and, where needed, a read-only collaborator; none of them stops
//! the others from running.

mod away;
mod birthday;
mod email;
mod language;
mod messaging;
mod options;
mod password;
mod referrer;
mod timestamps;
mod username;
mod website;

pub use away::check_away;
pub use birthday::{check_birthday, encode_birthday};
pub use email::{check_email, is_valid_email};
pub use language::check_language;
pub use messaging::{check_icq, check_msn};
pub use options::{clamp_page_size, normalize_options};
pub use password::check_password;
pub use referrer::resolve_referrer;
pub use timestamps::normalize_timestamp;
pub use username::{check_username, normalize_username};
pub use website::normalize_website;

use agora_types::ValidationError;

/// Outcome of a single check: the normalized value or the reason it was rejected.
pub type Checked<T> = Result<T, ValidationError>;
