use std::collections::HashSet;

use crate::ports::Localization;
use crate::settings::Settings;

/// Set of installed language packs.
#[derive(Debug, Clone, Default)]
pub struct LanguagePacks {
    installed: HashSet<String>,
}

impl LanguagePacks {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            installed: names.into_iter().map(Into::into).collect(),
        }
    }

    /// The packs listed in `AGORA_LANGUAGES`.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.languages.iter().cloned())
    }
}

impl Localization for LanguagePacks {
    fn language_exists(&self, name: &str) -> bool {
        self.installed.contains(name)
    }
}
