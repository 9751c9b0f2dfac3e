use serde::{Deserialize, Serialize};

use crate::FieldId;

/// Input widget of a dynamic profile field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Textarea,
    Select,
    Radio,
    MultiSelect,
    Checkbox,
}

impl FieldKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "text" => Some(Self::Text),
            "textarea" => Some(Self::Textarea),
            "select" => Some(Self::Select),
            "radio" => Some(Self::Radio),
            "multiselect" => Some(Self::MultiSelect),
            "checkbox" => Some(Self::Checkbox),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Textarea => "textarea",
            Self::Select => "select",
            Self::Radio => "radio",
            Self::MultiSelect => "multiselect",
            Self::Checkbox => "checkbox",
        }
    }

    /// Kinds that accept several options at once.
    pub fn is_multi_choice(self) -> bool {
        matches!(self, Self::MultiSelect | Self::Checkbox)
    }

    pub fn is_single_choice(self) -> bool {
        matches!(self, Self::Select | Self::Radio)
    }
}

/// Admin-defined extra attribute. Read-only to the user pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileFieldDefinition {
    pub fid: FieldId,
    pub name: String,
    pub kind: FieldKind,
    /// Allowed values for choice kinds, in display order.
    pub options: Vec<String>,
    pub required: bool,
    pub editable: bool,
    pub display_order: i64,
}

impl ProfileFieldDefinition {
    /// Parse the stored `kind\noption\noption...` form.
    pub fn parse_kind_spec(spec: &str) -> Option<(FieldKind, Vec<String>)> {
        let mut parts = spec.splitn(2, '\n');
        let kind = FieldKind::parse(parts.next()?)?;
        let options = parts
            .next()
            .map(|rest| {
                rest.split('\n')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        Some((kind, options))
    }

    pub fn kind_spec(&self) -> String {
        let mut spec = self.kind.as_str().to_string();
        for option in &self.options {
            spec.push('\n');
            spec.push_str(option);
        }
        spec
    }

    pub fn allows(&self, value: &str) -> bool {
        self.options.iter().any(|o| o == value.trim())
    }
}

/// Snapshot of the profile-field definitions at a given revision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSchema {
    /// Bumped whenever a definition is added or changed.
    pub revision: i64,
    /// Ordered by display order.
    pub fields: Vec<ProfileFieldDefinition>,
}

/// Value submitted for a profile field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Single(String),
    Multi(Vec<String>),
}

impl FieldValue {
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Single(v) => v.trim().is_empty(),
            FieldValue::Multi(vs) => vs.iter().all(|v| v.trim().is_empty()),
        }
    }

    /// Storage form: multiple values are newline separated.
    pub fn joined(&self) -> String {
        match self {
            FieldValue::Single(v) => v.clone(),
            FieldValue::Multi(vs) => vs.join("\n"),
        }
    }
}
