use std::collections::BTreeMap;

use agora_types::{
    ErrorCode, FieldId, FieldValue, ProfileFieldDefinition, ProfileSchema, ValidationError,
    ValidationErrors,
};
use tracing::debug;

/// Check submitted profile-field values against the schema and return the
/// storage form of every submitted value for a known field.
///
/// Locked (non-editable) fields are only considered when `include_locked` is
/// set. Values are copied even when they produced an error, so the caller
/// sees the complete picture.
pub fn validate_profile_fields(
    schema: &ProfileSchema,
    values: &BTreeMap<FieldId, FieldValue>,
    include_locked: bool,
    errors: &mut ValidationErrors,
) -> BTreeMap<FieldId, String> {
    let mut accepted = BTreeMap::new();

    for field in schema
        .fields
        .iter()
        .filter(|f| include_locked || f.editable)
    {
        let value = values.get(&field.fid);

        if field.required && value.is_none_or(FieldValue::is_empty) {
            errors.push(ValidationError::with_params(
                ErrorCode::MissingField,
                "missing_required_profile_field",
                [&field.name],
            ));
        }

        let Some(value) = value else {
            continue;
        };

        if !value_allowed(field, value) {
            errors.push(ValidationError::with_params(
                ErrorCode::UnknownOption,
                "bad_profile_field_values",
                [&field.name],
            ));
        }

        accepted.insert(field.fid, value.joined());
    }

    let ignored = values.keys().filter(|fid| !accepted.contains_key(fid)).count();
    if ignored > 0 {
        debug!(
            ignored,
            revision = schema.revision,
            "dropped values for unknown or locked profile fields"
        );
    }

    accepted
}

fn value_allowed(field: &ProfileFieldDefinition, value: &FieldValue) -> bool {
    if field.kind.is_multi_choice() {
        match value {
            FieldValue::Multi(items) => items.iter().all(|item| field.allows(item)),
            FieldValue::Single(item) => item.trim().is_empty() || field.allows(item),
        }
    } else if field.kind.is_single_choice() {
        let chosen = value.joined();
        chosen.trim().is_empty() || field.allows(&chosen)
    } else {
        true
    }
}
