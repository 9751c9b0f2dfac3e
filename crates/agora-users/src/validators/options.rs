use agora_types::{AccountFlag, Mode, NormalizedOptions, OptionsInput, ThreadMode};

use crate::settings::Settings;

/// Normalize account options. On insert every option gets a value; on update
/// only submitted options are carried forward.
pub fn normalize_options(
    input: Option<&OptionsInput>,
    mode: Mode,
    settings: &Settings,
) -> NormalizedOptions {
    let insert = mode == Mode::Insert;
    let empty = OptionsInput::default();
    let input = input.unwrap_or(&empty);
    let mut out = NormalizedOptions::default();

    for flag in AccountFlag::ALL {
        match input.flags.get(&flag) {
            Some(value) => {
                out.flags.insert(flag, *value);
            }
            None if insert => {
                out.flags.insert(flag, flag.default_value());
            }
            None => {}
        }
    }

    out.show_code_buttons = match input.show_code_buttons {
        Some(v) => Some(v != 0),
        None => insert.then_some(true),
    };

    out.thread_mode = match input.thread_mode.as_deref() {
        Some(choice) => Some(ThreadMode::from_choice(choice)),
        None => insert.then_some(ThreadMode::Linear),
    };

    out.threads_per_page = match input.threads_per_page {
        Some(v) => Some(clamp_page_size(v, &settings.threads_per_page_options)),
        None => insert.then_some(0),
    };
    out.posts_per_page = match input.posts_per_page {
        Some(v) => Some(clamp_page_size(v, &settings.posts_per_page_options)),
        None => insert.then_some(0),
    };

    out.days_prune = match input.days_prune {
        Some(v) => Some(v.max(0)),
        None => insert.then_some(0),
    };

    out
}

/// Cap a page size at the largest allowed choice. An empty allow-list
/// leaves the value alone.
pub fn clamp_page_size(requested: u32, allowed: &[u32]) -> u32 {
    match allowed.iter().max() {
        Some(&biggest) if requested > biggest => biggest,
        _ => requested,
    }
}
