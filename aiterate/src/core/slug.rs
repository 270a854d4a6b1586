//! Output directory slug normalization.

use crate::core::fence::strip_code_fence;

/// Directory name used when the model cannot produce a usable slug.
pub const DEFAULT_DIRECTORY_NAME: &str = "generated-function";

/// Prefix prepended when a slug does not start with a lowercase letter.
pub const NON_LETTER_PREFIX: &str = "fn-";

pub const MAX_SLUG_LEN: usize = 30;

/// Normalize arbitrary text into a directory slug.
///
/// The result contains only `[a-z0-9-]`, has no doubled hyphens and no leading or
/// trailing hyphen, starts with a letter, and is at most [`MAX_SLUG_LEN`] bytes.
/// Returns `None` when nothing usable remains.
pub fn sanitize_slug(raw: &str) -> Option<String> {
    let lowered = strip_code_fence(raw).to_lowercase();
    let mapped: String = lowered
        .chars()
        .map(|ch| {
            if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' {
                ch
            } else {
                '-'
            }
        })
        .collect();

    let mut slug = collapse_hyphens(&mapped);
    if slug.is_empty() {
        return None;
    }
    if !slug.starts_with(|ch: char| ch.is_ascii_lowercase()) {
        slug = format!("{NON_LETTER_PREFIX}{slug}");
    }
    if slug.len() > MAX_SLUG_LEN {
        slug.truncate(MAX_SLUG_LEN);
        slug = slug.trim_end_matches('-').to_string();
    }
    Some(slug)
}

fn collapse_hyphens(input: &str) -> String {
    input
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
