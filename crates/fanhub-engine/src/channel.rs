//! Channel grammar and wildcard expansion.
//!
//! Channels are `/`-separated segment paths such as `/chat/lobby`. A
//! subscription may instead name a pattern whose final segment is `*`
//! (one level) or `**` (any depth). Publications always use concrete
//! names.

use fanhub_core::error::AppError;
use fanhub_core::result::AppResult;

/// Characters allowed inside a channel segment, besides alphanumerics.
const SEGMENT_PUNCTUATION: &[char] = &['-', '_', '!', '~', '(', ')', '$', '@'];

fn is_segment_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || SEGMENT_PUNCTUATION.contains(&c)
}

fn is_plain_segment(segment: &str) -> bool {
    !segment.is_empty() && segment.chars().all(is_segment_char)
}

/// Split a channel into segments, or `None` when the shape is wrong
/// (missing leading slash, empty segment, trailing slash).
fn segments(channel: &str) -> Option<Vec<&str>> {
    let rest = channel.strip_prefix('/')?;
    if rest.is_empty() {
        return None;
    }
    let parts: Vec<&str> = rest.split('/').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return None;
    }
    Some(parts)
}

/// Whether `channel` is a valid concrete channel name (no wildcards).
pub fn is_valid_name(channel: &str) -> bool {
    match segments(channel) {
        Some(parts) => parts.iter().all(|p| is_plain_segment(p)),
        None => false,
    }
}

/// Whether `channel` is a valid pattern: plain segments followed by a
/// final `*` or `**`.
pub fn is_valid_pattern(channel: &str) -> bool {
    match segments(channel) {
        Some(parts) => match parts.split_last() {
            Some((last, init)) => {
                (*last == "*" || *last == "**") && init.iter().all(|p| is_plain_segment(p))
            }
            None => false,
        },
        None => false,
    }
}

/// Validate a channel a client may subscribe to: a concrete name or a
/// wildcard pattern.
pub fn validate_subscribable(channel: &str) -> AppResult<()> {
    if is_valid_name(channel) || is_valid_pattern(channel) {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "Invalid subscription channel: '{channel}'"
        )))
    }
}

/// Validate a channel a message may be published on: a concrete name
/// only.
pub fn validate_publishable(channel: &str) -> AppResult<()> {
    if is_valid_name(channel) {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "Invalid publish channel: '{channel}'"
        )))
    }
}

/// All subscription channels that match a concrete published name.
///
/// `/a/b` expands to `/**`, `/a/b`, `/a/*` and `/a/**`; a publication on
/// `/a/b` must reach subscribers of any of those. The caller validates
/// the name first.
pub fn expand(channel: &str) -> Vec<String> {
    let parts = match segments(channel) {
        Some(parts) => parts,
        None => return Vec::new(),
    };

    let mut expansions = vec!["/**".to_string(), channel.to_string()];

    let mut glob = parts.clone();
    if let Some(last) = glob.last_mut() {
        *last = "*";
    }
    expansions.push(format!("/{}", glob.join("/")));

    for depth in 1..parts.len() {
        let mut prefix = parts[..depth].to_vec();
        prefix.push("**");
        expansions.push(format!("/{}", prefix.join("/")));
    }

    expansions
}
