//! Input sanitization.
//!
//! HTML goes through `ammonia`'s allowlist. Since one pass can expose a new
//! payload hidden inside another (`<scr<script>ipt>`), [`sanitize_to_fixpoint`]
//! repeats the pass until the output is stable, with an explicit round limit.
//!
//! These are called by the embedding shop's input handlers, not by the router here.

use regex::Regex;
use std::sync::LazyLock;

use super::Error;

/// Smallest round limit, so very short inputs still get a few passes.
const MIN_ROUNDS: usize = 8;

static LEGACY_TAG: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)<(?:\w+)\W+?[\w]").ok());

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fixpoint {
    Stabilized(String),
    CappedAtLimit,
}

#[must_use]
pub fn sanitize_html(input: &str) -> String {
    ammonia::clean(input)
}

/// Apply `pass` until its output stops changing, at most `limit` times.
pub fn fixpoint_with<F>(input: &str, limit: usize, mut pass: F) -> Fixpoint
where
    F: FnMut(&str) -> String,
{
    let mut current = input.to_string();
    for _ in 0..limit {
        let next = pass(&current);
        if next == current {
            return Fixpoint::Stabilized(current);
        }
        current = next;
    }
    Fixpoint::CappedAtLimit
}

/// Sanitize `input` with [`sanitize_html`] until stable.
///
/// The round limit is the input length (never below a small floor).
///
/// # Errors
/// Returns [`Error::SanitizationFailure`] if the output did not stabilize in time.
pub fn sanitize_to_fixpoint(input: &str) -> Result<String, Error> {
    let limit = input.len().max(MIN_ROUNDS);
    match fixpoint_with(input, limit, sanitize_html) {
        Fixpoint::Stabilized(output) => Ok(output),
        Fixpoint::CappedAtLimit => Err(Error::SanitizationFailure(limit)),
    }
}

/// Make `name` safe to use as a file name: no path separators, traversal or reserved names.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    sanitize_filename::sanitize(name)
}

/// Truncate `input` at the first URL-encoded null byte.
#[must_use]
pub fn cut_off_poison_null_byte(input: &str) -> &str {
    input.find("%00").map_or(input, |index| &input[..index])
}

/// Regex based tag stripping kept for stored data written by older releases.
#[deprecated(note = "bypassable; use sanitize_to_fixpoint for new code")]
#[must_use]
pub fn sanitize_legacy(input: &str) -> String {
    LEGACY_TAG.as_ref().map_or_else(
        || input.to_string(),
        |re| re.replace_all(input, "").into_owned(),
    )
}
