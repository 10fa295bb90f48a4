//! Variable Substituter (§4.2): single-pass `{{NAME}}` expansion.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::TransclusionError;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([A-Za-z0-9_-]+)\}\}").expect("static pattern is valid"));

/// Expand `{{name}}` placeholders in `path` using `variables`.
///
/// Lenient (`strict = false`): unknown names are left untouched in the
/// output. Strict: the first unknown name short-circuits with
/// [`TransclusionError::UndefinedVariable`]. Substitution never re-scans its
/// own output, so a variable whose value itself contains `{{...}}` is not
/// expanded again.
pub fn substitute(
    path: &str,
    variables: &HashMap<String, String>,
    strict: bool,
) -> Result<String, TransclusionError> {
    if strict {
        for caps in PLACEHOLDER.captures_iter(path) {
            let name = &caps[1];
            if !variables.contains_key(name) {
                return Err(TransclusionError::UndefinedVariable {
                    name: name.to_string(),
                });
            }
        }
    }

    let mut result = String::with_capacity(path.len());
    let mut last_end = 0;
    for caps in PLACEHOLDER.captures_iter(path) {
        let whole = caps.get(0).expect("group 0 always matches");
        result.push_str(&path[last_end..whole.start()]);
        let name = &caps[1];
        match variables.get(name) {
            Some(value) => result.push_str(value),
            None => result.push_str(whole.as_str()),
        }
        last_end = whole.end();
    }
    result.push_str(&path[last_end..]);

    Ok(result)
}
