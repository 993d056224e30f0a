//! Prompt construction and failure-message formatting

use crate::translate::descriptor::Content;
use crate::translate::error::{AdapterError, AdapterResult};

/// Placeholder the user prompt template must contain exactly once
pub const PLACEHOLDER: &str = "%s";

/// Appended to every failure message
pub const FAILURE_NOTICE: &str = "Translation failed.";

/// Check that a template has exactly one placeholder
pub fn validate_template(template: &str) -> AdapterResult<()> {
    let count = template.matches(PLACEHOLDER).count();
    if count != 1 {
        return Err(AdapterError::ConfigError(format!(
            "User prompt template must contain exactly one '{}' placeholder, found {}",
            PLACEHOLDER, count
        )));
    }
    Ok(())
}

/// Build the prompt for `content`
///
/// A [`Content::Prompt`] is returned unchanged. A [`Content::Input`] replaces the
/// template's placeholder; the rest of the template is kept byte for byte.
pub fn build_prompt(template: &str, content: &Content) -> String {
    match content {
        Content::Prompt(prompt) => prompt.clone(),
        Content::Input(input) => template.replacen(PLACEHOLDER, input, 1),
    }
}

/// Format the message delivered for an aborted or empty response
///
/// The non-empty parts of `[prefix, status, error]` are joined with a space,
/// followed by [`FAILURE_NOTICE`], and the whole is trimmed. Whitespace inside
/// the joined string is kept as the library reported it.
///
/// # Example
///
/// ```ignore
/// let msg = failure_message("[immersive-translate]", Some("429"), Some("rate limited"));
/// assert_eq!(msg, "[immersive-translate] 429 rate limited Translation failed.");
/// ```
pub fn failure_message(prefix: &str, status: Option<&str>, error: Option<&str>) -> String {
    let parts: Vec<&str> = [Some(prefix), status, error]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect();

    format!("{} {}", parts.join(" "), FAILURE_NOTICE)
        .trim()
        .to_string()
}
