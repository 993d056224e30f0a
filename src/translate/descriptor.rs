//! Per-request descriptor
//!
//! A [`TranslationRequest`] carries the text to translate and where the result
//! should go. The adapter never edits a caller's descriptor: it clones it and
//! fills in `status`, `error`, `backend` and `model` on the copy handed to the
//! completion callback.

use serde::{Deserialize, Serialize};

/// What to send to the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Content {
    /// A finished prompt, sent verbatim
    Prompt(String),
    /// Text substituted into the user prompt template
    Input(String),
}

impl Content {
    /// The text regardless of kind
    pub fn as_str(&self) -> &str {
        match self {
            Content::Prompt(s) | Content::Input(s) => s,
        }
    }
}

/// Key-value bundle describing one translation request
///
/// `buffer` and `position` are opaque to the adapter; they are forwarded to the
/// request library and returned to the callback untouched.
///
/// # Example
///
/// ```ignore
/// let request = TranslationRequest::new(Content::Input("Hello".into()))
///     .with_buffer("*scratch*")
///     .with_position(42);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRequest {
    pub content: Content,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl TranslationRequest {
    /// Create a descriptor with no target and no completion fields
    ///
    /// # Arguments
    /// * `content` - [`Content::Prompt`] to send as is, or [`Content::Input`]
    ///   to fill into the user prompt template
    ///
    /// # Example
    /// ```ignore
    /// let request = TranslationRequest::new(Content::Prompt("Translate: cat".into()));
    /// assert_eq!(request.backend, None);
    /// ```
    pub fn new(content: Content) -> Self {
        Self {
            content,
            buffer: None,
            position: None,
            status: None,
            error: None,
            backend: None,
            model: None,
        }
    }

    /// Name of the buffer the translation belongs to
    pub fn with_buffer(mut self, buffer: impl Into<String>) -> Self {
        self.buffer = Some(buffer.into());
        self
    }

    /// Offset in the buffer where the result should be inserted
    pub fn with_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }
}
