//! Contract of the wrapped LLM request library
//!
//! The adapter does no networking of its own. It hands an [`LlmRequest`] and a
//! [`ResponseHandler`] to a [`RequestLibrary`] implementation, which performs
//! the request however it likes and reports back through the handler.
//!
//! The handler may be called several times for one request: intermediate
//! chunks ([`Response::Reasoning`], [`Response::ToolCall`],
//! [`Response::ToolResult`]) can arrive before the terminal one
//! ([`Response::Text`], [`Response::Aborted`], [`Response::Failed`]).

use crate::translate::descriptor::TranslationRequest;
use serde_json::Value;

/// Everything the library needs to send one request
#[derive(Debug, Clone, PartialEq)]
pub struct LlmRequest {
    pub prompt: String,
    pub buffer: Option<String>,
    pub position: Option<usize>,
    pub system_prompt: String,
    pub stream: bool,
    pub backend: String,
    pub model: Option<String>,
    /// Opaque to the library; returned in [`RequestInfo::context`]
    pub context: TranslationRequest,
}

/// Shape of a value delivered to the completion handler
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Finished response text
    Text(String),
    /// The request was cancelled
    Aborted,
    /// No response; details are in [`RequestInfo`]
    Failed,
    /// Reasoning/thinking output emitted before the answer
    Reasoning(String),
    /// The model asked to call a tool
    ToolCall(Value),
    /// Result of a tool call
    ToolResult(Value),
}

impl Response {
    /// Whether this ends the request
    pub fn is_terminal(&self) -> bool {
        matches!(self, Response::Text(_) | Response::Aborted | Response::Failed)
    }
}

/// Request metadata delivered alongside each [`Response`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestInfo {
    pub context: Option<TranslationRequest>,
    pub status: Option<String>,
    pub error: Option<String>,
}

impl RequestInfo {
    pub fn with_context(context: TranslationRequest) -> Self {
        Self {
            context: Some(context),
            status: None,
            error: None,
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Completion handler passed to [`RequestLibrary::request`]
pub type ResponseHandler = Box<dyn FnMut(Response, RequestInfo) + Send + 'static>;

/// An LLM request library the adapter can delegate to
pub trait RequestLibrary: Send + Sync {
    /// Name used in logs and error messages
    fn name(&self) -> &str;

    /// Whether the library can take requests right now
    fn is_available(&self) -> bool;

    /// Start a request
    ///
    /// Must not block. The handler is called, possibly from another task, with
    /// any number of intermediate chunks and then once with a terminal response.
    fn request(&self, request: LlmRequest, handler: ResponseHandler);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::descriptor::Content;
    use serde_json::json;

    #[test]
    fn test_terminal_shapes() {
        assert!(Response::Text("ok".to_string()).is_terminal());
        assert!(Response::Aborted.is_terminal());
        assert!(Response::Failed.is_terminal());
    }

    #[test]
    fn test_chunk_shapes_are_not_terminal() {
        assert!(!Response::Reasoning("thinking".to_string()).is_terminal());
        assert!(!Response::ToolCall(json!({"name": "lookup"})).is_terminal());
        assert!(!Response::ToolResult(json!("42")).is_terminal());
    }

    #[test]
    fn test_request_info_builder() {
        let context = TranslationRequest::new(Content::Prompt("p".to_string()));
        let info = RequestInfo::with_context(context.clone())
            .with_status("502")
            .with_error("bad gateway");
        assert_eq!(info.context, Some(context));
        assert_eq!(info.status.as_deref(), Some("502"));
        assert_eq!(info.error.as_deref(), Some("bad gateway"));
    }
}
