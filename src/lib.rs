//! Immersive-translate request adapter
//!
//! Forwards translation requests from an editor integration to an LLM request
//! library and delivers each result to a one-shot callback. See [`translate`]
//! for the adapter, its configuration and the request libraries.

pub mod translate;

// Re-export the adapter surface for convenient access
pub use translate::{
    AdapterConfig, AdapterError, AdapterResult, Completion, Content, HostDefaults,
    RequestLibrary, Response, TranslateAdapter, TranslationFailure, TranslationRequest,
    TranslationResult,
};
