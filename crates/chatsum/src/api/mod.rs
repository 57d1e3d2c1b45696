//! HTTP interaction with the text-generation endpoint.
//!
//! - [`generate`]: request/response types for an Ollama-style
//!   `/api/generate` endpoint, the async [`GenerateClient`], and the typed
//!   [`SummaryOutcome`] it returns. Failures are values, not errors: the
//!   caller always gets something it can display.

pub mod generate;

pub use generate::{GenerateClient, GenerateRequest, NO_RESPONSE_PLACEHOLDER, SummaryOutcome};
