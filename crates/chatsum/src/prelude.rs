//! Convenience re-exports for common `chatsum` types.
//!
//! ```ignore
//! use chatsum::prelude::*;
//! ```
//!
//! Covers what a host needs to wire the summarizer in: settings, the
//! [`Summarizer`] context, the [`Output`] trait, and the history types its
//! tests tend to touch. Wire types and constants stay in their modules.

// ── Context and commands ────────────────────────────────────────────
pub use crate::commands::{CleanTarget, Command, Output, Style, Summarizer};

// ── Components ──────────────────────────────────────────────────────
pub use crate::api::{GenerateClient, SummaryOutcome};
pub use crate::config::{ConfigError, Settings};
pub use crate::history::{
    HistoryStats, HistoryStore, MessageRecord, ReadOutcome, Window, WindowParseError,
};
pub use crate::prompt::{PromptBuilder, RenderedPrompt};
