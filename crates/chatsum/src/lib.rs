//! Windowed chat-history summarization with a local LLM.
//!
//! `chatsum` keeps a bounded, in-memory history per conversation and, on
//! request, sends a slice of it to an Ollama-style `/api/generate`
//! endpoint for summarization. The host chat client feeds it messages and
//! command lines; everything it prints goes back through the host's
//! [`Output`](commands::Output) sink.
//!
//! # Getting started
//!
//! ```ignore
//! use chatsum::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), String> {
//!     let dir = std::path::Path::new(".");
//!     let settings = Settings::load(dir).map_err(|e| e.to_string())?;
//!     let mut summarizer = Summarizer::from_settings(settings, dir)?;
//!
//!     let mut out = MyHostOutput::default();
//!     let now = chrono::Local::now();
//!     summarizer.on_message("#rust", "alice", "anyone tried 2024 edition?", now, &mut out).await;
//!     summarizer.dispatch("#rust", "/sum 30m", now, &mut out).await;
//!     Ok(())
//! }
//! ```
//!
//! # Where to find things
//!
//! - **History buffers and windows:** [`HistoryStore`](history::HistoryStore)
//!   stores records per conversation; [`Window`](history::Window) parses
//!   `/sum` arguments into all / time-bounded / count-bounded selections.
//! - **Prompt templates:** [`PromptBuilder`](prompt::PromptBuilder) loads a
//!   template with a `{{history}}` marker, falling back to a built-in one.
//! - **Talking to the model:** [`GenerateClient`](api::GenerateClient)
//!   returns a typed [`SummaryOutcome`](api::SummaryOutcome) and never
//!   errors past its boundary.
//! - **Settings:** [`Settings`](config::Settings) for typed, validated
//!   configuration persisted as a flat string map.
//! - **Commands:** [`Summarizer`](commands::Summarizer) wires it together
//!   behind `/sum`, `/sumstats`, and `/sumclean`.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`history`] | Per-conversation FIFO buffers, window grammar, stats |
//! | [`prompt`] | Template loading and `{{history}}` substitution |
//! | [`api`] | `/api/generate` client and typed outcomes |
//! | [`config`] | Settings with defaults, validation, and persistence |
//! | [`commands`] | Command parsing, the `Summarizer` context, output styling |

pub mod api;
pub mod commands;
pub mod config;
pub mod history;
pub mod prelude;
pub mod prompt;
