//! Terminal host for the `chatsum` summarizer.
//!
//! Reads chat lines from stdin, records them per buffer, and routes
//! `/sum`, `/sumstats`, and `/sumclean` to a [`chatsum::commands::Summarizer`].
//! Output is printed with [`output::TerminalOutput`].

pub mod input;
pub mod output;
pub mod session;
