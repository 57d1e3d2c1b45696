//! User commands and the [`Summarizer`] context that serves them.
//!
//! Three commands are recognized:
//!
//! - `/sum [5m|5h|5]`: summarize all history, a time window, or the last N lines
//! - `/sumstats`: history statistics for the current conversation and overall
//! - `/sumclean [all|<conversation-id>]`: drop history
//!
//! All output goes through the host's [`Output`] implementation. No command
//! returns an error: parse problems, empty history, and network failures
//! are all reported as output lines and control returns to the host.

use std::path::Path;

use chrono::{DateTime, Local, TimeDelta};
use tracing::{debug, info};

use crate::api::{GenerateClient, SummaryOutcome};
use crate::config::Settings;
use crate::history::{HistoryStore, ReadOutcome, WINDOW_GRAMMAR, Window, render_records};
use crate::prompt::PromptBuilder;

pub const SUM_USAGE: &str = "/sum [5m|5h|5]";
pub const SUMSTATS_USAGE: &str = "/sumstats";
pub const SUMCLEAN_USAGE: &str = "/sumclean [all|<conversation-id>]";

// ── Output ─────────────────────────────────────────────────────────

/// How a line should be rendered by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    /// Model output.
    Summary,
    /// A failed summarization (timeout, connection, remote error).
    Failure,
    /// Non-fatal warnings such as a template fallback.
    Notice,
}

/// Host-side sink for lines printed into a conversation view.
pub trait Output {
    fn print(&mut self, conversation: &str, line: &str);
    fn print_styled(&mut self, conversation: &str, style: Style, line: &str);
}

// ── Commands ───────────────────────────────────────────────────────

/// Target of `/sumclean`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanTarget {
    Current,
    All,
    Conversation(String),
}

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Raw window argument, parsed when the command runs.
    Summarize(Option<String>),
    Stats,
    Clean(CleanTarget),
}

impl Command {
    /// Parse `line` if it is one of our commands; `None` otherwise.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let (name, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let arg = Some(rest.trim()).filter(|a| !a.is_empty());
        match name {
            "/sum" => Some(Command::Summarize(arg.map(str::to_string))),
            "/sumstats" => Some(Command::Stats),
            "/sumclean" => Some(Command::Clean(match arg {
                None => CleanTarget::Current,
                Some("all") => CleanTarget::All,
                Some(id) => CleanTarget::Conversation(id.to_string()),
            })),
            _ => None,
        }
    }
}

// ── Summarizer ─────────────────────────────────────────────────────

/// Owns the history table and everything needed to summarize it.
///
/// The host creates one at startup and passes it by `&mut` into its
/// message and command handlers. Exclusive access serializes appends and
/// reads; a summarize call materializes its window before the network
/// await, so nothing can observe a half-read buffer.
#[derive(Debug)]
pub struct Summarizer {
    history: HistoryStore,
    prompt: PromptBuilder,
    client: GenerateClient,
    settings: Settings,
}

impl Summarizer {
    pub fn new(settings: Settings, prompt: PromptBuilder, client: GenerateClient) -> Self {
        Self {
            history: HistoryStore::new(settings.max_history_lines),
            prompt,
            client,
            settings,
        }
    }

    /// Build from settings: client from `llm_url`/`llm_model`/`timeout`,
    /// template from `prompt_file` resolved against `dir`.
    pub fn from_settings(settings: Settings, dir: &Path) -> Result<Self, String> {
        let (prompt, client) = components(&settings, dir)?;
        Ok(Self::new(settings, prompt, client))
    }

    /// Replace the settings while keeping stored history. A lower
    /// `max_history_lines` trims every buffer right away. On error nothing
    /// changes.
    pub fn apply_settings(&mut self, settings: Settings, dir: &Path) -> Result<(), String> {
        let (prompt, client) = components(&settings, dir)?;
        self.history
            .set_max_history_lines(settings.max_history_lines);
        info!(
            model = %settings.llm_model,
            url = %settings.llm_url,
            max_history_lines = settings.max_history_lines.get(),
            "applied new settings"
        );
        self.prompt = prompt;
        self.client = client;
        self.settings = settings;
        Ok(())
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut HistoryStore {
        &mut self.history
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Handle an inbound chat message. Returns `true` if it matched the
    /// summary trigger (in which case a summary has already been printed).
    pub async fn on_message(
        &mut self,
        conversation: &str,
        speaker: &str,
        text: &str,
        now: DateTime<Local>,
        out: &mut dyn Output,
    ) -> bool {
        self.history.append(conversation, speaker, text, now);

        let trigger = self.settings.summary_trigger.as_str();
        if trigger.is_empty() || text.trim() != trigger {
            return false;
        }
        debug!(conversation, "summary trigger matched");
        self.summarize_window(conversation, Window::All, now, out)
            .await;
        true
    }

    /// Run `line` if it is one of our commands. Returns whether it was.
    pub async fn dispatch(
        &mut self,
        conversation: &str,
        line: &str,
        now: DateTime<Local>,
        out: &mut dyn Output,
    ) -> bool {
        let Some(command) = Command::parse(line) else {
            return false;
        };
        self.run(conversation, command, now, out).await;
        true
    }

    pub async fn run(
        &mut self,
        conversation: &str,
        command: Command,
        now: DateTime<Local>,
        out: &mut dyn Output,
    ) {
        match command {
            Command::Summarize(arg) => self.summarize(conversation, arg.as_deref(), now, out).await,
            Command::Stats => self.stats(conversation, out),
            Command::Clean(target) => self.clean(conversation, target, out),
        }
    }

    /// `/sum [args]`.
    pub async fn summarize(
        &mut self,
        conversation: &str,
        arg: Option<&str>,
        now: DateTime<Local>,
        out: &mut dyn Output,
    ) {
        match Window::parse(arg) {
            Ok(window) => self.summarize_window(conversation, window, now, out).await,
            Err(e) => {
                out.print(conversation, &format!("Error: {e}"));
                out.print(
                    conversation,
                    &format!("Usage: {SUM_USAGE} (window {WINDOW_GRAMMAR})"),
                );
            }
        }
    }

    async fn summarize_window(
        &mut self,
        conversation: &str,
        window: Window,
        now: DateTime<Local>,
        out: &mut dyn Output,
    ) {
        let records = match self.history.read(conversation, window, now) {
            ReadOutcome::NoHistory => {
                out.print(conversation, "No recent history to summarize.");
                return;
            }
            ReadOutcome::EmptyWindow => {
                out.print(
                    conversation,
                    &format!("No history in the selected window ({window})."),
                );
                return;
            }
            ReadOutcome::Records(records) => records,
        };

        info!(conversation, %window, lines = records.len(), "generating summary");
        out.print(
            conversation,
            &format!("Generating summary ({window}, {} lines)...", records.len()),
        );

        let rendered = self.prompt.render(&render_records(&records));
        if let Some(notice) = &rendered.notice {
            out.print_styled(conversation, Style::Notice, notice);
        }

        let outcome = self.client.summarize(&rendered.text).await;
        print_outcome(conversation, &outcome, out);
    }

    /// `/sumstats`.
    pub fn stats(&self, conversation: &str, out: &mut dyn Output) {
        match self.history.stats(conversation) {
            Some(stats) => {
                out.print(
                    conversation,
                    &format!("History for {conversation}: {} messages", stats.count),
                );
                out.print(
                    conversation,
                    &format!(
                        "  oldest {}, newest {}, span {}",
                        stats.oldest.format("%Y-%m-%d %H:%M"),
                        stats.newest.format("%Y-%m-%d %H:%M"),
                        format_span(stats.span)
                    ),
                );
            }
            None => out.print(conversation, &format!("No history for {conversation}.")),
        }
        out.print(
            conversation,
            &format!(
                "Tracking {} conversations, {} messages total (max {} per conversation).",
                self.history.conversation_count(),
                self.history.total_messages(),
                self.history.max_history_lines()
            ),
        );
        out.print(
            conversation,
            &format!(
                "Model {} at {} (temperature {}).",
                self.client.model(),
                self.client.endpoint(),
                self.settings.temperature
            ),
        );
    }

    /// `/sumclean [all|<id>]`.
    pub fn clean(&mut self, conversation: &str, target: CleanTarget, out: &mut dyn Output) {
        let line = match target {
            CleanTarget::All => {
                let (buffers, messages) = self.history.clear_all();
                format!("Cleared {messages} messages from {buffers} conversations.")
            }
            CleanTarget::Current => {
                let removed = self.history.clear(conversation);
                format!("Cleared {removed} messages from {conversation}.")
            }
            CleanTarget::Conversation(id) => {
                let removed = self.history.clear(&id);
                format!("Cleared {removed} messages from {id}.")
            }
        };
        info!("{line}");
        out.print(conversation, &line);
    }
}

fn components(settings: &Settings, dir: &Path) -> Result<(PromptBuilder, GenerateClient), String> {
    let client = GenerateClient::new(
        &settings.llm_url,
        settings.llm_model.clone(),
        settings.timeout,
    )?;
    let prompt = settings
        .prompt_path(dir)
        .map_or_else(PromptBuilder::builtin, PromptBuilder::new);
    Ok((prompt, client))
}

/// Print a summary outcome: non-empty lines only, bracketed by blank lines.
fn print_outcome(conversation: &str, outcome: &SummaryOutcome, out: &mut dyn Output) {
    let style = if outcome.is_failure() {
        Style::Failure
    } else {
        Style::Summary
    };
    out.print(conversation, "");
    for line in outcome.display_text().lines().filter(|l| !l.trim().is_empty()) {
        out.print_styled(conversation, style, line);
    }
    out.print(conversation, "");
}

/// `1h 05m`, `12m`, `40s`.
fn format_span(span: TimeDelta) -> String {
    let secs = span.num_seconds().max(0);
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    match (h, m) {
        (0, 0) => format!("{s}s"),
        (0, _) => format!("{m}m"),
        _ => format!("{h}h {m:02}m"),
    }
}
