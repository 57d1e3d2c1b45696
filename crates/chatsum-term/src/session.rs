//! Terminal chat session: routes input lines to the summarizer.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use chatsum::commands::{Output, SUM_USAGE, SUMCLEAN_USAGE, SUMSTATS_USAGE, Style, Summarizer};
use chatsum::config::Settings;
use chrono::{DateTime, Local};
use tracing::{debug, warn};

use crate::input::{InputLine, parse_input_line};

/// Whether the read loop should keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Command-line values that take precedence over `settings.json`, both at
/// startup and on every `/reload`.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub llm_url: Option<String>,
    pub llm_model: Option<String>,
    pub prompt_file: Option<String>,
    pub max_history_lines: Option<NonZeroUsize>,
}

impl Overrides {
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(url) = &self.llm_url {
            settings.llm_url = url.clone();
        }
        if let Some(model) = &self.llm_model {
            settings.llm_model = model.clone();
        }
        if let Some(path) = &self.prompt_file {
            settings.prompt_file = path.clone();
        }
        if let Some(max) = self.max_history_lines {
            settings.max_history_lines = max;
        }
    }
}

/// The current buffer, local nick, and settings source for one terminal
/// session.
#[derive(Debug, Clone)]
pub struct Session {
    buffer: String,
    nick: String,
    config_dir: PathBuf,
    overrides: Overrides,
}

impl Session {
    pub fn new(
        buffer: impl Into<String>,
        nick: impl Into<String>,
        config_dir: impl Into<PathBuf>,
        overrides: Overrides,
    ) -> Self {
        Self {
            buffer: buffer.into(),
            nick: nick.into(),
            config_dir: config_dir.into(),
            overrides,
        }
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Print the startup banner into the current buffer.
    pub fn greet(&self, summarizer: &Summarizer, out: &mut dyn Output) {
        let trigger = &summarizer.settings().summary_trigger;
        let line = if trigger.is_empty() {
            "chatsum loaded! Use /sum to summarize.".to_string()
        } else {
            format!("chatsum loaded! Use /sum or type '{trigger}' in chat.")
        };
        out.print(&self.buffer, &line);
    }

    pub async fn handle_line(
        &mut self,
        summarizer: &mut Summarizer,
        line: &str,
        now: DateTime<Local>,
        out: &mut dyn Output,
    ) -> Flow {
        match parse_input_line(line) {
            InputLine::Empty => {}
            InputLine::Quit => return Flow::Quit,
            InputLine::Help => self.help(out),
            InputLine::Reload => self.reload(summarizer, out),
            InputLine::ShowBuffer => {
                out.print(&self.buffer, &format!("Current buffer: {}", self.buffer));
            }
            InputLine::SwitchBuffer(id) => {
                debug!(from = %self.buffer, to = %id, "switching buffer");
                self.buffer = id;
                out.print(&self.buffer, &format!("Now talking in {}", self.buffer));
            }
            InputLine::Command(command) => {
                if !summarizer.dispatch(&self.buffer, &command, now, out).await {
                    out.print(
                        &self.buffer,
                        &format!("Unknown command: {command} (try /help)"),
                    );
                }
            }
            InputLine::Message { speaker, text } => {
                let speaker = speaker.as_deref().unwrap_or(&self.nick);
                summarizer
                    .on_message(&self.buffer, speaker, &text, now, out)
                    .await;
            }
        }
        Flow::Continue
    }

    /// Re-read `settings.json`, reapply the command-line overrides, and
    /// hand the result to the summarizer. History is kept.
    fn reload(&self, summarizer: &mut Summarizer, out: &mut dyn Output) {
        let result = Settings::load(&self.config_dir)
            .map_err(|e| e.to_string())
            .and_then(|mut settings| {
                self.overrides.apply(&mut settings);
                summarizer.apply_settings(settings, &self.config_dir)
            });
        match result {
            Ok(()) => out.print(
                &self.buffer,
                &format!(
                    "Reloaded settings (max {} messages per conversation).",
                    summarizer.history().max_history_lines()
                ),
            ),
            Err(e) => {
                warn!("settings reload failed: {e}");
                out.print_styled(&self.buffer, Style::Failure, &format!("Reload failed: {e}"));
            }
        }
    }

    fn help(&self, out: &mut dyn Output) {
        for line in [
            SUM_USAGE,
            SUMSTATS_USAGE,
            SUMCLEAN_USAGE,
            "/buffer [<id>]",
            "/reload",
            "/quit",
            "<speaker>: <text> records a message from <speaker>; plain text is from you",
        ] {
            out.print(&self.buffer, line);
        }
    }
}
