//! Prompt template loading and history substitution.
//!
//! A template is plain text containing the literal marker `{{history}}`.
//! Every occurrence is replaced with the rendered history window; nothing
//! else in the template is interpreted. When the configured template file
//! can't be used, the built-in [`DEFAULT_TEMPLATE`] takes its place.

use std::io;
use std::path::PathBuf;

use tracing::{debug, warn};

/// Placeholder replaced with the windowed history text.
pub const HISTORY_MARKER: &str = "{{history}}";

/// Template used when no external template is configured or loadable.
pub const DEFAULT_TEMPLATE: &str = "\
Please provide a concise summary of this chat conversation:

{{history}}

Summary:";

/// A prompt ready to send, plus an optional notice for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    pub text: String,
    /// Set when the external template failed to load for a reason other
    /// than "not found" and the built-in template was used instead.
    pub notice: Option<String>,
}

/// Builds summarization prompts from an optional template file.
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    template_path: Option<PathBuf>,
}

impl PromptBuilder {
    /// Load the template from `path` on every render, so edits take effect
    /// without a restart.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            template_path: Some(path.into()),
        }
    }

    /// Always use [`DEFAULT_TEMPLATE`].
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Substitute `history_text` into the template.
    pub fn render(&self, history_text: &str) -> RenderedPrompt {
        let Some(path) = &self.template_path else {
            return RenderedPrompt {
                text: substitute(DEFAULT_TEMPLATE, history_text),
                notice: None,
            };
        };

        match std::fs::read_to_string(path) {
            Ok(template) => {
                debug!(path = %path.display(), "loaded prompt template");
                RenderedPrompt {
                    text: substitute(&template, history_text),
                    notice: None,
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "prompt template not found, using built-in");
                RenderedPrompt {
                    text: substitute(DEFAULT_TEMPLATE, history_text),
                    notice: None,
                }
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read prompt template");
                RenderedPrompt {
                    text: substitute(DEFAULT_TEMPLATE, history_text),
                    notice: Some(format!(
                        "Could not read prompt file {}: {e}. Using the built-in prompt.",
                        path.display()
                    )),
                }
            }
        }
    }
}

/// Literal replacement of every [`HISTORY_MARKER`].
pub fn substitute(template: &str, history_text: &str) -> String {
    template.replace(HISTORY_MARKER, history_text)
}
