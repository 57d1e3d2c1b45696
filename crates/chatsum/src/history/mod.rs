//! Bounded, per-conversation chat history.
//!
//! [`HistoryStore`] maps a conversation id to a FIFO buffer of
//! [`MessageRecord`]s. Every buffer is capped at `max_history_lines`; the
//! oldest records are evicted first when the cap is exceeded. Buffers are
//! created lazily on the first message and only live as long as the store.
//!
//! Reads go through a [`Window`] and report one of three outcomes (see
//! [`ReadOutcome`]) so callers can tell "never seen this conversation" apart
//! from "nothing in the requested window".

pub mod window;

pub use window::{WINDOW_GRAMMAR, Window, WindowParseError};

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::num::NonZeroUsize;

use chrono::{DateTime, Local, TimeDelta};
use tracing::{debug, trace};

/// Default per-conversation cap.
pub const DEFAULT_MAX_HISTORY_LINES: NonZeroUsize = NonZeroUsize::new(150).unwrap();

// ── Records ────────────────────────────────────────────────────────

/// One received chat message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    timestamp: DateTime<Local>,
    speaker: String,
    text: String,
}

impl MessageRecord {
    pub fn new(
        timestamp: DateTime<Local>,
        speaker: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            speaker: speaker.into(),
            text: text.into(),
        }
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    pub fn speaker(&self) -> &str {
        &self.speaker
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Display form: `[HH:MM] speaker: text`.
impl fmt::Display for MessageRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.timestamp.format("%H:%M"),
            self.speaker,
            self.text
        )
    }
}

/// Join records into the newline-separated text fed to the prompt template.
pub fn render_records(records: &[MessageRecord]) -> String {
    records
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Read outcomes ──────────────────────────────────────────────────

/// Result of reading a window from one conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The conversation was never seen, or has been cleaned.
    NoHistory,
    /// The conversation has history, but none of it falls in the window.
    EmptyWindow,
    /// Matching records, oldest first.
    Records(Vec<MessageRecord>),
}

/// Summary statistics for one conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryStats {
    pub count: usize,
    pub oldest: DateTime<Local>,
    pub newest: DateTime<Local>,
    /// `newest - oldest`; zero for a single record.
    pub span: TimeDelta,
}

// ── Store ──────────────────────────────────────────────────────────

/// Per-conversation message buffers with a shared length cap.
///
/// The store does no locking of its own. The owner is expected to
/// serialize access, normally by holding it inside a single
/// [`Summarizer`](crate::commands::Summarizer).
#[derive(Debug)]
pub struct HistoryStore {
    conversations: HashMap<String, VecDeque<MessageRecord>>,
    max_history_lines: NonZeroUsize,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY_LINES)
    }
}

impl HistoryStore {
    pub fn new(max_history_lines: NonZeroUsize) -> Self {
        Self {
            conversations: HashMap::new(),
            max_history_lines,
        }
    }

    pub fn max_history_lines(&self) -> NonZeroUsize {
        self.max_history_lines
    }

    /// Change the cap. Existing buffers are trimmed right away so the
    /// length invariant holds without waiting for the next append.
    pub fn set_max_history_lines(&mut self, max: NonZeroUsize) {
        self.max_history_lines = max;
        for (id, buffer) in &mut self.conversations {
            let evicted = trim_front(buffer, max);
            if evicted > 0 {
                debug!(conversation = %id, evicted, "trimmed history to new cap");
            }
        }
    }

    /// Record a message, evicting the oldest entries beyond the cap.
    pub fn append(
        &mut self,
        conversation_id: &str,
        speaker: &str,
        text: &str,
        now: DateTime<Local>,
    ) {
        let buffer = self
            .conversations
            .entry(conversation_id.to_string())
            .or_default();
        buffer.push_back(MessageRecord::new(now, speaker, text));
        let evicted = trim_front(buffer, self.max_history_lines);
        trace!(
            conversation = conversation_id,
            len = buffer.len(),
            evicted,
            "appended message"
        );
    }

    /// Read the records selected by `window`, evaluated at `now`.
    pub fn read(&self, conversation_id: &str, window: Window, now: DateTime<Local>) -> ReadOutcome {
        let Some(buffer) = self
            .conversations
            .get(conversation_id)
            .filter(|b| !b.is_empty())
        else {
            return ReadOutcome::NoHistory;
        };

        let start = match window {
            Window::All => 0,
            Window::Last(n) => buffer.len().saturating_sub(n.get()),
            Window::Since(duration) => {
                // Scan from the newest record and stop at the first one
                // older than the cutoff; never include anything before it.
                let cutoff = now.checked_sub_signed(duration);
                let matching = buffer
                    .iter()
                    .rev()
                    .take_while(|r| cutoff.is_none_or(|c| r.timestamp >= c))
                    .count();
                buffer.len() - matching
            }
        };

        if start == buffer.len() {
            return ReadOutcome::EmptyWindow;
        }
        ReadOutcome::Records(buffer.range(start..).cloned().collect())
    }

    pub fn stats(&self, conversation_id: &str) -> Option<HistoryStats> {
        let buffer = self.conversations.get(conversation_id)?;
        let oldest = buffer.front()?.timestamp;
        let newest = buffer.back()?.timestamp;
        Some(HistoryStats {
            count: buffer.len(),
            oldest,
            newest,
            span: newest - oldest,
        })
    }

    /// Remove one conversation. Returns how many records it held.
    pub fn clear(&mut self, conversation_id: &str) -> usize {
        self.conversations
            .remove(conversation_id)
            .map_or(0, |b| b.len())
    }

    /// Remove every conversation. Returns `(buffers, messages)` removed.
    pub fn clear_all(&mut self) -> (usize, usize) {
        let removed = (self.conversation_count(), self.total_messages());
        self.conversations.clear();
        removed
    }

    /// Number of conversations currently tracked.
    pub fn conversation_count(&self) -> usize {
        self.conversations.len()
    }

    /// Messages stored across all conversations.
    pub fn total_messages(&self) -> usize {
        self.conversations.values().map(VecDeque::len).sum()
    }
}

/// Pop from the front until `buffer.len() <= max`. Returns the number popped.
fn trim_front(buffer: &mut VecDeque<MessageRecord>, max: NonZeroUsize) -> usize {
    let excess = buffer.len().saturating_sub(max.get());
    buffer.drain(..excess);
    excess
}
