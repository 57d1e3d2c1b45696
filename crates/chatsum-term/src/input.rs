//! Classification of terminal input lines.

/// What a line typed at the prompt means to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputLine {
    /// Blank line; ignored.
    Empty,
    /// `/quit` or `/exit`.
    Quit,
    /// `/help`.
    Help,
    /// `/reload`: re-read settings from the config directory.
    Reload,
    /// `/buffer <id>`: make `<id>` the current conversation.
    SwitchBuffer(String),
    /// `/buffer` with no argument: show the current conversation.
    ShowBuffer,
    /// Any other `/...` line, handed to the summarizer's dispatcher.
    Command(String),
    /// A chat message. `speaker` is `None` when the line had no
    /// `speaker:` prefix, meaning "from the local nick".
    Message {
        speaker: Option<String>,
        text: String,
    },
}

/// Classify one line of input.
///
/// A leading `//` escapes a message that starts with a slash, as in most
/// IRC clients: `//sum` is the message `/sum`, not the command.
pub fn parse_input_line(line: &str) -> InputLine {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return InputLine::Empty;
    }

    if let Some(escaped) = line.strip_prefix("//") {
        return message(&format!("/{escaped}"));
    }

    let trimmed = line.trim();
    if trimmed.starts_with('/') {
        let (name, rest) = trimmed
            .split_once(char::is_whitespace)
            .unwrap_or((trimmed, ""));
        let rest = rest.trim();
        return match name {
            "/quit" | "/exit" => InputLine::Quit,
            "/help" => InputLine::Help,
            "/reload" => InputLine::Reload,
            "/buffer" if rest.is_empty() => InputLine::ShowBuffer,
            "/buffer" => InputLine::SwitchBuffer(rest.to_string()),
            _ => InputLine::Command(trimmed.to_string()),
        };
    }

    message(line)
}

/// `speaker: text` when the part before the first colon is a single word,
/// otherwise the whole line is the text.
fn message(line: &str) -> InputLine {
    if let Some((speaker, text)) = line.split_once(':') {
        let speaker = speaker.trim();
        let text = text.trim();
        if !speaker.is_empty()
            && !text.is_empty()
            && !speaker.contains(char::is_whitespace)
            && !speaker.starts_with('/')
        {
            return InputLine::Message {
                speaker: Some(speaker.to_string()),
                text: text.to_string(),
            };
        }
    }
    InputLine::Message {
        speaker: None,
        text: line.trim().to_string(),
    }
}
