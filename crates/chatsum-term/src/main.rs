//! Terminal chat host for chatsum.
//!
//! Every line typed on stdin is a chat message in the current buffer,
//! unless it is a command. Summaries come from an Ollama-style endpoint.
//!
//! # Examples
//!
//! ```sh
//! # Use settings.json from the current directory
//! chatsum-term
//!
//! # Write defaults for missing settings, then start in #rust
//! chatsum-term --config-dir ~/.config/chatsum --init-config --buffer '#rust'
//!
//! # Point at another model server, with debug logs on stderr
//! chatsum-term -v --llm-url http://gpu-box:11434/api/generate --model qwen2.5:7b
//! ```

use std::io::IsTerminal;
use std::num::NonZeroUsize;
use std::path::PathBuf;

use chatsum::prelude::*;
use chatsum_term::output::TerminalOutput;
use chatsum_term::session::{Flow, Overrides, Session};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Terminal chat host with windowed LLM summaries.
#[derive(Parser)]
#[command(name = "chatsum-term", version)]
struct Cli {
    /// Directory holding settings.json and relative prompt files.
    #[arg(long, default_value = ".")]
    config_dir: PathBuf,

    /// Summarization endpoint (overrides llm_url).
    #[arg(long)]
    llm_url: Option<String>,

    /// Model name (overrides llm_model).
    #[arg(long)]
    model: Option<String>,

    /// Prompt template file (overrides prompt_file).
    #[arg(long)]
    prompt_file: Option<String>,

    /// Per-buffer history cap (overrides max_history_lines).
    #[arg(long)]
    max_history_lines: Option<NonZeroUsize>,

    /// Buffer to start in.
    #[arg(long, default_value = "#general")]
    buffer: String,

    /// Speaker name for lines without a `speaker:` prefix.
    #[arg(long, default_value = "me")]
    nick: String,

    /// Write defaults for missing keys to settings.json before starting.
    #[arg(long)]
    init_config: bool,

    /// Disable colored output.
    #[arg(long)]
    no_color: bool,

    /// Log more to stderr (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            llm_url: self.llm_url.clone(),
            llm_model: self.model.clone(),
            prompt_file: self.prompt_file.clone(),
            max_history_lines: self.max_history_lines,
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.init_config {
        match Settings::init_file(&cli.config_dir) {
            Ok(added) if added.is_empty() => {
                eprintln!("settings.json already has every key");
            }
            Ok(added) => eprintln!("Wrote defaults for: {}", added.join(", ")),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
    }

    let mut settings = match Settings::load(&cli.config_dir) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    let overrides = cli.overrides();
    overrides.apply(&mut settings);

    let mut summarizer = match Summarizer::from_settings(settings, &cli.config_dir) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: failed to create summarizer: {e}");
            std::process::exit(1);
        }
    };
    info!(
        model = %summarizer.settings().llm_model,
        url = %summarizer.settings().llm_url,
        "summarizer ready"
    );

    let color = !cli.no_color && std::io::stdout().is_terminal();
    let mut out = TerminalOutput::new(std::io::stdout(), color);
    let mut session = Session::new(cli.buffer, cli.nick, cli.config_dir, overrides);
    session.greet(&summarizer, &mut out);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                eprintln!("Error: failed to read stdin: {e}");
                std::process::exit(1);
            }
        };
        let now = chrono::Local::now();
        if session
            .handle_line(&mut summarizer, &line, now, &mut out)
            .await
            == Flow::Quit
        {
            break;
        }
    }
}
