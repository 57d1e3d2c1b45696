//! Integration tests against a fake `/api/generate` endpoint.
//!
//! Each test starts a real axum server on a random port and points a
//! `GenerateClient` (or a full `Summarizer`) at it.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use chatsum::prelude::*;
use chrono::{Local, TimeDelta, TimeZone};

/// Requests seen by the fake server.
type Seen = Arc<Mutex<Vec<serde_json::Value>>>;

#[derive(Clone)]
struct Fake {
    seen: Seen,
    status: StatusCode,
    body: String,
    delay: Duration,
}

async fn generate(
    State(fake): State<Fake>,
    axum::Json(req): axum::Json<serde_json::Value>,
) -> impl IntoResponse {
    fake.seen.lock().unwrap().push(req);
    tokio::time::sleep(fake.delay).await;
    (
        fake.status,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        fake.body,
    )
}

/// Helper: spawn a fake endpoint answering every request with `status` / `body`.
async fn spawn_fake(status: StatusCode, body: &str, delay: Duration) -> (String, Seen) {
    let seen: Seen = Arc::default();
    let fake = Fake {
        seen: seen.clone(),
        status,
        body: body.to_string(),
        delay,
    };
    let router = Router::new()
        .route("/api/generate", post(generate))
        .with_state(fake);

    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (format!("http://{addr}/api/generate"), seen)
}

fn client(url: &str, timeout: Duration) -> GenerateClient {
    let http = reqwest::Client::builder().no_proxy().build().unwrap();
    GenerateClient::with_client(http, url, "llama3.2:3b", timeout).unwrap()
}

#[derive(Default)]
struct Recorder {
    lines: Vec<(Option<Style>, String)>,
}

impl Output for Recorder {
    fn print(&mut self, _conversation: &str, line: &str) {
        self.lines.push((None, line.to_string()));
    }

    fn print_styled(&mut self, _conversation: &str, style: Style, line: &str) {
        self.lines.push((Some(style), line.to_string()));
    }
}

impl Recorder {
    fn styled(&self, style: Style) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|(s, _)| *s == Some(style))
            .map(|(_, l)| l.as_str())
            .collect()
    }
}

// ── Client ───────────────────────────────────────────────────────────

#[tokio::test]
async fn sends_model_prompt_and_no_streaming() {
    let (url, seen) = spawn_fake(
        StatusCode::OK,
        r#"{"response":"They planned the release.","done":true}"#,
        Duration::ZERO,
    )
    .await;

    let outcome = client(&url, Duration::from_secs(5))
        .summarize("Summarize: [10:00] a: ship it")
        .await;
    assert_eq!(
        outcome,
        SummaryOutcome::Generated("They planned the release.".into())
    );

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1, "exactly one request, no retries");
    assert_eq!(
        seen[0],
        serde_json::json!({
            "model": "llama3.2:3b",
            "prompt": "Summarize: [10:00] a: ship it",
            "stream": false,
        })
    );
}

#[tokio::test]
async fn missing_response_field_is_placeholder() {
    let (url, _) = spawn_fake(StatusCode::OK, r#"{"done":true}"#, Duration::ZERO).await;
    let outcome = client(&url, Duration::from_secs(5)).summarize("p").await;
    assert_eq!(outcome, SummaryOutcome::NoResponse);
    assert_eq!(outcome.display_text(), "No response from LLM");
}

#[tokio::test]
async fn http_error_is_remote_outcome() {
    let (url, seen) = spawn_fake(
        StatusCode::INTERNAL_SERVER_ERROR,
        r#"{"error":"model 'x' not found"}"#,
        Duration::ZERO,
    )
    .await;
    let outcome = client(&url, Duration::from_secs(5)).summarize("p").await;
    match &outcome {
        SummaryOutcome::Remote { status, body } => {
            assert_eq!(*status, 500);
            assert!(body.contains("not found"));
        }
        other => panic!("expected remote error, got {other:?}"),
    }
    assert!(outcome.display_text().starts_with("HTTP Error 500"));
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn slow_endpoint_times_out() {
    let (url, seen) = spawn_fake(
        StatusCode::OK,
        r#"{"response":"late"}"#,
        Duration::from_secs(3),
    )
    .await;
    let outcome = client(&url, Duration::from_millis(200)).summarize("p").await;
    assert!(
        matches!(outcome, SummaryOutcome::Timeout(_)),
        "got {outcome:?}"
    );
    assert!(outcome.is_failure());
    assert_eq!(seen.lock().unwrap().len(), 1);
}

// ── Summarizer end to end ────────────────────────────────────────────

#[tokio::test]
async fn summarize_last_lines_with_custom_template() {
    let (url, seen) = spawn_fake(
        StatusCode::OK,
        r#"{"response":"Line A\n\nLine B\n"}"#,
        Duration::ZERO,
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("prompt.txt"), "TL;DR please:\n{{history}}\n--").unwrap();

    let mut summarizer = Summarizer::new(
        Settings::default(),
        PromptBuilder::new(dir.path().join("prompt.txt")),
        client(&url, Duration::from_secs(5)),
    );

    let t0 = Local.with_ymd_and_hms(2024, 5, 2, 14, 0, 0).unwrap();
    let mut out = Recorder::default();
    for (i, text) in ["one", "two", "three"].iter().enumerate() {
        let now = t0 + TimeDelta::minutes(i as i64);
        summarizer
            .on_message("#dev", "carol", text, now, &mut out)
            .await;
    }

    let handled = summarizer
        .dispatch("#dev", "/sum 2", t0 + TimeDelta::minutes(5), &mut out)
        .await;
    assert!(handled);

    let prompt = seen.lock().unwrap()[0]["prompt"]
        .as_str()
        .unwrap()
        .to_string();
    assert_eq!(
        prompt,
        "TL;DR please:\n[14:01] carol: two\n[14:02] carol: three\n--"
    );
    assert_eq!(out.styled(Style::Summary), ["Line A", "Line B"]);
    assert!(out.styled(Style::Failure).is_empty());
}

#[tokio::test]
async fn summarize_time_window_scenario() {
    let (url, seen) = spawn_fake(StatusCode::OK, r#"{"response":"ok"}"#, Duration::ZERO).await;
    let mut summarizer = Summarizer::new(
        Settings::default(),
        PromptBuilder::builtin(),
        client(&url, Duration::from_secs(5)),
    );

    let t = Local.with_ymd_and_hms(2024, 5, 2, 8, 0, 0).unwrap();
    let mut out = Recorder::default();
    summarizer
        .on_message("room1", "a", "at T", t, &mut out)
        .await;
    summarizer
        .on_message("room1", "b", "at T+1m", t + TimeDelta::minutes(1), &mut out)
        .await;
    summarizer
        .on_message("room1", "c", "at T+10m", t + TimeDelta::minutes(10), &mut out)
        .await;

    summarizer
        .dispatch("room1", "/sum 5m", t + TimeDelta::minutes(11), &mut out)
        .await;

    let seen = seen.lock().unwrap();
    let prompt = seen[0]["prompt"].as_str().unwrap();
    assert!(prompt.contains("[08:10] c: at T+10m"));
    assert!(!prompt.contains("at T+1m"));
    assert!(!prompt.contains("a: at T\n"));
    assert_eq!(out.styled(Style::Summary), ["ok"]);
}
