//! Non-streaming client for an Ollama-style `/api/generate` endpoint.

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

/// Shown when the endpoint answers without a `response` field.
pub const NO_RESPONSE_PLACEHOLDER: &str = "No response from LLM";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ── Wire types ─────────────────────────────────────────────────────

/// Request body. `stream` is always `false`: the whole completion comes
/// back in one JSON object.
#[derive(Serialize, Debug)]
pub struct GenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub stream: bool,
}

#[derive(Deserialize, Debug)]
struct RawGenerateResponse {
    #[serde(default)]
    response: Option<serde_json::Value>,
}

// ── Outcome ────────────────────────────────────────────────────────

/// Everything a summarize call can end in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryOutcome {
    /// Generated text from the `response` field.
    Generated(String),
    /// The endpoint answered, but without a `response` string.
    NoResponse,
    /// No complete response within the configured timeout.
    Timeout(String),
    /// Could not connect, or the transport failed mid-request.
    Connection(String),
    /// The endpoint answered with a non-success HTTP status.
    Remote { status: u16, body: String },
    /// The body was not the JSON we expected.
    MalformedResponse(String),
}

impl SummaryOutcome {
    /// Whether this outcome is a failure rather than model output.
    pub fn is_failure(&self) -> bool {
        !matches!(
            self,
            SummaryOutcome::Generated(_) | SummaryOutcome::NoResponse
        )
    }

    /// Text to show in the conversation.
    pub fn display_text(&self) -> String {
        match self {
            SummaryOutcome::Generated(text) => text.clone(),
            SummaryOutcome::NoResponse => NO_RESPONSE_PLACEHOLDER.to_string(),
            SummaryOutcome::Timeout(e) => format!("Timeout Error: {e}"),
            SummaryOutcome::Connection(e) => format!("URL Error: {e}"),
            SummaryOutcome::Remote { status, body } if body.trim().is_empty() => {
                format!("HTTP Error {status}")
            }
            SummaryOutcome::Remote { status, body } => format!("HTTP Error {status}: {body}"),
            SummaryOutcome::MalformedResponse(e) => format!("Error: {e}"),
        }
    }
}

impl fmt::Display for SummaryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_text())
    }
}

// ── Client ─────────────────────────────────────────────────────────

/// Async HTTP client bound to one endpoint and model.
#[derive(Debug, Clone)]
pub struct GenerateClient {
    client: reqwest::Client,
    endpoint: reqwest::Url,
    model: String,
    timeout: Duration,
}

impl GenerateClient {
    /// Build a client. Fails only on an unparseable endpoint URL or if the
    /// HTTP client itself can't be constructed.
    pub fn new(
        endpoint: &str,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("chatsum/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        Self::with_client(client, endpoint, model, timeout)
    }

    /// Use a pre-configured `reqwest::Client` (proxy settings, TLS roots).
    /// `timeout` is applied per request on top of the client's own settings.
    pub fn with_client(
        client: reqwest::Client,
        endpoint: &str,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, String> {
        let endpoint = reqwest::Url::parse(endpoint)
            .map_err(|e| format!("invalid endpoint URL '{endpoint}': {e}"))?;
        Ok(Self {
            client,
            endpoint,
            model: model.into(),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send `prompt` and wait for the full completion. Never retries.
    pub async fn summarize(&self, prompt: &str) -> SummaryOutcome {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };
        debug!(
            "LLM request: endpoint={}, model={}, prompt={} chars, timeout={}s",
            self.endpoint,
            self.model,
            prompt.len(),
            self.timeout.as_secs_f64(),
        );

        let start = Instant::now();
        let outcome = self.send(&body).await;
        let elapsed = start.elapsed();

        match &outcome {
            SummaryOutcome::Generated(text) => debug!(
                "LLM response: {} chars in {:.1}s",
                text.len(),
                elapsed.as_secs_f64()
            ),
            other => warn!(
                "LLM call did not produce text after {:.1}s: {}",
                elapsed.as_secs_f64(),
                other
            ),
        }
        outcome
    }

    async fn send(&self, body: &GenerateRequest<'_>) -> SummaryOutcome {
        let resp = match self
            .client
            .post(self.endpoint.clone())
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => return classify_transport_error(&e),
        };

        let status = resp.status();
        let text = match resp.text().await {
            Ok(text) => text,
            Err(e) => return classify_transport_error(&e),
        };
        trace!("LLM raw response: HTTP {} ({} bytes)", status, text.len());

        if !status.is_success() {
            return SummaryOutcome::Remote {
                status: status.as_u16(),
                body: text,
            };
        }

        parse_generate_body(&text)
    }
}

/// Extract the generated text from a success body.
fn parse_generate_body(text: &str) -> SummaryOutcome {
    let parsed: RawGenerateResponse = match serde_json::from_str(text) {
        Ok(parsed) => parsed,
        Err(e) => return SummaryOutcome::MalformedResponse(format!("failed to parse response: {e}")),
    };
    match parsed.response {
        Some(serde_json::Value::String(s)) => SummaryOutcome::Generated(s),
        _ => SummaryOutcome::NoResponse,
    }
}

fn classify_transport_error(e: &reqwest::Error) -> SummaryOutcome {
    if e.is_timeout() {
        SummaryOutcome::Timeout(format!("request timed out: {e}"))
    } else {
        SummaryOutcome::Connection(format!("request failed: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_shape() {
        let body = GenerateRequest {
            model: "llama3.2:3b",
            prompt: "hi",
            stream: false,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"model": "llama3.2:3b", "prompt": "hi", "stream": false})
        );
    }

    #[test]
    fn parses_response_field() {
        let body = r#"{"model":"m","response":"A short summary.","done":true}"#;
        assert_eq!(
            parse_generate_body(body),
            SummaryOutcome::Generated("A short summary.".into())
        );
    }

    #[test]
    fn missing_response_field_yields_placeholder() {
        let outcome = parse_generate_body(r#"{"done":true}"#);
        assert_eq!(outcome, SummaryOutcome::NoResponse);
        assert_eq!(outcome.display_text(), NO_RESPONSE_PLACEHOLDER);
        assert!(!outcome.is_failure());

        assert_eq!(
            parse_generate_body(r#"{"response":null}"#),
            SummaryOutcome::NoResponse
        );
    }

    #[test]
    fn non_json_body_is_malformed() {
        let outcome = parse_generate_body("<html>oops</html>");
        assert!(matches!(outcome, SummaryOutcome::MalformedResponse(_)));
        assert!(outcome.is_failure());
        assert!(outcome.display_text().starts_with("Error: failed to parse response"));
    }

    #[test]
    fn failure_text_embeds_description() {
        let outcome = SummaryOutcome::Connection("request failed: connection refused".into());
        assert_eq!(
            outcome.display_text(),
            "URL Error: request failed: connection refused"
        );
        let outcome = SummaryOutcome::Remote {
            status: 500,
            body: "model not loaded".into(),
        };
        assert_eq!(outcome.display_text(), "HTTP Error 500: model not loaded");
        let outcome = SummaryOutcome::Remote {
            status: 404,
            body: String::new(),
        };
        assert_eq!(outcome.display_text(), "HTTP Error 404");
    }

    #[test]
    fn invalid_endpoint_rejected_at_construction() {
        let err = GenerateClient::new("not a url", "m", DEFAULT_TIMEOUT).unwrap_err();
        assert!(err.contains("invalid endpoint URL"));
    }

    #[tokio::test]
    async fn connection_refused_becomes_outcome() {
        // Bind then drop a listener so the port is known to be closed.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        let client = GenerateClient::with_client(
            http,
            &format!("http://{addr}/api/generate"),
            "m",
            Duration::from_secs(5),
        )
        .unwrap();
        let outcome = client.summarize("hello").await;
        assert!(matches!(outcome, SummaryOutcome::Connection(_)), "got {outcome:?}");
        assert!(outcome.is_failure());
        assert!(outcome.display_text().starts_with("URL Error: request failed"));
    }
}
