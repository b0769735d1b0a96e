//! Best-effort text summarization over a generateContent-style HTTP API.
//!
//! Every failure is reported as [`ServerError::UpstreamUnavailable`]; callers
//! degrade to "no summary available" instead of failing the request.

use serde::{Deserialize, Serialize};

use crate::config::ServerConfig;
use crate::error::ServerError;

const PROMPT_PREFIX: &str = "Summarize this text:\n";

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [RequestContent<'a>; 1],
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content
            .parts
            .into_iter()
            .next()?
            .text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }
}

struct Endpoint {
    url: String,
    api_key: String,
}

pub struct Summarizer {
    client: reqwest::Client,
    endpoint: Option<Endpoint>,
}

impl Summarizer {
    pub fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.summarizer_timeout)
            .build()?;
        let endpoint = match (&config.summarizer_url, &config.summarizer_api_key) {
            (Some(url), Some(api_key)) => Some(Endpoint {
                url: url.clone(),
                api_key: api_key.clone(),
            }),
            _ => None,
        };
        Ok(Self { client, endpoint })
    }

    pub fn is_enabled(&self) -> bool {
        self.endpoint.is_some()
    }

    pub async fn summarize(&self, text: &str) -> Result<String, ServerError> {
        let endpoint = self
            .endpoint
            .as_ref()
            .ok_or_else(|| ServerError::UpstreamUnavailable("summarizer not configured".into()))?;

        let prompt = format!("{PROMPT_PREFIX}{text}");
        let body = GenerateRequest {
            contents: [RequestContent {
                parts: [RequestPart { text: &prompt }],
            }],
        };

        let response = self
            .client
            .post(&endpoint.url)
            .header("x-goog-api-key", &endpoint.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServerError::UpstreamUnavailable(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServerError::UpstreamUnavailable(format!(
                "summarizer returned {status}"
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ServerError::UpstreamUnavailable(format!("unexpected body: {e}")))?;

        parsed
            .first_text()
            .ok_or_else(|| ServerError::UpstreamUnavailable("empty summary".into()))
    }
}
