use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::HostError;
use crate::protocol::InlineImage;

pub const FALLBACK_REPLY: &str = "⚠️ Gemini API did not return a valid response.";

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<RequestContent>,
}

#[derive(Serialize)]
struct RequestContent {
    role: String,
    parts: Vec<RequestPart>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum RequestPart {
    Text { text: String },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineImage,
    },
}

#[derive(Deserialize, Default)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Option<Vec<ResponsePart>>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    api_url: String,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(
        api_key: &str,
        model: &str,
        api_url: &str,
        timeout: Duration,
    ) -> Result<Self, HostError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HostError::Transport(format!("could not build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            model: model.to_string(),
            api_url: api_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// One single-turn generate-content call. Shape problems in an otherwise
    /// valid JSON body degrade to `FALLBACK_REPLY`; only transport failures and
    /// unparseable bodies are errors.
    pub async fn generate(
        &self,
        prompt: &str,
        image: Option<&InlineImage>,
    ) -> Result<String, HostError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_url, self.model
        );

        let mut parts = vec![RequestPart::Text {
            text: prompt.to_string(),
        }];
        if let Some(image) = image {
            parts.push(RequestPart::InlineData {
                inline_data: image.clone(),
            });
        }

        let request = GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user".to_string(),
                parts,
            }],
        };

        let timeout_secs = self.timeout.as_secs();
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| HostError::transport(&e, timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Gemini responded with status {}", status);
        }

        let raw = response
            .text()
            .await
            .map_err(|e| HostError::transport(&e, timeout_secs))?;
        debug!("Gemini raw response: {}", raw);

        parse_reply(&raw)
    }
}

/// Parse a generate-content response body into reply text.
pub fn parse_reply(raw: &str) -> Result<String, HostError> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|_| HostError::MalformedJson {
            raw: raw.to_string(),
        })?;

    let response: GenerateContentResponse = serde_json::from_value(value).unwrap_or_default();
    Ok(extract_reply(response).unwrap_or_else(|| FALLBACK_REPLY.to_string()))
}

fn extract_reply(response: GenerateContentResponse) -> Option<String> {
    let candidate = response.candidates?.into_iter().next()?;
    let parts = candidate.content?.parts?;

    Some(
        parts
            .into_iter()
            .map(|part| part.text.unwrap_or_default())
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string(),
    )
}
