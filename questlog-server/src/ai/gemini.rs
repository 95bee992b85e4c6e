//! Gemini `generateContent` REST adapter.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::TextGenerator;
use crate::config::GeminiConfig;
use crate::error::GenerationError;

/// Header carrying the API key; keeps it out of request URLs and error text
const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().map(|p| p.text).collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Result<Self, GenerationError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
        };

        let resp = self
            .http
            .post(self.endpoint())
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body: body.chars().take(512).collect(),
            });
        }

        let parsed: GenerateResponse = resp.json().await?;
        let text = parsed.text().ok_or(GenerationError::EmptyResponse)?;
        debug!(model = %self.model, chars = text.len(), "generation complete");
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_request_shape() {
        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: "hello" }],
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
    }

    #[test]
    fn test_response_text_joins_parts() {
        let raw = r#"{"candidates":[{"content":{"parts":[
            {"text":"Do 20 "},{"text":"squats."}
        ]}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.text().as_deref(), Some("Do 20 squats."));
    }

    #[test]
    fn test_response_without_text() {
        let parsed: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(parsed.text().is_none());
        let blank = r#"{"candidates":[{"content":{"parts":[{"text":"  "}]}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(blank).unwrap();
        assert!(parsed.text().is_none());
        let parsed: GenerateResponse = serde_json::from_str(r#"{"promptFeedback":{}}"#).unwrap();
        assert!(parsed.text().is_none());
    }

    #[test]
    fn test_endpoint() {
        let client = GeminiClient::new(&GeminiConfig {
            api_key: "k".into(),
            model: "gemini-pro".into(),
            base_url: "http://localhost:1".into(),
            timeout: Duration::from_secs(1),
        })
        .unwrap();
        assert_eq!(
            client.endpoint(),
            "http://localhost:1/v1beta/models/gemini-pro:generateContent"
        );
    }
}
