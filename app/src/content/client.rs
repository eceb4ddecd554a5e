//! Minimal client for an OpenAI-compatible chat completions endpoint.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_TOKENS: u32 = 600;

#[derive(Debug, Error)]
pub enum Error {
    #[error("content provider is not configured")]
    NotConfigured,
    #[error("request to content provider failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid content provider url: {0}")]
    Url(#[from] url::ParseError),
    #[error("content provider returned no text")]
    EmptyResponse,
}

pub struct Config {
    pub api_url: Url,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    api_url: Url,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [Message<'a>; 2],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl Client {
    pub fn new(config: Config) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let mut api_url = config.api_url;
        // `join` replaces the last segment of a base without a trailing slash.
        if !api_url.path().ends_with('/') {
            let path = format!("{}/", api_url.path());
            api_url.set_path(&path);
        }
        Ok(Self {
            http,
            api_url,
            api_key: config.api_key.filter(|key| !key.trim().is_empty()),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub(crate) async fn complete(
        &self,
        model: &str,
        system: &str,
        user: &str,
    ) -> Result<String, Error> {
        let api_key = self.api_key.as_deref().ok_or(Error::NotConfigured)?;
        let request = ChatRequest {
            model,
            max_tokens: MAX_TOKENS,
            messages: [
                Message {
                    role: "system",
                    content: system,
                },
                Message {
                    role: "user",
                    content: user,
                },
            ],
        };
        let response: ChatResponse = self
            .http
            .post(self.api_url.join("chat/completions")?)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_owned())
            .filter(|text| !text.is_empty())
            .ok_or(Error::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_keys_count_as_missing() {
        let client = Client::new(Config {
            api_url: Url::parse("https://openrouter.ai/api/v1/").unwrap(),
            api_key: Some("  ".to_owned()),
        })
        .unwrap();
        assert!(!client.is_configured());
    }

    #[test]
    fn base_url_keeps_its_last_segment() {
        let client = Client::new(Config {
            api_url: Url::parse("https://openrouter.ai/api/v1").unwrap(),
            api_key: None,
        })
        .unwrap();
        assert_eq!(
            client.api_url.join("chat/completions").unwrap().as_str(),
            "https://openrouter.ai/api/v1/chat/completions"
        );
    }

    #[test]
    fn parses_chat_responses() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"  Hello  "}}]}"#;
        let response: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            response.choices[0].message.content.as_deref(),
            Some("  Hello  ")
        );
    }
}
