// src/consensus/adapter.rs
//! Model provider adapters. The engine is provider-agnostic: it needs only
//! `generate(prompt) -> text` plus the verdict extractor over the reply.
//! `ChatCompletionsClient` speaks the OpenAI-compatible chat-completions
//! dialect most hosted models expose; `MockModelClient` scripts replies for
//! tests, offline runs, and the demo binary.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::scoring::ModelConfig;

#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
    fn id(&self) -> &str;
}

const SYSTEM_PROMPT: &str = "You are a URL security analyst. Assess whether the described target \
is malicious. Reply with exactly two lines: 'Verdict: SAFE|SUSPICIOUS|MALICIOUS' and \
'Confidence: NN%', then one short sentence of reasoning.";

/// OpenAI-compatible chat-completions adapter. The API key is read from the
/// environment variable named in the config; a missing key surfaces as an
/// error the consensus engine degrades on.
pub struct ChatCompletionsClient {
    http: reqwest::Client,
    id: String,
    model: String,
    base_url: String,
    api_key: Option<String>,
}

impl ChatCompletionsClient {
    pub fn from_config(cfg: &ModelConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(15))
            .build()
            .context("building model http client")?;
        let api_key = cfg
            .api_key_env
            .as_deref()
            .and_then(|name| std::env::var(name).ok())
            .filter(|k| !k.is_empty());
        Ok(Self {
            http,
            id: cfg.id.clone(),
            model: if cfg.model.is_empty() {
                cfg.id.clone()
            } else {
                cfg.model.clone()
            },
            base_url: cfg
                .base_url
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            api_key,
        })
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[async_trait]
impl ModelClient for ChatCompletionsClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let key = self
            .api_key
            .as_deref()
            .with_context(|| format!("model {}: api key not set", self.id))?;
        let req = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.1,
            max_tokens: 120,
        };
        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url.trim_end_matches('/')))
            .bearer_auth(key)
            .json(&req)
            .send()
            .await
            .with_context(|| format!("model {}: request failed", self.id))?;
        if !resp.status().is_success() {
            anyhow::bail!("model {}: status {}", self.id, resp.status());
        }
        let body: ChatResponse = resp
            .json()
            .await
            .with_context(|| format!("model {}: reply parse", self.id))?;
        let content = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();
        if content.trim().is_empty() {
            anyhow::bail!("model {}: empty reply", self.id);
        }
        Ok(content)
    }

    fn id(&self) -> &str {
        &self.id
    }
}

/// Scripted client: fixed reply, optional delay, optional failure.
pub struct MockModelClient {
    id: String,
    reply: String,
    delay: Option<Duration>,
    fail: bool,
}

impl MockModelClient {
    pub fn new(id: impl Into<String>, reply: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            reply: reply.into(),
            delay: None,
            fail: false,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl ModelClient for MockModelClient {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        if self.fail {
            anyhow::bail!("simulated model failure");
        }
        Ok(self.reply.clone())
    }

    fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_client_returns_scripted_reply() {
        let client = MockModelClient::new("m1", "Verdict: SAFE\nConfidence: 90%");
        let out = client.generate("prompt").await.unwrap();
        assert!(out.starts_with("Verdict: SAFE"));
        assert_eq!(client.id(), "m1");
    }

    #[tokio::test]
    async fn failing_mock_errors() {
        let client = MockModelClient::new("m1", "x").failing();
        assert!(client.generate("prompt").await.is_err());
    }

    #[tokio::test]
    async fn chat_client_without_key_errors_cleanly() {
        let cfg = ModelConfig {
            id: "keyless".into(),
            provider: "openai-compatible".into(),
            model: "test-model".into(),
            base_url: None,
            api_key_env: Some("URL_VERDICT_TEST_KEY_THAT_IS_UNSET".into()),
            weight: 1.0,
            enabled: true,
        };
        let client = ChatCompletionsClient::from_config(&cfg).unwrap();
        let err = client.generate("prompt").await.unwrap_err();
        assert!(err.to_string().contains("api key"));
    }
}
