use crate::config::RewriterConfig;
use crate::rewrite::{RewriteError, Rewriter};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Prompt prefix placed before the content to rewrite
pub const REWRITE_PROMPT: &str = "Rewrite the following content in a better style:\n\n";

/// Ollama chat request format
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Ollama chat response format
#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ChatMessage>,
}

/// Rewriter backed by a local Ollama server's chat API
pub struct OllamaRewriter {
    config: RewriterConfig,
    client: Client,
}

impl OllamaRewriter {
    pub fn new(config: RewriterConfig) -> Result<Self, RewriteError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RewriteError::Connection(e.to_string()))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &RewriterConfig {
        &self.config
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.config.endpoint.trim_end_matches('/'))
    }
}

#[async_trait]
impl Rewriter for OllamaRewriter {
    async fn rewrite(&self, content: &str) -> Result<String, RewriteError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: format!("{}{}", REWRITE_PROMPT, content),
            }],
            stream: false,
        };

        let resp = self
            .client
            .post(self.chat_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| RewriteError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(RewriteError::Api(format!("HTTP {}: {}", status, body)));
        }

        let chat: ChatResponse = resp
            .json()
            .await
            .map_err(|e| RewriteError::Parse(e.to_string()))?;

        let text = chat
            .message
            .map(|m| m.content.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(RewriteError::Parse("Empty rewrite response".to_string()));
        }
        Ok(text)
    }
}
