//! OpenAI-compatible chat completions (OpenRouter, Fireworks).

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{LanguageModel, LlmError, LlmRequest};

const TIMEOUT_SECS: u64 = 120;
const OPENROUTER_REFERER: &str = "https://github.com/auto-pr/auto-pr";

/// Static description of one OpenAI-compatible provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderSpec {
    pub name: &'static str,
    pub api_key_env: &'static str,
    pub base_url: &'static str,
    pub referer: Option<&'static str>,
}

pub const OPENROUTER: ProviderSpec = ProviderSpec {
    name: "OpenRouter",
    api_key_env: "OPENROUTER_API_KEY",
    base_url: "https://openrouter.ai/api/v1",
    referer: Some(OPENROUTER_REFERER),
};

pub const FIREWORKS: ProviderSpec = ProviderSpec {
    name: "Fireworks",
    api_key_env: "FIREWORKS_API_KEY",
    base_url: "https://api.fireworks.ai/inference/v1",
    referer: None,
};

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiCompatible {
    client: Client,
    spec: ProviderSpec,
    api_key: String,
}

impl OpenAiCompatible {
    pub fn new(spec: ProviderSpec, api_key: String) -> Result<Self, LlmError> {
        let client = Client::builder()
            .user_agent(concat!("auto-pr/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .map_err(|e| LlmError::Failed(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            spec,
            api_key,
        })
    }

    /// Build a client for `spec`, reading its API key from the environment.
    pub fn from_env(spec: ProviderSpec) -> Result<Self, LlmError> {
        let api_key = std::env::var(spec.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| LlmError::Authentication {
                provider: spec.name.to_string(),
                message: format!("{} is not set", spec.api_key_env),
            })?;
        Self::new(spec, api_key)
    }

    pub fn openrouter() -> Result<Self, LlmError> {
        Self::from_env(OPENROUTER)
    }

    pub fn fireworks() -> Result<Self, LlmError> {
        Self::from_env(FIREWORKS)
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.spec.base_url)
    }
}

impl LanguageModel for OpenAiCompatible {
    fn complete(&self, request: &LlmRequest) -> Result<String, LlmError> {
        let mut messages = Vec::with_capacity(2);
        if !request.system_prompt.is_empty() {
            messages.push(ChatMessage {
                role: "system",
                content: &request.system_prompt,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.user_prompt,
        });
        let body = ChatRequest {
            model: &request.model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        log::debug!("POST {} model={}", self.url(), request.model);
        let mut builder = self
            .client
            .post(self.url())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body);
        if let Some(referer) = self.spec.referer {
            builder = builder.header("HTTP-Referer", referer);
        }

        let response = builder
            .send()
            .map_err(|e| LlmError::Failed(format!("{} request failed: {}", self.spec.name, e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(classify_status(self.spec.name, status.as_u16(), &text));
        }

        let parsed: ChatResponse = response.json().map_err(|e| {
            LlmError::Failed(format!("Failed to parse {} response: {}", self.spec.name, e))
        })?;
        extract_content(self.spec.name, parsed)
    }
}

fn classify_status(provider: &str, status: u16, body: &str) -> LlmError {
    let message = format!("{} - {}", status, body.trim());
    match status {
        401 | 403 => LlmError::Authentication {
            provider: provider.to_string(),
            message,
        },
        429 => LlmError::RateLimited {
            provider: provider.to_string(),
            message,
        },
        _ => LlmError::Failed(format!("{} API error: {}", provider, message)),
    }
}

fn extract_content(provider: &str, response: ChatResponse) -> Result<String, LlmError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| LlmError::Failed(format!("{} returned an empty response", provider)))
}
