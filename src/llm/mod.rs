//! LLM collaborator.
//!
//! Workflows call [`generate`] with a [`LanguageModel`]. The [`ModelRouter`]
//! picks a backend from the `provider:model` string in the request:
//!
//! - `claude:<model>` - the `claude` CLI ([`claude::ClaudeCli`])
//! - `openrouter:<model>` / `fireworks:<model>` - OpenAI-compatible chat
//!   completions over HTTP ([`openai::OpenAiCompatible`])

pub mod claude;
pub mod clean;
pub mod openai;

pub use clean::{clean_message, split_title_body};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("{provider} authentication failed: {message}")]
    Authentication { provider: String, message: String },

    #[error("{provider} rate limit exceeded: {message}")]
    RateLimited { provider: String, message: String },

    #[error("Unknown model provider '{0}' (expected claude, openrouter or fireworks)")]
    UnknownProvider(String),

    #[error("LLM request failed: {0}")]
    Failed(String),
}

impl LlmError {
    /// Authentication and configuration problems never go away by retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::RateLimited { .. } | LlmError::Failed(_))
    }
}

/// One text-generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmRequest {
    /// `provider:model`, e.g. `claude:sonnet`.
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub max_retries: u32,
}

pub trait LanguageModel {
    /// Single attempt, no retries.
    fn complete(&self, request: &LlmRequest) -> Result<String, LlmError>;
}

/// Run `request`, retrying retryable failures up to `max_retries` extra times.
pub fn generate(model: &dyn LanguageModel, request: &LlmRequest) -> Result<String, LlmError> {
    let mut attempt = 0;
    loop {
        match model.complete(request) {
            Ok(text) => return Ok(text),
            Err(e) if e.is_retryable() && attempt < request.max_retries => {
                attempt += 1;
                log::warn!(
                    "LLM attempt {}/{} failed: {}",
                    attempt,
                    request.max_retries + 1,
                    e
                );
            }
            Err(e) => return Err(e),
        }
    }
}

/// Split `provider:model` into its parts.
pub fn split_model(model: &str) -> Result<(&str, &str), LlmError> {
    match model.split_once(':') {
        Some((provider, name)) if !provider.is_empty() && !name.is_empty() => Ok((provider, name)),
        _ => Err(LlmError::UnknownProvider(model.to_string())),
    }
}

/// Providers [`ModelRouter`] knows how to reach.
pub const PROVIDERS: [&str; 3] = ["claude", "openrouter", "fireworks"];

/// Dispatches requests to a backend by the model's provider prefix.
#[derive(Debug, Default)]
pub struct ModelRouter;

impl ModelRouter {
    pub fn new() -> Self {
        Self
    }
}

impl LanguageModel for ModelRouter {
    fn complete(&self, request: &LlmRequest) -> Result<String, LlmError> {
        let (provider, name) = split_model(&request.model)?;
        let routed = LlmRequest {
            model: name.to_string(),
            ..request.clone()
        };
        log::debug!("Routing LLM request to provider '{}' model '{}'", provider, name);
        match provider {
            "claude" | "claude-code" => claude::ClaudeCli::new().complete(&routed),
            "openrouter" => openai::OpenAiCompatible::openrouter()?.complete(&routed),
            "fireworks" => openai::OpenAiCompatible::fireworks()?.complete(&routed),
            other => Err(LlmError::UnknownProvider(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Flaky {
        failures: Cell<u32>,
        auth: bool,
    }

    impl LanguageModel for Flaky {
        fn complete(&self, _: &LlmRequest) -> Result<String, LlmError> {
            if self.failures.get() == 0 {
                return Ok("done".into());
            }
            self.failures.set(self.failures.get() - 1);
            if self.auth {
                Err(LlmError::Authentication {
                    provider: "test".into(),
                    message: "expired".into(),
                })
            } else {
                Err(LlmError::Failed("boom".into()))
            }
        }
    }

    fn request(max_retries: u32) -> LlmRequest {
        LlmRequest {
            model: "claude:sonnet".into(),
            system_prompt: String::new(),
            user_prompt: "hi".into(),
            temperature: 0.7,
            max_tokens: 100,
            max_retries,
        }
    }

    #[test]
    fn test_generate_retries_generic_failures() {
        let model = Flaky {
            failures: Cell::new(2),
            auth: false,
        };
        assert_eq!(generate(&model, &request(2)).unwrap(), "done");
    }

    #[test]
    fn test_generate_gives_up_after_max_retries() {
        let model = Flaky {
            failures: Cell::new(3),
            auth: false,
        };
        assert!(matches!(generate(&model, &request(2)), Err(LlmError::Failed(_))));
        assert_eq!(model.failures.get(), 0);
    }

    #[test]
    fn test_generate_never_retries_authentication() {
        let model = Flaky {
            failures: Cell::new(1),
            auth: true,
        };
        assert!(matches!(
            generate(&model, &request(5)),
            Err(LlmError::Authentication { .. })
        ));
    }

    #[test]
    fn test_split_model() {
        assert_eq!(split_model("claude:sonnet").unwrap(), ("claude", "sonnet"));
        assert_eq!(
            split_model("openrouter:anthropic/claude-3.5-sonnet").unwrap(),
            ("openrouter", "anthropic/claude-3.5-sonnet")
        );
        assert!(split_model("sonnet").is_err());
        assert!(split_model(":sonnet").is_err());
    }

    #[test]
    fn test_router_rejects_unknown_provider() {
        let mut req = request(0);
        req.model = "acme:gpt".into();
        assert!(matches!(
            ModelRouter::new().complete(&req),
            Err(LlmError::UnknownProvider(p)) if p == "acme"
        ));
    }
}
