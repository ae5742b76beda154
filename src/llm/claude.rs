//! `claude` CLI backend.

use std::io::Write;
use std::process::{Command, Stdio};

use super::{LanguageModel, LlmError, LlmRequest};

const PROVIDER: &str = "claude";

/// Runs `claude --print` with the user prompt on stdin.
#[derive(Debug, Default)]
pub struct ClaudeCli;

impl ClaudeCli {
    pub fn new() -> Self {
        Self
    }
}

impl LanguageModel for ClaudeCli {
    fn complete(&self, request: &LlmRequest) -> Result<String, LlmError> {
        log::debug!(
            "claude --print --model {} (temperature/max_tokens are managed by the CLI)",
            request.model
        );
        let mut command = Command::new("claude");
        command.args(["--print", "--model", &request.model]);
        if !request.system_prompt.is_empty() {
            command.args(["--append-system-prompt", &request.system_prompt]);
        }

        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| LlmError::Failed(format!("Failed to spawn claude: {}", e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(request.user_prompt.as_bytes())
                .map_err(|e| LlmError::Failed(format!("Failed to write to stdin: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| LlmError::Failed(format!("Failed to wait for claude: {}", e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = if stderr.trim().is_empty() {
                stdout.trim().to_string()
            } else {
                stderr.trim().to_string()
            };
            return Err(classify_failure(&message));
        }
        if stdout.trim().is_empty() {
            return Err(LlmError::Failed("claude returned an empty response".to_string()));
        }
        Ok(stdout)
    }
}

fn classify_failure(message: &str) -> LlmError {
    let lower = message.to_lowercase();
    if lower.contains("oauth")
        || lower.contains("expired")
        || lower.contains("login")
        || lower.contains("authenticat")
        || lower.contains("api key")
    {
        LlmError::Authentication {
            provider: PROVIDER.to_string(),
            message: message.to_string(),
        }
    } else if lower.contains("rate limit") || lower.contains("overloaded") {
        LlmError::RateLimited {
            provider: PROVIDER.to_string(),
            message: message.to_string(),
        }
    } else {
        LlmError::Failed(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_expired_token_as_authentication() {
        assert!(matches!(
            classify_failure("OAuth token has expired. Please run /login"),
            LlmError::Authentication { .. }
        ));
        assert!(matches!(
            classify_failure("Invalid API key"),
            LlmError::Authentication { .. }
        ));
    }

    #[test]
    fn test_classify_rate_limit_and_generic() {
        assert!(matches!(
            classify_failure("API Error: Overloaded"),
            LlmError::RateLimited { .. }
        ));
        assert!(matches!(classify_failure("unknown flag"), LlmError::Failed(_)));
    }
}
