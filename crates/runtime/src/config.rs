//! Per-conversation configuration.

use std::time::Duration;

pub const DEFAULT_MAX_TOKENS: u32 = 1024;
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 25;
pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(120);

/// Static configuration sent with every model call, plus loop limits.
#[derive(Debug, Clone)]
pub struct ConversationConfig {
    /// Model identifier.
    pub model: String,
    /// Maximum output tokens per model call.
    pub max_tokens: u32,
    /// Ordered system prompt text blocks.
    pub system: Vec<String>,
    /// Ceiling on tool-dispatch rounds within one prompt. `None` disables it.
    pub max_tool_rounds: Option<usize>,
    /// Retry behavior for transport failures.
    pub retry: RetryPolicy,
    /// Deadline for a single model call. `None` waits indefinitely.
    pub model_timeout: Option<Duration>,
    /// Deadline for a single tool invocation.
    pub tool_timeout: Option<Duration>,
}

impl ConversationConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            system: Vec::new(),
            max_tool_rounds: Some(DEFAULT_MAX_TOOL_ROUNDS),
            retry: RetryPolicy::default(),
            model_timeout: Some(DEFAULT_MODEL_TIMEOUT),
            tool_timeout: None,
        }
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Append a system prompt block.
    pub fn system(mut self, text: impl Into<String>) -> Self {
        self.system.push(text.into());
        self
    }

    pub fn max_tool_rounds(mut self, rounds: Option<usize>) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn model_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.model_timeout = timeout;
        self
    }

    pub fn tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = Some(timeout);
        self
    }
}

/// Exponential backoff for retryable transport failures.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (zero-based).
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = self.multiplier.powi(i32::try_from(retry).unwrap_or(i32::MAX));
        let delay = self.initial_delay.as_secs_f64() * factor;
        if !delay.is_finite() || delay >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ConversationConfig::new("claude-test");
        assert_eq!(config.max_tokens, 1024);
        assert_eq!(config.max_tool_rounds, Some(25));
        assert!(config.system.is_empty());
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.model_timeout, Some(Duration::from_secs(120)));
        assert_eq!(config.tool_timeout, None);
    }

    #[test]
    fn system_blocks_keep_order() {
        let config = ConversationConfig::new("m").system("first").system("second");
        assert_eq!(config.system, ["first", "second"]);
    }

    #[test]
    fn backoff_grows_and_caps() {
        let policy = RetryPolicy {
            max_retries: 10,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            multiplier: 2.0,
        };
        assert_eq!(policy.delay(0), Duration::from_millis(100));
        assert_eq!(policy.delay(1), Duration::from_millis(200));
        assert_eq!(policy.delay(2), Duration::from_millis(400));
        assert_eq!(policy.delay(4), Duration::from_secs(1));
        assert_eq!(policy.delay(u32::MAX), Duration::from_secs(1));
    }
}
