//! Text generation port
//!
//! Everything that talks to a language model goes through [`TextGenerator`]:
//! submit a prompt, get text back. The production adapter is
//! [`gemini::GeminiClient`]; [`UnavailableGenerator`] stands in when no API
//! key is configured, and [`ScriptedGenerator`] replays canned replies.

pub mod gemini;

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::GenerationError;

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Short adapter name for logs
    fn name(&self) -> &'static str;
}

/// Always fails with [`GenerationError::Unavailable`]
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableGenerator;

#[async_trait]
impl TextGenerator for UnavailableGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        Err(GenerationError::Unavailable)
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}

/// Replays queued replies in order, then repeats the fallback reply.
/// Records every prompt it receives.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String, String>>>,
    fallback: Option<String>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    /// Answer every prompt with `reply`
    pub fn always(reply: impl Into<String>) -> Self {
        Self {
            fallback: Some(reply.into()),
            ..Self::default()
        }
    }

    /// Fail every prompt
    pub fn failing() -> Self {
        Self::default()
    }

    pub fn push_reply(&self, reply: impl Into<String>) {
        self.replies.lock().push_back(Ok(reply.into()));
    }

    pub fn push_failure(&self, message: impl Into<String>) {
        self.replies.lock().push_back(Err(message.into()));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.prompts.lock().push(prompt.to_string());
        let next = self.replies.lock().pop_front();
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(GenerationError::Other(message)),
            None => self
                .fallback
                .clone()
                .ok_or_else(|| GenerationError::Other("no scripted reply".to_string())),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unavailable() {
        assert!(matches!(
            UnavailableGenerator.generate("hi").await,
            Err(GenerationError::Unavailable)
        ));
    }

    #[tokio::test]
    async fn test_scripted_order_then_fallback() {
        let g = ScriptedGenerator::always("default");
        g.push_reply("first");
        g.push_failure("boom");
        assert_eq!(g.generate("a").await.unwrap(), "first");
        assert!(g.generate("b").await.is_err());
        assert_eq!(g.generate("c").await.unwrap(), "default");
        assert_eq!(g.calls(), 3);
        assert_eq!(g.prompts(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_failing() {
        assert!(ScriptedGenerator::failing().generate("x").await.is_err());
    }
}
