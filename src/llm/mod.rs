mod client;
pub mod prompts;
mod stream;

pub use client::LlamaClient;
pub use stream::StreamAssembler;

use crate::error::Result;
use async_trait::async_trait;

/// A language model that turns one prompt into one fully assembled reply.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

#[cfg(test)]
pub mod scripted {
    use super::CompletionModel;
    use crate::error::{AssistantError, Result};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned replies in order; `None` simulates a transport failure.
    #[derive(Default)]
    pub struct ScriptedModel {
        replies: Mutex<VecDeque<Option<String>>>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        pub fn new(replies: &[Option<&str>]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().map(|r| r.map(str::to_string)).collect()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl CompletionModel for ScriptedModel {
        async fn complete(&self, prompt: &str) -> Result<String> {
            if let Ok(mut prompts) = self.prompts.lock() {
                prompts.push(prompt.to_string());
            }
            let next = self.replies.lock().ok().and_then(|mut r| r.pop_front()).flatten();
            next.ok_or_else(|| AssistantError::ModelTransport("model unavailable".to_string()))
        }
    }
}
