use serde::Serialize;
use std::future::Future;
use std::pin::Pin;

use crate::error::TranslateError;

mod openai;

pub use openai::OpenAI;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
}

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: String) -> Self {
        Self {
            role: MessageRole::System,
            content,
        }
    }

    pub fn user(content: String) -> Self {
        Self {
            role: MessageRole::User,
            content,
        }
    }
}

/// Sampling parameters sent with every completion request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderUsage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderResponse {
    pub content: String,
    pub model: Option<String>,
    pub usage: Option<ProviderUsage>,
}

pub type ProviderFuture =
    Pin<Box<dyn Future<Output = Result<ProviderResponse, TranslateError>> + Send>>;

/// A chat-completion backend, assembled builder style and consumed by
/// [`Provider::complete`].
pub trait Provider: Clone + Send + Sync + 'static {
    fn append_system_input(self, input: String) -> Self;
    fn append_user_input(self, input: String) -> Self;
    fn with_sampling(self, sampling: Sampling) -> Self;
    fn complete(self) -> ProviderFuture;
}

pub(crate) fn get_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}
