use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error};

use super::{Message, Provider, ProviderFuture, ProviderResponse, ProviderUsage, Sampling};
use crate::error::TranslateError;

pub(crate) const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub(crate) const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone)]
pub struct OpenAI {
    client: reqwest::Client,
    key: String,
    base_url: String,
    model: String,
    messages: Vec<Message>,
    sampling: Option<Sampling>,
}

impl OpenAI {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            key: key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            messages: Vec::new(),
            sampling: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if !model.trim().is_empty() {
            self.model = model;
        }
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        if !base_url.trim().is_empty() {
            self.base_url = base_url.trim_end_matches('/').to_string();
        }
        self
    }

    fn request_body(&self) -> serde_json::Value {
        let mut body = json!({
            "model": self.model,
            "messages": self.messages,
        });
        if let Some(sampling) = self.sampling {
            body["max_tokens"] = json!(sampling.max_tokens);
            body["temperature"] = json!(sampling.temperature);
            body["top_p"] = json!(sampling.top_p);
        }
        body
    }
}

impl Provider for OpenAI {
    fn append_system_input(mut self, input: String) -> Self {
        self.messages.push(Message::system(input));
        self
    }

    fn append_user_input(mut self, input: String) -> Self {
        self.messages.push(Message::user(input));
        self
    }

    fn with_sampling(mut self, sampling: Sampling) -> Self {
        self.sampling = Some(sampling);
        self
    }

    fn complete(self) -> ProviderFuture {
        Box::pin(async move { call_chat_completions(self).await })
    }
}

async fn call_chat_completions(provider: OpenAI) -> Result<ProviderResponse, TranslateError> {
    let url = format!("{}/chat/completions", provider.base_url);
    let body = provider.request_body();
    debug!(model = %provider.model, "sending chat completion request");

    let response = provider
        .client
        .post(&url)
        .bearer_auth(&provider.key)
        .json(&body)
        .send()
        .await
        .inspect_err(|err| error!("chat completion request failed: {}", err))?;

    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    if !status.is_success() {
        error!(status = status.as_u16(), body = %text, "chat completion API error");
        return Err(TranslateError::Upstream {
            status: status.as_u16(),
            body: extract_openai_error(&text).unwrap_or(text),
        });
    }
    extract_completion(&text, &provider.model)
}

pub(crate) fn extract_completion(
    text: &str,
    fallback_model: &str,
) -> Result<ProviderResponse, TranslateError> {
    let payload: OpenAIResponse = serde_json::from_str(text)?;
    let content = payload
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(TranslateError::EmptyResponse)?;
    let model = payload
        .model
        .filter(|value| !value.trim().is_empty())
        .or_else(|| Some(fallback_model.to_string()));
    let usage = payload.usage.map(|usage| ProviderUsage {
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
        total_tokens: usage.total_tokens,
    });
    Ok(ProviderResponse {
        content,
        model,
        usage,
    })
}

fn extract_openai_error(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<OpenAIError>,
    }

    #[derive(Deserialize)]
    struct OpenAIError {
        message: Option<String>,
        #[serde(rename = "type")]
        kind: Option<String>,
        code: Option<String>,
    }

    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    let error = parsed.error?;
    Some(format_error_parts(error.message, error.kind, error.code))
}

fn format_error_parts(
    message: Option<String>,
    kind: Option<String>,
    code: Option<String>,
) -> String {
    let mut parts = Vec::new();
    if let Some(message) = message.filter(|value| !value.trim().is_empty()) {
        parts.push(message);
    }
    if let Some(kind) = kind.filter(|value| !value.trim().is_empty()) {
        parts.push(format!("type: {}", kind));
    }
    if let Some(code) = code.filter(|value| !value.trim().is_empty()) {
        parts.push(format!("code: {}", code));
    }
    if parts.is_empty() {
        "unknown error".to_string()
    } else {
        parts.join(" | ")
    }
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    model: Option<String>,
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
    total_tokens: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openai_extract_first_choice() {
        let payload = include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/openai_chat_response.json"
        ));
        let response = extract_completion(payload, "fallback").unwrap();
        insta::assert_snapshot!(response.content, @"你好呀");
        assert_eq!(response.model.as_deref(), Some("gpt-4o-mini-2024-07-18"));
        assert_eq!(response.usage.and_then(|usage| usage.total_tokens), Some(42));
    }

    #[test]
    fn empty_choices_are_rejected() {
        let err = extract_completion(r#"{"choices": []}"#, "fallback").unwrap_err();
        assert!(matches!(err, TranslateError::EmptyResponse));
    }

    #[test]
    fn error_body_is_summarized() {
        let body = r#"{"error": {"message": "Incorrect API key", "type": "invalid_request_error", "code": "invalid_api_key"}}"#;
        assert_eq!(
            extract_openai_error(body).as_deref(),
            Some("Incorrect API key | type: invalid_request_error | code: invalid_api_key")
        );
        assert_eq!(extract_openai_error("<html>"), None);
    }

    #[test]
    fn request_body_carries_sampling() {
        let provider = OpenAI::new("key")
            .with_model("test-model")
            .append_system_input("system".to_string())
            .append_user_input("user".to_string())
            .with_sampling(Sampling {
                max_tokens: 2000,
                temperature: 0.5,
                top_p: 0.5,
            });
        let body = provider.request_body();
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["max_tokens"], 2000);
        assert_eq!(body["temperature"], 0.5);
        assert_eq!(body["top_p"], 0.5);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "user");
    }
}
