//! The prompt adapter: one user prompt in, one outcome out.
//!
//! Every call yields an [`AskOutcome`]; nothing escapes as an error. The HTTP
//! layer decides how each outcome is presented.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::config::UpstreamConfig;
use crate::upstream::glm::{ChatCompletionResponse, ChatMessage, GlmClient, UpstreamError};

/// Shown when the upstream answered without any usable text.
pub const NO_REPLY_TEXT: &str = "抱歉，AI未能生成有效的回复。";

/// Shown when the upstream client was never constructed.
pub const UNAVAILABLE_TEXT: &str = "错误：智谱AI客户端未初始化。";

/// Prefix for transport and API failures.
pub const FAILURE_PREFIX: &str = "调用AI服务时发生错误: ";

/// Number of prompt characters included in logs.
const PROMPT_PREVIEW_CHARS: usize = 200;

/// A chat-completion backend. [`GlmClient`] in production, mocks in tests.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Model identifier the backend sends upstream.
    fn model(&self) -> &str;

    /// Perform a single completion call for `messages`.
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<ChatCompletionResponse, UpstreamError>;
}

/// Result of asking the upstream model.
#[derive(Debug)]
pub enum AskOutcome {
    /// Trimmed text of the first choice. May be empty.
    Answered(String),
    /// The call succeeded without a first choice carrying content.
    NoReply,
    /// Transport, status or decoding failure.
    Failed(UpstreamError),
    /// No client was available; no call was made.
    Unavailable,
}

impl AskOutcome {
    pub fn is_answered(&self) -> bool {
        matches!(self, AskOutcome::Answered(_))
    }

    /// Render the outcome as the text returned to the caller.
    pub fn into_text(self) -> String {
        match self {
            AskOutcome::Answered(text) => text,
            AskOutcome::NoReply => NO_REPLY_TEXT.to_string(),
            AskOutcome::Failed(e) => format!("{FAILURE_PREFIX}{e}"),
            AskOutcome::Unavailable => UNAVAILABLE_TEXT.to_string(),
        }
    }
}

/// Process-wide adapter handle. Cheap to clone.
#[derive(Clone)]
pub struct Assistant {
    backend: Option<Arc<dyn ChatBackend>>,
}

impl Assistant {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    /// An adapter whose every call short-circuits to [`AskOutcome::Unavailable`].
    pub fn unavailable() -> Self {
        Self { backend: None }
    }

    /// Construct the GLM client, degrading to [`Assistant::unavailable`] on failure.
    pub fn from_config(config: &UpstreamConfig) -> Self {
        match GlmClient::new(config) {
            Ok(client) => {
                info!(model = %config.model, endpoint = client.endpoint(), "GLM client initialized");
                Self::new(Arc::new(client))
            }
            Err(e) => {
                error!(error = %e, "GLM client initialization failed, requests will be answered with an error");
                Self::unavailable()
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    pub fn model(&self) -> Option<&str> {
        self.backend.as_deref().map(|b| b.model())
    }

    /// Send `prompt` as a single user message and classify the result.
    pub async fn ask(&self, prompt: &str) -> AskOutcome {
        let Some(backend) = &self.backend else {
            warn!("Ask received but the upstream client is not initialized");
            return AskOutcome::Unavailable;
        };

        debug!(
            model = backend.model(),
            prompt_chars = prompt.chars().count(),
            prompt = preview(prompt, PROMPT_PREVIEW_CHARS),
            "Sending prompt upstream"
        );

        match backend.complete(vec![ChatMessage::user(prompt)]).await {
            Ok(response) => match response.first_text() {
                Some(text) => {
                    let text = text.trim();
                    info!(reply_chars = text.chars().count(), "Upstream call succeeded");
                    AskOutcome::Answered(text.to_string())
                }
                None => {
                    warn!(choices = response.choices.len(), "Upstream call succeeded without usable content");
                    AskOutcome::NoReply
                }
            },
            Err(e) => {
                error!(error = %e, "Upstream call failed");
                AskOutcome::Failed(e)
            }
        }
    }
}

/// The first `max_chars` characters of `text`, cut on a char boundary.
fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::upstream::glm::{ChatChoice, ReplyMessage};

    fn reply(content: Option<&str>) -> ChatCompletionResponse {
        ChatCompletionResponse {
            choices: vec![ChatChoice {
                message: Some(ReplyMessage {
                    role: Some("assistant".to_string()),
                    content: content.map(str::to_string),
                }),
            }],
        }
    }

    /// Backend returning a canned result and recording what it was sent.
    struct CannedBackend {
        reply: fn() -> Result<ChatCompletionResponse, UpstreamError>,
        calls: AtomicUsize,
        last: Mutex<Vec<ChatMessage>>,
    }

    impl CannedBackend {
        fn new(reply: fn() -> Result<ChatCompletionResponse, UpstreamError>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
                last: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatBackend for CannedBackend {
        fn model(&self) -> &str {
            "mock-model"
        }

        async fn complete(
            &self,
            messages: Vec<ChatMessage>,
        ) -> Result<ChatCompletionResponse, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = messages;
            (self.reply)()
        }
    }

    #[tokio::test]
    async fn test_answer_is_trimmed() {
        let backend = CannedBackend::new(|| Ok(reply(Some("  hi there\n"))));
        let assistant = Assistant::new(backend.clone());

        let outcome = assistant.ask("hello").await;
        assert!(outcome.is_answered());
        assert_eq!(outcome.into_text(), "hi there");
        assert_eq!(*backend.last.lock().unwrap(), vec![ChatMessage::user("hello")]);
    }

    #[tokio::test]
    async fn test_empty_choices_is_no_reply() {
        let assistant = Assistant::new(CannedBackend::new(|| Ok(ChatCompletionResponse::default())));
        let outcome = assistant.ask("hello").await;
        assert!(matches!(outcome, AskOutcome::NoReply));
        assert_eq!(outcome.into_text(), NO_REPLY_TEXT);
    }

    #[tokio::test]
    async fn test_blank_content_is_answered_empty() {
        let assistant = Assistant::new(CannedBackend::new(|| Ok(reply(Some(" \n ")))));
        let outcome = assistant.ask("hello").await;
        assert!(matches!(&outcome, AskOutcome::Answered(text) if text.is_empty()));
        assert_eq!(outcome.into_text(), "");
    }

    #[tokio::test]
    async fn test_missing_content_is_no_reply() {
        let assistant = Assistant::new(CannedBackend::new(|| Ok(reply(None))));
        assert!(matches!(assistant.ask("hello").await, AskOutcome::NoReply));
    }

    #[tokio::test]
    async fn test_failure_renders_error_text() {
        let assistant = Assistant::new(CannedBackend::new(|| {
            Err(UpstreamError::Api {
                status: 401,
                message: "invalid token".to_string(),
            })
        }));
        let text = assistant.ask("hello").await.into_text();
        assert!(text.starts_with(FAILURE_PREFIX));
        assert!(text.contains("invalid token"));
    }

    #[tokio::test]
    async fn test_unavailable_makes_no_call() {
        let assistant = Assistant::unavailable();
        assert!(!assistant.is_available());
        assert_eq!(assistant.model(), None);
        assert_eq!(assistant.ask("hello").await.into_text(), UNAVAILABLE_TEXT);
    }

    #[test]
    fn test_from_config_without_key_is_unavailable() {
        let assistant = Assistant::from_config(&UpstreamConfig::default());
        assert!(!assistant.is_available());
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        assert_eq!(preview("你好世界", 2), "你好");
        assert_eq!(preview("short", 200), "short");
    }
}
