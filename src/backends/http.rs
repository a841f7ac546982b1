/*!
 * HTTP clients for MT inference servers and OpenAI-compatible chat APIs.
 *
 * The MT client talks to a local inference server exposing a simple
 * translate endpoint (one server process hosts the Marian and NLLB models;
 * loading happens server-side on first use). The chat client speaks the
 * OpenAI chat-completions wire format, which local runtimes such as Ollama
 * and LM Studio also expose.
 */

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::backends::{ChatModel, ModelFactory, TranslationModel};
use crate::errors::{BackendError, ProviderError};
use crate::registry::{Backend, ModelSpec};

/// Default request timeout for MT inference calls
const MT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Translate request for the inference server
#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    /// Model identifier to serve the request with
    model: &'a str,
    /// Placeholder-protected text to translate
    text: &'a str,
    /// Source language; only multilingual models need it
    #[serde(skip_serializing_if = "Option::is_none")]
    src_lang: Option<&'a str>,
    /// Target language; only multilingual models need it
    #[serde(skip_serializing_if = "Option::is_none")]
    tgt_lang: Option<&'a str>,
}

/// Translate response from the inference server
#[derive(Debug, Deserialize)]
struct TranslateResponse {
    /// Translated text
    #[serde(default)]
    translation: Option<String>,
    /// Alternative field some server versions use
    #[serde(default)]
    generated_text: Option<String>,
}

/// Load request for warming a model server-side
#[derive(Debug, Serialize)]
struct LoadRequest<'a> {
    /// Model identifier to load
    model: &'a str,
}

/// One MT model served over HTTP
#[derive(Debug, Clone)]
pub struct HttpTranslationModel {
    base_url: Url,
    client: Client,
    spec: ModelSpec,
}

impl HttpTranslationModel {
    /// Create a handle for `spec` against the server at `base_url`
    pub fn new(base_url: Url, client: Client, spec: ModelSpec) -> Self {
        Self {
            base_url,
            client,
            spec,
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.base_url
            .join(path)
            .map_err(|e| self.request_failed(format!("invalid endpoint '{}': {}", path, e)))
    }

    fn request_failed(&self, message: String) -> BackendError {
        BackendError::RequestFailed {
            model_id: self.spec.model_id.clone(),
            src: self.spec.src_lang.clone(),
            tgt: self.spec.tgt_lang.clone(),
            message,
        }
    }
}

#[async_trait]
impl TranslationModel for HttpTranslationModel {
    async fn translate(
        &self,
        text: &str,
        src_lang: &str,
        tgt_lang: &str,
    ) -> Result<String, BackendError> {
        let multilingual = self.spec.backend == Backend::Nllb;
        let request = TranslateRequest {
            model: &self.spec.model_id,
            text,
            src_lang: multilingual.then_some(src_lang),
            tgt_lang: multilingual.then_some(tgt_lang),
        };

        debug!(
            "MT request to {} for {}->{} ({} chars)",
            self.spec.model_id,
            src_lang,
            tgt_lang,
            text.len()
        );

        let response = self
            .client
            .post(self.endpoint("api/translate")?)
            .timeout(MT_REQUEST_TIMEOUT)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.request_failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("MT server returned {} for {}: {}", status, self.spec.model_id, body);
            return Err(self.request_failed(format!("HTTP {}: {}", status, body)));
        }

        let parsed: TranslateResponse = response
            .json()
            .await
            .map_err(|e| self.request_failed(format!("invalid response body: {}", e)))?;

        let translated = parsed
            .translation
            .or(parsed.generated_text)
            .unwrap_or_default();
        if translated.is_empty() {
            return Err(BackendError::EmptyOutput {
                model_id: self.spec.model_id.clone(),
                src: src_lang.to_string(),
                tgt: tgt_lang.to_string(),
            });
        }
        Ok(translated)
    }

    async fn warm_up(&self) -> Result<(), BackendError> {
        let request = LoadRequest {
            model: &self.spec.model_id,
        };
        let response = self
            .client
            .post(self.endpoint("api/load")?)
            .timeout(MT_REQUEST_TIMEOUT)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.request_failed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(self.request_failed(format!("load failed, HTTP {}: {}", status, body)));
        }
        debug!("Model {} loaded", self.spec.model_id);
        Ok(())
    }
}

/// Factory producing `HttpTranslationModel` handles against one server
pub struct HttpModelFactory {
    base_url: Url,
    client: Client,
}

impl HttpModelFactory {
    /// Create a factory for the inference server at `base_url`
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            client: Client::new(),
        }
    }
}

impl ModelFactory for HttpModelFactory {
    fn create(&self, spec: &ModelSpec) -> Arc<dyn TranslationModel> {
        Arc::new(HttpTranslationModel::new(
            self.base_url.clone(),
            self.client.clone(),
            spec.clone(),
        ))
    }
}

/// Chat completion request (OpenAI wire format)
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    /// Model name
    model: &'a str,
    /// Conversation messages
    messages: Vec<ChatMessage>,
    /// Sampling temperature
    temperature: f32,
    /// Streaming is never used here
    stream: bool,
}

/// Chat message object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (system or user)
    pub role: String,
    /// Content of the message
    pub content: String,
}

/// Chat completion response (OpenAI wire format)
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    /// Completion choices; the first one carries the output
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// OpenAI-compatible chat client used by the post-editor
#[derive(Debug, Clone)]
pub struct OpenAiChatClient {
    base_url: Url,
    client: Client,
    model_name: String,
    temperature: f32,
    system_prompt: String,
}

impl OpenAiChatClient {
    /// Create a chat client for `model_name` at `base_url`
    pub fn new(base_url: Url, model_name: &str, temperature: f32) -> Self {
        Self {
            base_url,
            client: Client::new(),
            model_name: model_name.to_string(),
            temperature,
            system_prompt: "You post-edit machine translations.".to_string(),
        }
    }
}

#[async_trait]
impl ChatModel for OpenAiChatClient {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let endpoint = self
            .base_url
            .join("v1/chat/completions")
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let request = ChatCompletionRequest {
            model: &self.model_name,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: self.system_prompt.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            temperature: self.temperature,
            stream: false,
        };

        let response = self
            .client
            .post(endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status_code: status.as_u16(),
                message: body,
            });
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::ParseError("response contained no choices".to_string()))
    }
}
