//! LLM provider capability registry.
//!
//! The transport layer is external: the pipeline only sees the
//! [`LlmProvider`] trait and resolves handles through an injected
//! [`ProviderResolver`] once per run. Resolved handles are shared read-only
//! across round workers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::error::{PipelineError, ProviderError, Result};
use crate::domain::run::TokenUsage;

/// Chat message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Requested response shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    Text,
    JsonObject,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub response_format: Option<ResponseFormat>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub content: String,
    pub usage: TokenUsage,
    pub latency_ms: u64,
}

/// A chat-completion backend. Retries, if any, happen inside the
/// implementation.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> std::result::Result<ChatResponse, ProviderError>;
}

/// A provider bound to one model.
#[derive(Clone)]
pub struct ProviderHandle {
    pub provider_id: String,
    pub model: String,
    pub provider: Arc<dyn LlmProvider>,
}

impl ProviderHandle {
    /// `provider/model`, the identifier used for judges and logs.
    pub fn id(&self) -> String {
        format!("{}/{}", self.provider_id, self.model)
    }

    /// Send `messages` to this handle's model.
    pub async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
        response_format: Option<ResponseFormat>,
    ) -> Result<ChatResponse> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            temperature,
            max_tokens,
            response_format,
        };
        self.provider.chat(request).await.map_err(PipelineError::from)
    }
}

impl std::fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderHandle")
            .field("provider_id", &self.provider_id)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

/// Resolves a `(provider, model)` pair to a handle. Unknown providers or
/// missing credentials are configuration errors.
pub trait ProviderResolver: Send + Sync {
    fn resolve(&self, provider_id: &str, model: &str) -> Result<ProviderHandle>;
}

/// Resolver over a fixed set of registered providers.
#[derive(Default, Clone)]
pub struct StaticProviderResolver {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
}

impl StaticProviderResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `provider` under `provider_id`. Any model name is accepted
    /// for a registered provider.
    pub fn with_provider(mut self, provider_id: &str, provider: Arc<dyn LlmProvider>) -> Self {
        self.providers.insert(provider_id.to_string(), provider);
        self
    }
}

impl ProviderResolver for StaticProviderResolver {
    fn resolve(&self, provider_id: &str, model: &str) -> Result<ProviderHandle> {
        let provider = self.providers.get(provider_id).ok_or_else(|| {
            PipelineError::Configuration(format!("unsupported provider: {provider_id}"))
        })?;
        if model.trim().is_empty() {
            return Err(PipelineError::Configuration(format!(
                "provider {provider_id} configured without a model"
            )));
        }
        Ok(ProviderHandle {
            provider_id: provider_id.to_string(),
            model: model.to_string(),
            provider: Arc::clone(provider),
        })
    }
}
