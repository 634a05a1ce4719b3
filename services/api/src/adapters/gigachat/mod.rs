//! services/api/src/adapters/gigachat/mod.rs
//!
//! This module contains the adapter for the GigaChat completion API.
//! It implements the `ChatCompletionService` port from the `core` crate and
//! manages the OAuth bearer token the provider requires.

mod credential;
pub mod prompt;

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use student_helper_core::ports::{ChatCompletionService, ChatError, ChatResult, Clock, SystemClock};
use student_helper_core::{Completion, ContextCategory};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::GigaChatConfig;
use credential::{credential_expiry, token_preview, CachedCredential, CredentialCache, TokenResponse};

pub use credential::{DEFAULT_VALIDITY_MINUTES, EXPIRY_SAFETY_MARGIN_MINUTES};

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: [RequestMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Serialize)]
struct RequestMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Option<Vec<ResponseChoice>>,
}

#[derive(Deserialize)]
struct ResponseChoice {
    message: Option<ResponseMessage>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ChatCompletionService` against GigaChat.
///
/// One instance is shared by all request handlers. The cached credential is
/// the only mutable state; two callers that miss the cache at the same time
/// may both fetch a token, and the last one stored wins.
pub struct GigaChatAdapter {
    http: Client,
    config: GigaChatConfig,
    credentials: CredentialCache,
    clock: Arc<dyn Clock>,
}

impl GigaChatAdapter {
    /// Creates a new `GigaChatAdapter` reading time from the system clock.
    pub fn new(config: GigaChatConfig) -> Result<Self, reqwest::Error> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: GigaChatConfig, clock: Arc<dyn Clock>) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        info!(model = %config.model, api_url = %config.api_url, "GigaChat adapter initialized");

        Ok(Self {
            http,
            config,
            credentials: CredentialCache::default(),
            clock,
        })
    }

    /// Returns a usable bearer token, fetching a new one on a cache miss.
    async fn access_token(&self, cancel: &CancellationToken) -> ChatResult<String> {
        if let Some(token) = self.credentials.valid_token(self.clock.now()).await {
            debug!("Using cached GigaChat token");
            return Ok(token);
        }

        // Nothing is stored unless the request completes.
        let credential = until_cancelled(cancel, self.request_token()).await?;
        let token = credential.token.clone();
        self.credentials.store(credential).await;
        Ok(token)
    }

    async fn request_token(&self) -> ChatResult<CachedCredential> {
        info!("Requesting new access token from GigaChat");

        let basic = BASE64_STANDARD.encode(format!(
            "{}:{}",
            self.config.client_id, self.config.client_secret
        ));

        let response = self
            .http
            .post(&self.config.auth_url)
            .header(AUTHORIZATION, format!("Basic {}", basic))
            .header(ACCEPT, "application/json")
            .header("RqUID", Uuid::new_v4().to_string())
            .form(&[("scope", self.config.scope.as_str())])
            .send()
            .await
            .map_err(credential_transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(credential_transport_error)?;
        debug!(status = status.as_u16(), "Token response received");

        if !status.is_success() {
            error!(status = status.as_u16(), body = %body, "Failed to get GigaChat token");
            return Err(ChatError::CredentialAcquisitionFailed(format!(
                "token endpoint returned {}",
                status.as_u16()
            )));
        }

        let parsed: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            error!(error = %e, "Token response is not valid JSON");
            ChatError::MalformedUpstreamResponse(e.to_string())
        })?;

        let expires_at_millis = parsed.expires_at_millis();
        let token = match parsed.access_token {
            Some(token) if !token.is_empty() => token,
            _ => {
                error!("No access_token in GigaChat token response");
                return Err(ChatError::CredentialAcquisitionFailed(
                    "no access token in response".to_string(),
                ));
            }
        };

        let expires_at = credential_expiry(self.clock.now(), expires_at_millis);
        info!(expires_at = %expires_at, token = %token_preview(&token), "GigaChat token received");

        Ok(CachedCredential { token, expires_at })
    }

    async fn request_completion(
        &self,
        token: &str,
        message: &str,
        category: ContextCategory,
    ) -> ChatResult<Completion> {
        let request = CompletionRequest {
            model: &self.config.model,
            messages: [
                RequestMessage {
                    role: "system",
                    content: prompt::system_prompt(category),
                },
                RequestMessage {
                    role: "user",
                    content: message,
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            stream: false,
        };

        debug!(category = %category, "Sending request to GigaChat chat/completions");

        let response = self
            .http
            .post(format!("{}/chat/completions", self.config.api_url.trim_end_matches('/')))
            .bearer_auth(token)
            .header(ACCEPT, "application/json")
            .json(&request)
            .send()
            .await
            .map_err(completion_transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(completion_transport_error)?;
        debug!(status = status.as_u16(), "Chat response received");

        if !status.is_success() {
            error!(status = status.as_u16(), body = %body, "GigaChat API error");
            return Err(ChatError::CompletionRequestFailed {
                status: status.as_u16(),
            });
        }

        Ok(parse_completion(&body))
    }
}

//=========================================================================================
// `ChatCompletionService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ChatCompletionService for GigaChatAdapter {
    async fn get_completion(
        &self,
        message: &str,
        category: ContextCategory,
        cancel: &CancellationToken,
    ) -> ChatResult<Completion> {
        if message.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        info!(chars = message.chars().count(), category = %category, "Getting GigaChat response");

        let token = self.access_token(cancel).await?;
        let completion =
            until_cancelled(cancel, self.request_completion(&token, message, category)).await?;

        if completion.is_placeholder() {
            warn!("GigaChat returned no usable content, answering with placeholder");
        } else {
            info!("GigaChat response received successfully");
        }
        Ok(completion)
    }

    fn model_name(&self) -> &str {
        "gigachat"
    }
}

//=========================================================================================
// Helpers
//=========================================================================================

/// Runs `operation` unless `cancel` fires first. A token that is already
/// cancelled wins without polling `operation`.
async fn until_cancelled<T>(
    cancel: &CancellationToken,
    operation: impl Future<Output = ChatResult<T>>,
) -> ChatResult<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ChatError::Cancelled),
        result = operation => result,
    }
}

/// Extracts `choices[0].message.content`, degrading to the placeholder on
/// anything else.
fn parse_completion(body: &str) -> Completion {
    let parsed: CompletionResponse = match serde_json::from_str(body) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(error = %e, "Unparsable GigaChat completion body");
            return Completion::Placeholder;
        }
    };

    parsed
        .choices
        .and_then(|choices| choices.into_iter().next())
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .map(Completion::Generated)
        .unwrap_or(Completion::Placeholder)
}

fn credential_transport_error(e: reqwest::Error) -> ChatError {
    if e.is_timeout() {
        ChatError::Timeout
    } else {
        ChatError::CredentialAcquisitionFailed(e.to_string())
    }
}

fn completion_transport_error(e: reqwest::Error) -> ChatError {
    if e.is_timeout() {
        ChatError::Timeout
    } else {
        ChatError::Transport(e.to_string())
    }
}
