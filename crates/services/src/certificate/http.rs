use std::env;

use async_trait::async_trait;
use lesson_core::model::{LessonId, UserId};
use reqwest::Client;
use serde::Serialize;

use super::{CertificateCheck, CompletionCheck};
use crate::error::CompletionCheckError;

#[derive(Clone, Debug)]
pub struct CompletionCheckConfig {
    pub base_url: String,
    pub api_token: Option<String>,
}

impl CompletionCheckConfig {
    /// Reads `LEARN_CERTIFICATE_URL` and optional `LEARN_API_TOKEN`.
    ///
    /// Returns `None` when no URL is configured.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("LEARN_CERTIFICATE_URL").ok()?;
        if base_url.trim().is_empty() {
            return None;
        }
        let api_token = env::var("LEARN_API_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty());
        Some(Self {
            base_url,
            api_token,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/certificates/check", self.base_url.trim_end_matches('/'))
    }
}

/// Completion check backed by the platform's HTTP API.
#[derive(Clone)]
pub struct HttpCompletionCheck {
    client: Client,
    config: Option<CompletionCheckConfig>,
}

impl HttpCompletionCheck {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(CompletionCheckConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<CompletionCheckConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }
}

#[async_trait]
impl CompletionCheck for HttpCompletionCheck {
    async fn check(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<CertificateCheck, CompletionCheckError> {
        let config = self
            .config
            .as_ref()
            .ok_or(CompletionCheckError::Disabled)?;

        let payload = CheckRequest {
            user_id: user_id.to_string(),
            lesson_id: lesson_id.value(),
        };
        let mut request = self.client.post(config.endpoint()).json(&payload);
        if let Some(token) = &config.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(CompletionCheckError::HttpStatus(response.status()));
        }

        Ok(response.json::<CertificateCheck>().await?)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckRequest {
    user_id: String,
    lesson_id: u64,
}
