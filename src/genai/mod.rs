pub mod gemini;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::config::AppConfig;

/// Failures at the generative-backend boundary. Every one of these is
/// absorbed by the owning pipeline component; none crosses the public
/// contract.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("backend returned no text")]
    EmptyResponse,
    #[error("backend returned malformed JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),
    #[error("backend output violated the contract: {0}")]
    Schema(String),
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &str;
    /// Submit a prompt and return the raw response text. The text is not
    /// guaranteed to be valid JSON even on success; callers must validate.
    async fn generate(&self, prompt: &str) -> Result<String, BackendError>;
}

/// Select the generation strategy once at startup: a configured credential
/// yields the remote client, otherwise `None` and every component runs on
/// its deterministic fallback.
pub fn create_generator(config: &AppConfig) -> Option<Arc<dyn TextGenerator>> {
    let cfg = config.gemini.as_ref()?;
    if cfg.api_key.trim().is_empty() {
        return None;
    }
    let client = gemini::GeminiClient::new(cfg.api_key.clone(), cfg.model.clone());
    info!(backend = client.name(), "generative backend configured");
    Some(Arc::new(client))
}

#[cfg(test)]
pub mod testing {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::{BackendError, TextGenerator};

    /// Returns a fixed response and records every prompt it was given.
    pub struct CannedGenerator {
        pub response: String,
        pub prompts: Mutex<Vec<String>>,
    }

    impl CannedGenerator {
        pub fn new(response: &str) -> Self {
            Self {
                response: response.to_string(),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for CannedGenerator {
        fn name(&self) -> &str {
            "Canned"
        }

        async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.response.clone())
        }
    }

    pub struct FailingGenerator;

    #[async_trait]
    impl TextGenerator for FailingGenerator {
        fn name(&self) -> &str {
            "Failing"
        }

        async fn generate(&self, _prompt: &str) -> Result<String, BackendError> {
            Err(BackendError::EmptyResponse)
        }
    }
}
