use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    pub gemini: Option<GeminiConfig>,
    pub jira: Option<JiraConfig>,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Deserialize)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct JiraConfig {
    pub domain: String,
    pub email: String,
    pub api_token: String,
    pub project_key: Option<String>,
}

/// What a batch classification does when a single review's analysis blows
/// up: substitute a neutral placeholder and keep going, or abort the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchFailurePolicy {
    PerItemFallback,
    AbortBatch,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub batch_failure_policy: BatchFailurePolicy,
    /// Min/max jitter between per-review backend calls, in milliseconds.
    pub classify_delay_ms: (u64, u64),
    pub review_limit: usize,
    pub mock_seed: Option<u64>,
    pub country: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            batch_failure_policy: BatchFailurePolicy::PerItemFallback,
            classify_delay_ms: (1000, 2000),
            review_limit: 100,
            mock_seed: None,
            country: "br".into(),
        }
    }
}

fn config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".storepulse")
        .join("config.toml")
}

pub fn load_config() -> Result<AppConfig> {
    let path = config_path();
    let mut config: AppConfig = if path.exists() {
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        toml::from_str(&contents).with_context(|| "Failed to parse config.toml")?
    } else {
        AppConfig::default()
    };

    // The env var wins over the config file.
    if let Ok(key) = std::env::var("GEMINI_API_KEY") {
        if !key.trim().is_empty() {
            match &mut config.gemini {
                Some(gemini) => gemini.api_key = key,
                None => {
                    config.gemini = Some(GeminiConfig {
                        api_key: key,
                        model: None,
                    })
                }
            }
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_defaults() {
        let config = AppConfig::default();
        assert_eq!(
            config.analysis.batch_failure_policy,
            BatchFailurePolicy::PerItemFallback
        );
        assert_eq!(config.analysis.classify_delay_ms, (1000, 2000));
        assert_eq!(config.analysis.review_limit, 100);
        assert!(config.analysis.mock_seed.is_none());
    }

    #[test]
    fn parses_full_config() {
        let toml_src = r#"
            [gemini]
            api_key = "k"
            model = "gemini-1.5-pro"

            [jira]
            domain = "acme"
            email = "dev@acme.com"
            api_token = "t"

            [analysis]
            batch_failure_policy = "abort_batch"
            classify_delay_ms = [0, 0]
            mock_seed = 42
        "#;
        let config: AppConfig = toml::from_str(toml_src).unwrap();
        assert_eq!(
            config.gemini.unwrap().model.as_deref(),
            Some("gemini-1.5-pro")
        );
        assert_eq!(
            config.analysis.batch_failure_policy,
            BatchFailurePolicy::AbortBatch
        );
        assert_eq!(config.analysis.mock_seed, Some(42));
        assert_eq!(config.analysis.review_limit, 100);
    }
}
