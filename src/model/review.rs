use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
    Unset,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
            Sentiment::Unset => "unset",
        }
    }
}

impl Default for Sentiment {
    fn default() -> Self {
        Sentiment::Unset
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Store {
    GooglePlay,
    AppStore,
}

impl Store {
    pub fn as_str(&self) -> &'static str {
        match self {
            Store::GooglePlay => "google_play",
            Store::AppStore => "app_store",
        }
    }
}

impl fmt::Display for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical, storefront-agnostic review. Identity is
/// `(app_id, store, review_id)`; `content` is never empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub review_id: String,
    pub app_id: String,
    pub store: Store,
    pub author: String,
    pub content: String,
    pub rating: u8,
    #[serde(default)]
    pub sentiment: Sentiment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment_score: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// Raw review record as returned by a storefront adapter. The two stores
/// disagree on field names; serde aliases absorb both shapes so nothing
/// downstream ever branches on store identity.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawReview {
    #[serde(default, alias = "reviewId", alias = "id")]
    pub review_id: Option<String>,
    #[serde(default, alias = "userName", alias = "user_name")]
    pub author: Option<String>,
    #[serde(default, alias = "text", alias = "review")]
    pub content: Option<String>,
    #[serde(default, alias = "score")]
    pub rating: Option<u8>,
    #[serde(default, alias = "at")]
    pub date: Option<DateTime<Utc>>,
}
