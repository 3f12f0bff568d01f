use serde::{Deserialize, Serialize};

use super::review::Sentiment;

/// Outcome of classifying one piece of review text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub sentiment: Sentiment,
    pub score: f64,
    #[serde(default)]
    pub reasoning: String,
}

/// Per-review classification result inside a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewClassification {
    pub review_id: String,
    pub sentiment: Sentiment,
    pub sentiment_score: f64,
    #[serde(default)]
    pub reasoning: String,
}

/// Aggregate sentiment picture for one app. The numeric fields are always
/// computed locally; only the qualitative fields come from the backend
/// (or its fallback).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentSummary {
    pub overall_sentiment: Sentiment,
    pub confidence: f64,
    pub main_issues: Vec<String>,
    pub main_positives: Vec<String>,
    pub recommendation: String,
    pub total_reviews: usize,
    pub positive_percentage: f64,
    pub negative_percentage: f64,
    pub neutral_percentage: f64,
}
