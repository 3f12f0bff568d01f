use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::Deserialize;
use tracing::warn;

use crate::config::AnalysisConfig;
use crate::genai::{BackendError, TextGenerator};
use crate::model::review::{Review, Sentiment};
use crate::model::sentiment::SentimentSummary;
use crate::util::json_text::strip_code_fences;

use super::Generated;

/// Sample excerpts per sentiment class included in the summary prompt.
const SAMPLES_PER_CLASS: usize = 2;
const SAMPLE_CHAR_CAP: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
struct SentimentStats {
    total: usize,
    positive: usize,
    negative: usize,
    neutral: usize,
}

impl SentimentStats {
    /// Counts over classified reviews only; `Unset` reviews carry no signal.
    fn compute(reviews: &[Review]) -> Self {
        let positive = reviews
            .iter()
            .filter(|r| r.sentiment == Sentiment::Positive)
            .count();
        let negative = reviews
            .iter()
            .filter(|r| r.sentiment == Sentiment::Negative)
            .count();
        let neutral = reviews
            .iter()
            .filter(|r| r.sentiment == Sentiment::Neutral)
            .count();
        Self {
            total: positive + negative + neutral,
            positive,
            negative,
            neutral,
        }
    }

    fn percentage(&self, count: usize) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        round1(count as f64 / self.total as f64 * 100.0)
    }

    /// Strict majority across the three classes; any tie for the top spot
    /// resolves to neutral.
    fn majority(&self) -> Sentiment {
        if self.positive > self.negative && self.positive > self.neutral {
            Sentiment::Positive
        } else if self.negative > self.positive && self.negative > self.neutral {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Qualitative half of a summary, the only part the backend contributes.
#[derive(Debug, Deserialize)]
struct Verdict {
    overall_sentiment: Sentiment,
    confidence: f64,
    #[serde(default)]
    main_issues: Vec<String>,
    #[serde(default)]
    main_positives: Vec<String>,
    #[serde(default)]
    recommendation: String,
}

fn parse_verdict(raw: &str) -> Result<Verdict, BackendError> {
    let cleaned = strip_code_fences(raw);
    let verdict: Verdict = serde_json::from_str(cleaned)?;

    if verdict.overall_sentiment == Sentiment::Unset {
        return Err(BackendError::Schema(
            "overall_sentiment must be positive, negative or neutral".into(),
        ));
    }
    if !(0.0..=1.0).contains(&verdict.confidence) {
        return Err(BackendError::Schema(format!(
            "confidence {} out of range [0, 1]",
            verdict.confidence
        )));
    }
    Ok(verdict)
}

pub struct SentimentSummarizer {
    generator: Option<Arc<dyn TextGenerator>>,
    delay_ms: (u64, u64),
}

impl SentimentSummarizer {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>, config: &AnalysisConfig) -> Self {
        Self {
            generator,
            delay_ms: config.classify_delay_ms,
        }
    }

    /// Summarize classified reviews for one app. The numeric distribution is
    /// always computed locally; only the qualitative fields depend on the
    /// backend, and they degrade to deterministic placeholders.
    pub async fn summarize(&self, app_name: &str, reviews: &[Review]) -> Generated<SentimentSummary> {
        let stats = SentimentStats::compute(reviews);

        if stats.total == 0 {
            return Generated::Degraded(
                SentimentSummary {
                    overall_sentiment: Sentiment::Neutral,
                    confidence: 0.0,
                    main_issues: Vec::new(),
                    main_positives: Vec::new(),
                    recommendation: "No classified reviews available.".into(),
                    total_reviews: 0,
                    positive_percentage: 0.0,
                    negative_percentage: 0.0,
                    neutral_percentage: 0.0,
                },
                "no classified reviews".into(),
            );
        }

        let generator = match &self.generator {
            Some(generator) => generator,
            None => {
                return Generated::Degraded(
                    fallback_summary(&stats),
                    "no backend credential configured".into(),
                )
            }
        };

        match self
            .summarize_remote(generator.as_ref(), app_name, reviews, &stats)
            .await
        {
            Ok(summary) => Generated::Primary(summary),
            Err(err) => {
                warn!(error = %err, "summary backend failed, using local fallback");
                Generated::Degraded(fallback_summary(&stats), err.to_string())
            }
        }
    }

    async fn summarize_remote(
        &self,
        generator: &dyn TextGenerator,
        app_name: &str,
        reviews: &[Review],
        stats: &SentimentStats,
    ) -> Result<SentimentSummary, BackendError> {
        self.throttle().await;
        let raw = generator
            .generate(&summary_prompt(app_name, reviews, stats))
            .await?;
        let verdict = parse_verdict(&raw)?;

        Ok(SentimentSummary {
            overall_sentiment: verdict.overall_sentiment,
            confidence: verdict.confidence,
            main_issues: verdict.main_issues,
            main_positives: verdict.main_positives,
            recommendation: verdict.recommendation,
            total_reviews: stats.total,
            positive_percentage: stats.percentage(stats.positive),
            negative_percentage: stats.percentage(stats.negative),
            neutral_percentage: stats.percentage(stats.neutral),
        })
    }

    async fn throttle(&self) {
        let (min, max) = self.delay_ms;
        if max == 0 {
            return;
        }
        let wait = if max > min {
            rand::thread_rng().gen_range(min..=max)
        } else {
            min
        };
        tokio::time::sleep(Duration::from_millis(wait)).await;
    }
}

fn fallback_summary(stats: &SentimentStats) -> SentimentSummary {
    SentimentSummary {
        overall_sentiment: stats.majority(),
        confidence: 0.7,
        main_issues: vec!["Offline fallback summary is active".into()],
        main_positives: vec!["Configure a generative backend credential for a full analysis".into()],
        recommendation: "Configure the generative backend for a more precise analysis".into(),
        total_reviews: stats.total,
        positive_percentage: stats.percentage(stats.positive),
        negative_percentage: stats.percentage(stats.negative),
        neutral_percentage: stats.percentage(stats.neutral),
    }
}

fn summary_prompt(app_name: &str, reviews: &[Review], stats: &SentimentStats) -> String {
    let mut samples = Vec::new();
    for sentiment in [Sentiment::Positive, Sentiment::Negative, Sentiment::Neutral] {
        samples.extend(
            reviews
                .iter()
                .filter(|r| r.sentiment == sentiment)
                .take(SAMPLES_PER_CLASS),
        );
    }
    let sample_text: String = samples
        .iter()
        .map(|r| {
            let excerpt: String = r.content.chars().take(SAMPLE_CHAR_CAP).collect();
            format!("- {excerpt}...\n")
        })
        .collect();

    format!(
        r#"Analyze the overall sentiment of the app "{app_name}" based on the following statistics and review samples:

Statistics:
- Total reviews: {total}
- Positive: {positive} ({positive_pct:.1}%)
- Negative: {negative} ({negative_pct:.1}%)
- Neutral: {neutral} ({neutral_pct:.1}%)

Review samples:
{sample_text}
Respond ONLY with a JSON object in this exact format:
{{
    "overall_sentiment": "positive|negative|neutral",
    "confidence": 0.85,
    "main_issues": ["issue1", "issue2"],
    "main_positives": ["positive1", "positive2"],
    "recommendation": "brief recommendation"
}}"#,
        total = stats.total,
        positive = stats.positive,
        positive_pct = stats.percentage(stats.positive),
        negative = stats.negative,
        negative_pct = stats.percentage(stats.negative),
        neutral = stats.neutral,
        neutral_pct = stats.percentage(stats.neutral),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genai::testing::{CannedGenerator, FailingGenerator};
    use crate::model::review::Store;
    use chrono::Utc;

    fn quiet_config() -> AnalysisConfig {
        AnalysisConfig {
            classify_delay_ms: (0, 0),
            ..AnalysisConfig::default()
        }
    }

    fn review(id: &str, sentiment: Sentiment) -> Review {
        Review {
            review_id: id.to_string(),
            app_id: "app1".into(),
            store: Store::AppStore,
            author: "Anonymous".into(),
            content: format!("review body {id}"),
            rating: 3,
            sentiment,
            sentiment_score: None,
            timestamp: Utc::now(),
        }
    }

    fn mixed_reviews(positive: usize, negative: usize, neutral: usize) -> Vec<Review> {
        let mut out = Vec::new();
        for i in 0..positive {
            out.push(review(&format!("p{i}"), Sentiment::Positive));
        }
        for i in 0..negative {
            out.push(review(&format!("n{i}"), Sentiment::Negative));
        }
        for i in 0..neutral {
            out.push(review(&format!("u{i}"), Sentiment::Neutral));
        }
        out
    }

    #[tokio::test]
    async fn empty_input_yields_zeroed_neutral_summary() {
        let summarizer = SentimentSummarizer::new(None, &quiet_config());
        let summary = summarizer.summarize("MyApp", &[]).await.into_inner();
        assert_eq!(summary.overall_sentiment, Sentiment::Neutral);
        assert_eq!(summary.total_reviews, 0);
        assert_eq!(summary.positive_percentage, 0.0);
        assert_eq!(summary.negative_percentage, 0.0);
        assert_eq!(summary.neutral_percentage, 0.0);
    }

    #[tokio::test]
    async fn unset_reviews_carry_no_signal() {
        let summarizer = SentimentSummarizer::new(None, &quiet_config());
        let reviews = vec![review("r1", Sentiment::Unset)];
        let summary = summarizer.summarize("MyApp", &reviews).await.into_inner();
        assert_eq!(summary.total_reviews, 0);
    }

    #[tokio::test]
    async fn percentages_sum_to_one_hundred() {
        let summarizer = SentimentSummarizer::new(None, &quiet_config());
        for (p, n, u) in [(1, 1, 1), (3, 2, 1), (7, 0, 0), (2, 5, 6)] {
            let reviews = mixed_reviews(p, n, u);
            let summary = summarizer.summarize("MyApp", &reviews).await.into_inner();
            let sum =
                summary.positive_percentage + summary.negative_percentage + summary.neutral_percentage;
            assert!((sum - 100.0).abs() < 0.2, "({p},{n},{u}) summed to {sum}");
        }
    }

    #[tokio::test]
    async fn fallback_majority_wins() {
        let summarizer = SentimentSummarizer::new(None, &quiet_config());
        let summary = summarizer
            .summarize("MyApp", &mixed_reviews(4, 1, 1))
            .await
            .into_inner();
        assert_eq!(summary.overall_sentiment, Sentiment::Positive);
        assert!((summary.confidence - 0.7).abs() < 1e-9);
    }

    #[tokio::test]
    async fn fallback_tie_is_neutral() {
        let summarizer = SentimentSummarizer::new(None, &quiet_config());
        let summary = summarizer
            .summarize("MyApp", &mixed_reviews(3, 3, 0))
            .await
            .into_inner();
        assert_eq!(summary.overall_sentiment, Sentiment::Neutral);
    }

    #[tokio::test]
    async fn primary_path_merges_verdict_with_local_stats() {
        let generator = CannedGenerator::new(
            r#"```json
{
    "overall_sentiment": "negative",
    "confidence": 0.9,
    "main_issues": ["crashes"],
    "main_positives": ["nice design"],
    "recommendation": "fix stability first"
}
```"#,
        );
        let summarizer = SentimentSummarizer::new(Some(Arc::new(generator)), &quiet_config());
        let outcome = summarizer.summarize("MyApp", &mixed_reviews(1, 3, 0)).await;
        assert!(!outcome.is_degraded());
        let summary = outcome.into_inner();
        assert_eq!(summary.overall_sentiment, Sentiment::Negative);
        assert_eq!(summary.main_issues, vec!["crashes".to_string()]);
        assert_eq!(summary.total_reviews, 4);
        assert!((summary.positive_percentage - 25.0).abs() < 1e-9);
        assert!((summary.negative_percentage - 75.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn degrades_on_backend_failure() {
        let summarizer =
            SentimentSummarizer::new(Some(Arc::new(FailingGenerator)), &quiet_config());
        let outcome = summarizer.summarize("MyApp", &mixed_reviews(0, 4, 1)).await;
        assert!(outcome.is_degraded());
        assert_eq!(outcome.into_inner().overall_sentiment, Sentiment::Negative);
    }

    #[tokio::test]
    async fn degrades_on_invalid_verdict() {
        let generator =
            CannedGenerator::new(r#"{"overall_sentiment": "meh", "confidence": 0.5}"#);
        let summarizer = SentimentSummarizer::new(Some(Arc::new(generator)), &quiet_config());
        let outcome = summarizer.summarize("MyApp", &mixed_reviews(1, 1, 1)).await;
        assert!(outcome.is_degraded());
    }

    #[tokio::test]
    async fn prompt_contains_stats_and_samples() {
        let generator = Arc::new(CannedGenerator::new("garbage"));
        let summarizer = SentimentSummarizer::new(Some(generator.clone()), &quiet_config());
        let _ = summarizer.summarize("MyApp", &mixed_reviews(3, 1, 0)).await;

        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Total reviews: 4"));
        assert!(prompts[0].contains("Positive: 3 (75.0%)"));
        // At most two samples per class.
        assert_eq!(prompts[0].matches("- review body p").count(), 2);
    }

    #[test]
    fn rounding_stays_close_to_exact() {
        let stats = SentimentStats {
            total: 3,
            positive: 1,
            negative: 1,
            neutral: 1,
        };
        assert!((stats.percentage(1) - 33.3).abs() < 1e-9);
    }
}
