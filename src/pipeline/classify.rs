use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use rand::Rng;
use tracing::{debug, error, warn};

use crate::config::{AnalysisConfig, BatchFailurePolicy};
use crate::genai::{BackendError, TextGenerator};
use crate::model::review::{Review, Sentiment};
use crate::model::sentiment::{Classification, ReviewClassification};
use crate::util::json_text::strip_code_fences;

use super::Generated;

const POSITIVE_KEYWORDS: &[&str] = &[
    "bom",
    "ótimo",
    "excelente",
    "perfeito",
    "recomendo",
    "gosto",
    "funciona",
    "great",
    "excellent",
    "love",
    "awesome",
];

const NEGATIVE_KEYWORDS: &[&str] = &[
    "ruim",
    "péssimo",
    "horrível",
    "lento",
    "trava",
    "bug",
    "problema",
    "não funciona",
    "crash",
    "broken",
    "terrible",
    "useless",
];

/// Deterministic keyword heuristic used whenever the backend is absent or
/// misbehaves. Pure function; the scoring rule is load-bearing for tests:
/// 0.7 + 0.1 per hit, capped at 0.95, ties are neutral at 0.6.
pub fn classify_fallback(text: &str) -> Classification {
    let lower = text.to_lowercase();
    let positive_hits = POSITIVE_KEYWORDS.iter().filter(|k| lower.contains(*k)).count();
    let negative_hits = NEGATIVE_KEYWORDS.iter().filter(|k| lower.contains(*k)).count();

    let (sentiment, score) = if positive_hits > negative_hits {
        (Sentiment::Positive, (0.7 + positive_hits as f64 * 0.1).min(0.95))
    } else if negative_hits > positive_hits {
        (Sentiment::Negative, (0.7 + negative_hits as f64 * 0.1).min(0.95))
    } else {
        (Sentiment::Neutral, 0.6)
    };

    Classification {
        sentiment,
        score,
        reasoning: "keyword heuristic (offline fallback)".to_string(),
    }
}

fn classify_prompt(text: &str) -> String {
    format!(
        r#"Analyze the sentiment of the following mobile app review.

Review: "{text}"

Respond ONLY with a JSON object in this exact format:
{{
    "sentiment": "positive|negative|neutral",
    "score": 0.85,
    "reasoning": "brief explanation"
}}

Criteria:
- positive: clearly positive review, praise, satisfaction
- negative: clearly negative review, complaints, problems
- neutral: neutral or mixed review, or no clear sentiment
- score: confidence of the analysis (0.0 to 1.0)"#
    )
}

fn parse_classification(raw: &str) -> Result<Classification, BackendError> {
    let cleaned = strip_code_fences(raw);
    let parsed: Classification = serde_json::from_str(cleaned)?;

    if parsed.sentiment == Sentiment::Unset {
        return Err(BackendError::Schema(
            "sentiment must be positive, negative or neutral".into(),
        ));
    }
    if !(0.0..=1.0).contains(&parsed.score) {
        return Err(BackendError::Schema(format!(
            "score {} out of range [0, 1]",
            parsed.score
        )));
    }
    Ok(parsed)
}

pub struct SentimentClassifier {
    generator: Option<Arc<dyn TextGenerator>>,
    delay_ms: (u64, u64),
    batch_policy: BatchFailurePolicy,
}

impl SentimentClassifier {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>, config: &AnalysisConfig) -> Self {
        Self {
            generator,
            delay_ms: config.classify_delay_ms,
            batch_policy: config.batch_failure_policy,
        }
    }

    /// Classify one piece of text. Never fails: any backend problem degrades
    /// to the keyword fallback with the reason attached.
    pub async fn classify(&self, text: &str) -> Generated<Classification> {
        let generator = match &self.generator {
            Some(generator) => generator,
            None => {
                return Generated::Degraded(
                    classify_fallback(text),
                    "no backend credential configured".into(),
                )
            }
        };

        match self.classify_remote(generator.as_ref(), text).await {
            Ok(classification) => Generated::Primary(classification),
            Err(err) => {
                warn!(error = %err, "sentiment backend failed, using keyword fallback");
                Generated::Degraded(classify_fallback(text), err.to_string())
            }
        }
    }

    /// Classify a batch sequentially, in input order. Failure granularity is
    /// a policy choice: per-item fallback keeps already-computed results
    /// usable, abort surfaces the first backend failure for the whole batch.
    pub async fn classify_batch(&self, reviews: &[Review]) -> Result<Vec<ReviewClassification>> {
        let mut results = Vec::with_capacity(reviews.len());

        for (i, review) in reviews.iter().enumerate() {
            debug!(index = i + 1, total = reviews.len(), "classifying review");

            let outcome = match &self.generator {
                None => Generated::Degraded(
                    classify_fallback(&review.content),
                    "no backend credential configured".into(),
                ),
                Some(generator) => {
                    match self.classify_remote(generator.as_ref(), &review.content).await {
                        Ok(classification) => Generated::Primary(classification),
                        Err(err) => match self.batch_policy {
                            BatchFailurePolicy::AbortBatch => {
                                error!(
                                    review_id = %review.review_id,
                                    error = %err,
                                    "aborting batch on backend failure"
                                );
                                return Err(err).with_context(|| {
                                    format!("classification failed for review {}", review.review_id)
                                });
                            }
                            BatchFailurePolicy::PerItemFallback => {
                                warn!(
                                    review_id = %review.review_id,
                                    error = %err,
                                    "falling back for this review only"
                                );
                                Generated::Degraded(
                                    classify_fallback(&review.content),
                                    err.to_string(),
                                )
                            }
                        },
                    }
                }
            };

            let classification = outcome.into_inner();
            results.push(ReviewClassification {
                review_id: review.review_id.clone(),
                sentiment: classification.sentiment,
                sentiment_score: classification.score,
                reasoning: classification.reasoning,
            });
        }

        Ok(results)
    }

    async fn classify_remote(
        &self,
        generator: &dyn TextGenerator,
        text: &str,
    ) -> Result<Classification, BackendError> {
        self.throttle().await;
        let raw = generator.generate(&classify_prompt(text)).await?;
        parse_classification(&raw)
    }

    // Jittered delay between calls so batches stay under the backend's rate
    // ceiling. (0, 0) disables it.
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

/// Write classification results back onto the reviews, matching by id.
/// Reanalysis overwrites prior sentiment; everything else stays untouched.
pub fn apply_classifications(reviews: &mut [Review], results: &[ReviewClassification]) {
    for result in results {
        if let Some(review) = reviews.iter_mut().find(|r| r.review_id == result.review_id) {
            review.sentiment = result.sentiment;
            review.sentiment_score = Some(result.sentiment_score);
        }
    }
}
