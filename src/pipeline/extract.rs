use std::sync::Arc;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::genai::TextGenerator;
use crate::model::backlog::{
    BacklogBatch, BacklogItem, BacklogMetadata, BacklogSummary, Category, Effort, GeneratorKind,
    Priority,
};
use crate::model::review::{Review, Sentiment};
use crate::util::json_text::{extract_first_json_object, strip_code_fences};

/// Prompt-size bound: only this many reviews are rendered into the prompt.
const MAX_PROMPT_REVIEWS: usize = 50;

pub const FALLBACK_SOURCE: &str = "Fallback AI (simulated)";

const ISSUE_POOL: &[(&str, Category)] = &[
    ("Improve app performance", Category::Performance),
    ("Fix crash-on-launch failures", Category::Bug),
    ("Resolve login failures", Category::Bug),
    ("Improve user interface consistency", Category::UiUx),
    ("Reduce battery drain", Category::Performance),
    ("Improve customer support responsiveness", Category::Improvement),
    ("Refresh outdated content", Category::Improvement),
    ("Stabilize connection handling", Category::Bug),
];

const IMPROVEMENT_POOL: &[&str] = &[
    "Add dark mode",
    "Integrate with other platforms",
    "Offer theme customization",
    "Add new sharing options",
    "Improve notifications",
    "Optimize the tablet layout",
    "Add interactive tutorials",
];

pub struct BacklogExtractor {
    generator: Option<Arc<dyn TextGenerator>>,
    mock_seed: Option<u64>,
}

impl BacklogExtractor {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>, mock_seed: Option<u64>) -> Self {
        Self {
            generator,
            mock_seed,
        }
    }

    /// Turn a review batch into a structured backlog. Always returns a
    /// well-formed batch; `metadata.generator_kind` records which path
    /// produced it.
    pub async fn extract(&self, reviews: &[Review], app_name: &str) -> BacklogBatch {
        if reviews.is_empty() {
            return empty_batch(app_name);
        }

        let raw = match &self.generator {
            Some(generator) => {
                let prompt = extraction_prompt(reviews, app_name);
                match generator.generate(&prompt).await {
                    Ok(text) => Some(text),
                    Err(err) => {
                        error!(error = %err, "backlog backend call failed");
                        None
                    }
                }
            }
            None => None,
        };

        if let Some(raw) = raw {
            match parse_backlog(&raw, reviews.len(), app_name) {
                Ok(batch) => {
                    info!(
                        items = batch.backlog_items.len(),
                        kind = ?batch.metadata.generator_kind,
                        "backlog parsed from backend response"
                    );
                    return batch;
                }
                Err(reason) => {
                    warn!(reason = %reason, "backlog response unusable, generating mock backlog");
                }
            }
        }

        self.mock_backlog(reviews, app_name)
    }

    /// Last-resort generator with no external dependency. Seeded in tests
    /// for reproducibility; unseeded in production.
    fn mock_backlog(&self, reviews: &[Review], app_name: &str) -> BacklogBatch {
        let mut rng = match self.mock_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let num_issues = rng.gen_range(1..=3);
        let num_improvements = rng.gen_range(1..=2);

        let mut items: Vec<BacklogItem> = Vec::new();

        for _ in 0..num_issues {
            if let Some((description, category)) = ISSUE_POOL.choose(&mut rng) {
                let priority = *[Priority::High, Priority::Medium, Priority::Low]
                    .choose(&mut rng)
                    .unwrap_or(&Priority::Medium);
                push_unique(&mut items, mock_item(description, *category, priority));
            }
        }

        for _ in 0..num_improvements {
            if let Some(description) = IMPROVEMENT_POOL.choose(&mut rng) {
                let priority = *[Priority::Medium, Priority::Low]
                    .choose(&mut rng)
                    .unwrap_or(&Priority::Medium);
                push_unique(&mut items, mock_item(description, Category::Improvement, priority));
            }
        }

        items.push(sentiment_driven_item(reviews));

        let mut summary = synthesize_summary(&items, reviews.len(), app_name);
        summary.note = Some(format!(
            "Backlog generated with {} items from {} reviews.",
            items.len(),
            reviews.len()
        ));

        BacklogBatch {
            summary,
            backlog_items: items,
            metadata: BacklogMetadata {
                generated_at: Utc::now(),
                generator_kind: GeneratorKind::FallbackMock,
                reviews_count: reviews.len(),
            },
        }
    }
}

fn mock_item(description: &str, category: Category, priority: Priority) -> BacklogItem {
    BacklogItem {
        title: description.to_string(),
        description: description.to_string(),
        priority,
        category,
        estimated_effort: Effort::default(),
        user_impact: priority,
        evidence: Vec::new(),
        acceptance_criteria: Vec::new(),
        source: Some(FALLBACK_SOURCE.to_string()),
    }
}

fn push_unique(items: &mut Vec<BacklogItem>, item: BacklogItem) {
    if !items.iter().any(|i| i.description == item.description) {
        items.push(item);
    }
}

/// Exactly one extra item driven by the overall sentiment balance of the
/// input batch.
fn sentiment_driven_item(reviews: &[Review]) -> BacklogItem {
    let positive = reviews
        .iter()
        .filter(|r| r.sentiment == Sentiment::Positive)
        .count();
    let negative = reviews
        .iter()
        .filter(|r| r.sentiment == Sentiment::Negative)
        .count();

    let (priority, title, description) = if positive > negative * 2 {
        (
            Priority::Low,
            "Maintain current quality",
            "Maintain the current quality and keep collecting positive feedback.",
        )
    } else if negative > positive * 2 {
        (
            Priority::High,
            "Investigate main user complaints",
            "Investigate the main user complaints to prevent churn.",
        )
    } else {
        (
            Priority::Medium,
            "Analyze mixed feedback",
            "Analyze the mixed feedback to identify strengths and improvement areas.",
        )
    };

    BacklogItem {
        title: title.to_string(),
        description: description.to_string(),
        priority,
        category: Category::Other,
        estimated_effort: Effort::default(),
        user_impact: priority,
        evidence: Vec::new(),
        acceptance_criteria: Vec::new(),
        source: Some(FALLBACK_SOURCE.to_string()),
    }
}

fn extraction_prompt(reviews: &[Review], app_name: &str) -> String {
    let mut rendered = String::new();
    for (i, review) in reviews
        .iter()
        .filter(|r| !r.content.trim().is_empty())
        .take(MAX_PROMPT_REVIEWS)
        .enumerate()
    {
        rendered.push_str(&format!(
            "Review {} (Rating: {}): {}\n\n",
            i + 1,
            review.rating,
            review.content
        ));
    }

    format!(
        r#"Analyze the following reviews of the app "{app_name}" and identify technical problems, bugs, crashes, usability failures and improvements suggested by users.

Reviews:
{rendered}
Based on the analysis, generate a structured development backlog as JSON in the following format:

{{
    "summary": {{
        "total_reviews_analyzed": number_of_reviews,
        "critical_issues_found": number_of_critical_issues,
        "improvement_suggestions": number_of_improvements,
        "app_name": "{app_name}"
    }},
    "backlog_items": [
        {{
            "title": "Task title",
            "description": "Detailed description of the problem or improvement",
            "priority": "High|Medium|Low",
            "category": "Bug|Feature|Improvement|Performance|UI/UX",
            "estimated_effort": "1|2|3|5|8|13",
            "user_impact": "High|Medium|Low",
            "evidence": ["review excerpt mentioning the problem", "related review excerpt"],
            "acceptance_criteria": ["criterion 1", "criterion 2", "criterion 3"]
        }}
    ]
}}

Focus on:
1. Crashes and technical failures (high priority)
2. Performance problems (high/medium priority)
3. Functional bugs (medium/high priority)
4. UX/UI improvements (medium/low priority)
5. Requested new features (low/medium priority)

Return only the valid JSON object, with no additional text."#
    )
}

#[derive(Deserialize)]
struct WireBatch {
    summary: Option<BacklogSummary>,
    backlog_items: Option<Vec<BacklogItem>>,
}

fn parse_backlog(raw: &str, reviews_count: usize, app_name: &str) -> Result<BacklogBatch, String> {
    let cleaned = strip_code_fences(raw);

    // Primary: the whole response is the object we asked for.
    if let Ok(wire) = serde_json::from_str::<WireBatch>(cleaned) {
        if wire.summary.is_some() || wire.backlog_items.is_some() {
            let items = wire.backlog_items.unwrap_or_default();
            let summary = match wire.summary {
                Some(mut summary) => {
                    if summary.app_name.is_empty() {
                        summary.app_name = app_name.to_string();
                    }
                    if summary.total_reviews_analyzed == 0 {
                        summary.total_reviews_analyzed = reviews_count;
                    }
                    summary
                }
                None => synthesize_summary(&items, reviews_count, app_name),
            };
            return Ok(assemble(summary, items, GeneratorKind::Primary, reviews_count));
        }
    }

    // Partial recovery: salvage the first balanced object from surrounding
    // prose and retry.
    let span = extract_first_json_object(cleaned).ok_or("no JSON object in response")?;
    let wire: WireBatch =
        serde_json::from_str(span).map_err(|e| format!("recovered span unparseable: {e}"))?;
    let items = wire
        .backlog_items
        .ok_or("recovered object lacks backlog_items")?;
    let summary = synthesize_summary(&items, reviews_count, app_name);
    Ok(assemble(
        summary,
        items,
        GeneratorKind::FallbackPartial,
        reviews_count,
    ))
}

fn synthesize_summary(items: &[BacklogItem], reviews_count: usize, app_name: &str) -> BacklogSummary {
    BacklogSummary {
        total_reviews_analyzed: reviews_count,
        critical_issues_found: items
            .iter()
            .filter(|i| i.priority == Priority::High)
            .count(),
        improvement_suggestions: items
            .iter()
            .filter(|i| matches!(i.category, Category::Improvement | Category::Feature))
            .count(),
        app_name: app_name.to_string(),
        note: None,
    }
}

fn assemble(
    summary: BacklogSummary,
    items: Vec<BacklogItem>,
    kind: GeneratorKind,
    reviews_count: usize,
) -> BacklogBatch {
    BacklogBatch {
        summary,
        backlog_items: items,
        metadata: BacklogMetadata {
            generated_at: Utc::now(),
            generator_kind: kind,
            reviews_count,
        },
    }
}

fn empty_batch(app_name: &str) -> BacklogBatch {
    BacklogBatch {
        summary: BacklogSummary {
            total_reviews_analyzed: 0,
            critical_issues_found: 0,
            improvement_suggestions: 0,
            app_name: app_name.to_string(),
            note: Some("No reviews available to analyze.".into()),
        },
        backlog_items: Vec::new(),
        metadata: BacklogMetadata {
            generated_at: Utc::now(),
            generator_kind: GeneratorKind::Error,
            reviews_count: 0,
        },
    }
}
