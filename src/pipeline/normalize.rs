use chrono::Utc;

use crate::model::review::{RawReview, Review, Sentiment, Store};

/// Convert raw storefront records into canonical reviews. Records without
/// content are dropped since there is nothing to analyze; missing author,
/// rating and date get explicit defaults instead of failing the record.
pub fn normalize_reviews(app_id: &str, store: Store, raw: Vec<RawReview>) -> Vec<Review> {
    let ingested_at = Utc::now();

    raw.into_iter()
        .enumerate()
        .filter_map(|(idx, record)| {
            let content = record.content.filter(|c| !c.trim().is_empty())?;
            Some(Review {
                review_id: record
                    .review_id
                    .filter(|id| !id.trim().is_empty())
                    .unwrap_or_else(|| format!("{}-{idx}", store.as_str())),
                app_id: app_id.to_string(),
                store,
                author: record
                    .author
                    .filter(|a| !a.trim().is_empty())
                    .unwrap_or_else(|| "Anonymous".to_string()),
                content,
                rating: record.rating.map(|r| r.min(5)).unwrap_or(0),
                sentiment: Sentiment::Unset,
                sentiment_score: None,
                timestamp: record.date.unwrap_or(ingested_at),
            })
        })
        .collect()
}
