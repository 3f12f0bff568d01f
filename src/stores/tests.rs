use anyhow::Result;
use async_trait::async_trait;

use super::Storefront;
use crate::model::app::{AppDetails, AppSummary};
use crate::model::review::{RawReview, Store};
use crate::pipeline::normalize::normalize_reviews;

/// A storefront that serves canned raw reviews, for pipeline tests.
pub struct MockStorefront {
    pub reviews: Vec<RawReview>,
}

impl MockStorefront {
    pub fn with_reviews(reviews: Vec<RawReview>) -> Self {
        Self { reviews }
    }
}

#[async_trait]
impl Storefront for MockStorefront {
    fn store(&self) -> Store {
        Store::AppStore
    }

    async fn search_apps(&self, _query: &str, _limit: usize) -> Result<Vec<AppSummary>> {
        Ok(Vec::new())
    }

    async fn get_app_details(&self, _app_id: &str) -> Result<Option<AppDetails>> {
        Ok(None)
    }

    async fn get_app_reviews(&self, _app_id: &str, count: usize) -> Result<Vec<RawReview>> {
        Ok(self.reviews.iter().take(count).cloned().collect())
    }
}

fn raw(id: &str, content: &str) -> RawReview {
    RawReview {
        review_id: Some(id.to_string()),
        author: None,
        content: Some(content.to_string()),
        rating: Some(4),
        date: None,
    }
}

#[tokio::test]
async fn not_found_surfaces_as_empty_results() {
    let storefront = MockStorefront::with_reviews(Vec::new());
    assert!(storefront.search_apps("anything", 10).await.unwrap().is_empty());
    assert!(storefront.get_app_details("missing").await.unwrap().is_none());
    assert!(storefront
        .get_app_reviews("missing", 10)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn fetched_reviews_normalize_into_canonical_shape() {
    let storefront = MockStorefront::with_reviews(vec![
        raw("r1", "funciona bem"),
        RawReview {
            content: None,
            ..RawReview::default()
        },
        raw("r2", "trava demais"),
    ]);

    let raw_reviews = storefront.get_app_reviews("app1", 10).await.unwrap();
    let reviews = normalize_reviews("app1", storefront.store(), raw_reviews);

    assert_eq!(reviews.len(), 2);
    assert!(reviews.iter().all(|r| r.app_id == "app1"));
    assert!(reviews.iter().all(|r| r.store == Store::AppStore));
    assert_eq!(reviews[0].author, "Anonymous");
}

#[tokio::test]
async fn review_count_cap_is_applied() {
    let storefront = MockStorefront::with_reviews(vec![
        raw("r1", "a"),
        raw("r2", "b"),
        raw("r3", "c"),
    ]);
    let raw_reviews = storefront.get_app_reviews("app1", 2).await.unwrap();
    assert_eq!(raw_reviews.len(), 2);
}
