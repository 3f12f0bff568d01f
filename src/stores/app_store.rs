use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;

use super::Storefront;
use crate::model::app::{AppDetails, AppSummary};
use crate::model::review::{RawReview, Store};

const ITUNES_BASE: &str = "https://itunes.apple.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct AppStoreClient {
    country: String,
    client: reqwest::Client,
}

impl AppStoreClient {
    pub fn new(country: String) -> Self {
        Self {
            country,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    results: Vec<ItunesApp>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItunesApp {
    track_id: Option<u64>,
    track_name: Option<String>,
    primary_genre_name: Option<String>,
    average_user_rating: Option<f64>,
    user_rating_count: Option<u64>,
    artwork_url512: Option<String>,
    description: Option<String>,
    artist_name: Option<String>,
    price: Option<f64>,
    version: Option<String>,
}

impl ItunesApp {
    fn summary(self) -> AppSummary {
        AppSummary {
            app_id: self.track_id.map(|id| id.to_string()).unwrap_or_default(),
            name: self.track_name.unwrap_or_default(),
            store: Store::AppStore,
            category: self.primary_genre_name.unwrap_or_default(),
            rating: self.average_user_rating.unwrap_or(0.0),
            total_reviews: self.user_rating_count.unwrap_or(0),
            developer: self.artist_name.unwrap_or_default(),
            price: self.price.unwrap_or(0.0),
        }
    }

    fn details(self) -> AppDetails {
        let price = self.price.unwrap_or(0.0);
        AppDetails {
            app_id: self.track_id.map(|id| id.to_string()).unwrap_or_default(),
            name: self.track_name.unwrap_or_default(),
            store: Store::AppStore,
            current_version: self.version.unwrap_or_default(),
            rating: self.average_user_rating.unwrap_or(0.0),
            total_reviews: self.user_rating_count.unwrap_or(0),
            category: self.primary_genre_name.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            icon_url: self.artwork_url512.unwrap_or_default(),
            developer: self.artist_name.unwrap_or_default(),
            price,
            free: price == 0.0,
        }
    }
}

// The customer-reviews feed wraps every scalar in a `{"label": ...}` object.
#[derive(Deserialize)]
struct FeedResponse {
    feed: Option<Feed>,
}

#[derive(Deserialize)]
struct Feed {
    #[serde(default)]
    entry: Option<Entries>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Entries {
    Many(Vec<Entry>),
    One(Box<Entry>),
}

#[derive(Deserialize)]
struct Entry {
    author: Option<EntryAuthor>,
    #[serde(rename = "im:rating")]
    rating: Option<Label>,
    content: Option<Label>,
    id: Option<Label>,
    updated: Option<Label>,
}

#[derive(Deserialize)]
struct EntryAuthor {
    name: Option<Label>,
}

#[derive(Deserialize)]
struct Label {
    label: Option<String>,
}

fn label(value: Option<Label>) -> Option<String> {
    value.and_then(|l| l.label).filter(|s| !s.trim().is_empty())
}

/// Parse the customer-reviews feed body into raw reviews. Entries without a
/// rating are the app's own metadata entry and are skipped.
fn parse_reviews_feed(body: &str, count: usize) -> Vec<RawReview> {
    let parsed: FeedResponse = match serde_json::from_str(body) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!(error = %err, "unparseable reviews feed");
            return Vec::new();
        }
    };

    let entries = match parsed.feed.and_then(|f| f.entry) {
        Some(Entries::Many(entries)) => entries,
        Some(Entries::One(entry)) => vec![*entry],
        None => Vec::new(),
    };

    entries
        .into_iter()
        .filter(|entry| entry.rating.is_some())
        .take(count)
        .map(|entry| RawReview {
            review_id: label(entry.id),
            author: entry.author.and_then(|a| label(a.name)),
            content: label(entry.content),
            rating: label(entry.rating).and_then(|r| r.parse().ok()),
            date: label(entry.updated)
                .and_then(|d| DateTime::parse_from_rfc3339(&d).ok())
                .map(|d| d.with_timezone(&Utc)),
        })
        .collect()
}

#[async_trait]
impl Storefront for AppStoreClient {
    fn store(&self) -> Store {
        Store::AppStore
    }

    async fn search_apps(&self, query: &str, limit: usize) -> Result<Vec<AppSummary>> {
        let url = format!(
            "{ITUNES_BASE}/search?term={}&country={}&media=software&limit={limit}",
            urlencoding::encode(query),
            self.country
        );

        let resp = self
            .client
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .context("App Store search request failed")?;

        if !resp.status().is_success() {
            warn!(status = %resp.status(), "App Store search returned an error status");
            return Ok(Vec::new());
        }

        let parsed: LookupResponse = resp
            .json()
            .await
            .context("Failed to parse App Store search response")?;

        Ok(parsed.results.into_iter().map(ItunesApp::summary).collect())
    }

    async fn get_app_details(&self, app_id: &str) -> Result<Option<AppDetails>> {
        let url = format!(
            "{ITUNES_BASE}/lookup?id={}&country={}",
            urlencoding::encode(app_id),
            self.country
        );

        let resp = self
            .client
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .context("App Store lookup request failed")?;

        if !resp.status().is_success() {
            warn!(status = %resp.status(), "App Store lookup returned an error status");
            return Ok(None);
        }

        let parsed: LookupResponse = resp
            .json()
            .await
            .context("Failed to parse App Store lookup response")?;

        Ok(parsed.results.into_iter().next().map(ItunesApp::details))
    }

    async fn get_app_reviews(&self, app_id: &str, count: usize) -> Result<Vec<RawReview>> {
        let url = format!(
            "{ITUNES_BASE}/{}/rss/customerreviews/page=1/id={}/sortby=mostrecent/json",
            self.country,
            urlencoding::encode(app_id)
        );

        let resp = self
            .client
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .context("App Store reviews request failed")?;

        if !resp.status().is_success() {
            warn!(status = %resp.status(), "App Store reviews returned an error status");
            return Ok(Vec::new());
        }

        let body = resp
            .text()
            .await
            .context("Failed to read App Store reviews response")?;

        Ok(parse_reviews_feed(&body, count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"{
        "feed": {
            "entry": [
                {
                    "author": {"name": {"label": "joana"}},
                    "im:rating": {"label": "5"},
                    "content": {"label": "ótimo app, recomendo"},
                    "id": {"label": "111"},
                    "updated": {"label": "2024-05-01T10:00:00-07:00"}
                },
                {
                    "author": {"name": {"label": "pedro"}},
                    "im:rating": {"label": "1"},
                    "content": {"label": "trava muito"},
                    "id": {"label": "222"},
                    "updated": {"label": "2024-05-02T10:00:00-07:00"}
                }
            ]
        }
    }"#;

    #[test]
    fn parses_review_entries() {
        let reviews = parse_reviews_feed(FEED, 10);
        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[0].review_id.as_deref(), Some("111"));
        assert_eq!(reviews[0].author.as_deref(), Some("joana"));
        assert_eq!(reviews[0].rating, Some(5));
        assert!(reviews[0].date.is_some());
        assert_eq!(reviews[1].content.as_deref(), Some("trava muito"));
    }

    #[test]
    fn respects_count_cap() {
        let reviews = parse_reviews_feed(FEED, 1);
        assert_eq!(reviews.len(), 1);
    }

    #[test]
    fn skips_entries_without_rating() {
        let body = r#"{
            "feed": {
                "entry": [
                    {"id": {"label": "app-metadata"}, "content": {"label": "the app itself"}},
                    {"im:rating": {"label": "4"}, "content": {"label": "good"}, "id": {"label": "1"}}
                ]
            }
        }"#;
        let reviews = parse_reviews_feed(body, 10);
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].rating, Some(4));
    }

    #[test]
    fn single_entry_object_is_accepted() {
        let body = r#"{
            "feed": {
                "entry": {"im:rating": {"label": "3"}, "content": {"label": "ok"}, "id": {"label": "9"}}
            }
        }"#;
        let reviews = parse_reviews_feed(body, 10);
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].rating, Some(3));
    }

    #[test]
    fn empty_or_garbage_feed_yields_no_reviews() {
        assert!(parse_reviews_feed("{}", 10).is_empty());
        assert!(parse_reviews_feed("not json", 10).is_empty());
        assert!(parse_reviews_feed(r#"{"feed": {}}"#, 10).is_empty());
    }
}
