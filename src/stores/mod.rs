pub mod app_store;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::AppConfig;
use crate::model::app::{AppDetails, AppSummary};
use crate::model::review::{RawReview, Store};

/// A storefront data source. "Not found" surfaces as empty results, never
/// as an error; only transport failures propagate.
#[async_trait]
pub trait Storefront: Send + Sync {
    fn store(&self) -> Store;
    async fn search_apps(&self, query: &str, limit: usize) -> Result<Vec<AppSummary>>;
    async fn get_app_details(&self, app_id: &str) -> Result<Option<AppDetails>>;
    async fn get_app_reviews(&self, app_id: &str, count: usize) -> Result<Vec<RawReview>>;
}

#[cfg(test)]
pub mod tests;

pub fn create_storefront(config: &AppConfig) -> Box<dyn Storefront> {
    Box::new(app_store::AppStoreClient::new(
        config.analysis.country.clone(),
    ))
}
