use serde::{Deserialize, Serialize};

use super::review::Store;

/// One storefront search hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSummary {
    pub app_id: String,
    pub name: String,
    pub store: Store,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub total_reviews: u64,
    #[serde(default)]
    pub developer: String,
    #[serde(default)]
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppDetails {
    pub app_id: String,
    pub name: String,
    pub store: Store,
    #[serde(default)]
    pub current_version: String,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub total_reviews: u64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon_url: String,
    #[serde(default)]
    pub developer: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub free: bool,
}
