use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::backlog::BacklogItem;

/// A fixed-focus, capacity-bounded slice of a sprint plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SprintSlot {
    pub focus: String,
    pub items: Vec<BacklogItem>,
    pub estimated_effort: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryEffort {
    pub total_effort: u32,
    pub item_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SprintPlan {
    pub sprints: Vec<SprintSlot>,
    pub effort_by_category: BTreeMap<String, CategoryEffort>,
    pub total_items: usize,
    pub generated_at: DateTime<Utc>,
}
