use std::collections::BTreeMap;

use chrono::Utc;
use serde::Serialize;

use crate::model::backlog::{BacklogBatch, BacklogItem, Category, Priority};
use crate::model::plan::{CategoryEffort, SprintPlan, SprintSlot};

pub const CRITICAL_BUG_CAPACITY: usize = 5;
pub const PERFORMANCE_CAPACITY: usize = 3;
pub const UX_CAPACITY: usize = 4;

#[derive(Debug, Default, Clone, Serialize)]
pub struct CategorizedBacklog {
    pub critical_bugs: Vec<BacklogItem>,
    pub performance_issues: Vec<BacklogItem>,
    pub ui_ux_improvements: Vec<BacklogItem>,
    pub feature_requests: Vec<BacklogItem>,
    pub other: Vec<BacklogItem>,
}

/// Partition items into fixed buckets. Exhaustive and disjoint: every item
/// lands in exactly one bucket, in input order.
pub fn categorize(items: &[BacklogItem]) -> CategorizedBacklog {
    let mut buckets = CategorizedBacklog::default();

    for item in items {
        match (item.category, item.priority) {
            (Category::Bug, Priority::High) => buckets.critical_bugs.push(item.clone()),
            (Category::Performance, _) => buckets.performance_issues.push(item.clone()),
            (Category::UiUx, _) | (Category::Improvement, _) => {
                buckets.ui_ux_improvements.push(item.clone())
            }
            (Category::Feature, _) => buckets.feature_requests.push(item.clone()),
            _ => buckets.other.push(item.clone()),
        }
    }

    buckets
}

fn slot(focus: &str, bucket: &[BacklogItem], capacity: usize) -> SprintSlot {
    let items: Vec<BacklogItem> = bucket.iter().take(capacity).cloned().collect();
    let estimated_effort = items.iter().map(|i| i.estimated_effort.points()).sum();
    SprintSlot {
        focus: focus.to_string(),
        items,
        estimated_effort,
    }
}

fn bucket_effort(bucket: &[BacklogItem]) -> CategoryEffort {
    CategoryEffort {
        total_effort: bucket.iter().map(|i| i.estimated_effort.points()).sum(),
        item_count: bucket.len(),
    }
}

/// Greedy, capacity-bounded sprint allocation over the categorized backlog.
pub fn plan_sprints(batch: &BacklogBatch) -> SprintPlan {
    let buckets = categorize(&batch.backlog_items);

    let mut effort_by_category = BTreeMap::new();
    for (name, bucket) in [
        ("critical_bugs", &buckets.critical_bugs),
        ("performance_issues", &buckets.performance_issues),
        ("ui_ux_improvements", &buckets.ui_ux_improvements),
        ("feature_requests", &buckets.feature_requests),
        ("other", &buckets.other),
    ] {
        effort_by_category.insert(name.to_string(), bucket_effort(bucket));
    }

    SprintPlan {
        sprints: vec![
            slot(
                "Critical bug fixes",
                &buckets.critical_bugs,
                CRITICAL_BUG_CAPACITY,
            ),
            slot(
                "Performance improvements",
                &buckets.performance_issues,
                PERFORMANCE_CAPACITY,
            ),
            slot("UX/UI improvements", &buckets.ui_ux_improvements, UX_CAPACITY),
        ],
        effort_by_category,
        total_items: batch.backlog_items.len(),
        generated_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::backlog::{BacklogMetadata, BacklogSummary, Effort, GeneratorKind};
    use std::collections::HashSet;

    fn item(title: &str, category: Category, priority: Priority) -> BacklogItem {
        BacklogItem {
            title: title.to_string(),
            description: format!("{title} description"),
            priority,
            category,
            estimated_effort: Effort::default(),
            user_impact: priority,
            evidence: Vec::new(),
            acceptance_criteria: Vec::new(),
            source: None,
        }
    }

    fn batch(items: Vec<BacklogItem>) -> BacklogBatch {
        BacklogBatch {
            summary: BacklogSummary::default(),
            backlog_items: items,
            metadata: BacklogMetadata {
                generated_at: Utc::now(),
                generator_kind: GeneratorKind::Primary,
                reviews_count: 0,
            },
        }
    }

    #[test]
    fn partition_is_exhaustive_and_disjoint() {
        let categories = [
            Category::Bug,
            Category::Feature,
            Category::Improvement,
            Category::Performance,
            Category::UiUx,
            Category::Other,
        ];
        let priorities = [Priority::High, Priority::Medium, Priority::Low];

        let mut items = Vec::new();
        for (ci, category) in categories.iter().enumerate() {
            for (pi, priority) in priorities.iter().enumerate() {
                items.push(item(&format!("item-{ci}-{pi}"), *category, *priority));
            }
        }

        let buckets = categorize(&items);
        let all: Vec<&BacklogItem> = buckets
            .critical_bugs
            .iter()
            .chain(&buckets.performance_issues)
            .chain(&buckets.ui_ux_improvements)
            .chain(&buckets.feature_requests)
            .chain(&buckets.other)
            .collect();

        assert_eq!(all.len(), items.len());
        let titles: HashSet<&str> = all.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles.len(), items.len());
    }

    #[test]
    fn only_high_priority_bugs_are_critical() {
        let items = vec![
            item("high bug", Category::Bug, Priority::High),
            item("medium bug", Category::Bug, Priority::Medium),
            item("low bug", Category::Bug, Priority::Low),
        ];
        let buckets = categorize(&items);
        assert_eq!(buckets.critical_bugs.len(), 1);
        assert_eq!(buckets.critical_bugs[0].title, "high bug");
        assert_eq!(buckets.other.len(), 2);
    }

    #[test]
    fn improvement_and_uiux_share_a_bucket() {
        let items = vec![
            item("polish", Category::UiUx, Priority::Low),
            item("refine", Category::Improvement, Priority::Medium),
        ];
        let buckets = categorize(&items);
        assert_eq!(buckets.ui_ux_improvements.len(), 2);
    }

    #[test]
    fn bucket_order_preserves_input_order() {
        let items = vec![
            item("first", Category::Performance, Priority::High),
            item("second", Category::Performance, Priority::Low),
            item("third", Category::Performance, Priority::Medium),
        ];
        let buckets = categorize(&items);
        let titles: Vec<&str> = buckets
            .performance_issues
            .iter()
            .map(|i| i.title.as_str())
            .collect();
        assert_eq!(titles, ["first", "second", "third"]);
    }

    #[test]
    fn sprint_capacities_are_enforced() {
        let mut items = Vec::new();
        for i in 0..10 {
            items.push(item(&format!("bug-{i}"), Category::Bug, Priority::High));
        }
        for i in 0..10 {
            items.push(item(
                &format!("perf-{i}"),
                Category::Performance,
                Priority::Medium,
            ));
        }
        for i in 0..10 {
            items.push(item(&format!("ux-{i}"), Category::UiUx, Priority::Low));
        }

        let plan = plan_sprints(&batch(items));
        assert_eq!(plan.sprints[0].items.len(), CRITICAL_BUG_CAPACITY);
        assert_eq!(plan.sprints[1].items.len(), PERFORMANCE_CAPACITY);
        assert_eq!(plan.sprints[2].items.len(), UX_CAPACITY);
    }

    #[test]
    fn sprint_effort_sums_included_items() {
        let mut a = item("bug-a", Category::Bug, Priority::High);
        a.estimated_effort = Effort::from(8);
        let mut b = item("bug-b", Category::Bug, Priority::High);
        b.estimated_effort = Effort::from(5);

        let plan = plan_sprints(&batch(vec![a, b]));
        assert_eq!(plan.sprints[0].estimated_effort, 13);
        assert_eq!(plan.sprints[1].estimated_effort, 0);
    }

    #[test]
    fn effort_by_category_counts_everything_not_just_slot_contents() {
        let mut items = Vec::new();
        for i in 0..7 {
            let mut it = item(&format!("bug-{i}"), Category::Bug, Priority::High);
            it.estimated_effort = Effort::from(2);
            items.push(it);
        }
        let plan = plan_sprints(&batch(items));
        let critical = &plan.effort_by_category["critical_bugs"];
        assert_eq!(critical.item_count, 7);
        assert_eq!(critical.total_effort, 14);
        // The sprint slot itself still honors the cap.
        assert_eq!(plan.sprints[0].items.len(), 5);
        assert_eq!(plan.total_items, 7);
    }
}
