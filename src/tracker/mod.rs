pub mod jira;

use serde::Serialize;

use crate::model::backlog::{Category, Priority};

#[derive(Debug, Clone, Serialize)]
pub struct CreatedIssue {
    pub title: String,
    pub issue_key: String,
    pub url: String,
    pub priority: Priority,
    pub category: Category,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedIssue {
    pub title: String,
    pub error: String,
}

/// Outcome of pushing one backlog batch to the issue tracker. Partial
/// success is success as long as something was created.
#[derive(Debug, Clone, Serialize)]
pub struct PushReport {
    pub success: bool,
    pub project_key: String,
    pub app_name: String,
    pub created_issues: Vec<CreatedIssue>,
    pub failed_issues: Vec<FailedIssue>,
    pub created_count: usize,
    pub failed_count: usize,
}
