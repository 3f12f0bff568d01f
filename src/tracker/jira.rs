use std::time::Duration;

use anyhow::{Context, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::error;

use super::{CreatedIssue, FailedIssue, PushReport};
use crate::config::JiraConfig;
use crate::model::backlog::{BacklogBatch, BacklogItem, BacklogSummary, Category};
use crate::util::adf::adf_document;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct JiraClient {
    base_url: String,
    auth_header: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
pub struct JiraUser {
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    #[serde(rename = "accountId")]
    pub account_id: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ProjectInfo {
    pub id: Option<String>,
    pub key: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "projectTypeKey")]
    pub project_type_key: Option<String>,
}

#[derive(Deserialize)]
struct CreatedIssueResponse {
    key: String,
}

fn issue_type_for(category: Category) -> &'static str {
    match category {
        Category::Bug => "Bug",
        Category::Feature | Category::Improvement | Category::UiUx => "Story",
        Category::Performance | Category::Other => "Task",
    }
}

/// Assemble the issue-create payload. Acceptance criteria and user evidence
/// are folded into the ADF description as numbered paragraphs.
fn build_issue_payload(project_key: &str, item: &BacklogItem, summary_title: &str) -> Value {
    let mut paragraphs = vec![item.description.clone()];

    if !item.acceptance_criteria.is_empty() {
        let mut block = String::from("Acceptance criteria:\n");
        for (i, criterion) in item.acceptance_criteria.iter().enumerate() {
            block.push_str(&format!("{}. {criterion}\n", i + 1));
        }
        paragraphs.push(block);
    }

    if !item.evidence.is_empty() {
        let mut block = String::from("User evidence:\n");
        for (i, excerpt) in item.evidence.iter().enumerate() {
            block.push_str(&format!("{}. {excerpt}\n", i + 1));
        }
        paragraphs.push(block);
    }

    json!({
        "fields": {
            "project": { "key": project_key },
            "summary": summary_title,
            "description": adf_document(&paragraphs),
            "issuetype": { "name": issue_type_for(item.category) },
            "priority": { "name": item.priority.as_str() }
        }
    })
}

fn build_epic_payload(project_key: &str, app_name: &str, summary: &BacklogSummary) -> Value {
    let body = format!(
        "Epic created automatically from the analysis of {} reviews of {app_name}.\n\n\
         Critical issues identified: {}\n\
         Improvement suggestions: {}\n\n\
         This epic groups every task generated from user review analysis.",
        summary.total_reviews_analyzed,
        summary.critical_issues_found,
        summary.improvement_suggestions,
    );

    json!({
        "fields": {
            "project": { "key": project_key },
            "summary": format!("{app_name} improvements from review analysis"),
            "description": adf_document(&[body]),
            "issuetype": { "name": "Epic" }
        }
    })
}

impl JiraClient {
    pub fn new(config: &JiraConfig) -> Self {
        let creds = format!("{}:{}", config.email, config.api_token);
        let encoded = base64::engine::general_purpose::STANDARD.encode(creds);
        Self {
            base_url: format!("https://{}.atlassian.net", config.domain),
            auth_header: format!("Basic {encoded}"),
            client: reqwest::Client::new(),
        }
    }

    pub async fn test_connection(&self) -> Result<JiraUser> {
        let url = format!("{}/rest/api/3/myself", self.base_url);
        let user = self
            .client
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Jira connection test failed")?
            .error_for_status()
            .context("Jira authentication failed")?
            .json()
            .await
            .context("Failed to parse Jira user response")?;
        Ok(user)
    }

    pub async fn get_projects(&self) -> Result<Vec<ProjectInfo>> {
        let url = format!("{}/rest/api/3/project", self.base_url);
        let projects = self
            .client
            .get(&url)
            .timeout(REQUEST_TIMEOUT)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Jira project listing failed")?
            .error_for_status()?
            .json()
            .await
            .context("Failed to parse Jira project list")?;
        Ok(projects)
    }

    pub async fn create_issue(
        &self,
        project_key: &str,
        item: &BacklogItem,
        summary_title: &str,
    ) -> Result<CreatedIssue> {
        let url = format!("{}/rest/api/3/issue", self.base_url);
        let payload = build_issue_payload(project_key, item, summary_title);

        let created: CreatedIssueResponse = self
            .client
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .header("Authorization", &self.auth_header)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .context("Jira issue creation request failed")?
            .error_for_status()
            .context("Jira rejected the issue")?
            .json()
            .await
            .context("Failed to parse Jira issue response")?;

        Ok(CreatedIssue {
            title: item.title.clone(),
            url: format!("{}/browse/{}", self.base_url, created.key),
            issue_key: created.key,
            priority: item.priority,
            category: item.category,
        })
    }

    /// Create one issue per backlog item, prefixing titles with the app
    /// name. A failed item does not stop the rest.
    pub async fn create_backlog_issues(
        &self,
        project_key: &str,
        batch: &BacklogBatch,
    ) -> PushReport {
        let app_name = batch.summary.app_name.clone();
        let mut created_issues = Vec::new();
        let mut failed_issues = Vec::new();

        for item in &batch.backlog_items {
            let title = format!("[{app_name}] {}", item.title);
            match self.create_issue(project_key, item, &title).await {
                Ok(issue) => created_issues.push(issue),
                Err(err) => {
                    error!(item = %item.title, error = %err, "issue creation failed");
                    failed_issues.push(FailedIssue {
                        title: item.title.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }

        let created_count = created_issues.len();
        let failed_count = failed_issues.len();
        PushReport {
            success: failed_count == 0 || created_count > 0,
            project_key: project_key.to_string(),
            app_name,
            created_issues,
            failed_issues,
            created_count,
            failed_count,
        }
    }

    pub async fn create_epic(
        &self,
        project_key: &str,
        app_name: &str,
        summary: &BacklogSummary,
    ) -> Result<CreatedIssue> {
        let url = format!("{}/rest/api/3/issue", self.base_url);
        let payload = build_epic_payload(project_key, app_name, summary);

        let created: CreatedIssueResponse = self
            .client
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .header("Authorization", &self.auth_header)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .context("Jira epic creation request failed")?
            .error_for_status()
            .context("Jira rejected the epic")?
            .json()
            .await
            .context("Failed to parse Jira epic response")?;

        Ok(CreatedIssue {
            title: format!("{app_name} improvements from review analysis"),
            url: format!("{}/browse/{}", self.base_url, created.key),
            issue_key: created.key,
            priority: Default::default(),
            category: Category::Other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::backlog::{Effort, Priority};

    fn item() -> BacklogItem {
        BacklogItem {
            title: "Fix login crash".into(),
            description: "App crashes when logging in with SSO".into(),
            priority: Priority::High,
            category: Category::Bug,
            estimated_effort: Effort::default(),
            user_impact: Priority::High,
            evidence: vec!["crashes every time".into()],
            acceptance_criteria: vec!["login succeeds".into(), "no crash reports".into()],
            source: None,
        }
    }

    #[test]
    fn issue_type_mapping() {
        assert_eq!(issue_type_for(Category::Bug), "Bug");
        assert_eq!(issue_type_for(Category::Feature), "Story");
        assert_eq!(issue_type_for(Category::Improvement), "Story");
        assert_eq!(issue_type_for(Category::UiUx), "Story");
        assert_eq!(issue_type_for(Category::Performance), "Task");
        assert_eq!(issue_type_for(Category::Other), "Task");
    }

    #[test]
    fn payload_carries_fields_and_priority() {
        let payload = build_issue_payload("PROJ", &item(), "[MyApp] Fix login crash");
        assert_eq!(payload["fields"]["project"]["key"], "PROJ");
        assert_eq!(payload["fields"]["summary"], "[MyApp] Fix login crash");
        assert_eq!(payload["fields"]["issuetype"]["name"], "Bug");
        assert_eq!(payload["fields"]["priority"]["name"], "High");
    }

    #[test]
    fn payload_folds_criteria_and_evidence_into_description() {
        let payload = build_issue_payload("PROJ", &item(), "t");
        let paragraphs = payload["fields"]["description"]["content"]
            .as_array()
            .unwrap();
        assert_eq!(paragraphs.len(), 3);
        let criteria = paragraphs[1]["content"][0]["text"].as_str().unwrap();
        assert!(criteria.starts_with("Acceptance criteria:"));
        assert!(criteria.contains("1. login succeeds"));
        assert!(criteria.contains("2. no crash reports"));
        let evidence = paragraphs[2]["content"][0]["text"].as_str().unwrap();
        assert!(evidence.contains("1. crashes every time"));
    }

    #[test]
    fn payload_without_criteria_has_single_paragraph() {
        let mut bare = item();
        bare.acceptance_criteria.clear();
        bare.evidence.clear();
        let payload = build_issue_payload("PROJ", &bare, "t");
        let paragraphs = payload["fields"]["description"]["content"]
            .as_array()
            .unwrap();
        assert_eq!(paragraphs.len(), 1);
    }

    #[test]
    fn epic_payload_summarizes_the_batch() {
        let summary = BacklogSummary {
            total_reviews_analyzed: 42,
            critical_issues_found: 3,
            improvement_suggestions: 5,
            app_name: "MyApp".into(),
            note: None,
        };
        let payload = build_epic_payload("PROJ", "MyApp", &summary);
        assert_eq!(payload["fields"]["issuetype"]["name"], "Epic");
        let body = payload["fields"]["description"]["content"][0]["content"][0]["text"]
            .as_str()
            .unwrap();
        assert!(body.contains("42 reviews"));
        assert!(body.contains("Critical issues identified: 3"));
    }
}
