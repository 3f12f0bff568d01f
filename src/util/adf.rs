use serde_json::{json, Value};

/// Assemble a minimal Atlassian Document Format body from plain-text
/// paragraphs. Jira's v3 REST API refuses plain strings for descriptions.
pub fn adf_document<S: AsRef<str>>(paragraphs: &[S]) -> Value {
    let content: Vec<Value> = paragraphs
        .iter()
        .map(|p| p.as_ref())
        .filter(|p| !p.trim().is_empty())
        .map(|p| {
            json!({
                "type": "paragraph",
                "content": [{ "type": "text", "text": p }]
            })
        })
        .collect();

    json!({ "type": "doc", "version": 1, "content": content })
}
