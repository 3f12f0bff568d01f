use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }

    fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "high" => Priority::High,
            "low" => Priority::Low,
            _ => Priority::Medium,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Generated text is not trusted to spell enum values exactly, so parsing
// is case-insensitive and unknown labels degrade to Medium.
impl<'de> Deserialize<'de> for Priority {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let label = String::deserialize(deserializer)?;
        Ok(Priority::from_label(&label))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Category {
    Bug,
    Feature,
    Improvement,
    Performance,
    #[serde(rename = "UI/UX")]
    UiUx,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Bug => "Bug",
            Category::Feature => "Feature",
            Category::Improvement => "Improvement",
            Category::Performance => "Performance",
            Category::UiUx => "UI/UX",
            Category::Other => "Other",
        }
    }

    fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "bug" => Category::Bug,
            "feature" => Category::Feature,
            "improvement" => Category::Improvement,
            "performance" => Category::Performance,
            "ui/ux" | "ui-ux" | "uiux" | "ux" => Category::UiUx,
            _ => Category::Other,
        }
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::Other
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let label = String::deserialize(deserializer)?;
        Ok(Category::from_label(&label))
    }
}

/// T-shirt effort on the Fibonacci-like scale 1/2/3/5/8/13. Accepts both
/// string and numeric wire forms; anything outside the scale parses as 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Effort(u8);

pub const EFFORT_SCALE: [u8; 6] = [1, 2, 3, 5, 8, 13];

impl Effort {
    pub fn points(self) -> u32 {
        self.0 as u32
    }
}

impl Default for Effort {
    fn default() -> Self {
        Effort(3)
    }
}

impl From<u8> for Effort {
    fn from(points: u8) -> Self {
        if EFFORT_SCALE.contains(&points) {
            Effort(points)
        } else {
            Effort::default()
        }
    }
}

impl<'de> Deserialize<'de> for Effort {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Num(i64),
            Float(f64),
            Text(String),
        }

        let parsed = match Raw::deserialize(deserializer)? {
            Raw::Num(n) => n,
            Raw::Float(f) => f as i64,
            Raw::Text(s) => s.trim().parse::<i64>().unwrap_or(3),
        };
        Ok(u8::try_from(parsed).map(Effort::from).unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GeneratorKind {
    Primary,
    FallbackPartial,
    FallbackMock,
    Error,
}

/// One unit of prospective engineering work derived from review evidence.
/// Immutable once produced; the planner and the issue tracker only read it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacklogItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub estimated_effort: Effort,
    #[serde(default)]
    pub user_impact: Priority,
    #[serde(default)]
    pub evidence: Vec<String>,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BacklogSummary {
    #[serde(default)]
    pub total_reviews_analyzed: usize,
    #[serde(default)]
    pub critical_issues_found: usize,
    #[serde(default)]
    pub improvement_suggestions: usize,
    #[serde(default)]
    pub app_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacklogMetadata {
    pub generated_at: DateTime<Utc>,
    pub generator_kind: GeneratorKind,
    pub reviews_count: usize,
}

/// One backlog batch per analysis request; batches are never merged here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacklogBatch {
    pub summary: BacklogSummary,
    pub backlog_items: Vec<BacklogItem>,
    pub metadata: BacklogMetadata,
}
