// Validation issue and result models

use super::stack::Stack;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl ImpactLevel {
    /// Points deducted from a perfect score of 100.
    pub fn weight(self) -> u32 {
        match self {
            ImpactLevel::Critical => 25,
            ImpactLevel::High => 15,
            ImpactLevel::Medium => 8,
            ImpactLevel::Low => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueType {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueCategory {
    Security,
    Reliability,
    Performance,
    Configuration,
    BestPractice,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    #[serde(rename = "type")]
    pub type_: IssueType,
    pub category: IssueCategory,
    pub title: String,
    pub description: String,
    pub impact: ImpactLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learn_more_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSummary {
    pub critical: u32,
    pub high: u32,
    pub medium: u32,
    pub low: u32,
}

impl ValidationSummary {
    pub fn from_issues(issues: &[ValidationIssue]) -> Self {
        let mut summary = Self::default();
        for issue in issues {
            match issue.impact {
                ImpactLevel::Critical => summary.critical += 1,
                ImpactLevel::High => summary.high += 1,
                ImpactLevel::Medium => summary.medium += 1,
                ImpactLevel::Low => summary.low += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub score: u32,
    pub issues: Vec<ValidationIssue>,
    pub summary: ValidationSummary,
    /// Milliseconds since the Unix epoch.
    pub checked_at: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackReport {
    pub stack: Stack,
    pub validation: ValidationResult,
}

/// What the worker publishes on every refresh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackSnapshot {
    pub timestamp: u64,
    pub stacks: Vec<StackReport>,
}

impl StackSnapshot {
    pub fn find(&self, name: &str) -> Option<&StackReport> {
        self.stacks.iter().find(|r| r.stack.name == name)
    }
}

impl ValidationIssue {
    pub fn new(
        type_: IssueType,
        category: IssueCategory,
        impact: ImpactLevel,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            type_,
            category,
            title: title.into(),
            description: description.into(),
            impact,
            service: None,
            fix: None,
            learn_more_url: None,
        }
    }

    pub fn for_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.fix = Some(fix.into());
        self
    }

    pub fn with_docs(mut self, url: impl Into<String>) -> Self {
        self.learn_more_url = Some(url.into());
        self
    }
}
