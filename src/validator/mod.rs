// Rule-based stack validation with a severity-weighted score

mod checks;
mod size;

pub use size::parse_size;

use crate::models::{
    ImpactLevel, IssueCategory, IssueType, Stack, ValidationIssue, ValidationResult,
    ValidationSummary,
};

/// Score returned when the checks themselves could not run.
pub const DEGRADED_SCORE: u32 = 50;

const MAX_SCORE: u32 = 100;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid size '{0}'")]
    InvalidSize(String),
    #[error("invalid cpus value {value} for service '{service}'")]
    InvalidCpus { service: String, value: f64 },
}

/// 100 minus the impact weights of all issues, floored at 0.
pub fn score(issues: &[ValidationIssue]) -> u32 {
    let deductions = issues
        .iter()
        .fold(0u32, |acc, i| acc.saturating_add(i.impact.weight()));
    MAX_SCORE.saturating_sub(deductions)
}

/// Run every check; the first check that cannot evaluate the stack aborts validation.
pub fn try_validate_stack(stack: &Stack) -> Result<ValidationResult, ValidationError> {
    let mut issues = Vec::new();
    for (name, check) in checks::CHECKS {
        let found = check(stack)?;
        if !found.is_empty() {
            tracing::trace!(
                stack = %stack.name,
                check = name,
                issues = found.len(),
                "check reported issues"
            );
        }
        issues.extend(found);
    }
    Ok(result_from(issues))
}

/// Validate a stack, never failing: errors produce a degraded result with one synthetic issue.
pub fn validate_stack(stack: &Stack) -> ValidationResult {
    match try_validate_stack(stack) {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(
                error = %e,
                stack = %stack.name,
                operation = "validate_stack",
                "validation failed, returning degraded result"
            );
            degraded(&e)
        }
    }
}

fn degraded(error: &ValidationError) -> ValidationResult {
    let issues = vec![ValidationIssue::new(
        IssueType::Error,
        IssueCategory::Configuration,
        ImpactLevel::Medium,
        "Validation Error",
        format!("The stack configuration could not be validated: {error}"),
    )];
    ValidationResult {
        score: DEGRADED_SCORE,
        summary: ValidationSummary::from_issues(&issues),
        issues,
        checked_at: now_millis(),
    }
}

fn result_from(issues: Vec<ValidationIssue>) -> ValidationResult {
    ValidationResult {
        score: score(&issues),
        summary: ValidationSummary::from_issues(&issues),
        issues,
        checked_at: now_millis(),
    }
}

fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(impact: ImpactLevel) -> ValidationIssue {
        ValidationIssue::new(
            IssueType::Error,
            IssueCategory::Security,
            impact,
            "t",
            "d",
        )
    }

    #[test]
    fn score_deducts_weights() {
        assert_eq!(score(&[]), 100);
        assert_eq!(
            score(&[
                issue(ImpactLevel::Critical),
                issue(ImpactLevel::High),
                issue(ImpactLevel::Medium),
                issue(ImpactLevel::Low),
            ]),
            100 - 25 - 15 - 8 - 3
        );
    }

    #[test]
    fn score_is_floored_and_monotonic() {
        let mut issues = Vec::new();
        let mut last = score(&issues);
        for _ in 0..10 {
            issues.push(issue(ImpactLevel::Critical));
            let next = score(&issues);
            assert!(next <= last);
            last = next;
        }
        assert_eq!(last, 0);
    }

    #[test]
    fn invalid_mem_limit_yields_degraded_result() {
        let stack: Stack = serde_json::from_value(serde_json::json!({
            "name": "broken",
            "services": [{ "name": "web", "image": "nginx:1.27", "memLimit": "lots" }]
        }))
        .unwrap();
        assert_eq!(
            try_validate_stack(&stack),
            Err(ValidationError::InvalidSize("lots".into()))
        );
        let result = validate_stack(&stack);
        assert_eq!(result.score, DEGRADED_SCORE);
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].title, "Validation Error");
        assert!(result.issues[0].description.contains("lots"));
    }
}
