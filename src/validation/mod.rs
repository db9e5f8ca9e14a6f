//! Structural validation of instances against schema trees.

mod walker;

pub use walker::ValidationWalker;

use crate::core::ValidationPolicy;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Fatal,
    Error,
    Warning,
    Information,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueKind {
    MissingRequired,
    TooMany,
    FixedValueMismatch,
    InvariantViolation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub path: String,
    pub severity: IssueSeverity,
    pub kind: IssueKind,
    pub detail: String,
    /// Key of the violated invariant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invariant_key: Option<String>,
}

/// Issues in the order they were found. Empty means valid.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub issues: Vec<ValidationIssue>,
}

impl IssueSeverity {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Fatal | Self::Error)
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Fatal => "fatal",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Information => "information",
        }
    }
}

impl IssueKind {
    fn as_str(&self) -> &'static str {
        match self {
            Self::MissingRequired => "missing-required",
            Self::TooMany => "too-many",
            Self::FixedValueMismatch => "fixed-value-mismatch",
            Self::InvariantViolation => "invariant-violation",
        }
    }

    /// OperationOutcome issue type.
    fn issue_type(&self) -> &'static str {
        match self {
            Self::MissingRequired => "required",
            Self::TooMany => "structure",
            Self::FixedValueMismatch => "value",
            Self::InvariantViolation => "invariant",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ValidationIssue {
    pub fn error(path: impl Into<String>, kind: IssueKind, detail: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            severity: IssueSeverity::Error,
            kind,
            detail: detail.into(),
            invariant_key: None,
        }
    }

    pub fn warning(path: impl Into<String>, kind: IssueKind, detail: impl Into<String>) -> Self {
        Self {
            severity: IssueSeverity::Warning,
            ..Self::error(path, kind, detail)
        }
    }

    pub fn with_invariant_key(mut self, key: impl Into<String>) -> Self {
        self.invariant_key = Some(key.into());
        self
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} at {}: {}", self.severity.as_str(), self.kind, self.path, self.detail)
    }
}

impl ValidationOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    /// Success under a policy: no errors, and no warnings when the policy
    /// treats them as failures.
    pub fn is_success(&self, policy: &ValidationPolicy) -> bool {
        self.error_count() == 0 && (!policy.fail_on_warnings || self.warning_count() == 0)
    }

    pub fn error_count(&self) -> usize {
        self.issues.iter().filter(|issue| issue.severity.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.severity == IssueSeverity::Warning)
            .count()
    }

    pub fn issues_of(&self, kind: IssueKind) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |issue| issue.kind == kind)
    }

    /// Renders the outcome as an OperationOutcome resource.
    pub fn to_operation_outcome(&self) -> Value {
        let issues: Vec<Value> = if self.issues.is_empty() {
            vec![json!({
                "severity": "information",
                "code": "informational",
                "diagnostics": "No issues detected"
            })]
        } else {
            self.issues
                .iter()
                .map(|issue| {
                    let mut rendered = json!({
                        "severity": issue.severity.as_str(),
                        "code": issue.kind.issue_type(),
                        "diagnostics": issue.detail,
                        "expression": [issue.path],
                    });
                    if let Some(key) = &issue.invariant_key {
                        rendered["details"] = json!({ "text": format!("{}: {}", issue.kind, key) });
                    }
                    rendered
                })
                .collect()
        };
        json!({ "resourceType": "OperationOutcome", "issue": issues })
    }
}

impl From<Vec<ValidationIssue>> for ValidationOutcome {
    fn from(issues: Vec<ValidationIssue>) -> Self {
        Self { issues }
    }
}
