//! Validation System - Collected Issues
//!
//! Validators never fail fast. They return every issue they find and the
//! caller decides whether the list is fatal.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// A variable is marked required and also carries a default
    SpecConflict,
    /// The template references a variable it never declares
    UndeclaredVariable,
    InvalidVersion,
    InvalidName,
    InvalidIdentifier,
    /// The template string could not be parsed by the engine
    TemplateSyntax,
    /// A render-time binding set omits a required variable
    MissingRequired,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SpecConflict => "spec_conflict",
            Self::UndeclaredVariable => "undeclared_variable",
            Self::InvalidVersion => "invalid_version",
            Self::InvalidName => "invalid_name",
            Self::InvalidIdentifier => "invalid_identifier",
            Self::TemplateSyntax => "template_syntax",
            Self::MissingRequired => "missing_required",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            variable: None,
            message: message.into(),
        }
    }

    pub fn for_variable(kind: IssueKind, variable: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            variable: Some(variable.to_string()),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Issues found for one stored record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordIssues {
    pub name: String,
    pub version: u32,
    pub issues: Vec<ValidationIssue>,
}

/// Aggregated result of auditing a whole registry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationReport {
    pub valid: bool,
    pub checked: usize,
    pub records: Vec<RecordIssues>,
}

impl ValidationReport {
    pub fn new(checked: usize, records: Vec<RecordIssues>) -> Self {
        Self {
            valid: records.is_empty(),
            checked,
            records,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn issue_count(&self) -> usize {
        self.records.iter().map(|r| r.issues.len()).sum()
    }

    pub fn issues_for(&self, name: &str, version: u32) -> &[ValidationIssue] {
        self.records
            .iter()
            .find(|r| r.name == name && r.version == version)
            .map(|r| r.issues.as_slice())
            .unwrap_or(&[])
    }
}

/// Identifier rule for variable names: `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_rule() {
        assert!(is_identifier("text"));
        assert!(is_identifier("_private"));
        assert!(is_identifier("max_length2"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("2fast"));
        assert!(!is_identifier("max-length"));
        assert!(!is_identifier("with space"));
    }

    #[test]
    fn test_report_lookup() {
        let report = ValidationReport::new(
            3,
            vec![RecordIssues {
                name: "greet".to_string(),
                version: 2,
                issues: vec![ValidationIssue::new(IssueKind::InvalidName, "bad")],
            }],
        );
        assert!(!report.is_valid());
        assert_eq!(report.issue_count(), 1);
        assert_eq!(report.issues_for("greet", 2).len(), 1);
        assert!(report.issues_for("greet", 1).is_empty());
    }

    #[test]
    fn test_issue_serializes_kind_snake_case() {
        let issue = ValidationIssue::for_variable(IssueKind::SpecConflict, "x", "conflict");
        let json = serde_json::to_string(&issue).unwrap();
        assert!(json.contains(r#""kind":"spec_conflict""#));
        assert!(json.contains(r#""variable":"x""#));
    }
}
