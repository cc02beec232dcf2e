//! Registry errors
//!
//! Every variant carries the prompt name and version it concerns so callers
//! can print a precise diagnostic without parsing the message.

use thiserror::Error;

use crate::validation::ValidationIssue;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Prompt {name}:v{version} failed validation: {}", join_issues(.issues))]
    TemplateValidation {
        name: String,
        version: u32,
        issues: Vec<ValidationIssue>,
    },

    #[error("Prompt {name}:v{version} is missing required variables: {}", join_names(.missing))]
    MissingRequiredVariables {
        name: String,
        version: u32,
        missing: Vec<String>,
    },

    #[error("Prompt {name}:v{version} already exists")]
    DuplicateVersion { name: String, version: u32 },

    #[error("Prompt {name} has no version after v{latest}")]
    VersionsExhausted { name: String, latest: u32 },

    #[error("Prompt not found: {name}")]
    PromptNotFound { name: String },

    #[error("Prompt {name} has no version {version} (available: {})", format_versions(.available))]
    VersionNotFound {
        name: String,
        version: u32,
        available: Vec<u32>,
    },

    #[error("Template syntax error in {name}:v{version}{}: {detail}", format_line(.line))]
    TemplateSyntax {
        name: String,
        version: u32,
        line: Option<usize>,
        detail: String,
    },

    #[error("Failed to render {name}:v{version}: {detail}")]
    Render {
        name: String,
        version: u32,
        detail: String,
    },
}

impl RegistryError {
    /// True for the two lookup failures
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::PromptNotFound { .. } | Self::VersionNotFound { .. })
    }
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| i.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

fn join_names(names: &[String]) -> String {
    names.join(", ")
}

fn format_versions(versions: &[u32]) -> String {
    versions
        .iter()
        .map(|v| format!("v{}", v))
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_line(line: &Option<usize>) -> String {
    match line {
        Some(n) => format!(" (line {})", n),
        None => String::new(),
    }
}
