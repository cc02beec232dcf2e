//! Prompt Templates - Named, Versioned Contracts
//!
//! A template declares every variable it reads. Validation checks the
//! declarations against the text; rendering checks caller bindings against
//! the declarations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::RegistryError;
use crate::render::{default_renderer, render_prompt, TextRenderer};
use crate::validation::{is_identifier, IssueKind, ValidationIssue};
use crate::variables::{validate_spec, Bindings, VarValue, VariableSpec};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub name: String,
    pub version: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub variables: BTreeMap<String, VariableSpec>,
    pub template: String,
}

impl PromptTemplate {
    pub fn new(name: impl Into<String>, version: u32, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version,
            description: String::new(),
            variables: BTreeMap::new(),
            template: template.into(),
        }
    }

    /// Starter record for a fresh prompts directory
    pub fn example() -> Self {
        Self::new(
            "example",
            1,
            "Explain {{ topic }} in simple terms for a {{ audience }}.\n",
        )
        .with_description("An example prompt template")
        .with_variable(
            "topic",
            VariableSpec::required().with_description("The topic to explain"),
        )
        .with_variable(
            "audience",
            VariableSpec::optional(Some(VarValue::from("general audience")))
                .with_description("Target audience for the explanation"),
        )
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, spec: VariableSpec) -> Self {
        self.variables.insert(name.into(), spec);
        self
    }

    /// Static checks over the whole record using the shared engine
    pub fn validate(&self) -> Vec<ValidationIssue> {
        self.validate_with(default_renderer())
    }

    pub fn validate_with(&self, renderer: &dyn TextRenderer) -> Vec<ValidationIssue> {
        let mut issues = vec![];

        if self.version < 1 {
            issues.push(ValidationIssue::new(
                IssueKind::InvalidVersion,
                format!("version must be a positive integer, got {}", self.version),
            ));
        }

        if self.name.trim().is_empty() {
            issues.push(ValidationIssue::new(
                IssueKind::InvalidName,
                "prompt name must not be empty",
            ));
        }

        for (name, spec) in &self.variables {
            if !is_identifier(name) {
                issues.push(ValidationIssue::for_variable(
                    IssueKind::InvalidIdentifier,
                    name,
                    format!("variable name `{}` is not a valid identifier", name),
                ));
            }
            issues.extend(validate_spec(name, spec));
        }

        match renderer.placeholders(&self.template) {
            Ok(used) => {
                for name in used {
                    if !self.variables.contains_key(&name) {
                        issues.push(ValidationIssue::for_variable(
                            IssueKind::UndeclaredVariable,
                            &name,
                            format!("variable `{}` is used in the template but not declared", name),
                        ));
                    }
                }
            }
            Err(e) => {
                issues.push(ValidationIssue::new(
                    IssueKind::TemplateSyntax,
                    format!("template does not parse: {}", e),
                ));
            }
        }

        issues
    }

    /// Render-time checks. Keys the template does not declare are ignored.
    pub fn validate_inputs(&self, bindings: &Bindings) -> Vec<ValidationIssue> {
        self.variables
            .iter()
            .filter(|(name, spec)| spec.required && !bindings.contains_key(name.as_str()))
            .map(|(name, _)| {
                ValidationIssue::for_variable(
                    IssueKind::MissingRequired,
                    name,
                    format!("missing required variable `{}`", name),
                )
            })
            .collect()
    }

    pub fn render(&self, bindings: &Bindings) -> Result<String, RegistryError> {
        render_prompt(default_renderer(), self, bindings)
    }

    pub fn render_with(
        &self,
        renderer: &dyn TextRenderer,
        bindings: &Bindings,
    ) -> Result<String, RegistryError> {
        render_prompt(renderer, self, bindings)
    }

    pub fn get_required_variables(&self) -> Vec<&str> {
        self.variables
            .iter()
            .filter(|(_, spec)| spec.required)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn get_optional_variables(&self) -> Vec<&str> {
        self.variables
            .iter()
            .filter(|(_, spec)| !spec.required)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

impl fmt::Display for PromptTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:v{}", self.name, self.version)
    }
}
