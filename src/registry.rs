//! Prompt Registry - Versioned Storage
//!
//! Records are keyed by (name, version). Insertion is the only mutation and
//! always runs validation first; "latest" is resolved on every lookup.

use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

use crate::error::RegistryError;
use crate::render::{render_prompt, MiniJinjaRenderer, TextRenderer};
use crate::templates::PromptTemplate;
use crate::validation::{RecordIssues, ValidationReport};
use crate::variables::{Bindings, VariableSpec};

pub struct PromptRegistry {
    entries: BTreeMap<String, BTreeMap<u32, PromptTemplate>>,
    renderer: Box<dyn TextRenderer>,
}

impl PromptRegistry {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            renderer: Box::new(MiniJinjaRenderer::new()),
        }
    }

    /// Use a different substitution engine for validation and rendering
    pub fn with_renderer(renderer: impl TextRenderer + 'static) -> Self {
        Self {
            entries: BTreeMap::new(),
            renderer: Box::new(renderer),
        }
    }

    /// Validate and insert. A rejected record leaves the registry untouched.
    pub fn add(&mut self, record: PromptTemplate) -> Result<(), RegistryError> {
        let issues = record.validate_with(self.renderer.as_ref());
        if !issues.is_empty() {
            warn!("Rejected {}: {} validation issue(s)", record, issues.len());
            return Err(RegistryError::TemplateValidation {
                name: record.name,
                version: record.version,
                issues,
            });
        }

        let versions = self.entries.entry(record.name.clone()).or_default();
        if versions.contains_key(&record.version) {
            return Err(RegistryError::DuplicateVersion {
                name: record.name,
                version: record.version,
            });
        }

        debug!("Registered {}", record);
        versions.insert(record.version, record);
        Ok(())
    }

    /// Look up a record. `None` resolves to the highest stored version.
    pub fn get(&self, name: &str, version: Option<u32>) -> Result<&PromptTemplate, RegistryError> {
        let versions = self
            .entries
            .get(name)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| RegistryError::PromptNotFound {
                name: name.to_string(),
            })?;

        match version {
            Some(v) => versions.get(&v).ok_or_else(|| RegistryError::VersionNotFound {
                name: name.to_string(),
                version: v,
                available: versions.keys().copied().collect(),
            }),
            None => versions
                .values()
                .next_back()
                .ok_or_else(|| RegistryError::PromptNotFound {
                    name: name.to_string(),
                }),
        }
    }

    pub fn render(
        &self,
        name: &str,
        version: Option<u32>,
        bindings: &Bindings,
    ) -> Result<String, RegistryError> {
        let record = self.get(name, version)?;
        render_prompt(self.renderer.as_ref(), record, bindings)
    }

    /// Distinct prompt names in lexicographic order
    pub fn list_prompts(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, versions)| !versions.is_empty())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Ascending versions for `name`; empty when the name is unknown
    pub fn list_versions(&self, name: &str) -> Vec<u32> {
        self.entries
            .get(name)
            .map(|versions| versions.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn latest_version(&self, name: &str) -> Option<u32> {
        self.entries
            .get(name)
            .and_then(|versions| versions.keys().next_back().copied())
    }

    /// Build a record at the next free version for `name` (1 for a new name)
    /// and insert it through [`PromptRegistry::add`]. Returns the version.
    pub fn create_prompt(
        &mut self,
        name: &str,
        template: &str,
        description: &str,
        variables: BTreeMap<String, VariableSpec>,
    ) -> Result<u32, RegistryError> {
        let version = match self.latest_version(name) {
            None => 1,
            Some(latest) => latest.checked_add(1).ok_or_else(|| {
                RegistryError::VersionsExhausted {
                    name: name.to_string(),
                    latest,
                }
            })?,
        };
        let record = PromptTemplate {
            name: name.to_string(),
            version,
            description: description.to_string(),
            variables,
            template: template.to_string(),
        };
        self.add(record)?;
        Ok(version)
    }

    /// Re-check every stored record and collect all issues
    pub fn validate_all(&self) -> ValidationReport {
        let mut checked = 0;
        let mut records = vec![];

        for record in self.iter() {
            checked += 1;
            let issues = record.validate_with(self.renderer.as_ref());
            if !issues.is_empty() {
                records.push(RecordIssues {
                    name: record.name.clone(),
                    version: record.version,
                    issues,
                });
            }
        }

        ValidationReport::new(checked, records)
    }

    /// Every stored record in (name, version) order
    pub fn iter(&self) -> impl Iterator<Item = &PromptTemplate> {
        self.entries.values().flat_map(|versions| versions.values())
    }

    /// Number of distinct names, not counting versions
    pub fn len(&self) -> usize {
        self.list_prompts().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, name: &str) -> bool {
        self.latest_version(name).is_some()
    }
}

impl Default for PromptRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PromptRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let versions: BTreeMap<&str, Vec<u32>> = self
            .entries
            .iter()
            .map(|(name, v)| (name.as_str(), v.keys().copied().collect()))
            .collect();
        f.debug_struct("PromptRegistry")
            .field("entries", &versions)
            .finish_non_exhaustive()
    }
}
