//! Prompt Registry - Versioned Prompt Templates
//!
//! # Ground Rules
//! 1. Templates Declare Their Variables
//! 2. Validation Collects, Actions Fail Fast
//! 3. Versions Never Overwrite
//! 4. Latest Means Highest, Resolved On Every Lookup
//! 5. Rendering Is Pure

pub mod error;
pub mod hashing;
pub mod loader;
pub mod registry;
pub mod render;
pub mod templates;
pub mod validation;
pub mod variables;

pub use error::RegistryError;
pub use hashing::{canonical_json, fingerprint, render_fingerprint};
pub use loader::{load_dir, load_into, LoadError};
pub use registry::PromptRegistry;
pub use render::{render_prompt, EngineError, MiniJinjaRenderer, TextRenderer};
pub use templates::PromptTemplate;
pub use validation::{IssueKind, RecordIssues, ValidationIssue, ValidationReport};
pub use variables::{validate_spec, Bindings, VarValue, VariableSpec};
