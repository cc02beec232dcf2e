//! Variable Declarations
//!
//! Each prompt declares the variables it accepts. Values supplied at render
//! time (and declared defaults) are plain scalars.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::validation::{IssueKind, ValidationIssue};

/// Caller-supplied or default value for a variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VarValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Null,
}

impl VarValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// Text a value renders to. Null displays as nothing and whole floats keep
/// their `.0`, the same as template output.
impl fmt::Display for VarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(x) if x.is_nan() => f.write_str("NaN"),
            Self::Float(x) if x.is_infinite() => {
                f.write_str(if x.is_sign_negative() { "-inf" } else { "inf" })
            }
            Self::Float(x) => {
                let text = x.to_string();
                if text.contains('.') {
                    f.write_str(&text)
                } else {
                    write!(f, "{}.0", text)
                }
            }
            Self::String(s) => f.write_str(s),
            Self::Null => Ok(()),
        }
    }
}

impl From<&str> for VarValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for VarValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for VarValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for VarValue {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<u32> for VarValue {
    fn from(value: u32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<f64> for VarValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for VarValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Name -> value mapping handed to a render call
pub type Bindings = BTreeMap<String, VarValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSpec {
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<VarValue>,
    #[serde(default)]
    pub description: String,
}

fn default_true() -> bool { true }

impl Default for VariableSpec {
    fn default() -> Self {
        Self::required()
    }
}

impl VariableSpec {
    pub fn required() -> Self {
        Self {
            required: true,
            default: None,
            description: String::new(),
        }
    }

    pub fn optional(default: Option<VarValue>) -> Self {
        Self {
            required: false,
            default,
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Check one declaration for self-contradictions. Never fails; an empty
/// list means the spec is sound.
pub fn validate_spec(name: &str, spec: &VariableSpec) -> Vec<ValidationIssue> {
    let mut issues = vec![];

    if spec.required && spec.default.is_some() {
        issues.push(ValidationIssue::for_variable(
            IssueKind::SpecConflict,
            name,
            format!("variable `{}` is required but declares a default", name),
        ));
    }

    issues
}
