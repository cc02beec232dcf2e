//! Renderer - Placeholder Substitution
//!
//! The placeholder grammar belongs to the template engine. The rest of the
//! crate only sees [`TextRenderer`]: render a flat binding set into a string,
//! and list the top-level names a template refers to.

use std::collections::{BTreeMap, BTreeSet};

use minijinja::{AutoEscape, Environment, ErrorKind, UndefinedBehavior};
use thiserror::Error;
use tracing::debug;

use crate::error::RegistryError;
use crate::templates::PromptTemplate;
use crate::variables::{Bindings, VarValue};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("{detail}")]
    Syntax { line: Option<usize>, detail: String },

    #[error("{detail}")]
    Render { detail: String },
}

impl EngineError {
    /// Attach the prompt identity the engine knows nothing about
    pub fn for_prompt(self, name: &str, version: u32) -> RegistryError {
        match self {
            Self::Syntax { line, detail } => RegistryError::TemplateSyntax {
                name: name.to_string(),
                version,
                line,
                detail,
            },
            Self::Render { detail } => RegistryError::Render {
                name: name.to_string(),
                version,
                detail,
            },
        }
    }
}

/// External substitution capability.
///
/// Placeholders with no binding must render as nothing rather than fail.
pub trait TextRenderer: Send + Sync {
    fn render_text(&self, template: &str, bindings: &Bindings) -> Result<String, EngineError>;

    /// Top-level variable names the template reads from its bindings
    fn placeholders(&self, template: &str) -> Result<BTreeSet<String>, EngineError>;
}

/// Jinja-style `{{ name }}` rendering backed by minijinja
#[derive(Debug, Clone, Copy, Default)]
pub struct MiniJinjaRenderer;

impl MiniJinjaRenderer {
    pub fn new() -> Self {
        Self
    }

    /// The environment borrows template sources, so one is built per call.
    fn environment<'source>(&self) -> Environment<'source> {
        let mut env = Environment::new();
        // Prompts are plain text, never HTML.
        env.set_auto_escape_callback(|_| AutoEscape::None);
        // Attribute and index lookups on an unbound value stay undefined.
        env.set_undefined_behavior(UndefinedBehavior::Chainable);
        env.set_keep_trailing_newline(true);
        env
    }
}

fn engine_error(err: minijinja::Error) -> EngineError {
    let detail = err
        .detail()
        .map(str::to_string)
        .unwrap_or_else(|| err.to_string());
    match err.kind() {
        ErrorKind::SyntaxError => EngineError::Syntax {
            line: err.line(),
            detail,
        },
        _ => EngineError::Render { detail },
    }
}

impl TextRenderer for MiniJinjaRenderer {
    fn render_text(&self, template: &str, bindings: &Bindings) -> Result<String, EngineError> {
        let env = self.environment();
        let tmpl = env.template_from_str(template).map_err(engine_error)?;
        // Null binds nothing so it falls through to the undefined value.
        let context: BTreeMap<&str, &VarValue> = bindings
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.as_str(), v))
            .collect();
        tmpl.render(&context).map_err(engine_error)
    }

    fn placeholders(&self, template: &str) -> Result<BTreeSet<String>, EngineError> {
        let env = self.environment();
        let tmpl = env.template_from_str(template).map_err(engine_error)?;
        Ok(tmpl.undeclared_variables(false).into_iter().collect())
    }
}

static DEFAULT_RENDERER: MiniJinjaRenderer = MiniJinjaRenderer;

/// Engine used when no renderer is supplied
pub fn default_renderer() -> &'static MiniJinjaRenderer {
    &DEFAULT_RENDERER
}

/// Optional defaults overlaid with caller values. Only declared variables
/// make it into the result; extra caller keys are dropped.
pub fn effective_bindings(prompt: &PromptTemplate, bindings: &Bindings) -> Bindings {
    prompt
        .variables
        .iter()
        .filter_map(|(name, spec)| {
            let value = match bindings.get(name) {
                Some(v) => Some(v),
                None if !spec.required => spec.default.as_ref(),
                None => None,
            };
            value.map(|v| (name.clone(), v.clone()))
        })
        .collect()
}

/// Render a prompt with the given engine.
///
/// Missing required variables are all reported in a single error. Engine
/// failures come back tagged with the prompt's name and version.
pub fn render_prompt(
    renderer: &dyn TextRenderer,
    prompt: &PromptTemplate,
    bindings: &Bindings,
) -> Result<String, RegistryError> {
    let issues = prompt.validate_inputs(bindings);
    if !issues.is_empty() {
        return Err(RegistryError::MissingRequiredVariables {
            name: prompt.name.clone(),
            version: prompt.version,
            missing: issues.into_iter().filter_map(|i| i.variable).collect(),
        });
    }

    let effective = effective_bindings(prompt, bindings);
    debug!(
        "Rendering {}:v{} with {} binding(s)",
        prompt.name,
        prompt.version,
        effective.len()
    );

    renderer
        .render_text(&prompt.template, &effective)
        .map_err(|e| e.for_prompt(&prompt.name, prompt.version))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables::VariableSpec;

    fn bind(pairs: &[(&str, VarValue)]) -> Bindings {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_render_text_substitutes() {
        let r = MiniJinjaRenderer::new();
        let out = r
            .render_text("Hello {{ who }}!", &bind(&[("who", "world".into())]))
            .unwrap();
        assert_eq!(out, "Hello world!");
    }

    #[test]
    fn test_render_text_no_html_escaping() {
        let r = MiniJinjaRenderer::new();
        let out = r
            .render_text("{{ code }}", &bind(&[("code", "<a href=\"x\">&</a>".into())]))
            .unwrap();
        assert_eq!(out, "<a href=\"x\">&</a>");
    }

    #[test]
    fn test_unbound_placeholder_renders_empty() {
        let r = MiniJinjaRenderer::new();
        let out = r.render_text("[{{ missing }}]", &Bindings::new()).unwrap();
        assert_eq!(out, "[]");

        let out = r.render_text("[{{ gone }}]", &bind(&[("gone", VarValue::Null)])).unwrap();
        assert_eq!(out, "[]");
    }

    #[test]
    fn test_attribute_of_unbound_renders_empty() {
        let r = MiniJinjaRenderer::new();
        let out = r.render_text("Hi {{ user.name }}!", &Bindings::new()).unwrap();
        assert_eq!(out, "Hi !");

        let out = r
            .render_text("Hi {{ user.name }}{{ user[0] }}!", &bind(&[("user", VarValue::Null)]))
            .unwrap();
        assert_eq!(out, "Hi !");
    }

    #[test]
    fn test_unbound_optional_attribute_through_prompt() {
        let prompt = PromptTemplate::new("u", 1, "Hi {{ user.name }}!")
            .with_variable("user", VariableSpec::optional(None));
        assert!(prompt.validate().is_empty());
        assert_eq!(
            render_prompt(default_renderer(), &prompt, &Bindings::new()).unwrap(),
            "Hi !"
        );
    }

    #[test]
    fn test_scalars_render_like_display() {
        let r = MiniJinjaRenderer::new();
        for value in [
            VarValue::from(100.0),
            VarValue::from(2.25),
            VarValue::from(-7),
            VarValue::from(true),
            VarValue::from("text"),
        ] {
            let out = r
                .render_text("{{ v }}", &bind(&[("v", value.clone())]))
                .unwrap();
            assert_eq!(out, value.to_string());
        }
    }

    #[test]
    fn test_keeps_trailing_newline() {
        let r = MiniJinjaRenderer::new();
        let out = r.render_text("line\n", &Bindings::new()).unwrap();
        assert_eq!(out, "line\n");
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let r = MiniJinjaRenderer::new();
        let err = r.render_text("Hello {{ who ", &Bindings::new()).unwrap_err();
        assert!(matches!(err, EngineError::Syntax { .. }));
        assert!(r.placeholders("{% if %}").is_err());
    }

    #[test]
    fn test_placeholders_top_level_only() {
        let r = MiniJinjaRenderer::new();
        let names = r
            .placeholders("{{ user.name }} {% for item in items %}{{ item }}{% endfor %} {{ tone }}")
            .unwrap();
        let names: Vec<_> = names.into_iter().collect();
        assert_eq!(names, vec!["items", "tone", "user"]);
    }

    #[test]
    fn test_effective_bindings_overlay() {
        let prompt = PromptTemplate::new("p", 1, "{{ a }} {{ b }} {{ c }}")
            .with_variable("a", VariableSpec::required())
            .with_variable("b", VariableSpec::optional(Some(VarValue::from(1))))
            .with_variable("c", VariableSpec::optional(None));

        let caller = bind(&[("a", "x".into()), ("b", 2.into()), ("extra", "y".into())]);
        let effective = effective_bindings(&prompt, &caller);
        assert_eq!(effective, bind(&[("a", "x".into()), ("b", 2.into())]));

        let effective = effective_bindings(&prompt, &bind(&[("a", "x".into())]));
        assert_eq!(effective, bind(&[("a", "x".into()), ("b", 1.into())]));
    }

    #[test]
    fn test_render_prompt_lists_every_missing_variable() {
        let prompt = PromptTemplate::new("p", 3, "{{ a }}{{ b }}")
            .with_variable("a", VariableSpec::required())
            .with_variable("b", VariableSpec::required());

        match render_prompt(default_renderer(), &prompt, &Bindings::new()) {
            Err(RegistryError::MissingRequiredVariables { name, version, missing }) => {
                assert_eq!(name, "p");
                assert_eq!(version, 3);
                assert_eq!(missing, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_render_prompt_syntax_error_tagged() {
        let prompt = PromptTemplate::new("broken", 2, "{{ a ");
        match render_prompt(default_renderer(), &prompt, &Bindings::new()) {
            Err(RegistryError::TemplateSyntax { name, version, .. }) => {
                assert_eq!(name, "broken");
                assert_eq!(version, 2);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
