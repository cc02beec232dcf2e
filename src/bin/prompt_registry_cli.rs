//! Prompt Registry CLI
//!
//! Commands: init, list, show, render, validate, new
//! Structured output is JSON on stdout; logs go to stderr.
//! Returns 1 on load/usage errors and 2 on validation or render failures.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use prompt_registry::{
    fingerprint, load_dir, loader::read_records, render_fingerprint, Bindings, PromptRegistry,
    PromptTemplate, RecordIssues, RegistryError, ValidationReport, VarValue, VariableSpec,
};

#[derive(Parser)]
#[command(name = "prompt-registry")]
#[command(about = "Prompt Registry - versioned prompt templates with variables")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory containing prompt files
    #[arg(short = 'd', long, env = "PROMPT_REGISTRY_DIR", default_value = "prompts", global = true)]
    prompts_dir: PathBuf,

    /// Log debug output to stderr (RUST_LOG refines it)
    #[arg(long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a starter prompt as YAML (save it as example.yaml)
    Init,

    /// List prompts with their versions
    List,

    /// Show one prompt
    Show {
        name: String,

        /// Specific version (default: latest)
        #[arg(short, long)]
        version: Option<u32>,
    },

    /// Render a prompt
    Render {
        name: String,

        /// Specific version (default: latest)
        #[arg(short, long)]
        version: Option<u32>,

        /// Variable binding, repeatable
        #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_binding)]
        vars: Vec<(String, String)>,

        /// Wrap the output in a JSON envelope
        #[arg(long)]
        json: bool,
    },

    /// Validate every prompt file
    Validate,

    /// Build a new prompt (next free version) and print it as YAML
    New {
        name: String,

        #[arg(long, default_value = "")]
        description: String,

        /// Declaration `name[!|?][:description]`; `?` marks it optional
        #[arg(long = "var", value_name = "DECL")]
        vars: Vec<String>,
    },
}

fn parse_binding(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("invalid variable `{}`, expected KEY=VALUE", raw)),
    }
}

fn parse_declaration(raw: &str) -> (String, VariableSpec) {
    let (name, description) = raw.split_once(':').unwrap_or((raw, ""));
    let (name, spec) = if let Some(name) = name.strip_suffix('?') {
        (name, VariableSpec::optional(None))
    } else {
        (name.strip_suffix('!').unwrap_or(name), VariableSpec::required())
    };
    (name.to_string(), spec.with_description(description))
}

fn setup_logging(verbose: bool) {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::WARN };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}

fn emit<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => fail(ExitCode::FAILURE, &format!("Failed to serialize output: {}", e)),
    }
}

fn fail(code: ExitCode, message: &str) -> ExitCode {
    println!("{}", serde_json::json!({ "success": false, "error": message }));
    code
}

fn registry_failure(e: &RegistryError) -> ExitCode {
    let code = if e.is_not_found() { ExitCode::FAILURE } else { ExitCode::from(2) };
    fail(code, &e.to_string())
}

fn print_yaml(record: &PromptTemplate) -> ExitCode {
    match serde_yaml::to_string(record) {
        Ok(yaml) => {
            print!("{}", yaml);
            ExitCode::SUCCESS
        }
        Err(e) => fail(ExitCode::FAILURE, &e.to_string()),
    }
}

fn load(dir: &Path) -> Result<PromptRegistry, ExitCode> {
    load_dir(dir).map_err(|e| fail(ExitCode::FAILURE, &format!("Failed to load prompts: {}", e)))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose);
    debug!("Using prompts directory {}", cli.prompts_dir.display());

    let dir = cli.prompts_dir.as_path();
    let result = match cli.command {
        Commands::Init => return print_yaml(&PromptTemplate::example()),
        Commands::Validate => return cmd_validate(dir),
        Commands::List => load(dir).map(|registry| cmd_list(&registry)),
        Commands::Show { name, version } => {
            load(dir).map(|registry| cmd_show(&registry, &name, version))
        }
        Commands::Render { name, version, vars, json } => {
            let bindings: Bindings = vars
                .into_iter()
                .map(|(k, v)| (k, VarValue::String(v)))
                .collect();
            load(dir).map(|registry| cmd_render(&registry, &name, version, &bindings, json))
        }
        Commands::New { name, description, vars } => {
            load(dir).map(|mut registry| cmd_new(&mut registry, &name, &description, &vars))
        }
    };

    result.unwrap_or_else(|code| code)
}

fn cmd_list(registry: &PromptRegistry) -> ExitCode {
    let prompts: Vec<_> = registry
        .list_prompts()
        .into_iter()
        .filter_map(|name| registry.get(name, None).ok())
        .map(|latest| {
            serde_json::json!({
                "name": latest.name,
                "versions": registry.list_versions(&latest.name),
                "latest": latest.version,
                "description": latest.description,
            })
        })
        .collect();
    emit(&prompts)
}

fn cmd_show(registry: &PromptRegistry, name: &str, version: Option<u32>) -> ExitCode {
    let record = match registry.get(name, version) {
        Ok(r) => r,
        Err(e) => return registry_failure(&e),
    };
    let hash = match fingerprint(record) {
        Ok(h) => h,
        Err(e) => return fail(ExitCode::FAILURE, &e.to_string()),
    };
    emit(&serde_json::json!({
        "prompt": record,
        "required": record.get_required_variables(),
        "optional": record.get_optional_variables(),
        "versions": registry.list_versions(name),
        "fingerprint": hash,
    }))
}

fn cmd_render(
    registry: &PromptRegistry,
    name: &str,
    version: Option<u32>,
    bindings: &Bindings,
    json: bool,
) -> ExitCode {
    let record = match registry.get(name, version) {
        Ok(r) => r,
        Err(e) => return registry_failure(&e),
    };
    let rendered = match registry.render(name, Some(record.version), bindings) {
        Ok(text) => text,
        Err(e) => return registry_failure(&e),
    };

    if !json {
        print!("{}", rendered);
        if !rendered.ends_with('\n') {
            println!();
        }
        return ExitCode::SUCCESS;
    }

    let hash = match render_fingerprint(record, bindings) {
        Ok(h) => h,
        Err(e) => return fail(ExitCode::FAILURE, &e.to_string()),
    };
    emit(&serde_json::json!({
        "success": true,
        "name": record.name,
        "version": record.version,
        "fingerprint": hash,
        "output": rendered,
    }))
}

/// Audits files one by one so a single bad record does not hide the rest.
fn cmd_validate(dir: &Path) -> ExitCode {
    let records = match read_records(dir) {
        Ok(r) => r,
        Err(e) => return fail(ExitCode::FAILURE, &format!("Failed to load prompts: {}", e)),
    };

    let mut registry = PromptRegistry::new();
    let mut rejected = vec![];
    for (path, record) in records {
        match registry.add(record) {
            Ok(()) => {}
            Err(RegistryError::TemplateValidation { name, version, issues }) => {
                rejected.push(RecordIssues { name, version, issues });
            }
            Err(e) => {
                return fail(ExitCode::from(2), &format!("{}: {}", path.display(), e));
            }
        }
    }

    let stored = registry.validate_all();
    let checked = stored.checked + rejected.len();
    let mut records = rejected;
    records.extend(stored.records);
    let report = ValidationReport::new(checked, records);

    let code = emit(&report);
    if report.is_valid() { code } else { ExitCode::from(2) }
}

fn cmd_new(
    registry: &mut PromptRegistry,
    name: &str,
    description: &str,
    declarations: &[String],
) -> ExitCode {
    let variables: BTreeMap<String, VariableSpec> =
        declarations.iter().map(|d| parse_declaration(d)).collect();

    let template = if variables.is_empty() {
        "Your prompt template here.\n".to_string()
    } else {
        let placeholders: Vec<_> = variables.keys().map(|v| format!("{{{{ {} }}}}", v)).collect();
        format!("Your prompt here.\n\n{}\n", placeholders.join("\n"))
    };

    let version = match registry.create_prompt(name, &template, description, variables) {
        Ok(v) => v,
        Err(e) => return registry_failure(&e),
    };
    let record = match registry.get(name, Some(version)) {
        Ok(r) => r,
        Err(e) => return registry_failure(&e),
    };

    print_yaml(record)
}
