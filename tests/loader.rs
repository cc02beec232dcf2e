//! Loader Tests - prompt files on disk

use std::fs;
use std::path::Path;

use prompt_registry::{
    load_dir, load_into, loader::read_records, Bindings, LoadError, PromptRegistry,
    PromptTemplate, RegistryError, VarValue,
};
use tempfile::TempDir;

fn write(dir: &Path, relative: &str, contents: &str) {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

const EXAMPLE: &str = r#"name: example
version: 1
description: An example prompt template
variables:
  topic:
    required: true
    description: The topic to explain
  audience:
    required: false
    default: general audience
    description: Target audience for the explanation
template: "Explain {{ topic }} in simple terms for a {{ audience }}.\n"
"#;

#[test]
fn test_load_and_render_from_directory() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "example.yaml", EXAMPLE);
    write(
        tmp.path(),
        "nested/example_v2.yml",
        "variables:\n  topic:\ntemplate: \"v2 {{ topic }}\"\n",
    );
    write(tmp.path(), "notes.txt", "not a prompt");

    let registry = load_dir(tmp.path()).unwrap();
    assert_eq!(registry.list_prompts(), vec!["example"]);
    assert_eq!(registry.list_versions("example"), vec![1, 2]);

    let mut b = Bindings::new();
    b.insert("topic".to_string(), VarValue::from("tides"));
    assert_eq!(registry.render("example", None, &b).unwrap(), "v2 tides");
    assert_eq!(
        registry.render("example", Some(1), &b).unwrap(),
        "Explain tides in simple terms for a general audience.\n"
    );
}

#[test]
fn test_missing_directory_is_empty() {
    let tmp = TempDir::new().unwrap();
    let registry = load_dir(&tmp.path().join("absent")).unwrap();
    assert!(registry.is_empty());
}

#[test]
fn test_empty_file_skipped() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "blank.yaml", "");
    write(tmp.path(), "real.json", r#"{"template": "hello"}"#);

    let mut registry = PromptRegistry::new();
    let loaded = load_into(tmp.path(), &mut registry).unwrap();
    assert_eq!(loaded, 1);
    assert_eq!(registry.get("real", None).unwrap().template, "hello");
}

#[test]
fn test_duplicate_across_files_rejected() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "a.yaml", "name: same\nversion: 1\ntemplate: first\n");
    write(tmp.path(), "b.yaml", "name: same\nversion: 1\ntemplate: second\n");

    let err = load_dir(tmp.path()).err().expect("duplicate must fail");
    match err {
        LoadError::Registry { path, source } => {
            assert!(path.ends_with("b.yaml"));
            assert!(matches!(source, RegistryError::DuplicateVersion { version: 1, .. }));
        }
        other => panic!("unexpected: {}", other),
    }
}

#[test]
fn test_invalid_record_names_file() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "broken.yaml", "template: \"{{ undeclared }}\"\n");

    let err = load_dir(tmp.path()).err().expect("undeclared variable must fail");
    assert!(err.to_string().contains("broken.yaml"));
    assert!(matches!(
        err,
        LoadError::Registry { source: RegistryError::TemplateValidation { .. }, .. }
    ));
}

#[test]
fn test_file_version_mismatch() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "greet_v2.yaml", "version: 5\ntemplate: hi\n");

    assert!(matches!(
        load_dir(tmp.path()),
        Err(LoadError::VersionMismatch { file_version: 2, record_version: 5, .. })
    ));
}

#[test]
fn test_read_records_does_not_validate() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "ok.yaml", "template: fine\n");
    write(tmp.path(), "bad.yaml", "template: \"{{ nope }}\"\n");

    let records = read_records(tmp.path()).unwrap();
    let names: Vec<_> = records.iter().map(|(_, r)| r.name.as_str()).collect();
    assert_eq!(names, vec!["bad", "ok"]);
    assert_eq!(records[0].1.validate().len(), 1);
}

#[test]
fn test_starter_prompt_loads_back() {
    let tmp = TempDir::new().unwrap();
    let yaml = serde_yaml::to_string(&PromptTemplate::example()).unwrap();
    write(tmp.path(), "example.yaml", &yaml);

    let registry = load_dir(tmp.path()).unwrap();
    assert_eq!(registry.get("example", None).unwrap(), &PromptTemplate::example());
}
