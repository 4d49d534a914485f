use std::path::Path;

use pipeline_schema_core::{
    NonInteractive, RuntimeParams, SCHEMA_FILE_NAME, SchemaDocument, SchemaError, flatten, lint,
    reconcile, validate_instance,
};
use pipeline_schema_store::{
    SchemaLocation, StoreError, ToolConfig, load_parameter_file, load_schema_value, save_schema,
    save_value,
};
use serde_json::json;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn skeleton_in(dir: &Path) -> SchemaLocation {
    let location = SchemaLocation::resolve(dir);
    let runtime = RuntimeParams::parse_flat_config(
        "params.reads = 'data/*.fq'\nparams.max_cpus = 16\nparams.skip_qc = false\n",
    );
    let mut doc = SchemaDocument::skeleton(&location.fallback_name(), "");
    reconcile(&mut doc, &runtime, &mut NonInteractive);
    save_schema(location.schema_path(), &doc).unwrap();
    location
}

// ---------------------------------------------------------------------------
// Schema lifecycle
// ---------------------------------------------------------------------------

#[test]
fn test_skeleton_save_lint_validate() {
    let dir = tempfile::tempdir().unwrap();
    let location = skeleton_in(dir.path());
    assert!(location.exists());

    let raw = load_schema_value(location.require_existing().unwrap()).unwrap();
    let report = lint(&raw).unwrap();
    assert_eq!(report.defaults.len(), 2);

    let params_path = write(
        dir.path(),
        "params.yaml",
        "reads: 'x.fq'\nmax_cpus: 8\nskip_qc: true\n",
    );
    let params = load_parameter_file(&params_path).unwrap();
    assert!(validate_instance(&report.flat, &params).is_ok());

    let bad_path = write(dir.path(), "bad.json", r#"{"max_cpus": "eight"}"#);
    let bad = load_parameter_file(&bad_path).unwrap();
    assert!(matches!(
        validate_instance(&report.flat, &bad),
        Err(SchemaError::InvalidParameters { .. })
    ));
}

#[test]
fn test_resave_keeps_file_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let text = r#"{
    "title": "t",
    "properties": {
        "a": {
            "type": "string",
            "default": "x",
            "description": "d",
            "help_text": "h"
        },
        "b": {
            "type": "string",
            "default": null
        }
    },
    "definitions": {}
}
"#;
    let path = write(dir.path(), SCHEMA_FILE_NAME, text);

    let doc = SchemaDocument::from_value(load_schema_value(&path).unwrap()).unwrap();
    save_schema(&path, &doc).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), text);
}

#[test]
fn test_resolve_prefers_explicit_file() {
    let dir = tempfile::tempdir().unwrap();
    let location = skeleton_in(dir.path());
    let by_file = SchemaLocation::resolve(location.schema_path());
    assert_eq!(by_file.schema_path(), location.schema_path());
    assert_eq!(
        by_file.schema_path().file_name().unwrap(),
        SCHEMA_FILE_NAME
    );
}

#[test]
fn test_invalid_remote_document_saved_aside() {
    let dir = tempfile::tempdir().unwrap();
    let location = skeleton_in(dir.path());
    let before = std::fs::read_to_string(location.schema_path()).unwrap();

    let broken = json!({"title": "edited", "properties": {"x": {"type": "array"}}});
    let aside = dir.path().join("nextflow_schema.json.remote.json");
    save_value(&aside, &broken).unwrap();

    assert_eq!(load_schema_value(&aside).unwrap(), broken);
    assert_eq!(
        std::fs::read_to_string(location.schema_path()).unwrap(),
        before
    );
}

#[test]
fn test_missing_schema_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let err = SchemaLocation::resolve(dir.path())
        .require_existing()
        .unwrap_err();
    assert!(err.to_string().contains(SCHEMA_FILE_NAME));
}

#[test]
fn test_flatten_loaded_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        SCHEMA_FILE_NAME,
        r#"{
    "properties": {
        "group": {"type": "object", "properties": {"reads": {"type": "string"}}},
        "reads": {"type": "string"}
    }
}"#,
    );
    let raw = load_schema_value(&path).unwrap();
    let doc = SchemaDocument::from_value(raw).unwrap();
    assert!(matches!(
        flatten(&doc),
        Err(SchemaError::DuplicateParameter { .. })
    ));
}

#[test]
fn test_tool_config_from_pipeline_dir() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        ".pipeline-schema.yml",
        "builder_url: http://localhost:8080/build\nmax_polls: 3\n",
    );
    let config = ToolConfig::load_or_default(dir.path()).unwrap();
    assert_eq!(config.builder_url, "http://localhost:8080/build");
    assert_eq!(config.poll_schedule().max_polls, Some(3));

    write(dir.path(), ".pipeline-schema.yml", "max_polls: [\n");
    assert!(matches!(
        ToolConfig::load_or_default(dir.path()),
        Err(StoreError::Yaml(_))
    ));
}
