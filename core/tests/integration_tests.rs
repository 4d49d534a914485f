use std::sync::atomic::AtomicBool;
use std::time::Duration;

use pipeline_schema_core::*;
use serde_json::{Value, json};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn pipeline_schema() -> Value {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema",
        "$id": "https://raw.githubusercontent.com/nf-core/demo/master/nextflow_schema.json",
        "title": "nf-core/demo pipeline parameters",
        "description": "Demo",
        "type": "object",
        "properties": {
            "input_output_options": {
                "type": "object",
                "title": "Input/output options",
                "properties": {
                    "reads": {"type": "string", "default": "data/*{1,2}.fastq.gz"},
                    "outdir": {"type": "string", "default": "./results"},
                    "email": {"type": "string"}
                },
                "required": ["reads", "email"]
            },
            "max_cpus": {"type": "integer", "default": 16},
            "single_end": {"type": "boolean"},
            "legacy_flag": {"type": "string"}
        },
        "required": ["legacy_flag"]
    })
}

fn flat_config() -> &'static str {
    "params.reads = 'data/*{1,2}.fastq.gz'\n\
     params.outdir = './results'\n\
     params.max_cpus = 16\n\
     params.single_end = false\n\
     params.max_memory = '128.GB'\n\
     params.clip_r1 = 0\n\
     params.genomes.GRCh37.fasta = '/refs/GRCh37.fa'\n\
     manifest.name = 'nf-core/demo'\n\
     manifest.description = 'Demo pipeline'\n"
}

struct Finished {
    schema: Value,
    polled: usize,
}

impl BuilderTransport for Finished {
    fn submit(&mut self, _url: &str, _payload: &Value) -> Result<Value> {
        Ok(json!({"status": "received", "api_url": "api", "web_url": "web"}))
    }

    fn fetch(&mut self, _url: &str) -> Result<Value> {
        self.polled += 1;
        if self.polled < 3 {
            Ok(json!({"status": "waiting_for_user"}))
        } else {
            Ok(json!({"status": "web_builder_edited", "schema": self.schema}))
        }
    }
}

// ---------------------------------------------------------------------------
// Reconciliation against a pipeline config
// ---------------------------------------------------------------------------

#[test]
fn test_reconcile_existing_schema_with_pipeline_config() {
    let mut doc = validate_schema(&pipeline_schema()).unwrap();
    let runtime = RuntimeParams::parse_flat_config(flat_config());

    let report = reconcile(&mut doc, &runtime, &mut NonInteractive);

    assert_eq!(report.removed, vec!["email", "legacy_flag"]);
    assert_eq!(report.added, vec!["max_memory", "clip_r1"]);
    assert_eq!(runtime.skipped, vec!["params.genomes.GRCh37.fasta"]);

    // Group keeps its remaining required child; top-level required list is gone.
    let group = doc.properties["input_output_options"].as_group().unwrap();
    assert_eq!(group.required, vec!["reads"]);
    assert!(doc.required.is_empty());
    assert!(doc.to_value().get("required").is_none());

    let max_memory = doc.find_param("max_memory").unwrap();
    assert_eq!(max_memory.param_type, ParamType::String);
    assert_eq!(max_memory.default, Some(json!("128.GB")));
    let clip = doc.find_param("clip_r1").unwrap();
    assert_eq!(clip.param_type, ParamType::Integer);
    assert_eq!(clip.default, Some(json!(0)));

    // Metadata survives the edit.
    let value = doc.to_value();
    assert_eq!(value["title"], "nf-core/demo pipeline parameters");
    assert_eq!(
        value["properties"]["input_output_options"]["title"],
        "Input/output options"
    );
}

#[test]
fn test_skeleton_build_from_pipeline_config() {
    let runtime = RuntimeParams::parse_flat_config(flat_config());
    let mut doc = SchemaDocument::skeleton(
        runtime.manifest_value("name").unwrap(),
        runtime.manifest_value("description").unwrap(),
    );

    let report = reconcile(&mut doc, &runtime, &mut NonInteractive);
    assert!(report.removed.is_empty());
    assert_eq!(report.added.len(), 6);

    let single_end = doc.find_param("single_end").unwrap();
    assert_eq!(single_end.param_type, ParamType::Boolean);
    assert!(single_end.default.is_none());

    let linted = lint(&doc.to_value()).unwrap();
    assert_eq!(linted.flat.properties.len(), 6);
    assert_eq!(linted.document, doc);
}

// ---------------------------------------------------------------------------
// Validation round trip
// ---------------------------------------------------------------------------

#[test]
fn test_valid_schema_flattens_and_accepts_typed_params() {
    let doc = validate_schema(&pipeline_schema()).unwrap();
    let flat = flatten(&doc).unwrap();

    let params = json!({
        "reads": "x_{1,2}.fq",
        "outdir": "out",
        "email": "me@example.com",
        "max_cpus": 2,
        "single_end": true,
        "legacy_flag": "on"
    });
    assert!(validate_instance(&flat, params.as_object().unwrap()).is_ok());
}

#[test]
fn test_yaml_params_validate_against_flat_schema() {
    let doc = validate_schema(&pipeline_schema()).unwrap();
    let flat = flatten(&doc).unwrap();

    let params = parse_parameter_instance(
        "reads: 'x.fq'\nemail: me@example.com\nlegacy_flag: on_value\nmax_cpus: 4.5\n",
    )
    .unwrap();
    let err = validate_instance(&flat, &params).unwrap_err();
    assert!(matches!(err, SchemaError::InvalidParameters { .. }));
}

#[test]
fn test_saved_document_reloads_identically() {
    let doc = validate_schema(&pipeline_schema()).unwrap();
    let text = serde_json::to_string_pretty(&doc).unwrap();
    let reloaded = validate_schema(&serde_json::from_str(&text).unwrap()).unwrap();
    assert_eq!(reloaded, doc);
}

// ---------------------------------------------------------------------------
// Remote editing
// ---------------------------------------------------------------------------

#[test]
fn test_remote_edit_round_trip() {
    let doc = validate_schema(&pipeline_schema()).unwrap();
    let mut edited_raw = pipeline_schema();
    edited_raw["properties"]["max_cpus"]["description"] = json!("Maximum CPUs");

    let transport = Finished {
        schema: edited_raw.clone(),
        polled: 0,
    };
    let mut session =
        RemoteEditSession::create(transport, DEFAULT_BUILDER_URL, &doc, "1.0").unwrap();
    let edited = session
        .wait_for_edit(&PollSchedule::new(Duration::ZERO), &AtomicBool::new(false))
        .unwrap();

    assert_eq!(session.status(), EditStatus::WebBuilderEdited);
    assert_eq!(edited.raw, edited_raw);
    let new_doc = edited.validation.unwrap();
    assert_eq!(
        new_doc.find_param("max_cpus").unwrap().extra["description"],
        "Maximum CPUs"
    );
}
