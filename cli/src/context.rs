//! State carried through one `build` run.
//!
//! [`BuildContext`] owns everything the stages share: where the schema
//! lives, the tool configuration, the resolved runtime parameters and the
//! working document. Stages run in order: load or create, lint, sync with
//! the pipeline, save, remote edit.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use pipeline_schema_core::{
    BuilderTransport, NonInteractive, ReconcilePolicy, ReconcileReport, RemoteEditSession,
    RuntimeParams, SchemaDocument, SchemaError, lint, reconcile,
};
use pipeline_schema_store::{
    SchemaLocation, ToolConfig, load_schema_value, save_schema, save_value,
};
use tracing::{debug, error, info, warn};

use crate::resolver::CommandResolver;

pub struct BuildContext {
    location: SchemaLocation,
    config: ToolConfig,
    resolver: CommandResolver,
    runtime: Option<RuntimeParams>,
    document: Option<SchemaDocument>,
    from_scratch: bool,
}

impl BuildContext {
    pub fn new(location: SchemaLocation, config: ToolConfig) -> Self {
        let resolver = CommandResolver::new(config.resolver.clone());
        Self {
            location,
            config,
            resolver,
            runtime: None,
            document: None,
            from_scratch: false,
        }
    }

    /// Resolves `path` and loads the tool configuration from the pipeline
    /// directory. `builder_url` overrides the configured builder.
    pub fn open(path: &Path, builder_url: Option<String>) -> Result<Self, String> {
        let location = SchemaLocation::resolve(path);
        let mut config =
            ToolConfig::load_or_default(location.pipeline_dir()).map_err(|e| e.to_string())?;
        if let Some(url) = builder_url {
            config.builder_url = url;
        }
        Ok(Self::new(location, config))
    }

    pub fn location(&self) -> &SchemaLocation {
        &self.location
    }

    /// `true` once this run generated the schema from the skeleton.
    pub fn from_scratch(&self) -> bool {
        self.from_scratch
    }

    pub fn document(&self) -> Option<&SchemaDocument> {
        self.document.as_ref()
    }

    /// Runtime parameters, resolved on first use.
    pub fn runtime_params(&mut self) -> Result<&RuntimeParams, String> {
        if self.runtime.is_none() {
            let runtime = self.resolver.resolve(self.location.pipeline_dir())?;
            self.runtime = Some(runtime);
        }
        self.runtime
            .as_ref()
            .ok_or_else(|| "pipeline parameters were not resolved".to_string())
    }

    /// Builds a new schema from the skeleton, fills it with every pipeline
    /// parameter and saves it.
    pub fn create_skeleton(&mut self) -> Result<(), String> {
        let fallback = self.location.fallback_name();
        let runtime = self.runtime_params()?;
        let name = runtime.manifest_value("name").unwrap_or(&fallback).to_string();
        let description = runtime.manifest_value("description").unwrap_or_default().to_string();

        let mut doc = SchemaDocument::skeleton(&name, &description);
        if let Some(runtime) = self.runtime.as_ref() {
            reconcile(&mut doc, runtime, &mut NonInteractive);
        }
        self.document = Some(doc);
        self.from_scratch = true;
        self.save()
    }

    /// Loads the schema from disk and lints it, keeping the typed document.
    pub fn lint_schema(&mut self) -> Result<(), String> {
        let path = self.location.require_existing().map_err(|e| e.to_string())?;
        let raw = load_schema_value(path).map_err(|e| e.to_string())?;
        let report = lint(&raw).map_err(|err| {
            error!("Schema is invalid: {err}");
            format!(
                "{}: {err}\nPlease fix or delete this file, then try again.",
                path.display()
            )
        })?;
        info!(
            "Schema lint passed: {} params, {} with defaults",
            report.flat.properties.len(),
            report.defaults.len()
        );
        debug!(
            "Flattened params: {}",
            report.flat.keys().collect::<Vec<_>>().join(", ")
        );
        self.document = Some(report.document);
        Ok(())
    }

    /// Reconciles the loaded document with the pipeline parameters.
    pub fn sync_with_pipeline<P: ReconcilePolicy>(
        &mut self,
        mut policy: P,
    ) -> Result<ReconcileReport, String> {
        self.runtime_params()?;
        let (Some(runtime), Some(doc)) = (self.runtime.as_ref(), self.document.as_mut()) else {
            return Err("schema has not been loaded".to_string());
        };
        let report = reconcile(doc, runtime, &mut policy);
        if report.is_empty() {
            info!("Schema already matches the pipeline parameters");
        }
        Ok(report)
    }

    /// Writes the working document over the schema file.
    pub fn save(&self) -> Result<(), String> {
        let doc = self
            .document
            .as_ref()
            .ok_or_else(|| "schema has not been loaded".to_string())?;
        save_schema(self.location.schema_path(), doc).map_err(|e| e.to_string())
    }

    /// Sends the document to the web builder, waits for the user to finish
    /// and saves the result.
    ///
    /// An edited document that fails validation is written beside the
    /// schema with a `.remote.json` suffix and the schema is left as is.
    pub fn launch_web_builder<T: BuilderTransport>(
        &mut self,
        transport: T,
        version: &str,
        cancel: &AtomicBool,
    ) -> Result<(), String> {
        let doc = self
            .document
            .as_ref()
            .ok_or_else(|| "schema has not been loaded".to_string())?;
        let mut session = RemoteEditSession::create(transport, &self.config.builder_url, doc, version)
            .map_err(|err| format!("Could not start the web builder session: {err}"))?;

        println!("Edit the schema in your browser: {}", session.web_url());
        debug!("Polling {} for the edited schema", session.api_url());
        info!("Waiting for form to be completed in the browser. Remember to click Finished when you're done.");

        let edited = match session.wait_for_edit(&self.config.poll_schedule(), cancel) {
            Ok(edited) => edited,
            Err(err) => return Err(self.manual_copy_hint(session.web_url(), &err)),
        };

        match edited.validation {
            Ok(doc) => {
                self.document = Some(doc);
                self.save()
            }
            Err(err) => {
                let aside = remote_copy_path(self.location.schema_path());
                save_value(&aside, &edited.raw).map_err(|e| e.to_string())?;
                warn!("Edited schema saved for inspection: {}", aside.display());
                Err(format!(
                    "Response from schema builder did not pass validation: {err}\nThe edited schema was written to {}",
                    aside.display()
                ))
            }
        }
    }

    fn manual_copy_hint(&self, web_url: &str, err: &SchemaError) -> String {
        format!(
            "{err}\nIf you saved the schema in the builder, copy it from {web_url} into {}",
            self.location.schema_path().display()
        )
    }
}

fn remote_copy_path(schema_path: &Path) -> PathBuf {
    let mut name = OsString::from(schema_path.as_os_str());
    name.push(".remote.json");
    PathBuf::from(name)
}
