//! Runtime configuration resolution through an external command.
//!
//! The pipeline runtime owns the real parameter defaults. The configured
//! resolver command (by default `nextflow config -flat`) is run with the
//! pipeline directory as its last argument and its `key = value` output is
//! parsed into [`RuntimeParams`].

use std::path::Path;
use std::process::Command;

use pipeline_schema_core::RuntimeParams;
use tracing::debug;

/// Runs a configuration dump command for a pipeline.
#[derive(Debug, Clone)]
pub struct CommandResolver {
    argv: Vec<String>,
}

impl CommandResolver {
    /// Creates a resolver for the given command line.
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }

    /// Runs the command for `pipeline_dir` and parses its output.
    pub fn resolve(&self, pipeline_dir: &Path) -> Result<RuntimeParams, String> {
        let Some((program, args)) = self.argv.split_first() else {
            return Err("no configuration resolver command configured".to_string());
        };
        debug!("Collecting pipeline parameter defaults with '{}'", self.argv.join(" "));

        let output = Command::new(program)
            .args(args)
            .arg(pipeline_dir)
            .output()
            .map_err(|err| format!("Failed to run '{program}': {err}"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!(
                "'{}' failed with {}: {}",
                self.argv.join(" "),
                output.status,
                stderr.trim()
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let runtime = RuntimeParams::parse_flat_config(&stdout);
        debug!(
            params = runtime.params.len(),
            manifest = runtime.manifest.len(),
            "pipeline config resolved"
        );
        Ok(runtime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_parses_command_output() {
        let resolver = CommandResolver::new(vec![
            "sh".to_string(),
            "-c".to_string(),
            "printf \"params.outdir = './results'\\nmanifest.name = 'demo'\\n\"".to_string(),
        ]);
        let runtime = resolver.resolve(Path::new(".")).unwrap();
        assert_eq!(runtime.params["outdir"], "'./results'");
        assert_eq!(runtime.manifest_value("name"), Some("demo"));
    }

    #[test]
    fn test_resolve_reports_failure() {
        let resolver = CommandResolver::new(vec![
            "sh".to_string(),
            "-c".to_string(),
            "echo broken >&2; exit 3".to_string(),
        ]);
        let err = resolver.resolve(Path::new(".")).unwrap_err();
        assert!(err.contains("broken"), "error: {err}");
    }

    #[test]
    fn test_resolve_without_command() {
        assert!(CommandResolver::new(Vec::new()).resolve(Path::new(".")).is_err());
    }
}
