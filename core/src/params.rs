//! Runtime parameter defaults reported by the pipeline configuration.
//!
//! The configuration resolver prints every resolved setting as a flat
//! `key = value` line. [`RuntimeParams`] keeps the `params.*` entries the
//! schema can describe and the `manifest.*` entries used as document
//! metadata.

use indexmap::IndexMap;
use tracing::debug;

const PARAMS_PREFIX: &str = "params.";
const MANIFEST_PREFIX: &str = "manifest.";

/// Parameter defaults and manifest metadata of a pipeline.
///
/// # Examples
///
/// ```
/// use pipeline_schema_core::RuntimeParams;
///
/// let runtime = RuntimeParams::parse_flat_config(
///     "params.outdir = './results'\nparams.genomes.GRCh37.fasta = 'x'\nmanifest.name = 'nf-core/demo'\n",
/// );
/// assert_eq!(runtime.params["outdir"], "'./results'");
/// assert_eq!(runtime.skipped, vec!["params.genomes.GRCh37.fasta"]);
/// assert_eq!(runtime.manifest_value("name"), Some("nf-core/demo"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeParams {
    /// Single-segment parameter names and their raw values.
    pub params: IndexMap<String, String>,
    /// Manifest entries without the `manifest.` prefix.
    pub manifest: IndexMap<String, String>,
    /// Fully qualified `params.*` keys skipped because they are nested.
    pub skipped: Vec<String>,
}

impl RuntimeParams {
    /// Builds the map from fully qualified configuration entries.
    ///
    /// Keys under `params.` with more than one further segment denote
    /// structured values the schema cannot represent; they are recorded in
    /// [`skipped`](Self::skipped) and otherwise ignored.
    pub fn from_config<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut runtime = Self::default();
        for (key, value) in entries {
            let key = key.as_ref();
            if let Some(name) = key.strip_prefix(PARAMS_PREFIX) {
                if name.contains('.') {
                    runtime.skipped.push(key.to_string());
                    continue;
                }
                runtime.params.insert(name.to_string(), value.into());
            } else if let Some(name) = key.strip_prefix(MANIFEST_PREFIX) {
                runtime.manifest.insert(name.to_string(), value.into());
            }
        }

        if !runtime.skipped.is_empty() {
            debug!(
                skipped = %runtime.skipped.join(", "),
                "skipped pipeline params with nested values"
            );
        }
        runtime
    }

    /// Parses `key = value` lines as printed by a flat configuration dump.
    ///
    /// Lines without a ` = ` separator are ignored.
    pub fn parse_flat_config(text: &str) -> Self {
        Self::from_config(text.lines().filter_map(|line| {
            line.split_once(" = ")
                .map(|(key, value)| (key.trim(), value.trim()))
        }))
    }

    /// Returns a manifest entry with surrounding quotes removed.
    pub fn manifest_value(&self, key: &str) -> Option<&str> {
        self.manifest
            .get(key)
            .map(|v| v.trim_matches(|c| c == '\'' || c == '"'))
    }

    /// Returns `true` if the pipeline defines `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Returns `true` when neither params nor manifest entries are known.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty() && self.manifest.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_splits_namespaces() {
        let runtime = RuntimeParams::from_config([
            ("params.reads", "data/*.fq"),
            ("params.max_cpus", "16"),
            ("manifest.description", "'Demo'"),
            ("process.cpus", "2"),
        ]);
        assert_eq!(
            runtime.params.keys().collect::<Vec<_>>(),
            vec!["reads", "max_cpus"]
        );
        assert_eq!(runtime.manifest_value("description"), Some("Demo"));
        assert!(!runtime.contains("cpus"));
    }

    #[test]
    fn test_from_config_skips_nested_params() {
        let runtime = RuntimeParams::from_config([
            ("params.genomes.GRCh37.fasta", "/ref/fa"),
            ("params.outdir", "./results"),
        ]);
        assert_eq!(runtime.skipped, vec!["params.genomes.GRCh37.fasta"]);
        assert!(runtime.contains("outdir"));
        assert!(!runtime.contains("genomes"));
    }

    #[test]
    fn test_parse_flat_config_ignores_noise() {
        let text = "N E X T F L O W ~ version 20.01.0\n\
                    params.outdir = './results'\n\
                    params.email = false\n\
                    params.expr = a = b\n";
        let runtime = RuntimeParams::parse_flat_config(text);
        assert_eq!(runtime.params["outdir"], "'./results'");
        assert_eq!(runtime.params["email"], "false");
        assert_eq!(runtime.params["expr"], "a = b");
        assert_eq!(runtime.params.len(), 3);
    }

    #[test]
    fn test_empty_runtime() {
        assert!(RuntimeParams::parse_flat_config("").is_empty());
    }
}
