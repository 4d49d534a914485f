//! Tool configuration for schema building.
//!
//! An optional YAML file in the pipeline directory tunes how the schema is
//! built: where the web builder lives, how it is polled, and which command
//! prints the pipeline configuration.
//!
//! # Example YAML
//!
//! ```yaml
//! builder_url: https://nf-co.re/json_schema_build
//! poll_interval_secs: 2
//! max_polls: 900
//! resolver: [nextflow, config, -flat]
//! ```

use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use pipeline_schema_core::{DEFAULT_BUILDER_URL, PollSchedule};
use serde::Deserialize;
use tracing::debug;

use crate::error::{Result, StoreError};

/// File name of the tool configuration inside a pipeline directory.
pub const CONFIG_FILE_NAME: &str = ".pipeline-schema.yml";

/// Settings for building and editing a schema.
///
/// Every field has a default, so a partial file is valid.
///
/// # Examples
///
/// ```
/// # use pipeline_schema_store::ToolConfig;
/// let config: ToolConfig = serde_yaml::from_str("poll_interval_secs: 5\n").unwrap();
/// assert_eq!(config.poll_interval_secs, 5);
/// assert_eq!(config.resolver, vec!["nextflow", "config", "-flat"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Address of the web schema builder.
    pub builder_url: String,
    /// Seconds between polls of the builder.
    pub poll_interval_secs: u64,
    /// Maximum number of polls before giving up; unbounded when absent.
    pub max_polls: Option<u32>,
    /// Command printing the flat pipeline configuration. The pipeline
    /// directory is appended as the last argument.
    pub resolver: Vec<String>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            builder_url: DEFAULT_BUILDER_URL.to_string(),
            poll_interval_secs: 2,
            max_polls: None,
            resolver: vec![
                "nextflow".to_string(),
                "config".to_string(),
                "-flat".to_string(),
            ],
        }
    }
}

impl ToolConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::StoreError::Io) if the file cannot be read, or
    /// [`Yaml`](crate::StoreError::Yaml) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|err| StoreError::io(path, err))?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Loads `<pipeline_dir>/.pipeline-schema.yml`, or the defaults when the
    /// file does not exist.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load) for an existing file.
    pub fn load_or_default(pipeline_dir: impl AsRef<Path>) -> Result<Self> {
        let path = pipeline_dir.as_ref().join(CONFIG_FILE_NAME);
        if !path.is_file() {
            debug!("No tool config at '{}', using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    /// Poll pacing derived from this configuration.
    pub fn poll_schedule(&self) -> PollSchedule {
        let schedule = PollSchedule::new(Duration::from_secs(self.poll_interval_secs));
        match self.max_polls {
            Some(max) => schedule.with_max_polls(max),
            None => schedule,
        }
    }
}
