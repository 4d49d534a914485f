//! Schema file persistence, parameter file loading, and tool configuration.
//!
//! This crate is the filesystem layer around `pipeline-schema-core`:
//!
//! - [`SchemaLocation`] resolves a pipeline directory or schema path.
//! - [`load_schema_value`] / [`save_schema`] read and atomically write
//!   schema documents with four-space indentation.
//! - [`load_parameter_file`] reads a JSON or YAML parameter set.
//! - [`ToolConfig`] holds builder and resolver settings from
//!   `.pipeline-schema.yml`.
//!
//! # Quick start
//!
//! ```no_run
//! use pipeline_schema_core::{flatten, validate_instance, validate_schema};
//! use pipeline_schema_store::{SchemaLocation, load_parameter_file, load_schema_value};
//!
//! let location = SchemaLocation::resolve("path/to/pipeline");
//! let doc = validate_schema(&load_schema_value(location.require_existing().unwrap()).unwrap()).unwrap();
//! let params = load_parameter_file("params.yml").unwrap();
//! validate_instance(&flatten(&doc).unwrap(), &params).unwrap();
//! ```

mod config;
mod error;
mod loader;

pub use config::{CONFIG_FILE_NAME, ToolConfig};
pub use error::{Result, StoreError};
pub use loader::{
    SchemaLocation, load_parameter_file, load_schema_value, save_schema, save_value,
};
