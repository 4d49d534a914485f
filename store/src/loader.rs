//! Schema and parameter file loading and saving.
//!
//! Schemas are read as raw JSON so callers can validate them before
//! committing to the typed model, and written atomically with a stable
//! four-space indentation for diff-friendly output.
//!
//! # Example
//!
//! ```no_run
//! use pipeline_schema_store::{SchemaLocation, load_schema_value, save_schema};
//! use pipeline_schema_core::validate_schema;
//!
//! let location = SchemaLocation::resolve("path/to/pipeline");
//! let raw = load_schema_value(location.schema_path()).unwrap();
//! let doc = validate_schema(&raw).unwrap();
//! save_schema(location.schema_path(), &doc).unwrap();
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use pipeline_schema_core::{SCHEMA_FILE_NAME, SchemaDocument, parse_parameter_instance};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{Result, StoreError};

/// Where a pipeline's schema lives.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use pipeline_schema_store::SchemaLocation;
///
/// let location = SchemaLocation::resolve("/does/not/exist");
/// assert_eq!(location.schema_path(), Path::new("/does/not/exist/nextflow_schema.json"));
/// assert!(!location.exists());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaLocation {
    pipeline_dir: PathBuf,
    schema_path: PathBuf,
}

impl SchemaLocation {
    /// Resolves a pipeline directory or a schema file path.
    ///
    /// An existing file is used as the schema itself and its parent becomes
    /// the pipeline directory. Anything else is treated as a pipeline
    /// directory holding `nextflow_schema.json`.
    pub fn resolve(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if path.is_file() {
            let pipeline_dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            };
            return Self {
                pipeline_dir,
                schema_path: path.to_path_buf(),
            };
        }
        Self {
            pipeline_dir: path.to_path_buf(),
            schema_path: path.join(SCHEMA_FILE_NAME),
        }
    }

    /// Directory of the pipeline.
    pub fn pipeline_dir(&self) -> &Path {
        &self.pipeline_dir
    }

    /// Path of the schema file.
    pub fn schema_path(&self) -> &Path {
        &self.schema_path
    }

    /// Returns `true` if the schema file exists.
    pub fn exists(&self) -> bool {
        self.schema_path.is_file()
    }

    /// Fails with [`StoreError::MissingSchema`] unless the file exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingSchema`] with the resolved path.
    pub fn require_existing(&self) -> Result<&Path> {
        if self.exists() {
            Ok(&self.schema_path)
        } else {
            Err(StoreError::MissingSchema(self.schema_path.clone()))
        }
    }

    /// Name used for a new schema when the manifest does not provide one.
    pub fn fallback_name(&self) -> String {
        self.pipeline_dir
            .canonicalize()
            .ok()
            .as_deref()
            .and_then(Path::file_name)
            .or_else(|| self.pipeline_dir.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "pipeline".to_string())
    }
}

/// Reads a schema file as raw JSON.
///
/// # Errors
///
/// Returns [`StoreError::Io`] if the file cannot be read and
/// [`StoreError::Json`] if it is not JSON.
pub fn load_schema_value(path: impl AsRef<Path>) -> Result<Value> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|err| StoreError::io(path, err))?;
    let value = serde_json::from_str(&text).map_err(|err| StoreError::json(path, err))?;
    debug!("JSON file loaded: {}", path.display());
    Ok(value)
}

/// Writes a schema with four-space indentation.
///
/// The document is written to a temporary file next to `path` and renamed
/// over it, so readers never observe a partially written schema.
///
/// # Errors
///
/// Returns [`StoreError::Io`] or [`StoreError::Json`] on failure.
pub fn save_schema(path: impl AsRef<Path>, doc: &SchemaDocument) -> Result<()> {
    let path = path.as_ref();
    info!(
        "Writing schema with {} params: {}",
        doc.param_count(),
        path.display()
    );
    write_json_atomic(path, doc)
}

/// Writes any raw JSON value the same way as [`save_schema`].
///
/// Used to keep documents that failed validation for manual inspection.
///
/// # Errors
///
/// Returns [`StoreError::Io`] or [`StoreError::Json`] on failure.
pub fn save_value(path: impl AsRef<Path>, value: &Value) -> Result<()> {
    write_json_atomic(path.as_ref(), value)
}

/// Loads a parameter file, accepting JSON or YAML.
///
/// # Errors
///
/// Returns [`StoreError::Io`] if the file cannot be read and
/// [`StoreError::Schema`] wrapping
/// [`ParameterFileParse`](pipeline_schema_core::SchemaError::ParameterFileParse)
/// if neither format parses.
pub fn load_parameter_file(path: impl AsRef<Path>) -> Result<Map<String, Value>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|err| StoreError::io(path, err))?;
    let params = parse_parameter_instance(&text)?;
    debug!("Loaded input params: {}", path.display());
    Ok(params)
}

fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut serializer)
        .map_err(|err| StoreError::json(path, err))?;
    buf.push(b'\n');

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|err| StoreError::io(dir, err))?;
    if let Ok(meta) = std::fs::metadata(path) {
        tmp.as_file()
            .set_permissions(meta.permissions())
            .map_err(|err| StoreError::io(tmp.path(), err))?;
    }
    tmp.write_all(&buf)
        .map_err(|err| StoreError::io(tmp.path(), err))?;
    tmp.persist(path)
        .map_err(|err| StoreError::io(path, err.error))?;
    Ok(())
}
