//! Parameter schema model, reconciliation, and validation for data pipelines.
//!
//! This crate is the engine behind the `pipeline-schema` tool:
//!
//! - [`SchemaDocument`]: a grouped JSON-Schema-like parameter document made
//!   of [`ScalarProperty`] and [`GroupProperty`] entries.
//! - [`flatten`]: lifts group children into a single [`FlatNamespace`].
//! - [`reconcile`]: removes stale and adds newly discovered parameters,
//!   asking a [`ReconcilePolicy`] about each change.
//! - [`infer`]: derives a typed property from an untyped default string.
//! - [`validate_schema`], [`lint`], [`validate_instance`]: structural
//!   validation of documents and of user parameter sets.
//! - [`RemoteEditSession`]: the polling protocol of the web schema builder.
//!
//! Nothing in this crate touches the filesystem or the network; I/O lives in
//! `pipeline-schema-store` and the CLI.
//!
//! # Example
//!
//! ```
//! use pipeline_schema_core::*;
//!
//! let mut doc = SchemaDocument::skeleton("nf-core/demo", "Demo pipeline");
//! let runtime = RuntimeParams::parse_flat_config(
//!     "params.reads = 'data/*.fq'\nparams.max_cpus = 16\nparams.skip_qc = false\n",
//! );
//!
//! let report = reconcile(&mut doc, &runtime, &mut NonInteractive);
//! assert_eq!(report.added, vec!["reads", "max_cpus", "skip_qc"]);
//!
//! let linted = lint(&doc.to_value()).unwrap();
//! assert_eq!(linted.defaults.len(), 2);
//! ```

mod error;
mod flatten;
mod infer;
mod params;
mod reconcile;
mod remote;
mod types;
mod validate;

pub use error::{Result, SchemaError};
pub use flatten::{FlatNamespace, flatten};
pub use infer::infer;
pub use params::RuntimeParams;
pub use reconcile::{
    Interactive, NonInteractive, Prompter, ReconcilePolicy, ReconcileReport, add_missing_params,
    reconcile, remove_unknown_params,
};
pub use remote::{
    BuilderTransport, DEFAULT_BUILDER_URL, EditStatus, EditedSchema, PollSchedule, PollStatus,
    RemoteEditSession,
};
pub use types::*;
pub use validate::{LintReport, lint, parse_parameter_instance, validate_instance, validate_schema};
