//! Reconciliation of a schema against runtime parameter defaults.
//!
//! [`reconcile`] removes schema parameters the pipeline no longer defines
//! and adds pipeline parameters the schema does not describe yet. Whether a
//! single change is applied is decided by a [`ReconcilePolicy`], which keeps
//! the algorithm independent of any prompting surface.
//!
//! # Example
//!
//! ```
//! use pipeline_schema_core::*;
//!
//! let mut doc = SchemaDocument::new();
//! doc.insert("stale", ScalarProperty::new(ParamType::String));
//!
//! let runtime = RuntimeParams::from_config([("params.max_cpus", "16")]);
//! let report = reconcile(&mut doc, &runtime, &mut NonInteractive);
//!
//! assert_eq!(report.removed, vec!["stale"]);
//! assert_eq!(report.added, vec!["max_cpus"]);
//! assert_eq!(doc.find_param("max_cpus").unwrap().param_type, ParamType::Integer);
//! ```

use tracing::{debug, info};

use crate::{PropertyNode, RuntimeParams, SchemaDocument, infer};

/// Decides whether an individual reconciliation change is applied.
pub trait ReconcilePolicy {
    /// Called for a schema parameter missing from the runtime params.
    fn should_remove(&mut self, key: &str) -> bool;

    /// Called for a runtime param missing from the schema.
    fn should_add(&mut self, key: &str) -> bool;
}

/// Applies every change without asking.
///
/// Used for freshly synthesized skeleton documents, where there is nothing a
/// human could meaningfully confirm.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonInteractive;

impl ReconcilePolicy for NonInteractive {
    fn should_remove(&mut self, _key: &str) -> bool {
        true
    }

    fn should_add(&mut self, _key: &str) -> bool {
        true
    }
}

/// A yes/no question asked to a human.
pub trait Prompter {
    /// Asks `question`; `default` is the answer on empty input.
    fn confirm(&mut self, question: &str, default: bool) -> bool;
}

/// Asks a [`Prompter`] about every change.
///
/// In auto-accept mode every question is answered affirmatively without
/// reaching the prompter.
#[derive(Debug)]
pub struct Interactive<P> {
    prompter: P,
    auto_accept: bool,
}

impl<P: Prompter> Interactive<P> {
    /// Creates a policy that asks `prompter` about each change.
    pub fn new(prompter: P) -> Self {
        Self {
            prompter,
            auto_accept: false,
        }
    }

    /// Answers yes to every question when `auto_accept` is set.
    pub fn auto_accept(mut self, auto_accept: bool) -> Self {
        self.auto_accept = auto_accept;
        self
    }

    /// Returns the wrapped prompter.
    pub fn into_inner(self) -> P {
        self.prompter
    }
}

impl<P: Prompter> ReconcilePolicy for Interactive<P> {
    fn should_remove(&mut self, key: &str) -> bool {
        self.auto_accept
            || self.prompter.confirm(
                &format!(
                    "Unrecognised 'params.{key}' found in schema but not pipeline. Remove it?"
                ),
                true,
            )
    }

    fn should_add(&mut self, key: &str) -> bool {
        self.auto_accept
            || self.prompter.confirm(
                &format!("Found 'params.{key}' in pipeline but not in schema. Add to schema?"),
                true,
            )
    }
}

impl<T: ReconcilePolicy + ?Sized> ReconcilePolicy for &mut T {
    fn should_remove(&mut self, key: &str) -> bool {
        (**self).should_remove(key)
    }

    fn should_add(&mut self, key: &str) -> bool {
        (**self).should_add(key)
    }
}

/// Keys changed by a reconciliation run, in the order they were processed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Parameters deleted from the schema.
    pub removed: Vec<String>,
    /// Parameters added to the schema.
    pub added: Vec<String>,
}

impl ReconcileReport {
    /// Returns `true` when the document was not changed.
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

/// Synchronizes `doc` with `runtime`, removals first.
///
/// Running removals first guarantees a key removed in this run is never
/// re-added by the same run.
pub fn reconcile<P: ReconcilePolicy>(
    doc: &mut SchemaDocument,
    runtime: &RuntimeParams,
    policy: &mut P,
) -> ReconcileReport {
    let removed = remove_unknown_params(doc, runtime, policy);
    let added = add_missing_params(doc, runtime, policy);

    if !removed.is_empty() {
        info!(
            "Removed {} params from existing schema that were not found in the pipeline config: {}",
            removed.len(),
            removed.join(", ")
        );
    }
    if !added.is_empty() {
        info!(
            "Added {} params to schema that were found in the pipeline config: {}",
            added.len(),
            added.join(", ")
        );
    }

    ReconcileReport { removed, added }
}

/// Removal pass: drops schema params the pipeline no longer defines.
///
/// Groups are only one level deep. Emptied groups stay in place; emptied
/// `required` lists disappear on serialization.
pub fn remove_unknown_params<P: ReconcilePolicy>(
    doc: &mut SchemaDocument,
    runtime: &RuntimeParams,
    policy: &mut P,
) -> Vec<String> {
    let mut removed = Vec::new();
    let top_keys: Vec<String> = doc.properties.keys().cloned().collect();

    for key in top_keys {
        let is_group = matches!(doc.properties.get(&key), Some(PropertyNode::Group(_)));
        if is_group {
            let Some(PropertyNode::Group(group)) = doc.properties.get_mut(&key) else {
                continue;
            };
            let child_keys: Vec<String> = group.properties.keys().cloned().collect();
            for child in child_keys {
                if runtime.contains(&child) || !policy.should_remove(&child) {
                    continue;
                }
                group.properties.shift_remove(&child);
                group.required.retain(|k| k != &child);
                debug!("Removing '{child}' from schema group '{key}'");
                removed.push(child);
            }
        } else {
            if runtime.contains(&key) || !policy.should_remove(&key) {
                continue;
            }
            doc.properties.shift_remove(&key);
            doc.required.retain(|k| k != &key);
            debug!("Removing '{key}' from schema");
            removed.push(key);
        }
    }

    removed
}

/// Addition pass: inserts runtime params the schema does not describe as
/// new top-level parameters.
pub fn add_missing_params<P: ReconcilePolicy>(
    doc: &mut SchemaDocument,
    runtime: &RuntimeParams,
    policy: &mut P,
) -> Vec<String> {
    let mut added = Vec::new();

    for (key, value) in &runtime.params {
        if doc.contains_param(key) || !policy.should_add(key) {
            continue;
        }
        doc.insert(key, infer(value));
        debug!("Adding '{key}' to schema");
        added.push(key.clone());
    }

    added
}
