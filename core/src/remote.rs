//! Remote schema builder session.
//!
//! A schema can be handed to a web-based builder for editing. The exchange
//! is a fixed protocol: the document is submitted once, the builder answers
//! with an address for the human (`web_url`) and an address to poll
//! (`api_url`), and polling continues until the builder reports that the
//! user finished editing or that something went wrong.
//!
//! ```text
//! created ──► waiting_for_user ──► web_builder_edited
//!                  ▲      │
//!                  └──────┴──────► error
//! ```
//!
//! Network access goes through a [`BuilderTransport`] so the state machine
//! runs unchanged against an HTTP client or a scripted test double.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde_json::{Value, json};
use tracing::{debug, info};

use crate::error::{Result, SchemaError};
use crate::{SchemaDocument, validate_schema};

/// Default address of the web schema builder.
pub const DEFAULT_BUILDER_URL: &str = "https://nf-co.re/json_schema_build";

/// Status the builder must return when it accepts a submission.
const STATUS_RECEIVED: &str = "received";

/// Spelling of [`STATUS_RECEIVED`] used by deployed builders.
const STATUS_RECEIVED_LEGACY: &str = "recieved";

/// Request/response channel to the remote builder.
pub trait BuilderTransport {
    /// Posts `payload` to `url` and returns the decoded JSON response.
    fn submit(&mut self, url: &str, payload: &Value) -> Result<Value>;

    /// Queries `url` and returns the decoded JSON response.
    fn fetch(&mut self, url: &str) -> Result<Value>;
}

impl<T: BuilderTransport + ?Sized> BuilderTransport for &mut T {
    fn submit(&mut self, url: &str, payload: &Value) -> Result<Value> {
        (**self).submit(url, payload)
    }

    fn fetch(&mut self, url: &str) -> Result<Value> {
        (**self).fetch(url)
    }
}

/// Session status as reported by the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditStatus {
    /// Submitted, not polled yet.
    Created,
    /// The user is still editing.
    WaitingForUser,
    /// The user finished; an edited document is available.
    WebBuilderEdited,
    /// The builder reported a failure.
    Error,
}

/// The document returned by the builder.
///
/// The raw document is always kept, even when it fails validation, so the
/// user can inspect and repair it.
#[derive(Debug, Clone)]
pub struct EditedSchema {
    /// Document exactly as returned by the builder.
    pub raw: Value,
    /// Result of validating [`raw`](Self::raw).
    pub validation: Result<SchemaDocument>,
}

/// Result of a single poll.
#[derive(Debug, Clone)]
pub enum PollStatus {
    /// The user is still editing.
    Waiting,
    /// Editing finished.
    Edited(EditedSchema),
}

/// Pacing of the blocking poll loop.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use pipeline_schema_core::PollSchedule;
///
/// let schedule = PollSchedule::new(Duration::from_secs(2)).with_max_polls(150);
/// assert_eq!(schedule.max_polls, Some(150));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    /// Delay between polls.
    pub interval: Duration,
    /// Upper bound on polls; `None` polls until cancelled.
    pub max_polls: Option<u32>,
}

impl PollSchedule {
    /// Creates an unbounded schedule with the given interval.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_polls: None,
        }
    }

    /// Bounds the number of polls.
    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = Some(max_polls);
        self
    }
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

/// An open editing session with the remote builder.
#[derive(Debug)]
pub struct RemoteEditSession<T> {
    transport: T,
    web_url: String,
    api_url: String,
    status: EditStatus,
}

impl<T: BuilderTransport> RemoteEditSession<T> {
    /// Submits `doc` to the builder at `builder_url` and opens a session.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::Protocol`] if the response lacks `api_url` or
    /// `web_url` or does not acknowledge the submission. Such responses are
    /// never retried. Transport failures are passed through.
    pub fn create(
        mut transport: T,
        builder_url: &str,
        doc: &SchemaDocument,
        version: &str,
    ) -> Result<Self> {
        let schema = serde_json::to_string(doc).map_err(|err| {
            SchemaError::Transport(format!("failed to serialize schema: {err}"))
        })?;
        let payload = json!({
            "post_content": "json_schema",
            "api": "true",
            "version": version,
            "status": "waiting_for_user",
            "schema": schema,
        });

        let response = transport.submit(builder_url, &payload)?;
        let field = |name: &str| response.get(name).and_then(Value::as_str);

        let acknowledged = matches!(
            field("status"),
            Some(STATUS_RECEIVED) | Some(STATUS_RECEIVED_LEGACY)
        );
        let (Some(api_url), Some(web_url), true) = (field("api_url"), field("web_url"), acknowledged)
        else {
            debug!("Response content:\n{response:#}");
            return Err(SchemaError::protocol(format!(
                "unexpected response from {builder_url}"
            )));
        };

        info!("Schema builder session opened: {web_url}");
        Ok(Self {
            web_url: web_url.to_string(),
            api_url: api_url.to_string(),
            transport,
            status: EditStatus::Created,
        })
    }

    /// Address the user should open to edit the schema.
    pub fn web_url(&self) -> &str {
        &self.web_url
    }

    /// Address polled for the result.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Last status observed.
    pub fn status(&self) -> EditStatus {
        self.status
    }

    /// Queries the builder once.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::RemoteEdit`] with the builder's message when it
    /// reports `error`, and [`SchemaError::Protocol`] for an unknown status or
    /// a finished session without a schema.
    pub fn poll(&mut self) -> Result<PollStatus> {
        let response = self.transport.fetch(&self.api_url)?;
        match response.get("status").and_then(Value::as_str) {
            Some("waiting_for_user") => {
                self.status = EditStatus::WaitingForUser;
                Ok(PollStatus::Waiting)
            }
            Some("error") => {
                self.status = EditStatus::Error;
                let message = response
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("no message")
                    .to_string();
                Err(SchemaError::RemoteEdit { message })
            }
            Some("web_builder_edited") => {
                let raw = extract_schema(&response)?;
                self.status = EditStatus::WebBuilderEdited;
                info!("Found saved status from schema builder");
                let validation = validate_schema(&raw);
                Ok(PollStatus::Edited(EditedSchema { raw, validation }))
            }
            other => {
                debug!("Response content:\n{response:#}");
                Err(SchemaError::protocol(format!(
                    "unexpected status {} from {}",
                    other.unwrap_or("<missing>"),
                    self.api_url
                )))
            }
        }
    }

    /// Polls until the session reaches a terminal state, sleeping the
    /// calling thread for `schedule.interval` between polls.
    ///
    /// # Errors
    ///
    /// Propagates [`poll`](Self::poll) errors, returns
    /// [`SchemaError::Cancelled`] once `cancel` is set, and
    /// [`SchemaError::RemoteTimeout`] when the poll budget is exhausted.
    pub fn wait_for_edit(
        &mut self,
        schedule: &PollSchedule,
        cancel: &AtomicBool,
    ) -> Result<EditedSchema> {
        let mut polls: u32 = 0;
        loop {
            if cancel.load(Ordering::Relaxed) {
                return Err(SchemaError::Cancelled);
            }
            if schedule.max_polls.is_some_and(|max| polls >= max) {
                return Err(SchemaError::RemoteTimeout { polls });
            }
            if polls > 0 && !schedule.interval.is_zero() {
                std::thread::sleep(schedule.interval);
            }

            polls += 1;
            match self.poll()? {
                PollStatus::Edited(edited) => return Ok(edited),
                PollStatus::Waiting => debug!(polls, "schema builder waiting for user"),
            }
        }
    }
}

/// Pulls the edited schema out of a finished response. Builders return it
/// either as an object or as a JSON-encoded string.
fn extract_schema(response: &Value) -> Result<Value> {
    match response.get("schema") {
        Some(Value::String(encoded)) => serde_json::from_str(encoded).map_err(|err| {
            SchemaError::protocol(format!("edited schema is not valid JSON: {err}"))
        }),
        Some(schema) => Ok(schema.clone()),
        None => Err(SchemaError::protocol(
            "finished session did not include a schema",
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::{ParamType, ScalarProperty};

    #[derive(Default)]
    struct Scripted {
        submit_response: Option<Value>,
        poll_responses: VecDeque<Value>,
        submitted: Vec<(String, Value)>,
        fetched: Vec<String>,
    }

    impl BuilderTransport for Scripted {
        fn submit(&mut self, url: &str, payload: &Value) -> Result<Value> {
            self.submitted.push((url.to_string(), payload.clone()));
            self.submit_response
                .clone()
                .ok_or_else(|| SchemaError::Transport("no response".to_string()))
        }

        fn fetch(&mut self, url: &str) -> Result<Value> {
            self.fetched.push(url.to_string());
            self.poll_responses
                .pop_front()
                .ok_or_else(|| SchemaError::Transport("no more responses".to_string()))
        }
    }

    fn accepted() -> Value {
        json!({
            "status": "received",
            "api_url": "https://builder.test/api/1",
            "web_url": "https://builder.test/edit/1"
        })
    }

    fn sample_doc() -> SchemaDocument {
        let mut doc = SchemaDocument::skeleton("demo", "Demo");
        doc.insert("outdir", ScalarProperty::new(ParamType::String));
        doc
    }

    fn open(polls: Vec<Value>) -> RemoteEditSession<Scripted> {
        let transport = Scripted {
            submit_response: Some(accepted()),
            poll_responses: polls.into(),
            ..Default::default()
        };
        RemoteEditSession::create(transport, DEFAULT_BUILDER_URL, &sample_doc(), "1.0").unwrap()
    }

    #[test]
    fn test_create_submits_serialized_schema() {
        let session = open(Vec::new());
        assert_eq!(session.web_url(), "https://builder.test/edit/1");
        assert_eq!(session.api_url(), "https://builder.test/api/1");
        assert_eq!(session.status(), EditStatus::Created);

        let (url, payload) = &session.transport.submitted[0];
        assert_eq!(url, DEFAULT_BUILDER_URL);
        assert_eq!(payload["post_content"], "json_schema");
        assert_eq!(payload["status"], "waiting_for_user");
        assert_eq!(payload["version"], "1.0");
        let schema: Value = serde_json::from_str(payload["schema"].as_str().unwrap()).unwrap();
        assert_eq!(schema["properties"]["outdir"]["type"], "string");
    }

    #[test]
    fn test_create_accepts_legacy_spelling() {
        let mut response = accepted();
        response["status"] = json!("recieved");
        let transport = Scripted {
            submit_response: Some(response),
            ..Default::default()
        };
        assert!(RemoteEditSession::create(transport, "u", &sample_doc(), "1.0").is_ok());
    }

    #[test]
    fn test_create_rejects_incomplete_response() {
        for response in [
            json!({"status": "received", "web_url": "w"}),
            json!({"status": "received", "api_url": "a"}),
            json!({"status": "waiting_for_user", "api_url": "a", "web_url": "w"}),
        ] {
            let transport = Scripted {
                submit_response: Some(response),
                ..Default::default()
            };
            let result = RemoteEditSession::create(transport, "u", &sample_doc(), "1.0");
            assert!(matches!(result, Err(SchemaError::Protocol { .. })));
        }
    }

    #[test]
    fn test_poll_waiting_keeps_session_open() {
        let mut session = open(vec![json!({"status": "waiting_for_user"})]);
        assert!(matches!(session.poll().unwrap(), PollStatus::Waiting));
        assert_eq!(session.status(), EditStatus::WaitingForUser);
    }

    #[test]
    fn test_poll_error_surfaces_remote_message() {
        let mut session = open(vec![json!({"status": "error", "message": "form expired"})]);
        assert_eq!(
            session.poll().unwrap_err(),
            SchemaError::RemoteEdit {
                message: "form expired".to_string()
            }
        );
        assert_eq!(session.status(), EditStatus::Error);
    }

    #[test]
    fn test_poll_edited_returns_valid_document() {
        let edited = json!({"properties": {"outdir": {"type": "string", "default": "out"}}});
        let mut session = open(vec![json!({"status": "web_builder_edited", "schema": edited})]);
        let PollStatus::Edited(result) = session.poll().unwrap() else {
            panic!("expected edited status");
        };
        let doc = result.validation.unwrap();
        assert_eq!(doc.find_param("outdir").unwrap().default, Some(json!("out")));
        assert_eq!(session.status(), EditStatus::WebBuilderEdited);
    }

    #[test]
    fn test_poll_edited_invalid_schema_keeps_raw_document() {
        let broken = json!({"title": "no properties here"});
        let mut session = open(vec![json!({
            "status": "web_builder_edited",
            "schema": serde_json::to_string(&broken).unwrap()
        })]);
        let PollStatus::Edited(result) = session.poll().unwrap() else {
            panic!("expected edited status");
        };
        assert_eq!(result.raw, broken);
        assert!(matches!(
            result.validation,
            Err(SchemaError::SchemaStructure { .. })
        ));
    }

    #[test]
    fn test_poll_unknown_status_is_protocol_error() {
        let mut session = open(vec![json!({"status": "sleeping"})]);
        assert!(matches!(session.poll(), Err(SchemaError::Protocol { .. })));
    }

    #[test]
    fn test_wait_for_edit_polls_until_finished() {
        let mut session = open(vec![
            json!({"status": "waiting_for_user"}),
            json!({"status": "waiting_for_user"}),
            json!({"status": "web_builder_edited", "schema": {"properties": {}}}),
        ]);
        let cancel = AtomicBool::new(false);
        let edited = session
            .wait_for_edit(&PollSchedule::new(Duration::ZERO), &cancel)
            .unwrap();
        assert!(edited.validation.is_ok());
        assert_eq!(session.transport.fetched.len(), 3);
        assert!(session.transport.fetched.iter().all(|u| u == "https://builder.test/api/1"));
    }

    #[test]
    fn test_wait_for_edit_times_out() {
        let mut session = open(vec![json!({"status": "waiting_for_user"}); 5]);
        let cancel = AtomicBool::new(false);
        let schedule = PollSchedule::new(Duration::ZERO).with_max_polls(2);
        assert_eq!(
            session.wait_for_edit(&schedule, &cancel).unwrap_err(),
            SchemaError::RemoteTimeout { polls: 2 }
        );
    }

    #[test]
    fn test_wait_for_edit_honors_cancellation() {
        let mut session = open(vec![json!({"status": "waiting_for_user"})]);
        let cancel = AtomicBool::new(true);
        assert_eq!(
            session
                .wait_for_edit(&PollSchedule::new(Duration::ZERO), &cancel)
                .unwrap_err(),
            SchemaError::Cancelled
        );
        assert!(session.transport.fetched.is_empty());
    }

    #[test]
    fn test_wait_for_edit_stops_on_error() {
        let mut session = open(vec![
            json!({"status": "waiting_for_user"}),
            json!({"status": "error", "message": "boom"}),
        ]);
        let cancel = AtomicBool::new(false);
        let err = session
            .wait_for_edit(&PollSchedule::new(Duration::ZERO), &cancel)
            .unwrap_err();
        assert!(matches!(err, SchemaError::RemoteEdit { message } if message == "boom"));
    }
}
