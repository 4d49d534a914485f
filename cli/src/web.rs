//! HTTP transport for the web schema builder.

use std::time::Duration;

use pipeline_schema_core::{BuilderTransport, SchemaError};
use serde_json::Value;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Talks to the builder over HTTP.
///
/// Submissions are sent as form fields, which is what the builder's API
/// endpoint reads. Every response body is decoded as JSON.
pub struct HttpTransport {
    agent: ureq::Agent,
}

impl HttpTransport {
    pub fn new() -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build()
            .into();
        Self { agent }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl BuilderTransport for HttpTransport {
    fn submit(&mut self, url: &str, payload: &Value) -> pipeline_schema_core::Result<Value> {
        let fields = form_fields(payload)?;
        debug!("POST {url} ({} fields)", fields.len());
        let mut response = self
            .agent
            .post(url)
            .send_form(fields.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .map_err(|err| transport_error(url, err))?;
        response
            .body_mut()
            .read_json::<Value>()
            .map_err(|err| transport_error(url, err))
    }

    fn fetch(&mut self, url: &str) -> pipeline_schema_core::Result<Value> {
        debug!("GET {url}");
        let mut response = self
            .agent
            .get(url)
            .call()
            .map_err(|err| transport_error(url, err))?;
        response
            .body_mut()
            .read_json::<Value>()
            .map_err(|err| transport_error(url, err))
    }
}

fn transport_error(url: &str, err: ureq::Error) -> SchemaError {
    SchemaError::Transport(format!("{url}: {err}"))
}

/// Flattens a JSON object into form fields. String values are sent as-is,
/// anything else as its JSON text.
fn form_fields(payload: &Value) -> pipeline_schema_core::Result<Vec<(String, String)>> {
    let Some(object) = payload.as_object() else {
        return Err(SchemaError::Transport(
            "builder payload must be a JSON object".to_string(),
        ));
    };
    Ok(object
        .iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), text)
        })
        .collect())
}
