//! Live remote-scripting session over HTTP
//!
//! The engine exposes a scripting server per open project: one port for
//! the input side, one for the output side, both guarded by a shared
//! passphrase. Every statement is one POST; the server replies with a
//! JSON envelope carrying the engine's feedback or error text.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::classify::classify;
use crate::error::{EngineError, ErrorKind};
use crate::session::EngineSession;

/// Default timeout for a single scripting request. Long, because a single
/// `calculate` statement blocks until the solver finishes.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(3600);

/// Reply envelope for statement execution
#[derive(Debug, Deserialize)]
struct RunReply {
    success: bool,
    #[serde(default)]
    feedback: String,
    #[serde(default)]
    error: String,
}

/// Reply envelope for series queries
#[derive(Debug, Deserialize)]
struct SeriesReply {
    success: bool,
    #[serde(default)]
    values: Vec<f64>,
    #[serde(default)]
    error: String,
}

/// Handle to one live engine conversation.
///
/// Created by [`HttpSession::connect`]; released by `close` (idempotent)
/// or on drop, whichever comes first.
#[derive(Debug)]
pub struct HttpSession {
    client: reqwest::blocking::Client,
    base_url: String,
    closed: bool,
}

/// Flatten an error and its source chain into one diagnostic string.
/// reqwest keeps the interesting part ("Connection refused") in `source`.
fn error_chain(e: &dyn std::error::Error) -> String {
    let mut text = e.to_string();
    let mut source = e.source();
    while let Some(s) = source {
        text.push_str(": ");
        text.push_str(&s.to_string());
        source = s.source();
    }
    text
}

/// Classify a transport-level reqwest failure
fn classify_transport(e: &reqwest::Error, context: &str) -> EngineError {
    let raw = error_chain(e);
    if e.is_connect() {
        return EngineError::new(
            ErrorKind::Connection,
            "Could not reach the engine scripting server; is it running on that port?",
            raw,
            context,
        );
    }
    if e.is_timeout() {
        return EngineError::new(
            ErrorKind::Connection,
            "The engine did not answer within the request timeout",
            raw,
            context,
        );
    }
    if e.is_decode() {
        return EngineError::new(
            ErrorKind::Configuration,
            "The engine API returned an unexpected shape; the scripting API was likely misused",
            raw,
            context,
        );
    }
    classify(&raw, context)
}

impl HttpSession {
    /// Establish a session against `host:port` using the shared passphrase.
    ///
    /// Fails with a `Connection` error on refusal, a rejected passphrase,
    /// or a missing license; the three are told apart by classifying the
    /// raw reply text.
    pub fn connect(
        host: &str,
        port: u16,
        passphrase: &str,
        timeout: Option<Duration>,
    ) -> Result<Self, EngineError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT))
            .build()
            .map_err(|e| classify_transport(&e, "connect"))?;

        let base_url = format!("http://{}:{}", host, port);
        let session = Self {
            client,
            base_url,
            closed: false,
        };

        let reply = session.post("/auth", &json!({ "password": passphrase }), "connect")?;
        if !reply.success {
            let raw = if reply.error.is_empty() {
                "authentication rejected".to_string()
            } else {
                reply.error
            };
            return Err(classify(&raw, "connect"));
        }

        tracing::debug!(url = %session.base_url, "engine session established");
        Ok(session)
    }

    /// POST a JSON body and decode the statement-reply envelope
    fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
        context: &str,
    ) -> Result<RunReply, EngineError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .map_err(|e| classify_transport(&e, context))?;
        response
            .json::<RunReply>()
            .map_err(|e| classify_transport(&e, context))
    }

    fn ensure_open(&self) -> Result<(), EngineError> {
        if self.closed {
            return Err(EngineError::new(
                ErrorKind::Connection,
                "The session has been closed; reconnect before reuse",
                "session closed",
                "engine request",
            ));
        }
        Ok(())
    }
}

impl EngineSession for HttpSession {
    fn run(&mut self, statement: &str) -> Result<String, EngineError> {
        self.ensure_open()?;
        tracing::debug!(statement, "running statement");
        let reply = self.post("/commands", &json!({ "statement": statement }), "engine request")?;
        if reply.success {
            Ok(reply.feedback)
        } else {
            let raw = if reply.error.is_empty() {
                reply.feedback
            } else {
                reply.error
            };
            Err(classify(&raw, "engine request"))
        }
    }

    fn query_series(&mut self, target: &str, metric: &str) -> Result<Vec<f64>, EngineError> {
        self.ensure_open()?;
        let url = format!("{}/query", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&json!({ "target": target, "metric": metric }))
            .send()
            .map_err(|e| classify_transport(&e, "results extraction"))?;
        let reply = response
            .json::<SeriesReply>()
            .map_err(|e| classify_transport(&e, "results extraction"))?;
        if reply.success {
            Ok(reply.values)
        } else {
            Err(classify(&reply.error, "results extraction"))
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        // Best-effort goodbye; a dead server is not an error at this point.
        if let Err(e) = self
            .client
            .post(format!("{}/close", self.base_url))
            .json(&json!({}))
            .send()
        {
            tracing::warn!(error = %e, "session close request failed");
        } else {
            tracing::debug!(url = %self.base_url, "engine session closed");
        }
    }
}

impl Drop for HttpSession {
    fn drop(&mut self) {
        self.close();
    }
}
