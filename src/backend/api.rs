//! Live-session execution backend
//!
//! Drives a persistent remote-scripting session: each command is applied
//! one at a time, in order, against the input session. A second session
//! on the output port serves result queries and is opened lazily, only
//! when the extractor first asks for it.

use std::time::Duration;

use crate::backend::{Backend, ExecutionOutcome};
use crate::command::CommandSequence;
use crate::config::ApiConfig;
use crate::error::EngineError;
use crate::session::{EngineSession, HttpSession};

/// Statement sent for a best-effort calculation interrupt
const INTERRUPT_STATEMENT: &str = "break";

#[derive(Debug)]
pub struct ApiBackend {
    config: ApiConfig,
    input: Option<Box<dyn EngineSession>>,
    output: Option<Box<dyn EngineSession>>,
    /// Whether a missing output session may be dialed on demand. False
    /// for injected sessions, where dialing would escape the test double.
    lazy_output: bool,
}

impl ApiBackend {
    pub fn new(config: ApiConfig) -> Self {
        Self {
            config,
            input: None,
            output: None,
            lazy_output: true,
        }
    }

    /// Build a backend over pre-made sessions. Tests inject
    /// [`crate::session::MockSession`]s here; `connect` becomes a no-op
    /// and no output session is dialed on demand.
    pub fn with_sessions(
        config: ApiConfig,
        input: Box<dyn EngineSession>,
        output: Option<Box<dyn EngineSession>>,
    ) -> Self {
        Self {
            config,
            input: Some(input),
            output,
            lazy_output: false,
        }
    }

    fn request_timeout(&self) -> Option<Duration> {
        self.config.request_timeout_secs.map(Duration::from_secs)
    }

    /// Apply every command in order against `session`, stopping at the
    /// first failure. Split out so the fail-fast contract is testable
    /// against any session implementation.
    pub fn execute_on_session(
        session: &mut dyn EngineSession,
        sequence: &CommandSequence,
        context: &str,
    ) -> Result<ExecutionOutcome, EngineError> {
        let mut commands_run = 0;
        for command in sequence {
            tracing::debug!(label = command.label(), context, "applying command");
            command
                .apply(session)
                .map_err(|e| e.with_context(context))?;
            commands_run += 1;
        }
        Ok(ExecutionOutcome {
            commands_run,
            diagnostic: None,
        })
    }
}

impl Backend for ApiBackend {
    fn name(&self) -> &str {
        "api"
    }

    fn connect(&mut self) -> Result<(), EngineError> {
        if self.input.is_some() {
            return Ok(());
        }
        let session = HttpSession::connect(
            &self.config.host,
            self.config.input_port,
            &self.config.passphrase,
            self.request_timeout(),
        )?;
        self.input = Some(Box::new(session));
        Ok(())
    }

    fn execute(
        &mut self,
        sequence: &CommandSequence,
        context: &str,
    ) -> Result<ExecutionOutcome, EngineError> {
        let session = self.input.as_deref_mut().ok_or_else(|| {
            EngineError::new(
                crate::error::ErrorKind::Connection,
                "No live session; call connect first",
                "input session missing",
                context,
            )
        })?;
        Self::execute_on_session(session, sequence, context)
    }

    fn abort(&mut self) {
        if let Some(session) = self.input.as_deref_mut() {
            if let Err(e) = session.run(INTERRUPT_STATEMENT) {
                tracing::warn!(error = %e, "calculation interrupt failed");
            }
        }
    }

    fn disconnect(&mut self) {
        if let Some(mut session) = self.input.take() {
            session.close();
        }
        if let Some(mut session) = self.output.take() {
            session.close();
        }
    }

    fn output_session(&mut self) -> Result<Option<&mut (dyn EngineSession + 'static)>, EngineError> {
        if self.output.is_none() && self.lazy_output {
            let session = HttpSession::connect(
                &self.config.host,
                self.config.output_port,
                &self.config.passphrase,
                self.request_timeout(),
            )
            .map_err(|e| e.with_context("results extraction"))?;
            self.output = Some(Box::new(session));
        }
        Ok(self.output.as_deref_mut())
    }
}

impl Drop for ApiBackend {
    fn drop(&mut self) {
        self.disconnect();
    }
}
