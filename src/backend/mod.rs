//! # Execution backends
//!
//! Two mutually exclusive strategies run a command sequence against the
//! engine:
//!
//! - [`ApiBackend`] - live, stateful remote-scripting session
//! - [`CliBackend`] - batch script executed as an engine subprocess
//!
//! The orchestrator holds a single `Box<dyn Backend>` chosen once at
//! startup from the configuration; nothing else branches on the mode.

mod api;
mod cli;

pub use api::ApiBackend;
pub use cli::CliBackend;

use crate::command::CommandSequence;
use crate::config::EngineConfig;
use crate::error::{EngineError, ErrorKind};
use crate::session::EngineSession;

/// What a finished execution left behind
#[derive(Debug, Clone, Default)]
pub struct ExecutionOutcome {
    /// Commands that actually ran (comments included for CLI scripts)
    pub commands_run: usize,
    /// Captured diagnostic text, if the backend produces any (CLI stdout)
    pub diagnostic: Option<String>,
}

/// One execution strategy against the engine.
///
/// Failures are always raised as classified [`EngineError`]s; a returned
/// [`ExecutionOutcome`] means the whole sequence was accepted.
pub trait Backend: std::fmt::Debug {
    /// Backend name for logs ("api", "cli")
    fn name(&self) -> &str;

    /// Establish whatever connection this backend needs. A no-op for
    /// backends that connect per-run.
    fn connect(&mut self) -> Result<(), EngineError>;

    /// Execute every command in order, failing fast on the first error.
    /// `context` names the surrounding operation for error classification
    /// ("model setup", "calculation").
    fn execute(
        &mut self,
        sequence: &CommandSequence,
        context: &str,
    ) -> Result<ExecutionOutcome, EngineError>;

    /// Best-effort interruption of an in-flight run. The engine state
    /// afterwards is undefined; callers must reconnect before reuse.
    fn abort(&mut self);

    /// Release all held sessions. Idempotent; safe to call on a backend
    /// that never connected.
    fn disconnect(&mut self);

    /// The output-side session for result queries, if this backend has
    /// one. CLI runs have none; callers fall back to exported tables.
    fn output_session(&mut self) -> Result<Option<&mut (dyn EngineSession + 'static)>, EngineError>;
}

/// Choose and build the backend from configuration.
///
/// The API backend wins when both modes are configured: a live session
/// gives direct result queries, which the batch mode cannot.
pub fn create_backend(config: &EngineConfig) -> Result<Box<dyn Backend>, EngineError> {
    if let Some(api) = &config.api {
        return Ok(Box::new(ApiBackend::new(api.clone())));
    }
    if let Some(cli) = &config.cli {
        return Ok(Box::new(CliBackend::new(cli.clone())));
    }
    Err(EngineError::new(
        ErrorKind::Configuration,
        "No execution backend configured; provide an [api] or [cli] section",
        "empty engine configuration",
        "backend selection",
    ))
}
