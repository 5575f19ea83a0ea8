//! Analysis orchestration
//!
//! A small state machine sequencing connect -> build -> calculate ->
//! extract against one backend. Stage changes and progress messages are
//! surfaced through [`ProgressSink`] so a host UI can stay responsive
//! between blocking calls; the orchestrator itself never spawns threads.
//! Failure at any stage is terminal for the run: callers start a fresh
//! orchestration attempt from `Idle`.

use std::path::PathBuf;

use crate::backend::Backend;
use crate::command::{Command, CommandSequence};
use crate::error::{EngineError, ErrorKind};
use crate::results::{self, AnalysisResults};
use crate::table;

/// Orchestration stage, for UI feedback only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Connecting,
    Setup,
    Meshing,
    Calculating,
    Extracting,
    Done,
    Error,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Connecting => "connecting",
            Stage::Setup => "setup",
            Stage::Meshing => "meshing",
            Stage::Calculating => "calculating",
            Stage::Extracting => "extracting",
            Stage::Done => "done",
            Stage::Error => "error",
        };
        write!(f, "{}", name)
    }
}

/// Receiver for stage and progress notifications. All methods default to
/// no-ops; implement only what the host cares about.
pub trait ProgressSink {
    fn stage_changed(&self, _stage: Stage) {}
    fn progress(&self, _message: &str) {}
}

/// Sink that discards every notification
pub struct NullSink;

impl ProgressSink for NullSink {}

/// What to extract once the calculation finished
#[derive(Debug, Clone)]
pub struct ResultQuery {
    /// Output target for step-series queries (the spudcan reference point)
    pub target: String,
    /// Metric name for the displacement series
    pub displacement_metric: String,
    /// Metric name for the load series
    pub load_metric: String,
    /// Exported table to fall back to when no output session exists
    pub fallback_table: Option<PathBuf>,
}

impl Default for ResultQuery {
    fn default() -> Self {
        Self {
            target: "spudcan_ref".to_string(),
            displacement_metric: "Uz".to_string(),
            load_metric: "SumFz".to_string(),
            fallback_table: None,
        }
    }
}

/// Drives one analysis run against one backend
pub struct Orchestrator {
    backend: Box<dyn Backend>,
    sink: Box<dyn ProgressSink>,
    stage: Stage,
    project_title: String,
}

impl Orchestrator {
    pub fn new(backend: Box<dyn Backend>, project_title: impl Into<String>) -> Self {
        Self {
            backend,
            sink: Box::new(NullSink),
            stage: Stage::Idle,
            project_title: project_title.into(),
        }
    }

    /// Attach a progress sink
    pub fn with_sink(mut self, sink: Box<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    fn enter(&mut self, stage: Stage) {
        self.stage = stage;
        self.sink.stage_changed(stage);
    }

    /// Record the failure, move to the terminal error stage, hand the
    /// classified error back for re-raising.
    fn fail(&mut self, err: EngineError) -> EngineError {
        tracing::error!(error = %err, raw = err.raw(), "orchestration failed");
        self.enter(Stage::Error);
        err
    }

    fn expect_stage(&mut self, allowed: &[Stage], operation: &str) -> Result<(), EngineError> {
        if allowed.contains(&self.stage) {
            return Ok(());
        }
        let err = EngineError::new(
            ErrorKind::Configuration,
            format!("{} called in stage '{}'", operation, self.stage),
            format!("stage = {}", self.stage),
            operation.to_string(),
        );
        Err(self.fail(err))
    }

    /// Establish the backend connection. `Idle -> Connecting`.
    pub fn connect(&mut self) -> Result<(), EngineError> {
        self.expect_stage(&[Stage::Idle], "connect")?;
        self.enter(Stage::Connecting);
        self.sink.progress("connecting to engine");
        self.backend.connect().map_err(|e| self.fail(e))?;
        self.sink.progress("engine connection established");
        Ok(())
    }

    /// Build the model. `Idle/Connecting -> Setup`. For a new engine
    /// project, a reset and a set-title command run before the supplied
    /// sequence.
    pub fn setup_model(
        &mut self,
        sequence: &CommandSequence,
        is_new_project: bool,
    ) -> Result<(), EngineError> {
        self.expect_stage(&[Stage::Idle, Stage::Connecting], "model setup")?;
        self.enter(Stage::Setup);
        self.sink.progress("building model");

        let full;
        let to_run = if is_new_project {
            full = sequence.with_prefix(vec![
                Command::statement("reset project", "new"),
                Command::statement(
                    "set title",
                    format!("settitle \"{}\"", self.project_title),
                ),
            ]);
            &full
        } else {
            sequence
        };

        self.backend
            .execute(to_run, "model setup")
            .map_err(|e| self.fail(e))?;
        self.sink.progress("model built");
        Ok(())
    }

    /// Mesh and calculate. `Setup -> Meshing -> Calculating`.
    pub fn run_calculation(&mut self, sequence: &CommandSequence) -> Result<(), EngineError> {
        self.expect_stage(&[Stage::Setup], "calculation")?;
        self.enter(Stage::Meshing);
        self.sink.progress("meshing and calculating");
        self.enter(Stage::Calculating);
        let outcome = self
            .backend
            .execute(sequence, "calculation")
            .map_err(|e| self.fail(e))?;
        self.sink
            .progress(&format!("calculation finished ({} commands)", outcome.commands_run));
        Ok(())
    }

    /// Pull and compile results. `Calculating -> Extracting -> Done`.
    ///
    /// Uses the backend's output session when it has one; otherwise the
    /// query's fallback table. Having neither is an `Output` error.
    pub fn extract_results(&mut self, query: &ResultQuery) -> Result<AnalysisResults, EngineError> {
        self.expect_stage(&[Stage::Calculating], "results extraction")?;
        self.enter(Stage::Extracting);
        self.sink.progress("extracting results");

        let curve = match self.backend.output_session() {
            Ok(Some(session)) => results::curve(
                session,
                &query.target,
                &query.displacement_metric,
                &query.load_metric,
            )
            .map_err(|e| e.with_context("results extraction")),
            Ok(None) => match &query.fallback_table {
                Some(path) => {
                    table::from_table(path).map_err(|e| e.with_context("results extraction"))
                }
                None => Err(EngineError::new(
                    ErrorKind::Output,
                    "No output session and no fallback result table configured",
                    "nothing to extract from",
                    "results extraction",
                )),
            },
            Err(e) => Err(e),
        }
        .map_err(|e| self.fail(e))?;

        let fetched_final = match self.backend.output_session() {
            Ok(Some(session)) => {
                results::single_value(session, &query.target, &query.displacement_metric)
                    .map_err(|e| e.with_context("results extraction"))
            }
            _ => Ok(None),
        };
        let final_penetration = fetched_final.map_err(|e| self.fail(e))?;

        let compiled = results::compile(curve, final_penetration);
        self.enter(Stage::Done);
        self.sink.progress("results extracted");
        Ok(compiled)
    }

    /// Best-effort interruption of an in-flight run. The engine state is
    /// undefined afterwards; the run is marked failed and the session
    /// must not be reused without a fresh connect.
    pub fn abort(&mut self) {
        self.sink.progress("abort requested");
        self.backend.abort();
        self.enter(Stage::Error);
    }

    /// Release backend sessions. Idempotent.
    pub fn disconnect(&mut self) {
        self.backend.disconnect();
    }
}
