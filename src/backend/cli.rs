//! Batch-script execution backend
//!
//! When no live session is available the same logical sequence runs as a
//! single batch job: the commands are rendered to a script file and the
//! engine front-end is launched as a subprocess with `--runscript`. The
//! script file is scoped to the run and removed on every exit path.

use std::io::{Read, Write};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use wait_timeout::ChildExt;

use crate::backend::{Backend, ExecutionOutcome};
use crate::classify::{classify, raw_preview};
use crate::command::CommandSequence;
use crate::config::CliConfig;
use crate::error::{EngineError, ErrorKind};
use crate::session::EngineSession;

/// File-stem markers a real engine front-end carries. Anything else is
/// rejected before a process is spawned.
const FRONTEND_MARKERS: &[&str] = &["plaxis"];

/// Abort/timeout poll granularity while the subprocess runs
const WAIT_SLICE: Duration = Duration::from_millis(250);

#[derive(Debug)]
pub struct CliBackend {
    config: CliConfig,
    abort_flag: Arc<AtomicBool>,
}

impl CliBackend {
    pub fn new(config: CliConfig) -> Self {
        Self {
            config,
            abort_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Reject executables that do not look like the engine front-end.
    /// Pure name check, exercised directly by tests.
    pub fn validate_executable(path: &Path) -> Result<(), EngineError> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_lowercase();
        if FRONTEND_MARKERS.iter().any(|marker| stem.contains(marker)) {
            Ok(())
        } else {
            Err(EngineError::new(
                ErrorKind::CliScripting,
                format!(
                    "'{}' is not recognizable as the engine front-end",
                    path.display()
                ),
                format!("executable = {}", path.display()),
                "batch run",
            ))
        }
    }

    fn kill_and_reap(child: &mut Child) {
        let _ = child.kill();
        let _ = child.wait();
    }

    /// Wait for the child within the wall-clock budget, honoring the
    /// abort flag between slices. Returns the exit status, or the
    /// classified reason the wait ended early.
    fn bounded_wait(&self, child: &mut Child, context: &str) -> Result<std::process::ExitStatus, EngineError> {
        let deadline = Instant::now() + Duration::from_secs(self.config.timeout_secs);
        loop {
            if self.abort_flag.load(Ordering::Relaxed) {
                Self::kill_and_reap(child);
                return Err(EngineError::new(
                    ErrorKind::Calculation,
                    "The batch run was aborted",
                    "aborted by caller",
                    context,
                ));
            }
            match child.wait_timeout(WAIT_SLICE).map_err(|e| classify(&e.to_string(), context))? {
                Some(status) => return Ok(status),
                None => {
                    if Instant::now() >= deadline {
                        Self::kill_and_reap(child);
                        return Err(EngineError::new(
                            ErrorKind::Calculation,
                            format!(
                                "The engine batch run exceeded the {}s wall-clock timeout",
                                self.config.timeout_secs
                            ),
                            "batch run timed out",
                            context,
                        ));
                    }
                }
            }
        }
    }
}

impl Backend for CliBackend {
    fn name(&self) -> &str {
        "cli"
    }

    fn connect(&mut self) -> Result<(), EngineError> {
        // Batch mode connects per run; validate the executable up front so
        // a misconfigured path fails during the connecting stage.
        Self::validate_executable(&self.config.executable)
    }

    fn execute(
        &mut self,
        sequence: &CommandSequence,
        context: &str,
    ) -> Result<ExecutionOutcome, EngineError> {
        self.abort_flag.store(false, Ordering::Relaxed);
        Self::validate_executable(&self.config.executable)?;

        // Scoped script file: removed when `script` drops, on every exit
        // path out of this function.
        let mut script = tempfile::Builder::new()
            .prefix("spudrun-")
            .suffix(".script")
            .tempfile()
            .map_err(|e| classify(&e.to_string(), context))?;
        script
            .write_all(sequence.to_script().as_bytes())
            .map_err(|e| classify(&e.to_string(), context))?;
        script
            .flush()
            .map_err(|e| classify(&e.to_string(), context))?;

        let script_path = script.path().to_path_buf();
        tracing::debug!(
            executable = %self.config.executable.display(),
            script = %script_path.display(),
            commands = sequence.len(),
            "launching engine batch run"
        );

        let mut child = Command::new(&self.config.executable)
            .arg(format!("--runscript={}", script_path.display()))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| classify(&e.to_string(), context))?;

        let status = self.bounded_wait(&mut child, context)?;

        let stdout = child
            .stdout
            .take()
            .map(|mut s| {
                let mut buf = String::new();
                s.read_to_string(&mut buf).ok();
                buf
            })
            .unwrap_or_default();
        let stderr = child
            .stderr
            .take()
            .map(|mut s| {
                let mut buf = String::new();
                s.read_to_string(&mut buf).ok();
                buf
            })
            .unwrap_or_default();

        if status.success() {
            return Ok(ExecutionOutcome {
                commands_run: sequence.len(),
                diagnostic: if stdout.trim().is_empty() {
                    None
                } else {
                    Some(stdout)
                },
            });
        }

        let raw = if stderr.trim().is_empty() { &stdout } else { &stderr };
        let classified = classify(raw, context);
        // An unmatched diagnostic from a failed batch run is a scripting
        // failure, not a generic one; the run itself is the operation that
        // broke. Specific rule matches keep their kind.
        if classified.kind() == ErrorKind::Generic {
            let code = status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(EngineError::new(
                ErrorKind::CliScripting,
                format!("Engine batch run failed (exit {}): {}", code, raw_preview(raw)),
                raw.clone(),
                context,
            ));
        }
        Err(classified)
    }

    fn abort(&mut self) {
        self.abort_flag.store(true, Ordering::Relaxed);
    }

    fn disconnect(&mut self) {
        // Nothing held between runs.
        tracing::debug!("cli backend disconnect: no persistent session");
    }

    fn output_session(&mut self) -> Result<Option<&mut (dyn EngineSession + 'static)>, EngineError> {
        Ok(None)
    }
}
