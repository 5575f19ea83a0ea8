//! Engine session abstraction
//!
//! [`EngineSession`] is the seam between commands/extraction and a live
//! engine conversation. The production implementation is [`HttpSession`];
//! [`MockSession`] is the scripted test double.

mod http;
mod mock;

pub use http::HttpSession;
pub use mock::MockSession;

use crate::error::EngineError;

/// One live engine conversation.
///
/// A session is exclusive and stateful: each successful `run` mutates
/// engine-side state and there is no rollback. `close` must be safe to
/// call at any point, including on sessions that never fully came up.
pub trait EngineSession: std::fmt::Debug {
    /// Execute one scripting statement; returns the engine's feedback text
    fn run(&mut self, statement: &str) -> Result<String, EngineError>;

    /// Fetch a step-indexed series of values for `target` (e.g. the
    /// spudcan reference point) and `metric` (e.g. `"Uz"`, `"SumFz"`)
    fn query_series(&mut self, target: &str, metric: &str) -> Result<Vec<f64>, EngineError>;

    /// Release the session. Idempotent; swallows its own errors (logged,
    /// never raised).
    fn close(&mut self);
}
