//! Mock session for testing
//!
//! Records every applied statement and serves canned query results
//! without a live engine. Essential for unit tests and CI pipelines.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::classify::classify;
use crate::error::EngineError;
use crate::session::EngineSession;

/// Scripted engine session double.
///
/// Statements succeed by default; `fail_on` plants a raw engine
/// diagnostic for the statement at a given index, which is classified the
/// same way a live session's feedback would be.
#[derive(Clone, Default, Debug)]
pub struct MockSession {
    /// Statements applied so far, in order
    applied: Arc<Mutex<Vec<String>>>,
    /// Index -> raw diagnostic to fail with
    failures: Arc<Mutex<HashMap<usize, String>>>,
    /// (target, metric) -> canned series
    series: Arc<Mutex<HashMap<(String, String), Vec<f64>>>>,
    /// Raw diagnostic every query fails with, if set
    query_failure: Arc<Mutex<Option<String>>>,
    /// Number of close() calls observed
    closes: Arc<Mutex<usize>>,
}

impl MockSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plant a failure: the `index`-th applied statement (0-based) will
    /// fail with `raw` as the engine diagnostic.
    pub fn fail_on(&self, index: usize, raw: impl Into<String>) {
        self.failures.lock().unwrap().insert(index, raw.into());
    }

    /// Serve `values` for `query_series(target, metric)`
    pub fn set_series(&self, target: impl Into<String>, metric: impl Into<String>, values: Vec<f64>) {
        self.series
            .lock()
            .unwrap()
            .insert((target.into(), metric.into()), values);
    }

    /// Make every series query fail with `raw`
    pub fn fail_queries(&self, raw: impl Into<String>) {
        *self.query_failure.lock().unwrap() = Some(raw.into());
    }

    /// Statements applied so far, in order
    pub fn applied(&self) -> Vec<String> {
        self.applied.lock().unwrap().clone()
    }

    /// Number of close() calls observed
    pub fn close_count(&self) -> usize {
        *self.closes.lock().unwrap()
    }
}

impl EngineSession for MockSession {
    fn run(&mut self, statement: &str) -> Result<String, EngineError> {
        let index = {
            let mut applied = self.applied.lock().unwrap();
            applied.push(statement.to_string());
            applied.len() - 1
        };
        if let Some(raw) = self.failures.lock().unwrap().get(&index) {
            return Err(classify(raw, "engine request"));
        }
        Ok(format!("OK: {}", statement))
    }

    fn query_series(&mut self, target: &str, metric: &str) -> Result<Vec<f64>, EngineError> {
        if let Some(raw) = self.query_failure.lock().unwrap().as_ref() {
            return Err(classify(raw, "results extraction"));
        }
        Ok(self
            .series
            .lock()
            .unwrap()
            .get(&(target.to_string(), metric.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    fn close(&mut self) {
        *self.closes.lock().unwrap() += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_mock_records_statements_in_order() {
        let mut session = MockSession::new();
        session.run("first").unwrap();
        session.run("second").unwrap();
        assert_eq!(session.applied(), vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn test_mock_planted_failure_is_classified() {
        let mut session = MockSession::new();
        session.fail_on(1, "soil body seems to collapse");
        session.run("ok").unwrap();
        let err = session.run("boom").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Calculation);
        // the failing statement was still recorded
        assert_eq!(session.applied().len(), 2);
    }

    #[test]
    fn test_mock_serves_canned_series() {
        let mut session = MockSession::new();
        session.set_series("point_a", "Uz", vec![0.0, -0.1]);
        assert_eq!(session.query_series("point_a", "Uz").unwrap(), vec![0.0, -0.1]);
        assert!(session.query_series("point_a", "SumFz").unwrap().is_empty());
    }

    #[test]
    fn test_mock_counts_closes() {
        let mut session = MockSession::new();
        session.close();
        session.close();
        assert_eq!(session.close_count(), 2);
    }
}
