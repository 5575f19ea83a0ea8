//! spudrun - spudcan penetration analysis automation over a remote-scripted FE engine

pub mod backend;
pub mod builder;
pub mod classify;
pub mod command;
pub mod config;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod results;
pub mod session;
pub mod table;

pub use backend::{create_backend, Backend, ExecutionOutcome};
pub use classify::classify;
pub use command::{Command, CommandSequence};
pub use config::{ApiConfig, CliConfig, EngineConfig};
pub use error::{EngineError, ErrorKind, FixSuggestion};
pub use model::Project;
pub use orchestrator::{NullSink, Orchestrator, ProgressSink, ResultQuery, Stage};
pub use results::{AnalysisResults, CurvePoint};
