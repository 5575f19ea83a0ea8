//! Engine failure taxonomy with fix suggestions
//!
//! Every failure surfaced by a backend or the extractor is reduced to one
//! of six kinds. The original diagnostic text is always retained next to
//! the refined message so logs keep the full story.

use thiserror::Error;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// The closed set of failure kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Connection,
    Configuration,
    Calculation,
    Output,
    CliScripting,
    Generic,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Connection => write!(f, "connection"),
            ErrorKind::Configuration => write!(f, "configuration"),
            ErrorKind::Calculation => write!(f, "calculation"),
            ErrorKind::Output => write!(f, "output"),
            ErrorKind::CliScripting => write!(f, "cli-scripting"),
            ErrorKind::Generic => write!(f, "generic"),
        }
    }
}

/// A classified engine failure.
///
/// `message` is the refined, user-facing description. `raw` is the
/// unmodified diagnostic the engine (or OS) produced. `context` names the
/// operation that was in progress ("model setup", "calculation", ...).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Connection error during {context}: {message}")]
    Connection {
        message: String,
        raw: String,
        context: String,
    },

    #[error("Configuration error during {context}: {message}")]
    Configuration {
        message: String,
        raw: String,
        context: String,
    },

    #[error("Calculation error during {context}: {message}")]
    Calculation {
        message: String,
        raw: String,
        context: String,
    },

    #[error("Output error during {context}: {message}")]
    Output {
        message: String,
        raw: String,
        context: String,
    },

    #[error("CLI scripting error during {context}: {message}")]
    CliScripting {
        message: String,
        raw: String,
        context: String,
    },

    #[error("Error during {context}: {message}")]
    Generic {
        message: String,
        raw: String,
        context: String,
    },
}

impl EngineError {
    /// Construct a variant directly from its kind
    pub fn new(
        kind: ErrorKind,
        message: impl Into<String>,
        raw: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        let (message, raw, context) = (message.into(), raw.into(), context.into());
        match kind {
            ErrorKind::Connection => EngineError::Connection { message, raw, context },
            ErrorKind::Configuration => EngineError::Configuration { message, raw, context },
            ErrorKind::Calculation => EngineError::Calculation { message, raw, context },
            ErrorKind::Output => EngineError::Output { message, raw, context },
            ErrorKind::CliScripting => EngineError::CliScripting { message, raw, context },
            ErrorKind::Generic => EngineError::Generic { message, raw, context },
        }
    }

    /// Get the kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Connection { .. } => ErrorKind::Connection,
            EngineError::Configuration { .. } => ErrorKind::Configuration,
            EngineError::Calculation { .. } => ErrorKind::Calculation,
            EngineError::Output { .. } => ErrorKind::Output,
            EngineError::CliScripting { .. } => ErrorKind::CliScripting,
            EngineError::Generic { .. } => ErrorKind::Generic,
        }
    }

    /// The refined, user-facing message
    pub fn message(&self) -> &str {
        match self {
            EngineError::Connection { message, .. }
            | EngineError::Configuration { message, .. }
            | EngineError::Calculation { message, .. }
            | EngineError::Output { message, .. }
            | EngineError::CliScripting { message, .. }
            | EngineError::Generic { message, .. } => message,
        }
    }

    /// The unmodified diagnostic text the failure was classified from
    pub fn raw(&self) -> &str {
        match self {
            EngineError::Connection { raw, .. }
            | EngineError::Configuration { raw, .. }
            | EngineError::Calculation { raw, .. }
            | EngineError::Output { raw, .. }
            | EngineError::CliScripting { raw, .. }
            | EngineError::Generic { raw, .. } => raw,
        }
    }

    /// The operation that was in progress when the failure occurred
    pub fn context(&self) -> &str {
        match self {
            EngineError::Connection { context, .. }
            | EngineError::Configuration { context, .. }
            | EngineError::Calculation { context, .. }
            | EngineError::Output { context, .. }
            | EngineError::CliScripting { context, .. }
            | EngineError::Generic { context, .. } => context,
        }
    }

    /// Replace the context tag, keeping kind, message and raw text.
    ///
    /// Context is attached where the failure surfaces (the backend knows it
    /// was running "model setup"); the classification itself never changes.
    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        let ctx = ctx.into();
        match &mut self {
            EngineError::Connection { context, .. }
            | EngineError::Configuration { context, .. }
            | EngineError::Calculation { context, .. }
            | EngineError::Output { context, .. }
            | EngineError::CliScripting { context, .. }
            | EngineError::Generic { context, .. } => *context = ctx,
        }
        self
    }
}

impl FixSuggestion for EngineError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            EngineError::Connection { .. } => {
                Some("Check the engine is running, the port/passphrase match, and the license is valid")
            }
            EngineError::Configuration { .. } => {
                Some("Check the project input values and the engine installation paths")
            }
            EngineError::Calculation { .. } => {
                Some("Review soil parameters and analysis control; the model may fail before the target penetration")
            }
            EngineError::Output { .. } => {
                Some("Verify the requested result exists and the result file has penetration and load columns")
            }
            EngineError::CliScripting { .. } => {
                Some("Check the engine executable path and the generated script (kept in the log at debug level)")
            }
            EngineError::Generic { .. } => Some("See the full engine log for the raw diagnostic"),
        }
    }
}
