//! Diagnostic classification
//!
//! Maps raw diagnostics (engine feedback strings, OS errors, decode
//! failures) to one [`EngineError`] kind plus a refined message. The rule
//! set is a single ordered table: most specific pattern first, first match
//! wins. Callers must not assume any two orderings are interchangeable.

use once_cell::sync::Lazy;

use crate::error::{EngineError, ErrorKind};

/// Keep this much of the raw diagnostic inside a Generic error message
const RAW_PREVIEW_CHARS: usize = 200;

/// One classification rule: case-insensitive substring -> kind + message
struct Rule {
    pattern: &'static str,
    kind: ErrorKind,
    message: &'static str,
}

/// Ordered rule table. Most specific first; the first matching pattern
/// wins, so narrow engine phrases must precede broad ones ("password
/// incorrect" before "connection").
static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        // Solver failures
        Rule {
            pattern: "did not converge",
            kind: ErrorKind::Calculation,
            message: "The calculation did not converge before reaching the target penetration",
        },
        Rule {
            pattern: "mechanism formed",
            kind: ErrorKind::Calculation,
            message: "A soil failure mechanism formed; the target load could not be sustained",
        },
        Rule {
            pattern: "soil body seems to collapse",
            kind: ErrorKind::Calculation,
            message: "The soil body collapsed before the prescribed penetration was reached",
        },
        Rule {
            pattern: "prescribed ultimate state not reached",
            kind: ErrorKind::Calculation,
            message: "The prescribed ultimate state was not reached",
        },
        Rule {
            pattern: "load advancement procedure fails",
            kind: ErrorKind::Calculation,
            message: "The load advancement procedure failed; try smaller steps",
        },
        // Model construction failures
        Rule {
            pattern: "mesh generation failed",
            kind: ErrorKind::Configuration,
            message: "Mesh generation failed; check geometry and mesh coarseness",
        },
        Rule {
            pattern: "invalid material",
            kind: ErrorKind::Configuration,
            message: "A material definition was rejected by the engine",
        },
        // Session / licensing failures
        Rule {
            pattern: "password incorrect",
            kind: ErrorKind::Connection,
            message: "The scripting passphrase was rejected; check the configured passphrase",
        },
        Rule {
            pattern: "license",
            kind: ErrorKind::Connection,
            message: "No valid engine license was found; check license configuration",
        },
        Rule {
            pattern: "connection refused",
            kind: ErrorKind::Connection,
            message: "The engine refused the connection; is the scripting server running on that port?",
        },
        Rule {
            pattern: "actively refused",
            kind: ErrorKind::Connection,
            message: "The engine refused the connection; is the scripting server running on that port?",
        },
        Rule {
            pattern: "failed to connect",
            kind: ErrorKind::Connection,
            message: "Could not reach the engine scripting server",
        },
        // Filesystem-level configuration failures
        Rule {
            pattern: "file not found",
            kind: ErrorKind::Configuration,
            message: "A required file was not found; check the configured paths",
        },
        Rule {
            pattern: "no such file",
            kind: ErrorKind::Configuration,
            message: "A required file was not found; check the configured paths",
        },
        Rule {
            pattern: "permission denied",
            kind: ErrorKind::Configuration,
            message: "File access was denied; check permissions on the working directory",
        },
        // Batch script failures
        Rule {
            pattern: "runscript",
            kind: ErrorKind::CliScripting,
            message: "The engine rejected the batch script invocation",
        },
        Rule {
            pattern: "syntax error in script",
            kind: ErrorKind::CliScripting,
            message: "The generated batch script was rejected by the engine",
        },
        // Result retrieval failures
        Rule {
            pattern: "no results",
            kind: ErrorKind::Output,
            message: "The engine reported no results for the requested query",
        },
        Rule {
            pattern: "unknown result type",
            kind: ErrorKind::Output,
            message: "The requested result type is not known to the engine",
        },
    ]
});

/// Classify a raw diagnostic string.
///
/// Always produces one of the six kinds; unmatched text becomes `Generic`
/// with a preview of the raw diagnostic so nothing is silently dropped.
pub fn classify(raw: &str, context: &str) -> EngineError {
    let lowered = raw.to_lowercase();
    for rule in RULES.iter() {
        if lowered.contains(rule.pattern) {
            return EngineError::new(rule.kind, rule.message, raw, context);
        }
    }
    EngineError::new(
        ErrorKind::Generic,
        format!(
            "Engine reported: {} (full diagnostic in the log)",
            raw_preview(raw)
        ),
        raw,
        context,
    )
}

/// Classify a native error raised by the scripting surface itself.
///
/// Decode and shape errors mean the command stream and the engine API
/// disagree; that is a configuration problem on our side, not an engine
/// failure. An already-classified [`EngineError`] passes through unchanged
/// (idempotent re-classification).
pub fn classify_native(err: &(dyn std::error::Error + 'static), context: &str) -> EngineError {
    if let Some(engine_err) = err.downcast_ref::<EngineError>() {
        return engine_err.clone();
    }
    let raw = err.to_string();
    if err.is::<serde_json::Error>() {
        return EngineError::new(
            ErrorKind::Configuration,
            "The engine API returned an unexpected shape; the scripting API was likely misused",
            raw,
            context,
        );
    }
    classify(&raw, context)
}

/// First ~200 characters of the raw text, cut at a char boundary
pub(crate) fn raw_preview(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.len() <= RAW_PREVIEW_CHARS {
        return trimmed;
    }
    let mut end = RAW_PREVIEW_CHARS;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    &trimmed[..end]
}
