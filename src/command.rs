//! Commands and command sequences
//!
//! A [`Command`] is one atomic unit of engine-side work. Live sessions
//! receive commands one statement at a time; batch runs receive the whole
//! sequence rendered as a script, one statement per line.

use crate::error::EngineError;
use crate::session::EngineSession;

/// One atomic unit of engine-side work
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// A single scripting statement, sent verbatim to the engine
    Statement {
        /// Short human label for logs and error context
        label: String,
        /// The scripting statement itself
        line: String,
    },
    /// Annotation emitted into batch scripts; a no-op against live sessions
    Comment(String),
}

impl Command {
    pub fn statement(label: impl Into<String>, line: impl Into<String>) -> Self {
        Command::Statement {
            label: label.into(),
            line: line.into(),
        }
    }

    pub fn comment(text: impl Into<String>) -> Self {
        Command::Comment(text.into())
    }

    /// Label used in logs; comments label themselves
    pub fn label(&self) -> &str {
        match self {
            Command::Statement { label, .. } => label,
            Command::Comment(_) => "comment",
        }
    }

    /// Apply this command to a live session.
    ///
    /// Statements may fail with a classified error; comments never reach
    /// the engine.
    pub fn apply(&self, session: &mut dyn EngineSession) -> Result<(), EngineError> {
        match self {
            Command::Statement { line, .. } => {
                session.run(line)?;
                Ok(())
            }
            Command::Comment(_) => Ok(()),
        }
    }

    /// Render this command as one script line (newline not included)
    pub fn render(&self) -> String {
        match self {
            Command::Statement { line, .. } => line.clone(),
            Command::Comment(text) => format!("# {}", text),
        }
    }
}

/// Ordered, immutable list of commands.
///
/// Order is significant: materials precede stratigraphy, stratigraphy
/// precedes geometry, and so on. Built once by the builder and consumed
/// whole by a backend; there is no partial restart.
#[derive(Debug, Clone, Default)]
pub struct CommandSequence {
    commands: Vec<Command>,
}

impl CommandSequence {
    pub fn new(commands: Vec<Command>) -> Self {
        Self { commands }
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Command> {
        self.commands.iter()
    }

    /// Number of statements that actually reach the engine
    pub fn statement_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, Command::Statement { .. }))
            .count()
    }

    /// Render the whole sequence as a batch script: one command per line,
    /// every line newline-terminated, UTF-8. Comment lines are ignored by
    /// the engine's script runner.
    pub fn to_script(&self) -> String {
        let mut script = String::new();
        for command in &self.commands {
            script.push_str(&command.render());
            script.push('\n');
        }
        script
    }

    /// A new sequence with `prefix` commands placed before this one
    pub fn with_prefix(&self, prefix: Vec<Command>) -> Self {
        let mut commands = prefix;
        commands.extend(self.commands.iter().cloned());
        Self { commands }
    }
}

impl<'a> IntoIterator for &'a CommandSequence {
    type Item = &'a Command;
    type IntoIter = std::slice::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}
