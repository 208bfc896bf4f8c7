//! ScriptEngine trait and error type
//!
//! The trait is the seam between the command-line front end and a scripting
//! backend. Execution is synchronous: every script statement that touches the
//! instrument blocks until the transport returns.

use thiserror::Error;

/// Errors that can occur during script execution
#[derive(Debug, Clone, Error)]
pub enum ScriptError {
    /// Compilation or parsing error
    #[error("Compilation error at line {line:?}, column {column:?}: {message}")]
    Compilation {
        /// Parser message
        message: String,
        /// 1-based line, if known
        line: Option<usize>,
        /// 1-based column, if known
        column: Option<usize>,
    },

    /// Runtime execution error, including instrument errors raised by bindings
    #[error("Runtime error: {message}")]
    Runtime {
        /// Error message
        message: String,
    },

    /// Variable not found in global scope
    #[error("Variable not found: {name}")]
    VariableNotFound {
        /// Variable name
        name: String,
    },
}

/// A scripting backend that can drive the instrument
pub trait ScriptEngine {
    /// Value produced by evaluating a script
    type Value;

    /// Run a script. Variables it defines stay visible to later calls.
    fn execute_script(&mut self, script: &str) -> Result<Self::Value, ScriptError>;

    /// Check that a script parses, without running it.
    fn validate_script(&self, script: &str) -> Result<(), ScriptError>;

    /// Look up a global variable.
    fn get_global(&self, name: &str) -> Result<Self::Value, ScriptError>;

    /// Drop every global, including bound instruments.
    fn clear_globals(&mut self);

    /// Backend name for diagnostics
    fn backend_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ScriptError::Compilation {
            message: "Expecting ';'".to_string(),
            line: Some(3),
            column: Some(7),
        };
        assert!(err.to_string().contains("Some(3)"));

        let err = ScriptError::Runtime {
            message: "instrument session is closed".to_string(),
        };
        assert_eq!(err.to_string(), "Runtime error: instrument session is closed");
    }
}
