//! Rhai implementation of the ScriptEngine trait
//!
//! Rhai is a small embedded language with Rust-like syntax. Scripts see the
//! instrument as the global `cg` (see [`super::bindings`]).
//!
//! # Example
//!
//! ```
//! use srs_cg635::instrument::Cg635;
//! use srs_cg635::scripting::{RhaiEngine, ScriptEngine};
//! use srs_cg635::transport::{MockTransport, Transport};
//!
//! let transport: Box<dyn Transport> = Box::new(MockTransport::new());
//! let mut engine = RhaiEngine::with_cg635(Cg635::new(transport), 100_000);
//! engine.execute_script(r#"
//!     cg.set_frequency(10e6);
//!     cg.set_display("frequency");
//! "#)?;
//! # Ok::<(), srs_cg635::scripting::ScriptError>(())
//! ```

use rhai::{Dynamic, Engine, EvalAltResult, Scope};

use super::bindings::{register_cg635, Cg635Handle};
use super::script_engine::{ScriptEngine, ScriptError};
use crate::instrument::Cg635;

/// Default operation budget per script execution
pub const DEFAULT_MAX_OPERATIONS: u64 = 1_000_000;

/// Rhai-based implementation of ScriptEngine
///
/// Scripts are stopped once they exceed the configured number of operations,
/// so a runaway loop cannot keep stepping the instrument forever.
pub struct RhaiEngine {
    engine: Engine,
    scope: Scope<'static>,
}

impl RhaiEngine {
    /// Create an engine with the default operation limit
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_MAX_OPERATIONS)
    }

    /// Create an engine with a custom operation limit
    pub fn with_limit(max_operations: u64) -> Self {
        let mut engine = Engine::new();

        engine.on_progress(move |count| {
            if count > max_operations {
                Some(
                    format!(
                        "Safety limit exceeded: maximum {} operations",
                        max_operations
                    )
                    .into(),
                )
            } else {
                None
            }
        });
        register_cg635(&mut engine);

        Self {
            engine,
            scope: Scope::new(),
        }
    }

    /// Create an engine with `cg` bound to the given controller
    pub fn with_cg635(cg: Cg635, max_operations: u64) -> Self {
        let mut engine = Self::with_limit(max_operations);
        engine.scope.push("cg", Cg635Handle::new(cg));
        engine
    }

    /// Underlying Rhai engine, for registering extra functions
    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }
}

impl Default for RhaiEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptEngine for RhaiEngine {
    type Value = Dynamic;

    fn execute_script(&mut self, script: &str) -> Result<Dynamic, ScriptError> {
        self.engine
            .eval_with_scope::<Dynamic>(&mut self.scope, script)
            .map_err(convert_rhai_error)
    }

    fn validate_script(&self, script: &str) -> Result<(), ScriptError> {
        self.engine
            .compile(script)
            .map(|_| ())
            .map_err(|e| convert_rhai_error(e.into()))
    }

    fn get_global(&self, name: &str) -> Result<Dynamic, ScriptError> {
        self.scope
            .get_value::<Dynamic>(name)
            .ok_or_else(|| ScriptError::VariableNotFound {
                name: name.to_string(),
            })
    }

    fn clear_globals(&mut self) {
        self.scope.clear();
    }

    fn backend_name(&self) -> &str {
        "Rhai"
    }
}

/// Convert Rhai's EvalAltResult to our ScriptError type
fn convert_rhai_error(error: Box<EvalAltResult>) -> ScriptError {
    match *error {
        EvalAltResult::ErrorParsing(parse_error, pos) => ScriptError::Compilation {
            message: parse_error.to_string(),
            line: pos.line(),
            column: pos.position(),
        },
        EvalAltResult::ErrorRuntime(message, _) => ScriptError::Runtime {
            message: message.to_string(),
        },
        EvalAltResult::ErrorTerminated(reason, _) => ScriptError::Runtime {
            message: reason.to_string(),
        },
        other => ScriptError::Runtime {
            message: other.to_string(),
        },
    }
}
