//! Scripting support for automating CG635 configuration.
//!
//! Scripts are written in [Rhai](https://rhai.rs) and see the connected
//! instrument as the global `cg`. The engine enforces an operation budget so a
//! runaway loop cannot keep issuing commands.
//!
//! # Architecture
//!
//! ```text
//! ScriptEngine trait
//!     └── RhaiEngine (persistent scope, operation limit)
//!
//! Instrument bindings
//!     └── Cg635Handle registered as type `Cg635`, plus sleep_ms()
//! ```
//!
//! # Example
//!
//! ```no_run
//! use srs_cg635::config::Settings;
//! use srs_cg635::instrument::Cg635;
//! use srs_cg635::scripting::{RhaiEngine, ScriptEngine};
//!
//! # fn main() -> anyhow::Result<()> {
//! let settings = Settings::load()?;
//! let cg = Cg635::connect(&settings)?;
//! let mut engine = RhaiEngine::with_cg635(cg, settings.scripting.max_operations);
//! engine.execute_script(r#"
//!     cg.set_output_standard("LVDS");
//!     for i in 0..5 {
//!         cg.step_up("q/q! high");
//!         sleep_ms(100);
//!     }
//! "#)?;
//! # Ok(())
//! # }
//! ```

pub mod bindings;
pub mod rhai_engine;
pub mod script_engine;

pub use bindings::{register_cg635, Cg635Handle};
pub use rhai_engine::{RhaiEngine, DEFAULT_MAX_OPERATIONS};
pub use script_engine::{ScriptEngine, ScriptError};
