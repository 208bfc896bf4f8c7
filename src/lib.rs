//! Driver for the Stanford Research Systems CG635 clock generator.
//!
//! The CG635 is programmed over GPIB with a small set of SCPI-style commands.
//! This crate validates arguments client-side, translates them into command
//! strings and sends them through a [`transport::Transport`]. VISA access is
//! provided by the `instrument_visa` feature; a simulated instrument is always
//! available for tests and dry runs.
//!
//! - [`instrument::Cg635`]: the controller
//! - [`parameters`]: display, step and output-standard tables
//! - [`config`]: figment-based settings
//! - [`scripting`]: Rhai automation with the instrument bound to `cg`

pub mod config;
pub mod error;
pub mod instrument;
pub mod parameters;
pub mod scripting;
pub mod transport;

pub use error::{Cg635Error, Cg635Result};
pub use instrument::Cg635;
