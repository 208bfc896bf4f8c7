//! Custom error types for the driver.
//!
//! `Cg635Error` is the single error type of the crate. It separates three kinds
//! of failure:
//!
//! - **Precondition violations** (`FrequencyOutOfRange`, `InvalidStepSize`,
//!   `DifferentialOutOfRange`, `IndexOutOfRange`, `UnknownParameter`): the
//!   argument was rejected client-side and nothing was sent to the instrument.
//!   The caller must correct the input.
//! - **Transport failures** (`Transport`, `Io`, `Closed`, `FeatureNotEnabled`):
//!   raised by the communication layer. No retries are attempted.
//! - **Configuration failures** (`Config`): settings could not be loaded or did
//!   not validate.
//!
//! By using `#[from]`, lower-level errors convert with the `?` operator.

use thiserror::Error;

use crate::config::ConfigError;

/// Convenience alias for results using the driver error type.
pub type Cg635Result<T> = std::result::Result<T, Cg635Error>;

/// Errors raised by the CG635 driver.
#[derive(Error, Debug)]
pub enum Cg635Error {
    /// Settings could not be loaded or failed validation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error from the underlying transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error reported by the transport library (VISA).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The transport session has already been released.
    #[error("Instrument session is closed")]
    Closed,

    /// Requested frequency is outside [0, 2.05 GHz].
    #[error("Frequency must be in range [0, 2.05 GHz], got {0} Hz")]
    FrequencyOutOfRange(f64),

    /// Step size is NaN or infinite.
    #[error("Step size must be a finite number, got {0}")]
    InvalidStepSize(f64),

    /// Requested differential voltage is outside [0.20 V, 1.00 V].
    #[error(
        "Differential voltage must be in range [0.20 V, 1.00 V], got low {low} V, high {high} V"
    )]
    DifferentialOutOfRange {
        /// Requested low rail, volts
        low: f64,
        /// Requested high rail, volts
        high: f64,
    },

    /// Integer parameter index is outside the accepted table.
    #[error("{kind} index {index} is not in range [0, {max}]")]
    IndexOutOfRange {
        /// Table the index was checked against
        kind: &'static str,
        /// Rejected index
        index: i64,
        /// Largest accepted index
        max: usize,
    },

    /// Parameter name did not match any entry of the accepted table.
    #[error("{kind} '{name}' is not one of {accepted:?}")]
    UnknownParameter {
        /// Table the name was looked up in
        kind: &'static str,
        /// Rejected name
        name: String,
        /// Accepted names
        accepted: &'static [&'static str],
    },

    /// Functionality was not compiled in.
    #[error("Feature '{0}' is not enabled. Please build with --features {0}")]
    FeatureNotEnabled(String),
}
