//! # Simulation Error Types
//!
//! Errors that reach the caller of the simulation.
//!
//! Lossy quantization, lost contexts and spawn caps are handled where they
//! happen and never show up here.

use thiserror::Error;

/// Errors that can occur in the simulation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmberError {
    /// A redeclared tree does not have the shape of the previous one.
    ///
    /// The reconciliation was rejected as a whole; no proxy was touched.
    #[error("structural mismatch at {position}: expected {expected}, found {found}")]
    StructuralMismatch {
        /// Path of the first divergent position, e.g. `root[1].prototype[0]`.
        position: String,
        /// Shape found in the previous declaration.
        expected: String,
        /// Shape found in the new declaration.
        found: String,
    },

    /// Invalid configuration values or syntax.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    ConfigIo(String),
}

/// Result type for simulation operations.
pub type EmberResult<T> = Result<T, EmberError>;
