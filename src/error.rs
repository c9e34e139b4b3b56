//! Error taxonomy for the tire core.
//!
//! Only genuinely malformed inputs are errors; an unachievable force request
//! is a normal answer (see [`crate::inverse::InverseSolution::feasible`]) and
//! near-zero rolling speed is handled by the integrator's direct branch.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TireError {
    /// Rejected before any state mutation; the tire is left unchanged.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A parameter failed validation (NaN, wrong sign, zero where a divisor
    /// is needed).
    #[error("invalid parameter `{key}`: {reason}")]
    InvalidParameter { key: &'static str, reason: String },

    /// A line of a `.tire` parameter file could not be parsed.
    #[error("parameter file line {line}: {reason}")]
    ParseError { line: usize, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TireError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        TireError::InvalidInput(msg.into())
    }
}
