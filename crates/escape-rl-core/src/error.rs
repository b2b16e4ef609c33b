//! Error types for the RL core library

use thiserror::Error;

/// Core error type for RL operations
#[derive(Error, Debug)]
pub enum RLError {
    /// Environment-related errors
    #[error("Environment error: {0}")]
    Environment(String),
    
    /// State outside the domain of a table or policy
    #[error("Invalid state: {0}")]
    InvalidState(String),
    
    /// Operation the environment does not provide (contract violation)
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
    
    /// Layout generation gave up after repeated infeasible attempts
    #[error("Infeasible layout for {room} after {attempts} attempts")]
    InfeasibleLayout {
        /// Room name
        room: String,
        /// Number of attempts made
        attempts: usize,
    },
    
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for RL operations
pub type Result<T> = std::result::Result<T, RLError>;
