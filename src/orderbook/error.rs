//! Error types for the matching engine and the market manager.

use thiserror::Error;

/// Errors produced by a single matching engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// A supplied argument failed validation (non-positive price/quantity,
    /// unknown side, GTD without an expiry, etc).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An invariant was violated internally. Always logged at `error` level
    /// before being returned; should never occur in correct operation.
    #[error("internal engine error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Errors produced by the market manager.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ManagerError {
    /// `create_market` was called for a symbol that already has an engine.
    #[error("market already exists: {0}")]
    AlreadyExists(String),

    /// An operation referenced a symbol with no registered engine.
    #[error("unknown market: {0}")]
    MarketNotFound(String),

    /// The routed-to engine rejected the operation.
    #[error("engine error for market {symbol}: {source}")]
    Engine {
        symbol: String,
        #[source]
        source: EngineError,
    },
}

/// Result alias for engine operations that can fail validation.
pub type EngineResult<T> = Result<T, EngineError>;

/// Result alias for manager operations that can fail validation or routing.
pub type ManagerResult<T> = Result<T, ManagerError>;
