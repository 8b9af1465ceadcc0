use std::time::Duration;
use thiserror::Error;

use night_types::TypesError;

/// Failures reported by a wallet engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// An input UTXO was consumed elsewhere between sync and submission.
    #[error("stale input: {0}")]
    StaleInput(String),

    #[error("transaction rejected: {0}")]
    Rejected(String),

    #[error("wallet engine at {endpoint} unreachable: {reason}")]
    Transport { endpoint: String, reason: String },

    #[error("invalid response from wallet engine: {0}")]
    InvalidResponse(String),

    #[error("wallet state stream closed")]
    StateClosed,

    #[error("{0}")]
    Other(String),
}

/// Why a transfer did not complete.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("invalid transfer request: {0}")]
    Validation(#[from] TypesError),

    #[error("insufficient NIGHT balance: requested {requested}, available {available}")]
    InsufficientBalance { available: String, requested: String },

    #[error("wallet did not finish syncing within {budget:?}")]
    SyncTimeout { budget: Duration },

    #[error("no fee tokens (dust) became available within {budget:?}")]
    FeeTokenTimeout { budget: Duration },

    #[error("proof generation did not finish within {budget:?}")]
    ProofTimeout { budget: Duration },

    #[error("transfer kept conflicting with other spends after {attempts} attempts: {reason}")]
    ConflictExhausted { attempts: u32, reason: String },

    #[error("transfer cancelled")]
    Cancelled,

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl TransferError {
    /// User-initiated aborts are not failures from the caller's point of view.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Errors loading or saving the wallet configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("cannot write config {path}: {reason}")]
    Write { path: String, reason: String },

    #[error("invalid config: {0}")]
    Parse(String),

    #[error("no home directory; set NIGHT_WALLET_HOME")]
    NoHome,
}
