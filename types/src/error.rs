//! Error type for parsing and validating wallet primitives.

use thiserror::Error;

/// Errors raised while parsing amounts, addresses, hashes and network names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypesError {
    #[error("invalid amount {0:?}: expected a decimal number such as 12.5")]
    InvalidAmount(String),

    #[error("amount must be greater than zero")]
    NonPositiveAmount,

    #[error("amount {amount:?} has more than {max_decimals} fractional digits")]
    ExcessPrecision { amount: String, max_decimals: u32 },

    #[error("amount {0:?} is too large")]
    AmountOverflow(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("address belongs to network {found}, expected {expected}")]
    NetworkMismatch { expected: String, found: String },

    #[error("unknown network {name:?} (valid networks: {valid})")]
    UnknownNetwork { name: String, valid: String },

    #[error("invalid hex value: {0}")]
    InvalidHex(String),
}
