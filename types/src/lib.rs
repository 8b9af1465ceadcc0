//! Fundamental types for the NIGHT wallet.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! network profiles, addresses, fixed-point amounts, token types, UTXO identity and timestamps.

pub mod address;
pub mod amount;
pub mod error;
pub mod hash;
pub mod network;
pub mod profile;
pub mod time;
pub mod token;

pub use address::WalletAddress;
pub use amount::NightAmount;
pub use error::TypesError;
pub use hash::{IntentHash, UtxoId};
pub use network::NetworkId;
pub use profile::{EndpointOverrides, NetworkProfile, ProfileSource, ResolvedProfile, Resolver};
pub use time::Timestamp;
pub use token::TokenType;
