//! Nullable infrastructure for deterministic testing.
//!
//! The indexer feed and the wallet engine are abstracted behind traits
//! (`FrameSource`, `WalletEngine`). This crate provides test-friendly
//! implementations that:
//! - Replay scripted frames and state transitions
//! - Inject failures (server errors, stale inputs, slow proofs, stalls)
//! - Count calls so tests can assert on teardown and retry bounds
//! - Never touch the network
//!
//! Usage: hand a nullable to the reconstructor or orchestrator in tests.

pub mod engine;
pub mod feed;

pub use engine::{CallCounts, NullEngine, NullHandle};
pub use feed::{native, CloseCounter, NullFeed};

use night_types::{IntentHash, TokenType, UtxoId};

/// Deterministic UTXO id: intent hash filled with `seed`.
pub fn utxo_id(seed: u8, output_index: u32) -> UtxoId {
    UtxoId::new(IntentHash::new([seed; 32]), output_index)
}

/// A non-native token type filled with `seed`.
pub fn token(seed: u8) -> TokenType {
    TokenType::new([seed; 32])
}
