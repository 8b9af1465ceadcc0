//! Wallet core library for the NIGHT wallet.
//!
//! Provides what the CLI needs to move funds:
//! - The wallet engine interface and its JSON-RPC client
//! - Transfer orchestration (sync, fee tokens, build/sign/prove/submit, retry)
//! - Cooperative cancellation
//! - Signing material handling
//! - Configuration file support

pub mod cancel;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod rpc_engine;
pub mod signing;
pub mod transfer;

pub use cancel::CancelToken;
pub use config::{TimeoutConfig, WalletConfig};
pub use engine::{
    FinalizedTransaction, NightUtxo, SignedTransaction, TransferRecipe, UnprovenTransaction,
    WalletEngine, WalletSnapshot, WarningSender,
};
pub use error::{ConfigError, EngineError, TransferError};
pub use events::{TransferEvent, TransferStage};
pub use rpc_engine::{RpcEngine, RpcSession};
pub use signing::SigningMaterial;
pub use transfer::{
    TransferConfig, TransferOrchestrator, TransferRequest, TransferResult, MAX_SUBMIT_ATTEMPTS,
};
