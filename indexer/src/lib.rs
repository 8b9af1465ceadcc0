//! Balance reconstruction from the indexer subscription feed.
//!
//! The indexer streams two kinds of frames for an address: transaction
//! frames (created and spent UTXOs) and progress frames (the highest
//! transaction id the indexer knows about). [`UtxoLedger`] folds those frames
//! into a working set of UTXOs; [`BalanceReconstructor`] drives the fold over
//! a [`FrameSource`] until the completion rule fires, then closes the source.

pub mod error;
pub mod frame;
pub mod ledger;
pub mod reconstruct;
pub mod source;
pub mod subscription;
pub mod wire;

pub use error::IndexerError;
pub use frame::{CreatedUtxo, FeedFrame, TransactionFrame};
pub use ledger::{BalanceSnapshot, SyncProgress, Utxo, UtxoLedger};
pub use reconstruct::{reconstruct_balance, BalanceReconstructor, DEFAULT_BUDGET};
pub use source::FrameSource;
pub use subscription::Subscription;
