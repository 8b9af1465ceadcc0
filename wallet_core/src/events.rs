//! Progress events emitted while a transfer runs.

use std::fmt;
use std::time::Duration;

/// Coarse position of a transfer in its pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferStage {
    Starting,
    Syncing,
    CheckingBalance,
    EnsuringFeeTokens,
    Building,
    Signing,
    Proving,
    Submitting,
    Resyncing,
    TearingDown,
}

impl fmt::Display for TransferStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Starting => "starting wallet",
            Self::Syncing => "syncing wallet",
            Self::CheckingBalance => "checking balance",
            Self::EnsuringFeeTokens => "ensuring fee tokens",
            Self::Building => "building transaction",
            Self::Signing => "signing transaction",
            Self::Proving => "generating proof",
            Self::Submitting => "submitting transaction",
            Self::Resyncing => "resyncing after conflict",
            Self::TearingDown => "stopping wallet",
        })
    }
}

/// Something the caller may want to render.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransferEvent {
    Stage(TransferStage),
    /// Engine sync position, same shape as balance reconstruction progress.
    SyncProgress { applied: u64, highest: u64 },
    DustRegistered { utxos: usize, tx_id: String },
    DustWaiting { elapsed: Duration },
    Retrying { attempt: u32, reason: String },
    /// Non-fatal engine warning.
    Warning(String),
    Submitted { tx_id: String },
}
