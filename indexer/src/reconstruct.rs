//! Driving the ledger fold to completion.

use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info};

use night_types::WalletAddress;

use crate::error::IndexerError;
use crate::frame::FeedFrame;
use crate::ledger::{BalanceSnapshot, UtxoLedger};
use crate::source::FrameSource;
use crate::subscription::Subscription;

/// Wall-clock budget for one reconstruction, independent of frame activity.
pub const DEFAULT_BUDGET: Duration = Duration::from_secs(120);

/// Callback receiving `(last_applied, highest_known)` after each transaction frame.
pub type ProgressFn<'a> = &'a mut dyn FnMut(u64, u64);

/// Reconstruct the balance of `address` from the indexer at `endpoint`
/// using [`DEFAULT_BUDGET`].
pub async fn reconstruct_balance(
    address: &WalletAddress,
    endpoint: &str,
    on_progress: Option<ProgressFn<'_>>,
) -> Result<BalanceSnapshot, IndexerError> {
    BalanceReconstructor::new(DEFAULT_BUDGET)
        .reconstruct(address, endpoint, on_progress)
        .await
}

/// Builds a [`BalanceSnapshot`] from a live feed within a time budget.
#[derive(Clone, Copy, Debug)]
pub struct BalanceReconstructor {
    budget: Duration,
}

impl Default for BalanceReconstructor {
    fn default() -> Self {
        Self::new(DEFAULT_BUDGET)
    }
}

impl BalanceReconstructor {
    pub fn new(budget: Duration) -> Self {
        Self { budget }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Open a subscription for `address` and fold it to completion.
    ///
    /// The budget covers connecting and the handshake as well as consuming
    /// frames. A handshake that fails or runs out of time still closes the
    /// websocket.
    pub async fn reconstruct(
        &self,
        address: &WalletAddress,
        endpoint: &str,
        on_progress: Option<ProgressFn<'_>>,
    ) -> Result<BalanceSnapshot, IndexerError> {
        let deadline = Instant::now() + self.budget;
        let timed_out = || IndexerError::Timeout {
            endpoint: endpoint.to_string(),
            budget: self.budget,
        };

        let mut subscription = timeout_at(deadline, Subscription::connect(endpoint))
            .await
            .map_err(|_| timed_out())??;
        match timeout_at(deadline, subscription.subscribe(address.as_str())).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                subscription.abandon().await;
                return Err(e);
            }
            Err(_) => {
                subscription.abandon().await;
                return Err(timed_out());
            }
        }
        self.run(subscription, deadline, on_progress).await
    }

    /// Fold frames from an already open source. The source is closed exactly
    /// once, whatever the outcome.
    pub async fn reconstruct_from<S: FrameSource>(
        &self,
        source: S,
        on_progress: Option<ProgressFn<'_>>,
    ) -> Result<BalanceSnapshot, IndexerError> {
        self.run(source, Instant::now() + self.budget, on_progress)
            .await
    }

    async fn run<S: FrameSource>(
        &self,
        mut source: S,
        deadline: Instant,
        on_progress: Option<ProgressFn<'_>>,
    ) -> Result<BalanceSnapshot, IndexerError> {
        let endpoint = source.endpoint().to_string();
        let mut ledger = UtxoLedger::new();

        let outcome = timeout_at(deadline, fold(&mut source, &mut ledger, on_progress)).await;
        source.close().await;

        match outcome {
            Ok(Ok(())) => {
                let snapshot = ledger.snapshot();
                info!(
                    endpoint = %endpoint,
                    transactions = snapshot.tx_count,
                    utxos = snapshot.utxo_count,
                    "balance reconstructed"
                );
                Ok(snapshot)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(IndexerError::Timeout {
                endpoint,
                budget: self.budget,
            }),
        }
    }
}

/// Apply frames in delivery order until the ledger reports completion.
async fn fold<S: FrameSource>(
    source: &mut S,
    ledger: &mut UtxoLedger,
    mut on_progress: Option<ProgressFn<'_>>,
) -> Result<(), IndexerError> {
    loop {
        let frame = match source.next_frame().await? {
            Some(frame) => frame,
            None => {
                return Err(IndexerError::Connection {
                    endpoint: source.endpoint().to_string(),
                    reason: "feed ended before sync completed".to_string(),
                })
            }
        };

        ledger.apply(&frame);

        if let FeedFrame::Transaction(_) = frame {
            let progress = ledger.progress();
            if let Some(callback) = on_progress.as_mut() {
                callback(progress.last_applied, progress.highest_known.unwrap_or(0));
            }
        } else {
            debug!(progress = ?ledger.progress(), "progress frame");
        }

        if ledger.is_complete() {
            return Ok(());
        }
    }
}
