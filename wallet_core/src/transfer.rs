//! Transfer orchestration.
//!
//! One run drives a payment through: validate, start the engine session,
//! initial sync, balance check, fee-token assurance, then
//! build/sign/prove/submit with a bounded retry on stale inputs. The
//! cancellation token is checked between steps, and the engine session is
//! stopped exactly once on every exit path.

use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep, timeout, timeout_at, Instant};
use tracing::{debug, info, warn};

use night_types::{NetworkProfile, NightAmount, Timestamp, TokenType, WalletAddress};

use crate::cancel::CancelToken;
use crate::engine::{TransferRecipe, WalletEngine, WalletSnapshot};
use crate::error::{EngineError, TransferError};
use crate::events::{TransferEvent, TransferStage};
use crate::signing::SigningMaterial;

/// Total build/sign/prove/submit attempts before a stale-input conflict is fatal.
pub const MAX_SUBMIT_ATTEMPTS: u32 = 3;

/// Time bounds for the suspension points of a transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferConfig {
    pub sync_timeout: Duration,
    /// Bound on the resync after a stale-input conflict.
    pub resync_timeout: Duration,
    pub dust_timeout: Duration,
    pub dust_poll_interval: Duration,
    pub proof_timeout: Duration,
    /// Validity window of the transaction from the moment it is built.
    pub ttl: Duration,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            sync_timeout: Duration::from_secs(300),
            resync_timeout: Duration::from_secs(60),
            dust_timeout: Duration::from_secs(300),
            dust_poll_interval: Duration::from_secs(5),
            proof_timeout: Duration::from_secs(300),
            ttl: Duration::from_secs(30 * 60),
        }
    }
}

/// One payment request. Amount and recipient are validated when the
/// transfer runs.
#[derive(Debug)]
pub struct TransferRequest {
    pub recipient: String,
    /// Amount in display units, e.g. `"12.5"`.
    pub amount: String,
    pub material: SigningMaterial,
    pub cancel: CancelToken,
}

/// Outcome of a successful transfer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferResult {
    pub tx_id: String,
    pub amount: NightAmount,
}

/// Per-run state: the engine session and its channels.
struct Session<'r, H> {
    handle: &'r H,
    state: watch::Receiver<WalletSnapshot>,
    warnings: mpsc::UnboundedReceiver<String>,
    cancel: &'r CancelToken,
}

impl<H> Session<'_, H> {
    fn checkpoint(&self) -> Result<(), TransferError> {
        if self.cancel.is_cancelled() {
            debug!("cancellation observed at checkpoint");
            return Err(TransferError::Cancelled);
        }
        Ok(())
    }

    fn latest(&self) -> WalletSnapshot {
        self.state.borrow().clone()
    }
}

type Observer<'a> = Box<dyn FnMut(&TransferEvent) + 'a>;

/// Runs transfers against one network through a [`WalletEngine`].
pub struct TransferOrchestrator<'a, E: WalletEngine> {
    engine: &'a E,
    profile: NetworkProfile,
    config: TransferConfig,
    observer: Observer<'a>,
}

impl<'a, E: WalletEngine> TransferOrchestrator<'a, E> {
    pub fn new(engine: &'a E, profile: NetworkProfile) -> Self {
        Self {
            engine,
            profile,
            config: TransferConfig::default(),
            observer: Box::new(|_| {}),
        }
    }

    pub fn with_config(mut self, config: TransferConfig) -> Self {
        self.config = config;
        self
    }

    /// Receive progress, stage and warning events.
    pub fn with_observer(mut self, observer: impl FnMut(&TransferEvent) + 'a) -> Self {
        self.observer = Box::new(observer);
        self
    }

    fn emit(&mut self, event: TransferEvent) {
        (self.observer)(&event);
    }

    fn stage(&mut self, stage: TransferStage) {
        debug!(%stage, "transfer stage");
        self.emit(TransferEvent::Stage(stage));
    }

    fn drain_warnings(&mut self, session: &mut Session<'_, E::Handle>) {
        while let Ok(warning) = session.warnings.try_recv() {
            warn!(warning = %warning, "wallet engine warning");
            self.emit(TransferEvent::Warning(warning));
        }
    }

    /// Execute one transfer end to end.
    pub async fn execute(&mut self, request: TransferRequest) -> Result<TransferResult, TransferError> {
        let amount = NightAmount::parse_display(&request.amount)?;
        let recipient = WalletAddress::decode_for(&request.recipient, self.profile.network)?;
        if request.cancel.is_cancelled() {
            return Err(TransferError::Cancelled);
        }

        self.stage(TransferStage::Starting);
        let (warning_tx, warning_rx) = mpsc::unbounded_channel();
        let handle = self
            .engine
            .start(&request.material, &self.profile, warning_tx)
            .await?;

        let mut session = Session {
            handle: &handle,
            state: self.engine.state(&handle),
            warnings: warning_rx,
            cancel: &request.cancel,
        };
        let outcome = self.run(&mut session, &recipient, amount).await;
        self.drain_warnings(&mut session);
        drop(session);

        self.stage(TransferStage::TearingDown);
        if let Err(e) = self.engine.stop(handle).await {
            warn!("failed to stop wallet engine: {e}");
        }

        match &outcome {
            Ok(result) => info!(tx_id = %result.tx_id, amount = %result.amount, "transfer submitted"),
            Err(e) if e.is_cancelled() => info!("transfer cancelled"),
            Err(e) => warn!("transfer failed: {e}"),
        }
        outcome
    }

    async fn run(
        &mut self,
        session: &mut Session<'_, E::Handle>,
        recipient: &WalletAddress,
        amount: NightAmount,
    ) -> Result<TransferResult, TransferError> {
        session.checkpoint()?;

        self.stage(TransferStage::Syncing);
        self.wait_for_sync(session, self.config.sync_timeout).await?;
        session.checkpoint()?;

        self.stage(TransferStage::CheckingBalance);
        let available = NightAmount::from_minor(session.latest().native_balance());
        if available.checked_sub(amount).is_none() {
            return Err(TransferError::InsufficientBalance {
                available: available.to_display(),
                requested: amount.to_display(),
            });
        }
        session.checkpoint()?;

        self.stage(TransferStage::EnsuringFeeTokens);
        self.ensure_fee_tokens(session).await?;
        session.checkpoint()?;

        let mut attempt = 1;
        loop {
            match self.build_and_submit(session, recipient, amount).await {
                Ok(tx_id) => return Ok(TransferResult { tx_id, amount }),
                Err(TransferError::Engine(EngineError::StaleInput(reason))) => {
                    if attempt >= MAX_SUBMIT_ATTEMPTS {
                        return Err(TransferError::ConflictExhausted {
                            attempts: attempt,
                            reason,
                        });
                    }
                    warn!(attempt, %reason, "stale input, resyncing before retry");
                    self.emit(TransferEvent::Retrying {
                        attempt,
                        reason,
                    });
                    session.checkpoint()?;

                    self.stage(TransferStage::Resyncing);
                    self.engine.resync(session.handle).await?;
                    self.wait_for_sync(session, self.config.resync_timeout)
                        .await?;
                    session.checkpoint()?;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Block until the engine reports a synced state or `budget` elapses.
    async fn wait_for_sync(
        &mut self,
        session: &mut Session<'_, E::Handle>,
        budget: Duration,
    ) -> Result<(), TransferError> {
        let deadline = Instant::now() + budget;
        loop {
            let (synced, applied, highest) = {
                let snapshot = session.state.borrow_and_update();
                (snapshot.synced, snapshot.applied, snapshot.highest)
            };
            self.emit(TransferEvent::SyncProgress { applied, highest });
            self.drain_warnings(session);
            if synced {
                return Ok(());
            }

            match timeout_at(deadline, session.state.changed()).await {
                Ok(Ok(())) => {}
                Ok(Err(_)) => return Err(EngineError::StateClosed.into()),
                Err(_) => return Err(TransferError::SyncTimeout { budget }),
            }
        }
    }

    /// Make sure fee tokens are available, registering UTXOs if needed.
    async fn ensure_fee_tokens(
        &mut self,
        session: &mut Session<'_, E::Handle>,
    ) -> Result<(), TransferError> {
        let snapshot = session.latest();
        if snapshot.dust_balance > 0 {
            debug!(dust = snapshot.dust_balance, "fee tokens available");
            return Ok(());
        }

        let unregistered = snapshot.unregistered_utxos();
        if !unregistered.is_empty() {
            info!(utxos = unregistered.len(), "registering UTXOs for fee-token generation");
            let tx_id = self
                .engine
                .register_dust(session.handle, &unregistered)
                .await?;
            self.emit(TransferEvent::DustRegistered {
                utxos: unregistered.len(),
                tx_id,
            });
        }

        // Waits out the full budget even when nothing is registered: a
        // generating balance and one that never comes look the same.
        let started = Instant::now();
        let deadline = started + self.config.dust_timeout;
        loop {
            session.checkpoint()?;
            self.drain_warnings(session);
            if session.latest().dust_balance > 0 {
                debug!(waited = ?started.elapsed(), "fee tokens arrived");
                return Ok(());
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(TransferError::FeeTokenTimeout {
                    budget: self.config.dust_timeout,
                });
            }
            self.emit(TransferEvent::DustWaiting {
                elapsed: now - started,
            });

            let pause = self.config.dust_poll_interval.min(deadline - now);
            tokio::select! {
                _ = sleep(pause) => {}
                _ = session.cancel.cancelled() => {}
            }
        }
    }

    /// Build, sign, prove and submit one transaction.
    async fn build_and_submit(
        &mut self,
        session: &mut Session<'_, E::Handle>,
        recipient: &WalletAddress,
        amount: NightAmount,
    ) -> Result<String, TransferError> {
        let recipe = TransferRecipe {
            token_type: TokenType::NATIVE,
            recipient: recipient.to_string(),
            amount: amount.minor(),
            ttl: Timestamp::now().plus(self.config.ttl),
        };

        self.stage(TransferStage::Building);
        let unproven = self.engine.build_transfer(session.handle, &recipe).await?;

        self.stage(TransferStage::Signing);
        let signed = self.engine.sign(session.handle, unproven).await?;

        self.stage(TransferStage::Proving);
        let budget = self.config.proof_timeout;
        let finalized = timeout(budget, self.engine.prove(session.handle, signed))
            .await
            .map_err(|_| TransferError::ProofTimeout { budget })??;

        self.stage(TransferStage::Submitting);
        let tx_id = self.engine.submit(session.handle, finalized).await?;
        self.emit(TransferEvent::Submitted {
            tx_id: tx_id.clone(),
        });
        Ok(tx_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_timeouts() {
        let config = TransferConfig::default();
        assert_eq!(config.sync_timeout, Duration::from_secs(300));
        assert!(config.resync_timeout < config.sync_timeout);
        assert_eq!(config.ttl, Duration::from_secs(1800));
    }
}
