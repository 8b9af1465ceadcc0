//! Nullable wallet engine: synthetic state transitions and injected failures.

use std::cell::{Cell, RefCell};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use night_types::{NetworkProfile, TokenType, UtxoId};
use night_wallet_core::engine::{
    FinalizedTransaction, NightUtxo, SignedTransaction, TransferRecipe, UnprovenTransaction,
    WalletEngine, WalletSnapshot, WarningSender,
};
use night_wallet_core::{CancelToken, EngineError, SigningMaterial};

/// How many times each engine operation was invoked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub start: u32,
    pub stop: u32,
    pub resync: u32,
    pub register_dust: u32,
    pub build: u32,
    pub sign: u32,
    pub prove: u32,
    pub submit: u32,
}

/// A running null session.
pub struct NullHandle {
    publisher: Arc<watch::Sender<WalletSnapshot>>,
}

impl NullHandle {
    /// Publish a modified snapshot, as the engine's sync loop would.
    pub fn publish(&self, modify: impl FnOnce(&mut WalletSnapshot)) {
        self.publisher.send_modify(modify);
    }
}

/// A test wallet engine.
///
/// Starts from a configured snapshot; by default the session is synced
/// immediately, holds fee tokens and every call succeeds.
pub struct NullEngine {
    initial: WalletSnapshot,
    sync_delay: Option<Duration>,
    never_sync: bool,
    resync_stalls: bool,
    dust_after_registration: Option<(u128, Duration)>,
    stale_submits: Cell<u32>,
    prove_delay: Option<Duration>,
    start_failure: Option<EngineError>,
    stop_failure: Option<EngineError>,
    warnings: Vec<String>,
    cancel_on_stale: Option<CancelToken>,
    cancel_on_resync: Option<CancelToken>,
    calls: Cell<CallCounts>,
    recipes: RefCell<Vec<TransferRecipe>>,
    registered: RefCell<Vec<UtxoId>>,
    last_handle: RefCell<Option<Arc<watch::Sender<WalletSnapshot>>>>,
}

impl NullEngine {
    /// Engine holding `balance` minor units of the native token and some
    /// fee tokens.
    pub fn with_balance(balance: u128) -> Self {
        let mut initial = WalletSnapshot {
            synced: true,
            applied: 1,
            highest: 1,
            dust_balance: 1_000,
            ..WalletSnapshot::default()
        };
        initial.balances.insert(TokenType::NATIVE, balance);
        Self::from_snapshot(initial)
    }

    pub fn from_snapshot(initial: WalletSnapshot) -> Self {
        Self {
            initial,
            sync_delay: None,
            never_sync: false,
            resync_stalls: false,
            dust_after_registration: None,
            stale_submits: Cell::new(0),
            prove_delay: None,
            start_failure: None,
            stop_failure: None,
            warnings: Vec::new(),
            cancel_on_stale: None,
            cancel_on_resync: None,
            calls: Cell::new(CallCounts::default()),
            recipes: RefCell::new(Vec::new()),
            registered: RefCell::new(Vec::new()),
            last_handle: RefCell::new(None),
        }
    }

    /// Report synced only after `delay`, on start and after each resync.
    pub fn sync_after(mut self, delay: Duration) -> Self {
        self.sync_delay = Some(delay);
        self
    }

    /// Never report a synced state.
    pub fn never_synced(mut self) -> Self {
        self.never_sync = true;
        self
    }

    /// The initial sync completes as usual, but a resync never does.
    pub fn stall_resync(mut self) -> Self {
        self.resync_stalls = true;
        self
    }

    /// Start with no fee tokens and the given unregistered native UTXOs.
    pub fn without_dust(mut self, utxos: Vec<(UtxoId, u128)>) -> Self {
        self.initial.dust_balance = 0;
        self.initial.night_utxos = utxos
            .into_iter()
            .map(|(id, value)| NightUtxo {
                id,
                value,
                registered_for_dust: false,
            })
            .collect();
        self
    }

    /// Fee tokens appear `delay` after a registration.
    pub fn dust_after_registration(mut self, amount: u128, delay: Duration) -> Self {
        self.dust_after_registration = Some((amount, delay));
        self
    }

    /// The next `n` submissions fail with a stale input.
    pub fn stale_submits(self, n: u32) -> Self {
        self.stale_submits.set(n);
        self
    }

    /// Every submission fails with a stale input.
    pub fn always_stale(self) -> Self {
        self.stale_submits(u32::MAX)
    }

    /// Proving takes `delay`.
    pub fn slow_prove(mut self, delay: Duration) -> Self {
        self.prove_delay = Some(delay);
        self
    }

    pub fn failing_start(mut self, error: EngineError) -> Self {
        self.start_failure = Some(error);
        self
    }

    pub fn failing_stop(mut self, error: EngineError) -> Self {
        self.stop_failure = Some(error);
        self
    }

    /// Raise `token` whenever a submission is refused as stale, as a user
    /// pressing Ctrl-C at that moment would.
    pub fn cancel_on_stale(mut self, token: CancelToken) -> Self {
        self.cancel_on_stale = Some(token);
        self
    }

    /// Raise `token` while a resync is in flight.
    pub fn cancel_on_resync(mut self, token: CancelToken) -> Self {
        self.cancel_on_resync = Some(token);
        self
    }

    /// Warnings reported right after start.
    pub fn warn_on_start(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn calls(&self) -> CallCounts {
        self.calls.get()
    }

    /// Recipes passed to `build_transfer`, in order.
    pub fn recipes(&self) -> Vec<TransferRecipe> {
        self.recipes.borrow().clone()
    }

    /// UTXOs passed to `register_dust`.
    pub fn registered(&self) -> Vec<UtxoId> {
        self.registered.borrow().clone()
    }

    /// Latest snapshot of the most recent session, if one was started.
    pub fn current_state(&self) -> Option<WalletSnapshot> {
        self.last_handle
            .borrow()
            .as_ref()
            .map(|publisher| publisher.borrow().clone())
    }

    fn count(&self, bump: impl FnOnce(&mut CallCounts)) {
        let mut calls = self.calls.get();
        bump(&mut calls);
        self.calls.set(calls);
    }

    /// Mark the session synced now or after the configured delay.
    fn schedule_sync(&self, publisher: &Arc<watch::Sender<WalletSnapshot>>) {
        if self.never_sync {
            return;
        }
        let mark = |s: &mut WalletSnapshot| {
            s.synced = true;
            s.applied = s.highest;
        };
        match self.sync_delay {
            None => publisher.send_modify(mark),
            Some(delay) => {
                let publisher = Arc::clone(publisher);
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    publisher.send_modify(mark);
                });
            }
        }
    }
}

impl WalletEngine for NullEngine {
    type Handle = NullHandle;

    async fn start(
        &self,
        _material: &SigningMaterial,
        _profile: &NetworkProfile,
        warnings: WarningSender,
    ) -> Result<NullHandle, EngineError> {
        self.count(|c| c.start += 1);
        if let Some(error) = &self.start_failure {
            return Err(error.clone());
        }

        let snapshot = WalletSnapshot {
            synced: false,
            applied: 0,
            ..self.initial.clone()
        };
        let (tx, _) = watch::channel(snapshot);
        let publisher = Arc::new(tx);
        for warning in &self.warnings {
            let _ = warnings.send(warning.clone());
        }
        self.schedule_sync(&publisher);
        *self.last_handle.borrow_mut() = Some(Arc::clone(&publisher));
        Ok(NullHandle { publisher })
    }

    fn state(&self, handle: &NullHandle) -> watch::Receiver<WalletSnapshot> {
        handle.publisher.subscribe()
    }

    async fn resync(&self, handle: &NullHandle) -> Result<(), EngineError> {
        self.count(|c| c.resync += 1);
        handle.publish(|s| s.synced = false);
        if let Some(token) = &self.cancel_on_resync {
            token.cancel();
        }
        if !self.resync_stalls {
            self.schedule_sync(&handle.publisher);
        }
        Ok(())
    }

    async fn register_dust(
        &self,
        handle: &NullHandle,
        utxos: &[UtxoId],
    ) -> Result<String, EngineError> {
        self.count(|c| c.register_dust += 1);
        self.registered.borrow_mut().extend_from_slice(utxos);

        let ids = utxos.to_vec();
        handle.publish(|s| {
            for utxo in s.night_utxos.iter_mut().filter(|u| ids.contains(&u.id)) {
                utxo.registered_for_dust = true;
            }
        });

        if let Some((amount, delay)) = self.dust_after_registration {
            let publisher = Arc::clone(&handle.publisher);
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                publisher.send_modify(|s| s.dust_balance = amount);
            });
        }
        Ok(format!("dust-registration-{}", self.calls.get().register_dust))
    }

    async fn build_transfer(
        &self,
        _handle: &NullHandle,
        recipe: &TransferRecipe,
    ) -> Result<UnprovenTransaction, EngineError> {
        self.count(|c| c.build += 1);
        self.recipes.borrow_mut().push(recipe.clone());
        Ok(UnprovenTransaction(format!("unproven-{}", recipe.amount)))
    }

    async fn sign(
        &self,
        _handle: &NullHandle,
        tx: UnprovenTransaction,
    ) -> Result<SignedTransaction, EngineError> {
        self.count(|c| c.sign += 1);
        Ok(SignedTransaction(tx.0.replace("unproven", "signed")))
    }

    async fn prove(
        &self,
        _handle: &NullHandle,
        tx: SignedTransaction,
    ) -> Result<FinalizedTransaction, EngineError> {
        self.count(|c| c.prove += 1);
        if let Some(delay) = self.prove_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(FinalizedTransaction(tx.0.replace("signed", "finalized")))
    }

    async fn submit(
        &self,
        _handle: &NullHandle,
        _tx: FinalizedTransaction,
    ) -> Result<String, EngineError> {
        self.count(|c| c.submit += 1);
        let remaining = self.stale_submits.get();
        if remaining > 0 {
            if remaining != u32::MAX {
                self.stale_submits.set(remaining - 1);
            }
            if let Some(token) = &self.cancel_on_stale {
                token.cancel();
            }
            return Err(EngineError::StaleInput("input already spent".into()));
        }
        Ok(format!("tx-{}", self.calls.get().submit))
    }

    async fn stop(&self, _handle: NullHandle) -> Result<(), EngineError> {
        self.count(|c| c.stop += 1);
        match &self.stop_failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}
