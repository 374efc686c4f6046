//! Submitting transactions and waiting for their receipts.

use crate::{
    address::derive_create_address,
    backend::{Backend, BackendError, BackendKind, SimBackend},
    bytes::RawBytes,
    error::{HarnessError, Result},
    receipt::{Deployment, PendingTransaction, Receipt},
    tx::{TransactionIntent, TxFormat},
};
use alloy_primitives::{Address, TxHash, map::AddressHashSet};
use parking_lot::Mutex;
use std::{sync::Arc, time::Duration};

/// Timing knobs of a [`Harness`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settings {
    /// Deadline used by [`Harness::transact`] and [`Harness::deploy`].
    pub receipt_timeout: Duration,
    /// Delay between two receipt lookups.
    pub poll_interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self { receipt_timeout: Duration::from_secs(120), poll_interval: Duration::from_millis(250) }
    }
}

/// A handle on one chain.
///
/// Every operation goes through an explicit `Harness` value; there is no process-wide
/// connection. Clones share the backend and the set of active impersonations, while separately
/// constructed harnesses share nothing.
#[derive(Clone, Debug)]
pub struct Harness {
    backend: Arc<dyn Backend>,
    settings: Settings,
    pub(crate) sessions: Arc<Mutex<AddressHashSet>>,
}

impl Harness {
    pub fn new(backend: impl Backend + 'static) -> Self {
        Self::from_arc(Arc::new(backend))
    }

    pub fn from_arc(backend: Arc<dyn Backend>) -> Self {
        Self { backend, settings: Settings::default(), sessions: Default::default() }
    }

    /// A harness over a fresh in-process chain with funded development accounts.
    pub fn simulated() -> Self {
        Self::new(SimBackend::default())
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// Accounts the backend can sign for.
    pub async fn accounts(&self) -> Result<Vec<Address>> {
        self.backend.accounts().await.map_err(HarnessError::query("eth_accounts"))
    }

    /// Hands `intent` to the backend for signing and broadcast.
    ///
    /// The nonce is the sender's pending transaction count at this moment, so sequential
    /// submissions from one account get increasing nonces even before earlier ones are mined.
    pub async fn submit(&self, intent: TransactionIntent) -> Result<PendingTransaction> {
        let from = intent.from();
        let nonce = self
            .backend
            .transaction_count(from)
            .await
            .map_err(HarnessError::query("eth_getTransactionCount"))?;
        debug!(target: "harness::client", %from, nonce, kind = ?intent.kind(), "submitting transaction");

        let hash = self.backend.send_transaction(intent.to_request(Some(nonce))).await.map_err(
            |err| match err {
                BackendError::NoSignerAvailable(_) => HarnessError::SigningUnavailable { from },
                source => HarnessError::Submission { from, source },
            },
        )?;
        trace!(target: "harness::client", %hash, "transaction accepted");
        Ok(PendingTransaction::new(intent, nonce, hash))
    }

    /// Waits until `pending` is included, for at most `timeout`.
    ///
    /// A receipt with a failure status is returned as [`HarnessError::Reverted`].
    pub async fn await_receipt(
        &self,
        pending: &PendingTransaction,
        timeout: Duration,
    ) -> Result<Receipt> {
        let hash = pending.hash();
        let receipt = tokio::time::timeout(timeout, self.poll_receipt(hash))
            .await
            .map_err(|_| HarnessError::Timeout { hash, timeout })??;

        if !receipt.is_success() {
            warn!(target: "harness::client", %hash, block = ?receipt.block_number, "transaction reverted");
            return Err(HarnessError::Reverted(Box::new(receipt)));
        }
        debug!(target: "harness::client", %hash, gas_used = receipt.gas_used, "transaction included");
        Ok(receipt)
    }

    async fn poll_receipt(&self, hash: TxHash) -> Result<Receipt> {
        loop {
            let receipt = self
                .backend
                .transaction_receipt(hash)
                .await
                .map_err(HarnessError::query("eth_getTransactionReceipt"))?;
            if let Some(receipt) = receipt {
                return Ok(receipt);
            }
            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }

    /// Submits `intent` and waits for its receipt with the configured timeout.
    pub async fn transact(&self, intent: TransactionIntent) -> Result<Receipt> {
        let pending = self.submit(intent).await?;
        self.await_receipt(&pending, self.settings.receipt_timeout).await
    }

    /// Deploys `init_code` from `from` and checks the node placed it at the derived address.
    pub async fn deploy(
        &self,
        from: Address,
        init_code: RawBytes,
        format: TxFormat,
    ) -> Result<Deployment> {
        let pending =
            self.submit(TransactionIntent::build_creation(from, init_code, format)).await?;
        let predicted = derive_create_address(from, pending.nonce());
        let receipt = self.await_receipt(&pending, self.settings.receipt_timeout).await?;
        match receipt.contract_address {
            Some(reported) if reported == predicted => {
                info!(target: "harness::client", address = %predicted, "contract deployed");
                Ok(Deployment { address: predicted, receipt })
            }
            reported => Err(HarnessError::AddressMismatch { predicted, reported }),
        }
    }

    /// Executes `intent` against the latest state without broadcasting it.
    pub async fn call(&self, intent: &TransactionIntent) -> Result<RawBytes> {
        let output = self
            .backend
            .call(intent.to_request(None))
            .await
            .map_err(HarnessError::query("eth_call"))?;
        Ok(output.into())
    }
}
