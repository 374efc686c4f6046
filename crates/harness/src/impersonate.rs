//! Scoped impersonation of accounts on development chains.

use crate::{
    backend::{BackendError, BackendKind},
    bytes::RawBytes,
    client::Harness,
    error::{HarnessError, Result},
    receipt::{PendingTransaction, Receipt},
    tx::{TransactionIntent, TxFormat},
};
use alloy_primitives::Address;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;

/// Authority to transact as an account whose key the harness does not hold.
///
/// Only handed out by [`Harness::impersonate`] and only valid inside its action.
#[derive(Clone, Debug)]
pub struct ImpersonationSession {
    harness: Harness,
    address: Address,
}

impl ImpersonationSession {
    /// The impersonated account.
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn harness(&self) -> &Harness {
        &self.harness
    }

    /// A call from the impersonated account.
    pub fn build_call(&self, to: Address, call_data: RawBytes, format: TxFormat) -> TransactionIntent {
        TransactionIntent::build_call(self.address, to, call_data, format)
    }

    pub async fn submit(&self, intent: TransactionIntent) -> Result<PendingTransaction> {
        self.harness.submit(intent).await
    }

    pub async fn transact(&self, intent: TransactionIntent) -> Result<Receipt> {
        self.harness.transact(intent).await
    }
}

/// Revokes an impersonation whose action future was dropped before completing.
struct RevokeOnDrop {
    harness: Harness,
    address: Address,
    armed: bool,
}

impl Drop for RevokeOnDrop {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.harness.sessions.lock().remove(&self.address);
        let backend = self.harness.backend().clone();
        let address = self.address;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(err) = backend.stop_impersonating_account(address).await {
                        warn!(target: "harness::impersonate", %address, %err, "failed to revoke impersonation");
                    }
                });
            }
            Err(_) => {
                warn!(target: "harness::impersonate", %address, "no runtime to revoke impersonation on")
            }
        }
    }
}

impl Harness {
    /// Runs `action` while the backend accepts transactions from `address` without its key.
    ///
    /// The impersonation is revoked on every exit path: after success, after an error and after
    /// a panic, which is resumed once revocation finished. If the returned future is dropped
    /// midway, revocation is spawned on the current tokio runtime. An error from `action` wins
    /// over an error from revoking.
    ///
    /// Fails with [`HarnessError::UnsupportedBackend`] on live networks and
    /// [`HarnessError::ImpersonationActive`] if this harness is already impersonating `address`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use alloy_primitives::address;
    /// use mist_harness::{Harness, RawBytes, TxFormat};
    ///
    /// # async fn run(harness: Harness) -> mist_harness::Result<()> {
    /// let whale = address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8");
    /// let to = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
    /// harness
    ///     .impersonate(whale, |session| async move {
    ///         session.transact(session.build_call(to, RawBytes::new(), TxFormat::Legacy)).await
    ///     })
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn impersonate<F, Fut, T>(&self, address: Address, action: F) -> Result<T>
    where
        F: FnOnce(ImpersonationSession) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut guard = self.begin_impersonation(address).await?;

        let session = ImpersonationSession { harness: self.clone(), address };
        let outcome = AssertUnwindSafe(action(session)).catch_unwind().await;

        let ended = self.end_impersonation(address).await;
        guard.armed = false;

        match outcome {
            Ok(Ok(value)) => ended.map(|()| value),
            Ok(Err(err)) => {
                if let Err(end_err) = ended {
                    warn!(target: "harness::impersonate", %address, err = %end_err, "failed to revoke impersonation");
                }
                Err(err)
            }
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    /// Registers the session and asks the backend for the grant.
    ///
    /// The returned guard is armed from the moment the address is registered, so dropping the
    /// caller while the grant is in flight still unregisters and revokes it.
    async fn begin_impersonation(&self, address: Address) -> Result<RevokeOnDrop> {
        let kind = self.kind();
        if kind == BackendKind::Live {
            return Err(HarnessError::UnsupportedBackend(kind));
        }
        if !self.sessions.lock().insert(address) {
            return Err(HarnessError::ImpersonationActive(address));
        }
        let mut guard = RevokeOnDrop { harness: self.clone(), address, armed: true };
        debug!(target: "harness::impersonate", %address, "begin impersonation");
        if let Err(err) = self.backend().impersonate_account(address).await {
            guard.armed = false;
            self.sessions.lock().remove(&address);
            return Err(match err {
                BackendError::Unsupported { .. } => HarnessError::UnsupportedBackend(kind),
                source => HarnessError::QueryFailed { method: "impersonate_account", source },
            });
        }
        Ok(guard)
    }

    async fn end_impersonation(&self, address: Address) -> Result<()> {
        self.sessions.lock().remove(&address);
        debug!(target: "harness::impersonate", %address, "end impersonation");
        self.backend()
            .stop_impersonating_account(address)
            .await
            .map_err(HarnessError::query("stop_impersonating_account"))
    }

    /// Returns true while `address` is impersonated through this harness.
    pub fn is_impersonating(&self, address: Address) -> bool {
        self.sessions.lock().contains(&address)
    }
}
