//! Signing without keys on the simulated backend.

use alloy_primitives::{Address, map::AddressHashSet};
use parking_lot::RwLock;
use std::sync::Arc;

/// The senders [`SimBackend`](super::SimBackend) accepts although it holds no key for them.
///
/// Clones share one set.
#[derive(Clone, Debug, Default)]
pub struct CheatsManager {
    state: Arc<RwLock<CheatsState>>,
}

impl CheatsManager {
    /// Starts accepting transactions from `addr`.
    ///
    /// Returns `false` if `addr` was already accepted.
    pub fn impersonate(&self, addr: Address) -> bool {
        trace!(target: "cheats", %addr, "impersonate");
        self.state.write().impersonated_accounts.insert(addr)
    }

    pub fn stop_impersonating(&self, addr: &Address) {
        trace!(target: "cheats", %addr, "stop impersonating");
        self.state.write().impersonated_accounts.remove(addr);
    }

    pub fn is_impersonated(&self, addr: Address) -> bool {
        let state = self.state.read();
        state.auto_impersonate_accounts || state.impersonated_accounts.contains(&addr)
    }

    pub fn auto_impersonate_accounts(&self) -> bool {
        self.state.read().auto_impersonate_accounts
    }

    /// When enabled, every sender counts as impersonated.
    pub fn set_auto_impersonate_account(&self, enabled: bool) {
        trace!(target: "cheats", enabled, "auto impersonation");
        self.state.write().auto_impersonate_accounts = enabled
    }

    /// Snapshot of the explicitly impersonated accounts.
    pub fn impersonated_accounts(&self) -> AddressHashSet {
        self.state.read().impersonated_accounts.clone()
    }
}

#[derive(Clone, Debug, Default)]
struct CheatsState {
    impersonated_accounts: AddressHashSet,
    auto_impersonate_accounts: bool,
}
