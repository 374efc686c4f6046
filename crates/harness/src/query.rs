//! Read-only probes of chain state.

use crate::{
    bytes::RawBytes,
    client::Harness,
    error::{HarnessError, Result},
};
use alloy_primitives::{Address, B256, U256};

impl Harness {
    /// Balance of `address` in wei.
    pub async fn balance_of(&self, address: Address) -> Result<U256> {
        self.backend().balance(address).await.map_err(HarnessError::query("eth_getBalance"))
    }

    /// Deployed code of `address`, empty for accounts without code.
    pub async fn code_of(&self, address: Address) -> Result<RawBytes> {
        let code =
            self.backend().code(address).await.map_err(HarnessError::query("eth_getCode"))?;
        Ok(code.into())
    }

    /// Raw storage word at `slot`.
    pub async fn storage_of(&self, address: Address, slot: U256) -> Result<B256> {
        self.backend()
            .storage_at(address, slot)
            .await
            .map_err(HarnessError::query("eth_getStorageAt"))
    }

    /// Pending transaction count of `address`, the nonce its next transaction will use.
    pub async fn nonce_of(&self, address: Address) -> Result<u64> {
        self.backend()
            .transaction_count(address)
            .await
            .map_err(HarnessError::query("eth_getTransactionCount"))
    }
}
