//! A backend served by a JSON-RPC node.

use super::{Backend, BackendError, BackendKind, BackendResult};
use crate::receipt::Receipt;
use alloy_network::EthereumWallet;
use alloy_primitives::{Address, B256, Bytes, TxHash, U256};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_signer_local::PrivateKeySigner;
use alloy_transport::TransportError;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// JSON-RPC error code for an unknown method.
const METHOD_NOT_FOUND: i64 = -32601;

/// Which family of development methods a node speaks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Anvil,
    Hardhat,
}

impl Dialect {
    pub const fn impersonate_method(self) -> &'static str {
        match self {
            Self::Anvil => "anvil_impersonateAccount",
            Self::Hardhat => "hardhat_impersonateAccount",
        }
    }

    pub const fn stop_impersonating_method(self) -> &'static str {
        match self {
            Self::Anvil => "anvil_stopImpersonatingAccount",
            Self::Hardhat => "hardhat_stopImpersonatingAccount",
        }
    }
}

/// A node reached over HTTP.
///
/// Transactions from the configured local signer are filled and signed here and sent raw; every
/// other sender is left to the node's own accounts through `eth_sendTransaction`.
#[derive(Clone)]
pub struct RpcBackend {
    provider: DynProvider,
    signer: Option<(Address, DynProvider)>,
    dialect: Dialect,
    kind: BackendKind,
}

impl fmt::Debug for RpcBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcBackend")
            .field("signer", &self.signer.as_ref().map(|(address, _)| address))
            .field("dialect", &self.dialect)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl RpcBackend {
    /// Wraps an existing provider. No fillers are expected on it.
    pub fn new(provider: DynProvider, dialect: Dialect, kind: BackendKind) -> Self {
        Self { provider, signer: None, dialect, kind }
    }

    /// Connects to `url` over HTTP.
    pub fn connect_http(url: Url, dialect: Dialect, kind: BackendKind) -> Self {
        let provider =
            ProviderBuilder::new().disable_recommended_fillers().connect_http(url).erased();
        Self::new(provider, dialect, kind)
    }

    /// Signs transactions from `signer`'s address locally instead of asking the node.
    pub fn with_signer(mut self, url: Url, signer: PrivateKeySigner) -> Self {
        let address = signer.address();
        let provider =
            ProviderBuilder::new().wallet(EthereumWallet::from(signer)).connect_http(url).erased();
        self.signer = Some((address, provider));
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn provider_for(&self, from: Option<Address>) -> &DynProvider {
        match &self.signer {
            Some((address, signing)) if Some(*address) == from => signing,
            _ => &self.provider,
        }
    }

    async fn admin(&self, method: &'static str, address: Address) -> BackendResult<()> {
        trace!(target: "backend::rpc", %method, %address, "admin request");
        self.provider
            .raw_request::<_, serde_json::Value>(method.into(), (address,))
            .await
            .map(drop)
            .map_err(|err| classify(err, method, None))
    }
}

/// Sorts a node error into the harness taxonomy.
///
/// Nodes disagree on the wording of a missing signer: anvil says "no signer available", hardhat
/// "unknown account", geth "unknown account" or "authentication needed".
pub(crate) fn classify(err: TransportError, method: &str, from: Option<Address>) -> BackendError {
    let Some(payload) = err.as_error_resp() else {
        return BackendError::Transport(err);
    };
    let message = payload.message.to_lowercase();
    let unknown_method = message.contains("method")
        && (message.contains("not found") || message.contains("does not exist"));
    if payload.code == METHOD_NOT_FOUND || unknown_method {
        return BackendError::Unsupported { method: method.to_string() };
    }
    if let Some(from) = from {
        if ["no signer", "unknown account", "authentication needed", "not impersonated"]
            .iter()
            .any(|needle| message.contains(needle))
        {
            return BackendError::NoSignerAvailable(from);
        }
    }
    BackendError::Rejected(payload.message.to_string())
}

#[async_trait::async_trait]
impl Backend for RpcBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn chain_id(&self) -> BackendResult<u64> {
        self.provider.get_chain_id().await.map_err(|err| classify(err, "eth_chainId", None))
    }

    async fn accounts(&self) -> BackendResult<Vec<Address>> {
        let mut accounts =
            self.provider.get_accounts().await.map_err(|err| classify(err, "eth_accounts", None))?;
        if let Some((address, _)) = &self.signer {
            if !accounts.contains(address) {
                accounts.insert(0, *address);
            }
        }
        Ok(accounts)
    }

    async fn transaction_count(&self, address: Address) -> BackendResult<u64> {
        self.provider
            .get_transaction_count(address)
            .pending()
            .await
            .map_err(|err| classify(err, "eth_getTransactionCount", None))
    }

    async fn send_transaction(&self, request: TransactionRequest) -> BackendResult<TxHash> {
        let from = request.from;
        let pending = self
            .provider_for(from)
            .send_transaction(request)
            .await
            .map_err(|err| classify(err, "eth_sendTransaction", from))?;
        Ok(*pending.tx_hash())
    }

    async fn transaction_receipt(&self, hash: TxHash) -> BackendResult<Option<Receipt>> {
        let receipt = self
            .provider
            .get_transaction_receipt(hash)
            .await
            .map_err(|err| classify(err, "eth_getTransactionReceipt", None))?;
        Ok(receipt.map(Receipt::from))
    }

    async fn call(&self, request: TransactionRequest) -> BackendResult<Bytes> {
        self.provider.call(request).await.map_err(|err| classify(err, "eth_call", None))
    }

    async fn balance(&self, address: Address) -> BackendResult<U256> {
        self.provider.get_balance(address).await.map_err(|err| classify(err, "eth_getBalance", None))
    }

    async fn code(&self, address: Address) -> BackendResult<Bytes> {
        self.provider.get_code_at(address).await.map_err(|err| classify(err, "eth_getCode", None))
    }

    async fn storage_at(&self, address: Address, slot: U256) -> BackendResult<B256> {
        let value = self
            .provider
            .get_storage_at(address, slot)
            .await
            .map_err(|err| classify(err, "eth_getStorageAt", None))?;
        Ok(B256::from(value.to_be_bytes::<32>()))
    }

    async fn impersonate_account(&self, address: Address) -> BackendResult<()> {
        self.admin(self.dialect.impersonate_method(), address).await
    }

    async fn stop_impersonating_account(&self, address: Address) -> BackendResult<()> {
        self.admin(self.dialect.stop_impersonating_method(), address).await
    }
}
