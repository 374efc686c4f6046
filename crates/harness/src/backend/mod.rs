//! The node boundary the harness talks through.

use crate::receipt::Receipt;
use alloy_primitives::{Address, B256, Bytes, TxHash, U256};
use alloy_rpc_types::TransactionRequest;
use alloy_transport::TransportError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod cheats;
mod rpc;
mod sim;

pub use cheats::CheatsManager;
pub use rpc::{Dialect, RpcBackend};
pub use sim::{DEFAULT_CHAIN_ID, DEV_ACCOUNTS, SimBackend};

pub type BackendResult<T> = Result<T, BackendError>;

/// Whether a backend can bend the rules of the chain it serves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// A local or forked development chain that honours impersonation.
    #[default]
    Simulated,
    /// A public network.
    Live,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Simulated => "simulated",
            Self::Live => "live",
        })
    }
}

/// Failures reported by a backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The node cannot sign for the sender.
    #[error("no signer available for {0}")]
    NoSignerAvailable(Address),
    /// The node does not implement the method.
    #[error("method `{method}` is not supported")]
    Unsupported { method: String },
    /// The node understood the request and refused it.
    #[error("{0}")]
    Rejected(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// JSON-RPC shaped access to a chain.
///
/// Transactions are signed on the backend side: the harness never holds keys itself.
#[async_trait::async_trait]
pub trait Backend: Send + Sync + fmt::Debug {
    fn kind(&self) -> BackendKind;

    /// `eth_chainId`
    async fn chain_id(&self) -> BackendResult<u64>;

    /// `eth_accounts`
    async fn accounts(&self) -> BackendResult<Vec<Address>>;

    /// `eth_getTransactionCount` at the pending block.
    async fn transaction_count(&self, address: Address) -> BackendResult<u64>;

    /// `eth_sendTransaction`, signed by whatever the backend holds for `request.from`.
    async fn send_transaction(&self, request: TransactionRequest) -> BackendResult<TxHash>;

    /// `eth_getTransactionReceipt`, `None` while pending.
    async fn transaction_receipt(&self, hash: TxHash) -> BackendResult<Option<Receipt>>;

    /// `eth_call` against the latest state.
    async fn call(&self, request: TransactionRequest) -> BackendResult<Bytes>;

    /// `eth_getBalance`
    async fn balance(&self, address: Address) -> BackendResult<U256>;

    /// `eth_getCode`
    async fn code(&self, address: Address) -> BackendResult<Bytes>;

    /// `eth_getStorageAt`
    async fn storage_at(&self, address: Address, slot: U256) -> BackendResult<B256>;

    /// Lets the backend sign for `address` without its key.
    async fn impersonate_account(&self, address: Address) -> BackendResult<()>;

    /// Revokes [`Backend::impersonate_account`].
    async fn stop_impersonating_account(&self, address: Address) -> BackendResult<()>;
}
