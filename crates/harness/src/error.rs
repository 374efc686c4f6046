//! Errors surfaced by the harness.

use crate::{
    abi::AbiError,
    backend::{BackendError, BackendKind},
    bytes::BytesError,
    logs::DecodeError,
    receipt::Receipt,
};
use alloy_primitives::{Address, TxHash};
use std::time::Duration;

/// Convenience alias for harness results.
pub type Result<T, E = HarnessError> = std::result::Result<T, E>;

/// Everything that can go wrong while driving a node.
///
/// None of these are retried: every failure is handed back to the caller as is.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// The backend holds no key for `from` and no impersonation is active for it.
    #[error("no signer available for {from}")]
    SigningUnavailable { from: Address },
    /// The transaction was not included before the deadline.
    ///
    /// It may still be mined later; nothing is cancelled or replaced.
    #[error("transaction {hash} was not included within {timeout:?}")]
    Timeout { hash: TxHash, timeout: Duration },
    /// The transaction was included but its execution failed.
    #[error("transaction {} reverted in block {:?}", .0.transaction_hash, .0.block_number)]
    Reverted(Box<Receipt>),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// Impersonation was requested against a backend that cannot grant it.
    #[error("impersonation is not supported by the {0} backend")]
    UnsupportedBackend(BackendKind),
    /// A read-only request failed.
    #[error("{method} failed: {source}")]
    QueryFailed {
        method: &'static str,
        #[source]
        source: BackendError,
    },
    /// The node refused the transaction or could not be reached while submitting it.
    #[error("failed to submit transaction from {from}: {source}")]
    Submission {
        from: Address,
        #[source]
        source: BackendError,
    },
    #[error("contract address mismatch: predicted {predicted}, node reported {reported:?}")]
    AddressMismatch { predicted: Address, reported: Option<Address> },
    #[error("{0} is already being impersonated")]
    ImpersonationActive(Address),
    #[error(transparent)]
    Abi(#[from] AbiError),
    #[error(transparent)]
    InvalidBytes(#[from] BytesError),
}

impl HarnessError {
    /// Returns the receipt of a reverted transaction.
    pub fn reverted_receipt(&self) -> Option<&Receipt> {
        match self {
            Self::Reverted(receipt) => Some(receipt),
            _ => None,
        }
    }

    pub(crate) fn query(method: &'static str) -> impl FnOnce(BackendError) -> Self {
        move |source| Self::QueryFailed { method, source }
    }
}
