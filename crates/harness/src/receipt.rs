//! Submitted transactions and their receipts.

use crate::{address::derive_create_address, tx::TransactionIntent};
use alloy_primitives::{Address, Log, TxHash};
use alloy_rpc_types::TransactionReceipt;

/// Outcome of an included transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReceiptStatus {
    Success,
    Failure,
}

/// The node's record of an included transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub transaction_hash: TxHash,
    pub status: ReceiptStatus,
    /// Logs in emission order.
    pub logs: Vec<Log>,
    pub gas_used: u64,
    /// Address reported by the node for creations.
    pub contract_address: Option<Address>,
    pub block_number: Option<u64>,
}

impl Receipt {
    pub fn is_success(&self) -> bool {
        self.status == ReceiptStatus::Success
    }
}

impl From<TransactionReceipt> for Receipt {
    fn from(receipt: TransactionReceipt) -> Self {
        Self {
            transaction_hash: receipt.transaction_hash,
            status: if receipt.inner.status() {
                ReceiptStatus::Success
            } else {
                ReceiptStatus::Failure
            },
            logs: receipt.inner.logs().iter().map(|log| log.inner.clone()).collect(),
            gas_used: receipt.gas_used,
            contract_address: receipt.contract_address,
            block_number: receipt.block_number,
        }
    }
}

/// A transaction accepted by the node but not necessarily included yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingTransaction {
    intent: TransactionIntent,
    nonce: u64,
    hash: TxHash,
}

impl PendingTransaction {
    pub(crate) fn new(intent: TransactionIntent, nonce: u64, hash: TxHash) -> Self {
        Self { intent, nonce, hash }
    }

    pub fn intent(&self) -> &TransactionIntent {
        &self.intent
    }

    /// The nonce assigned at submission.
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn hash(&self) -> TxHash {
        self.hash
    }

    /// For creations, the address the contract lands at if the transaction succeeds.
    pub fn predicted_address(&self) -> Option<Address> {
        self.intent.is_create().then(|| derive_create_address(self.intent.from(), self.nonce))
    }
}

/// A successfully deployed contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Deployment {
    pub address: Address,
    pub receipt: Receipt,
}
