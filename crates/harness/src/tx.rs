//! Unsigned transaction intents.

use crate::bytes::RawBytes;
use alloy_primitives::{Address, TxKind, U256};
use alloy_rpc_types::{TransactionInput, TransactionRequest};
use serde::{Deserialize, Serialize};

/// Wire shape of a transaction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TxFormat {
    /// Type 0, priced by a single gas price.
    Legacy,
    /// Type 2 (EIP-1559), priced by a max fee and a priority fee.
    #[default]
    FeeMarket,
}

impl TxFormat {
    /// The EIP-2718 transaction type.
    pub const fn tx_type(self) -> u8 {
        match self {
            Self::Legacy => 0,
            Self::FeeMarket => 2,
        }
    }
}

/// What a transaction does once included.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntentKind {
    /// Deploys the payload as init code.
    Create,
    /// Sends the payload as call data to the address.
    Call(Address),
}

/// An immutable, unsigned description of a transaction.
///
/// Gas limit and fees are left to the backend unless set explicitly. Fee fields that do not
/// apply to the chosen [`TxFormat`] are ignored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionIntent {
    from: Address,
    kind: IntentKind,
    data: RawBytes,
    value: U256,
    format: TxFormat,
    gas_limit: Option<u64>,
    gas_price: Option<u128>,
    max_fee_per_gas: Option<u128>,
    max_priority_fee_per_gas: Option<u128>,
}

impl TransactionIntent {
    fn new(from: Address, kind: IntentKind, data: RawBytes, format: TxFormat) -> Self {
        Self {
            from,
            kind,
            data,
            value: U256::ZERO,
            format,
            gas_limit: None,
            gas_price: None,
            max_fee_per_gas: None,
            max_priority_fee_per_gas: None,
        }
    }

    /// A contract creation carrying `init_code`.
    pub fn build_creation(from: Address, init_code: RawBytes, format: TxFormat) -> Self {
        Self::new(from, IntentKind::Create, init_code, format)
    }

    /// A message call to `to` carrying `call_data`.
    pub fn build_call(from: Address, to: Address, call_data: RawBytes, format: TxFormat) -> Self {
        Self::new(from, IntentKind::Call(to), call_data, format)
    }

    /// Attaches `value` wei.
    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    /// Legacy gas price.
    pub fn with_gas_price(mut self, gas_price: u128) -> Self {
        self.gas_price = Some(gas_price);
        self
    }

    /// Fee-market pricing.
    pub fn with_fees(mut self, max_fee_per_gas: u128, max_priority_fee_per_gas: u128) -> Self {
        self.max_fee_per_gas = Some(max_fee_per_gas);
        self.max_priority_fee_per_gas = Some(max_priority_fee_per_gas);
        self
    }

    pub fn from(&self) -> Address {
        self.from
    }

    pub fn kind(&self) -> IntentKind {
        self.kind
    }

    /// The destination, `None` for creations.
    pub fn to(&self) -> Option<Address> {
        match self.kind {
            IntentKind::Create => None,
            IntentKind::Call(to) => Some(to),
        }
    }

    pub fn is_create(&self) -> bool {
        self.kind == IntentKind::Create
    }

    pub fn data(&self) -> &RawBytes {
        &self.data
    }

    pub fn value(&self) -> U256 {
        self.value
    }

    pub fn format(&self) -> TxFormat {
        self.format
    }

    pub fn gas_limit(&self) -> Option<u64> {
        self.gas_limit
    }

    /// Converts into an RPC request, optionally pinned to `nonce`.
    pub fn to_request(&self, nonce: Option<u64>) -> TransactionRequest {
        let (gas_price, max_fee_per_gas, max_priority_fee_per_gas) = match self.format {
            TxFormat::Legacy => (self.gas_price, None, None),
            TxFormat::FeeMarket => (None, self.max_fee_per_gas, self.max_priority_fee_per_gas),
        };
        TransactionRequest {
            from: Some(self.from),
            to: Some(match self.kind {
                IntentKind::Create => TxKind::Create,
                IntentKind::Call(to) => TxKind::Call(to),
            }),
            input: TransactionInput::new(self.data.clone().into_bytes()),
            value: Some(self.value),
            nonce,
            gas: self.gas_limit,
            gas_price,
            max_fee_per_gas,
            max_priority_fee_per_gas,
            transaction_type: Some(self.format.tx_type()),
            ..Default::default()
        }
    }
}
