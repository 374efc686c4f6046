//! An in-process development chain backed by revm.
//!
//! Every transaction is mined into its own block as soon as it is sent, so receipts are available
//! immediately. Gas is free: the block base fee is zero and unpriced transactions pay nothing.

use super::{Backend, BackendError, BackendKind, BackendResult, cheats::CheatsManager};
use crate::receipt::{Receipt, ReceiptStatus};
use alloy_primitives::{
    Address, B256, Bytes, TxHash, TxKind, U256, address, keccak256, map::HashMap,
};
use alloy_rpc_types::TransactionRequest;
use parking_lot::Mutex;
use revm::{
    Context, DatabaseRef, ExecuteCommitEvm, ExecuteEvm, MainBuilder, MainContext,
    context::{
        CfgEnv, TxEnv,
        result::{ExecutionResult, Output},
    },
    database::InMemoryDB,
    primitives::KECCAK_EMPTY,
    state::AccountInfo,
};
use std::fmt;

/// Chain id used by [`SimBackend::default`].
pub const DEFAULT_CHAIN_ID: u64 = 31337;

/// Gas limit applied to transactions that do not set one.
const DEFAULT_GAS_LIMIT: u64 = 10_000_000;

/// The first development accounts of the `test test ... junk` mnemonic, funded at genesis.
pub const DEV_ACCOUNTS: [Address; 5] = [
    address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"),
    address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8"),
    address!("0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC"),
    address!("0x90F79bf6EB2c4f870365E785982E1f101E93b906"),
    address!("0x15d34AAf54267DB7D7c367839AAf71A00a2C6A65"),
];

/// An automining chain living in memory.
pub struct SimBackend {
    chain_id: u64,
    accounts: Vec<Address>,
    cheats: CheatsManager,
    state: Mutex<SimState>,
}

#[derive(Default)]
struct SimState {
    db: InMemoryDB,
    block_number: u64,
    receipts: HashMap<TxHash, Receipt>,
}

impl fmt::Debug for SimBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimBackend")
            .field("chain_id", &self.chain_id)
            .field("accounts", &self.accounts)
            .field("block_number", &self.block_number())
            .finish_non_exhaustive()
    }
}

impl Default for SimBackend {
    fn default() -> Self {
        Self::new(DEFAULT_CHAIN_ID)
    }
}

impl SimBackend {
    /// A chain with [`DEV_ACCOUNTS`] funded with 10000 ether each.
    pub fn new(chain_id: u64) -> Self {
        Self::with_accounts(chain_id, DEV_ACCOUNTS)
    }

    /// A chain whose signing accounts are `accounts`, each funded with 10000 ether.
    pub fn with_accounts(chain_id: u64, accounts: impl IntoIterator<Item = Address>) -> Self {
        let accounts: Vec<Address> = accounts.into_iter().collect();
        let balance = U256::from(10_000u64) * U256::from(10u64).pow(U256::from(18u64));
        let mut db = InMemoryDB::default();
        for account in &accounts {
            db.insert_account_info(*account, AccountInfo::from_balance(balance));
        }
        Self {
            chain_id,
            accounts,
            cheats: CheatsManager::default(),
            state: Mutex::new(SimState { db, ..Default::default() }),
        }
    }

    pub fn cheats(&self) -> &CheatsManager {
        &self.cheats
    }

    /// Number of the latest mined block.
    pub fn block_number(&self) -> u64 {
        self.state.lock().block_number
    }

    /// Overwrites the balance of `address`.
    pub fn set_balance(&self, address: Address, balance: U256) {
        let mut state = self.state.lock();
        let mut info = state.db.basic_ref(address).ok().flatten().unwrap_or_default();
        info.balance = balance;
        state.db.insert_account_info(address, info);
    }

    fn can_sign(&self, from: Address) -> bool {
        self.accounts.contains(&from) || self.cheats.is_impersonated(from)
    }

    fn account(state: &SimState, address: Address) -> BackendResult<AccountInfo> {
        Ok(state.db.basic_ref(address).map_err(evm_error)?.unwrap_or_default())
    }

    fn tx_env(&self, request: &TransactionRequest, caller: Address, nonce: u64) -> TxEnv {
        let fee_market =
            request.transaction_type == Some(2) || request.max_fee_per_gas.is_some();
        let (tx_type, gas_price, gas_priority_fee) = if fee_market {
            (
                2,
                request.max_fee_per_gas.unwrap_or_default(),
                Some(request.max_priority_fee_per_gas.unwrap_or_default()),
            )
        } else {
            (0, request.gas_price.unwrap_or_default(), None)
        };
        TxEnv {
            tx_type,
            caller,
            gas_limit: request.gas.unwrap_or(DEFAULT_GAS_LIMIT),
            gas_price,
            gas_priority_fee,
            kind: request.to.unwrap_or(TxKind::Create),
            value: request.value.unwrap_or_default(),
            data: request.input.input().cloned().unwrap_or_default(),
            nonce,
            chain_id: Some(self.chain_id),
            ..Default::default()
        }
    }

    fn cfg(&self) -> CfgEnv {
        CfgEnv::new().with_chain_id(self.chain_id)
    }

    fn tx_hash(&self, from: Address, nonce: u64) -> TxHash {
        let mut preimage = Vec::with_capacity(36);
        preimage.extend_from_slice(&self.chain_id.to_be_bytes());
        preimage.extend_from_slice(from.as_slice());
        preimage.extend_from_slice(&nonce.to_be_bytes());
        keccak256(preimage)
    }
}

fn evm_error(err: impl fmt::Display) -> BackendError {
    BackendError::Rejected(err.to_string())
}

#[async_trait::async_trait]
impl Backend for SimBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Simulated
    }

    async fn chain_id(&self) -> BackendResult<u64> {
        Ok(self.chain_id)
    }

    async fn accounts(&self) -> BackendResult<Vec<Address>> {
        Ok(self.accounts.clone())
    }

    async fn transaction_count(&self, address: Address) -> BackendResult<u64> {
        Ok(Self::account(&self.state.lock(), address)?.nonce)
    }

    async fn send_transaction(&self, request: TransactionRequest) -> BackendResult<TxHash> {
        let from = request.from.ok_or_else(|| BackendError::Rejected("missing sender".into()))?;
        if !self.can_sign(from) {
            return Err(BackendError::NoSignerAvailable(from));
        }

        let mut guard = self.state.lock();
        let state = &mut *guard;
        let nonce = match request.nonce {
            Some(nonce) => nonce,
            None => Self::account(state, from)?.nonce,
        };
        let tx = self.tx_env(&request, from, nonce);
        let hash = self.tx_hash(from, nonce);

        let result = {
            let mut evm =
                Context::mainnet().with_cfg(self.cfg()).with_db(&mut state.db).build_mainnet();
            evm.transact_commit(tx).map_err(evm_error)?
        };

        state.block_number += 1;
        let success = result.is_success();
        let contract_address = match &result {
            ExecutionResult::Success { output: Output::Create(_, address), .. } => *address,
            _ => None,
        };
        let receipt = Receipt {
            transaction_hash: hash,
            status: if success { ReceiptStatus::Success } else { ReceiptStatus::Failure },
            logs: if success { result.logs().to_vec() } else { Vec::new() },
            gas_used: result.gas_used(),
            contract_address,
            block_number: Some(state.block_number),
        };
        debug!(
            target: "backend::sim",
            %hash,
            %from,
            nonce,
            block = state.block_number,
            success,
            gas_used = receipt.gas_used,
            "mined transaction"
        );
        state.receipts.insert(hash, receipt);
        Ok(hash)
    }

    async fn transaction_receipt(&self, hash: TxHash) -> BackendResult<Option<Receipt>> {
        Ok(self.state.lock().receipts.get(&hash).cloned())
    }

    async fn call(&self, request: TransactionRequest) -> BackendResult<Bytes> {
        let caller = request.from.unwrap_or_default();
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let nonce = Self::account(state, caller)?.nonce;
        let tx = self.tx_env(&request, caller, nonce);

        let mut evm =
            Context::mainnet().with_cfg(self.cfg()).with_db(&mut state.db).build_mainnet();
        match evm.transact(tx).map_err(evm_error)?.result {
            ExecutionResult::Success { output, .. } => Ok(output.into_data()),
            ExecutionResult::Revert { output, .. } => {
                Err(BackendError::Rejected(format!("execution reverted: {output}")))
            }
            ExecutionResult::Halt { reason, .. } => {
                Err(BackendError::Rejected(format!("execution halted: {reason:?}")))
            }
        }
    }

    async fn balance(&self, address: Address) -> BackendResult<U256> {
        Ok(Self::account(&self.state.lock(), address)?.balance)
    }

    async fn code(&self, address: Address) -> BackendResult<Bytes> {
        let state = self.state.lock();
        let info = Self::account(&state, address)?;
        if let Some(code) = info.code {
            return Ok(code.original_bytes());
        }
        if info.code_hash == KECCAK_EMPTY || info.code_hash == B256::ZERO {
            return Ok(Bytes::new());
        }
        Ok(state.db.code_by_hash_ref(info.code_hash).map_err(evm_error)?.original_bytes())
    }

    async fn storage_at(&self, address: Address, slot: U256) -> BackendResult<B256> {
        let value = self.state.lock().db.storage_ref(address, slot).map_err(evm_error)?;
        Ok(B256::from(value.to_be_bytes::<32>()))
    }

    async fn impersonate_account(&self, address: Address) -> BackendResult<()> {
        self.cheats.impersonate(address);
        Ok(())
    }

    async fn stop_impersonating_account(&self, address: Address) -> BackendResult<()> {
        self.cheats.stop_impersonating(&address);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{derive_create_address, tx::{TransactionIntent, TxFormat}};

    const ECHO_INIT: &str =
        "0x60198061000c6000396000f3608060405261032161012360206040518383018152f3915050";

    #[tokio::test]
    async fn dev_accounts_are_funded() {
        let sim = SimBackend::default();
        assert_eq!(sim.accounts().await.unwrap(), DEV_ACCOUNTS.to_vec());
        let balance = sim.balance(DEV_ACCOUNTS[0]).await.unwrap();
        assert_eq!(balance, U256::from(10_000u64) * U256::from(10u64).pow(U256::from(18u64)));
        assert_eq!(sim.transaction_count(DEV_ACCOUNTS[0]).await.unwrap(), 0);
        assert_eq!(sim.chain_id().await.unwrap(), DEFAULT_CHAIN_ID);
    }

    #[tokio::test]
    async fn mines_creation_at_derived_address() {
        let sim = SimBackend::default();
        let from = DEV_ACCOUNTS[0];
        let intent =
            TransactionIntent::build_creation(from, ECHO_INIT.parse().unwrap(), TxFormat::FeeMarket);
        let hash = sim.send_transaction(intent.to_request(Some(0))).await.unwrap();

        let receipt = sim.transaction_receipt(hash).await.unwrap().unwrap();
        assert!(receipt.is_success());
        assert_eq!(receipt.block_number, Some(1));
        assert_eq!(receipt.contract_address, Some(derive_create_address(from, 0)));
        assert_eq!(sim.transaction_count(from).await.unwrap(), 1);

        let code = sim.code(derive_create_address(from, 0)).await.unwrap();
        assert_eq!(code.len(), 25);
    }

    #[tokio::test]
    async fn rejects_unknown_sender_until_impersonated() {
        let sim = SimBackend::default();
        let stranger = Address::repeat_byte(0x55);
        let request = TransactionIntent::build_call(
            stranger,
            DEV_ACCOUNTS[1],
            Default::default(),
            TxFormat::Legacy,
        )
        .to_request(None);

        let err = sim.send_transaction(request.clone()).await.unwrap_err();
        assert!(matches!(err, BackendError::NoSignerAvailable(addr) if addr == stranger));

        sim.impersonate_account(stranger).await.unwrap();
        let hash = sim.send_transaction(request.clone()).await.unwrap();
        assert!(sim.transaction_receipt(hash).await.unwrap().unwrap().is_success());

        sim.stop_impersonating_account(stranger).await.unwrap();
        assert!(sim.send_transaction(request).await.is_err());
    }

    #[tokio::test]
    async fn rejects_stale_nonce() {
        let sim = SimBackend::default();
        let from = DEV_ACCOUNTS[0];
        let request =
            TransactionIntent::build_call(from, DEV_ACCOUNTS[1], Default::default(), TxFormat::Legacy)
                .to_request(Some(5));
        assert!(matches!(sim.send_transaction(request).await, Err(BackendError::Rejected(_))));
        assert_eq!(sim.block_number(), 0);
    }

    #[tokio::test]
    async fn unknown_receipt_is_pending() {
        let sim = SimBackend::default();
        assert_eq!(sim.transaction_receipt(B256::repeat_byte(1)).await.unwrap(), None);
        assert_eq!(sim.storage_at(DEV_ACCOUNTS[0], U256::ZERO).await.unwrap(), B256::ZERO);
        assert!(sim.code(DEV_ACCOUNTS[0]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn set_balance_overwrites() {
        let sim = SimBackend::default();
        let who = Address::repeat_byte(0x77);
        sim.set_balance(who, U256::from(5));
        assert_eq!(sim.balance(who).await.unwrap(), U256::from(5));
    }
}
