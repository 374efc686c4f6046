//! A hand-assembled token with a fixed supply cap.
//!
//! Storage layout:
//!
//! | slot                       | value                   |
//! |----------------------------|-------------------------|
//! | `account`                  | balance of `account`    |
//! | `1 << 255`                 | total supply            |
//! | `keccak(owner ‖ spender)`  | allowance               |
//!
//! The owner and the cap are baked into the runtime. Only the owner may mint, and a mint that
//! would push the total supply past the cap reverts.

use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{Address, B256, U256, keccak256};
use eyre::{OptionExt, Result};
use mist_harness::{
    Deployment, Harness, InterfaceDescriptor, RawBytes, TransactionIntent, TxFormat,
    abi::{decode_output, encode_with_signature},
    asm::{AsmError, BytecodeBuilder, wrap_runtime},
};
use revm::bytecode::opcode::{
    ADD, AND, CALLDATALOAD, CALLER, DUP1, DUP2, DUP3, DUP4, EQ, GT, ISZERO, KECCAK256, LOG3, LT,
    MSTORE, POP, RETURN, REVERT, SHR, SLOAD, SSTORE, STOP, SUB, SWAP1,
};

const TOTAL_SUPPLY_SLOT: U256 = U256::from_limbs([0, 0, 0, 1 << 63]);

/// Human-readable interface of the token.
pub const SIGNATURES: [&str; 11] = [
    "function mint(address to, uint256 amount)",
    "function transfer(address to, uint256 amount) returns (bool)",
    "function approve(address spender, uint256 amount) returns (bool)",
    "function transferFrom(address from, address to, uint256 amount) returns (bool)",
    "function balanceOf(address account) view returns (uint256)",
    "function totalSupply() view returns (uint256)",
    "function allowance(address owner, address spender) view returns (uint256)",
    "function cap() view returns (uint256)",
    "function owner() view returns (address)",
    "event Transfer(address indexed from, address indexed to, uint256 value)",
    "event Approval(address indexed owner, address indexed spender, uint256 value)",
];

fn transfer_topic() -> B256 {
    keccak256("Transfer(address,address,uint256)")
}

fn approval_topic() -> B256 {
    keccak256("Approval(address,address,uint256)")
}

/// The bytecode of one token instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CappedToken {
    pub owner: Address,
    pub cap: U256,
}

impl CappedToken {
    pub fn new(owner: Address, cap: U256) -> Self {
        Self { owner, cap }
    }

    pub fn interface() -> Result<InterfaceDescriptor> {
        Ok(InterfaceDescriptor::parse(SIGNATURES)?)
    }

    pub fn init_code(&self) -> Result<RawBytes, AsmError> {
        wrap_runtime(&self.runtime()?)
    }

    pub fn runtime(&self) -> Result<RawBytes, AsmError> {
        let mut code = BytecodeBuilder::new()
            .push_number(0)
            .append(CALLDATALOAD)
            .push_number(0xe0)
            .append(SHR);
        for (sig, label) in [
            ("mint(address,uint256)", "mint"),
            ("transfer(address,uint256)", "transfer"),
            ("approve(address,uint256)", "approve"),
            ("transferFrom(address,address,uint256)", "transfer_from"),
            ("balanceOf(address)", "balance_of"),
            ("totalSupply()", "total_supply"),
            ("allowance(address,address)", "allowance"),
            ("cap()", "cap"),
            ("owner()", "owner"),
        ] {
            code = code.append(DUP1).push_bytes(&keccak256(sig)[..4]).append(EQ).jumpi(label);
        }
        code = code.label("fail").push_number(0).append(DUP1).append(REVERT);

        // mint: owner only, total supply must neither wrap nor exceed the cap
        code = code
            .label("mint")
            .append(CALLER)
            .push_address(self.owner)
            .append(EQ)
            .append(ISZERO)
            .jumpi("fail")
            .push_number(0x24)
            .append(CALLDATALOAD)
            .push_u256(TOTAL_SUPPLY_SLOT)
            .append(SLOAD)
            .append(DUP2)
            .append(DUP2)
            .append(ADD)
            .append(DUP2)
            .append(DUP2)
            .append(LT)
            .jumpi("fail")
            .push_u256(self.cap)
            .append(DUP2)
            .append(GT)
            .jumpi("fail")
            .append(DUP1)
            .push_u256(TOTAL_SUPPLY_SLOT)
            .append(SSTORE)
            .append(POP)
            .append(POP);
        code = address_arg(code, 0x04)
            .append(DUP1)
            .append(SLOAD)
            .append(DUP3)
            .append(ADD)
            .append(DUP2)
            .append(SSTORE)
            .append(DUP2)
            .push_number(0)
            .append(MSTORE)
            .append(DUP1)
            .push_number(0)
            .push_bytes(transfer_topic())
            .push_number(32)
            .push_number(0)
            .append(LOG3)
            .append(STOP);

        // transfer: [amount, to, from = caller]
        code = code.label("transfer").push_number(0x24).append(CALLDATALOAD);
        code = address_arg(code, 0x04).append(CALLER);
        code = return_true(move_balance(code));

        // approve: allowance[caller][spender] = amount
        code = address_arg(code.label("approve"), 0x04)
            .append(CALLER)
            .append(DUP1)
            .push_number(0)
            .append(MSTORE)
            .append(DUP2)
            .push_number(32)
            .append(MSTORE)
            .push_number(64)
            .push_number(0)
            .append(KECCAK256)
            .push_number(0x24)
            .append(CALLDATALOAD)
            .append(DUP1)
            .append(DUP3)
            .append(SSTORE)
            .push_number(0)
            .append(MSTORE)
            .append(POP)
            .append(DUP2)
            .append(DUP2)
            .push_bytes(approval_topic())
            .push_number(32)
            .push_number(0)
            .append(LOG3)
            .append(POP)
            .append(POP);
        code = return_true(code);

        // transferFrom: spend allowance[from][caller], then move
        code = address_arg(code.label("transfer_from"), 0x04)
            .append(DUP1)
            .push_number(0)
            .append(MSTORE)
            .append(CALLER)
            .push_number(32)
            .append(MSTORE)
            .push_number(64)
            .push_number(0)
            .append(KECCAK256)
            .append(DUP1)
            .append(SLOAD)
            .push_number(0x44)
            .append(CALLDATALOAD)
            .append(DUP1)
            .append(DUP3)
            .append(LT)
            .jumpi("fail")
            .append(SWAP1)
            .append(SUB)
            .append(SWAP1)
            .append(SSTORE)
            .append(POP)
            .push_number(0x44)
            .append(CALLDATALOAD);
        code = address_arg(code, 0x24);
        code = address_arg(code, 0x04);
        code = return_true(move_balance(code));

        code = return_word(address_arg(code.label("balance_of"), 0x04).append(SLOAD));
        code = return_word(code.label("total_supply").push_u256(TOTAL_SUPPLY_SLOT).append(SLOAD));
        code = address_arg(code.label("allowance"), 0x04).push_number(0).append(MSTORE);
        code = address_arg(code, 0x24)
            .push_number(32)
            .append(MSTORE)
            .push_number(64)
            .push_number(0)
            .append(KECCAK256)
            .append(SLOAD);
        code = return_word(code);
        code = return_word(code.label("cap").push_u256(self.cap));
        code = return_word(code.label("owner").push_address(self.owner));

        code.build()
    }
}

/// Pushes the address argument at calldata `offset`, upper bits cleared.
fn address_arg(code: BytecodeBuilder, offset: u64) -> BytecodeBuilder {
    code.push_number(offset).append(CALLDATALOAD).push_address(Address::repeat_byte(0xff)).append(AND)
}

/// Moves `amount` from `from` to `to` and logs `Transfer`, reverting on insufficient balance.
///
/// Expects `[amount, to, from]` with `from` on top and leaves the stack unchanged.
fn move_balance(code: BytecodeBuilder) -> BytecodeBuilder {
    code.append(DUP1)
        .append(SLOAD)
        .append(DUP4)
        .append(DUP2)
        .append(LT)
        .jumpi("fail")
        .append(DUP4)
        .append(SWAP1)
        .append(SUB)
        .append(DUP2)
        .append(SSTORE)
        .append(DUP2)
        .append(SLOAD)
        .append(DUP4)
        .append(ADD)
        .append(DUP3)
        .append(SSTORE)
        .append(DUP3)
        .push_number(0)
        .append(MSTORE)
        .append(DUP2)
        .append(DUP2)
        .push_bytes(transfer_topic())
        .push_number(32)
        .push_number(0)
        .append(LOG3)
}

fn return_word(code: BytecodeBuilder) -> BytecodeBuilder {
    code.push_number(0).append(MSTORE).push_number(32).push_number(0).append(RETURN)
}

fn return_true(code: BytecodeBuilder) -> BytecodeBuilder {
    return_word(code.push_number(1))
}

/// A deployed [`CappedToken`].
#[derive(Clone, Debug)]
pub struct Token {
    harness: Harness,
    address: Address,
    format: TxFormat,
}

impl Token {
    /// Deploys a token owned by `owner`, who also pays for the deployment.
    pub async fn deploy(
        harness: &Harness,
        owner: Address,
        cap: U256,
        format: TxFormat,
    ) -> Result<(Self, Deployment)> {
        let init_code = CappedToken::new(owner, cap).init_code()?;
        let deployment = harness.deploy(owner, init_code, format).await?;
        debug!(target: "token", address = %deployment.address, %cap, "token deployed");
        Ok((Self::at(harness.clone(), deployment.address, format), deployment))
    }

    /// A handle on a token already deployed at `address`.
    pub fn at(harness: Harness, address: Address, format: TxFormat) -> Self {
        Self { harness, address, format }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    fn intent(&self, from: Address, sig: &str, args: &[String]) -> Result<TransactionIntent> {
        let call_data = encode_with_signature(sig, args)?;
        Ok(TransactionIntent::build_call(from, self.address, call_data, self.format))
    }

    pub fn mint(&self, from: Address, to: Address, amount: U256) -> Result<TransactionIntent> {
        self.intent(from, "mint(address,uint256)", &[to.to_string(), amount.to_string()])
    }

    pub fn transfer(&self, from: Address, to: Address, amount: U256) -> Result<TransactionIntent> {
        self.intent(from, "transfer(address,uint256)", &[to.to_string(), amount.to_string()])
    }

    pub fn approve(
        &self,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TransactionIntent> {
        self.intent(owner, "approve(address,uint256)", &[spender.to_string(), amount.to_string()])
    }

    /// `spender` moves `amount` of `owner`'s tokens to `to`.
    pub fn transfer_from(
        &self,
        spender: Address,
        owner: Address,
        to: Address,
        amount: U256,
    ) -> Result<TransactionIntent> {
        self.intent(
            spender,
            "transferFrom(address,address,uint256)",
            &[owner.to_string(), to.to_string(), amount.to_string()],
        )
    }

    pub async fn balance_of(&self, account: Address) -> Result<U256> {
        self.read_uint("balanceOf(address)(uint256)", &[account.to_string()]).await
    }

    pub async fn total_supply(&self) -> Result<U256> {
        self.read_uint("totalSupply()(uint256)", &[]).await
    }

    pub async fn allowance(&self, owner: Address, spender: Address) -> Result<U256> {
        self.read_uint("allowance(address,address)(uint256)", &[owner.to_string(), spender.to_string()])
            .await
    }

    pub async fn cap(&self) -> Result<U256> {
        self.read_uint("cap()(uint256)", &[]).await
    }

    async fn read_uint(&self, sig: &str, args: &[String]) -> Result<U256> {
        let call = self.intent(Address::ZERO, sig, args)?;
        let output = self.harness.call(&call).await?;
        let values = decode_output(sig, output.as_slice())?;
        values
            .first()
            .and_then(DynSolValue::as_uint)
            .map(|(value, _)| value)
            .ok_or_eyre(format!("`{sig}` did not return a uint"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mist_harness::asm::disassemble;

    #[test]
    fn runtime_assembles() {
        let token = CappedToken::new(Address::repeat_byte(0x11), U256::from(1000));
        let runtime = token.runtime().unwrap();
        let listing = disassemble(runtime.as_slice());
        assert!(listing.starts_with("| 00 | PUSH1 00\n| 02 | CALLDATALOAD\n| 03 | PUSH1 e0\n| 05 | SHR\n"));
        assert_eq!(listing.matches("LOG3").count(), 4);
        assert!(!listing.contains("UNKNOWN"));

        let init = token.init_code().unwrap();
        assert_eq!(&init.as_slice()[init.len() - runtime.len()..], runtime.as_slice());
    }

    #[test]
    fn dispatches_every_interface_function() {
        let runtime = CappedToken::new(Address::ZERO, U256::MAX).runtime().unwrap();
        let interface = CappedToken::interface().unwrap();
        for function in interface.abi().functions() {
            let selector = function.selector();
            assert!(
                runtime.as_slice().windows(5).any(|w| w[0] == 0x63 && w[1..] == selector[..]),
                "{} is not dispatched",
                function.name
            );
        }
        assert_eq!(interface.abi().events().count(), 2);
    }

    #[test]
    fn intents_target_the_token() {
        let token = Token::at(Harness::simulated(), Address::repeat_byte(7), TxFormat::Legacy);
        let intent = token.transfer(Address::repeat_byte(1), Address::repeat_byte(2), U256::from(5)).unwrap();
        assert_eq!(intent.to(), Some(token.address()));
        assert_eq!(intent.format(), TxFormat::Legacy);
        assert_eq!(&intent.data().as_slice()[..4], &[0xa9, 0x05, 0x9c, 0xbb]);
    }
}
