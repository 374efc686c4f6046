use crate::init_tracing;
use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{Address, U256};
use mist_harness::{Harness, HarnessError, ReceiptStatus, TxFormat, logs::decode_receipt};
use mist_playground::{CappedToken, Token};
use similar_asserts::assert_eq;

const CAP: u64 = 1_000;

async fn setup() -> (Harness, Token, Vec<Address>) {
    init_tracing();
    let harness = Harness::simulated();
    let accounts = harness.accounts().await.unwrap();
    let (token, _) =
        Token::deploy(&harness, accounts[0], U256::from(CAP), TxFormat::FeeMarket).await.unwrap();
    (harness, token, accounts)
}

#[tokio::test(flavor = "multi_thread")]
async fn mint_past_cap_fails_and_keeps_supply() {
    let (harness, token, accounts) = setup().await;
    let owner = accounts[0];
    assert_eq!(token.cap().await.unwrap(), U256::from(CAP));

    for _ in 0..4 {
        harness.transact(token.mint(owner, accounts[1], U256::from(250)).unwrap()).await.unwrap();
    }
    assert_eq!(token.total_supply().await.unwrap(), U256::from(CAP));

    let err = harness
        .transact(token.mint(owner, accounts[1], U256::from(1)).unwrap())
        .await
        .unwrap_err();
    let receipt = err.reverted_receipt().expect("mint past the cap must revert");
    assert_eq!(receipt.status, ReceiptStatus::Failure);
    assert!(receipt.logs.is_empty());
    assert_eq!(token.total_supply().await.unwrap(), U256::from(CAP));
    assert_eq!(token.balance_of(accounts[1]).await.unwrap(), U256::from(CAP));
}

#[tokio::test(flavor = "multi_thread")]
async fn only_owner_mints() {
    let (harness, token, accounts) = setup().await;
    let err = harness
        .transact(token.mint(accounts[1], accounts[1], U256::from(1)).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, HarnessError::Reverted(_)), "{err}");
    assert_eq!(token.total_supply().await.unwrap(), U256::ZERO);
}

#[tokio::test(flavor = "multi_thread")]
async fn transfer_moves_exact_amount() {
    let (harness, token, accounts) = setup().await;
    let (a, b) = (accounts[0], accounts[1]);
    harness.transact(token.mint(a, a, U256::from(700)).unwrap()).await.unwrap();

    let supply = token.total_supply().await.unwrap();
    let (a_before, b_before) =
        (token.balance_of(a).await.unwrap(), token.balance_of(b).await.unwrap());

    let x = U256::from(123);
    let receipt = harness.transact(token.transfer(a, b, x).unwrap()).await.unwrap();

    assert_eq!(token.balance_of(a).await.unwrap(), a_before - x);
    assert_eq!(token.balance_of(b).await.unwrap(), b_before + x);
    assert_eq!(token.total_supply().await.unwrap(), supply);

    let events = decode_receipt(&receipt, &CappedToken::interface().unwrap()).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].name, "Transfer");
    assert_eq!(events[0].address, token.address());
    assert_eq!(
        events[0].values().cloned().collect::<Vec<_>>(),
        vec![DynSolValue::Address(a), DynSolValue::Address(b), DynSolValue::Uint(x, 256)]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn overdrawn_transfer_reverts() {
    let (harness, token, accounts) = setup().await;
    let (a, b) = (accounts[0], accounts[1]);
    harness.transact(token.mint(a, a, U256::from(10)).unwrap()).await.unwrap();

    let err = harness.transact(token.transfer(a, b, U256::from(11)).unwrap()).await.unwrap_err();
    assert!(err.reverted_receipt().is_some(), "{err}");
    assert_eq!(token.balance_of(a).await.unwrap(), U256::from(10));
    assert_eq!(token.balance_of(b).await.unwrap(), U256::ZERO);
}

#[tokio::test(flavor = "multi_thread")]
async fn mint_emits_transfer_from_zero() {
    let (harness, token, accounts) = setup().await;
    let receipt =
        harness.transact(token.mint(accounts[0], accounts[2], U256::from(5)).unwrap()).await.unwrap();
    let events = decode_receipt(&receipt, &CappedToken::interface().unwrap()).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].param("from"), Some(&DynSolValue::Address(Address::ZERO)));
    assert_eq!(events[0].param("to"), Some(&DynSolValue::Address(accounts[2])));
    assert_eq!(events[0].param("value"), Some(&DynSolValue::Uint(U256::from(5), 256)));
}
