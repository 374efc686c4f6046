use crate::init_tracing;
use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{Address, U256};
use mist_harness::{Harness, HarnessError, RawBytes, TransactionIntent, TxFormat, logs::decode_receipt};
use mist_playground::{CappedToken, Token};

#[tokio::test(flavor = "multi_thread")]
async fn impersonated_approval_is_spent_exactly() {
    init_tracing();
    let harness = Harness::simulated();
    let accounts = harness.accounts().await.unwrap();
    let (a, b) = (accounts[0], accounts[1]);
    let c = Address::repeat_byte(0xc0);

    let (token, _) =
        Token::deploy(&harness, a, U256::from(1_000_000), TxFormat::FeeMarket).await.unwrap();
    harness.transact(token.mint(a, c, U256::from(5_000)).unwrap()).await.unwrap();

    let y = U256::from(2_000);
    let z = U256::from(1_500);
    let approve = token.approve(c, a, y).unwrap();
    let receipt = harness
        .impersonate(c, |session| async move {
            assert_eq!(session.address(), c);
            session.transact(approve).await
        })
        .await
        .unwrap();
    let events = decode_receipt(&receipt, &CappedToken::interface().unwrap()).unwrap();
    assert_eq!(events[0].name, "Approval");
    assert_eq!(events[0].param("owner"), Some(&DynSolValue::Address(c)));
    assert_eq!(events[0].param("spender"), Some(&DynSolValue::Address(a)));

    let before = token.allowance(c, a).await.unwrap();
    assert_eq!(before, y);
    harness.transact(token.transfer_from(a, c, b, z).unwrap()).await.unwrap();

    assert_eq!(token.allowance(c, a).await.unwrap(), before - z);
    assert_eq!(token.balance_of(b).await.unwrap(), z);
    assert_eq!(token.balance_of(c).await.unwrap(), U256::from(5_000) - z);

    // the remaining allowance does not cover another spend of z
    let err = harness.transact(token.transfer_from(a, c, b, z).unwrap()).await.unwrap_err();
    assert!(err.reverted_receipt().is_some(), "{err}");
}

#[tokio::test(flavor = "multi_thread")]
async fn session_end_withdraws_signing() {
    init_tracing();
    let harness = Harness::simulated();
    let hero = harness.accounts().await.unwrap()[0];
    let c = Address::repeat_byte(0xc1);
    let ping = TransactionIntent::build_call(c, hero, RawBytes::new(), TxFormat::Legacy);

    let err = harness.submit(ping.clone()).await.unwrap_err();
    assert!(matches!(err, HarnessError::SigningUnavailable { from } if from == c));

    let first = ping.clone();
    let receipt = harness
        .impersonate(c, |session| async move { session.transact(first).await })
        .await
        .unwrap();
    assert!(receipt.is_success());
    assert_eq!(harness.nonce_of(c).await.unwrap(), 1);

    let err = harness.submit(ping.clone()).await.unwrap_err();
    assert!(matches!(err, HarnessError::SigningUnavailable { from } if from == c));

    // a fresh session grants it again
    harness.impersonate(c, |session| async move { session.transact(ping).await }).await.unwrap();
    assert_eq!(harness.nonce_of(c).await.unwrap(), 2);
}
