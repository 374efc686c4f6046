use crate::init_tracing;
use alloy_primitives::U256;
use mist_harness::{
    Harness, RawBytes, TransactionIntent, TxFormat,
    abi::{decode_output, encode_with_signature},
    derive_create_address,
};
use mist_playground::contracts::{self, ECHO_SIGNATURE, ECHO_VALUE};

#[tokio::test(flavor = "multi_thread")]
async fn echo_returns_fixed_constant() {
    init_tracing();
    let harness = Harness::simulated();
    let hero = harness.accounts().await.unwrap()[0];

    let deployment =
        harness.deploy(hero, contracts::echo_init_code(), TxFormat::FeeMarket).await.unwrap();
    assert_eq!(deployment.address, derive_create_address(hero, 0));
    assert_eq!(harness.code_of(deployment.address).await.unwrap(), contracts::echo_runtime());

    let data = encode_with_signature(ECHO_SIGNATURE, Vec::<String>::new()).unwrap();
    let call = TransactionIntent::build_call(hero, deployment.address, data, TxFormat::FeeMarket);
    let output = harness.call(&call).await.unwrap();
    assert_eq!(output.as_slice(), &ECHO_VALUE.to_be_bytes::<32>());

    let decoded = decode_output(ECHO_SIGNATURE, output.as_slice()).unwrap();
    assert_eq!(decoded[0].as_uint(), Some((U256::from(0x444), 256)));
}

#[tokio::test(flavor = "multi_thread")]
async fn generated_constructor_deploys_same_runtime() {
    init_tracing();
    let harness = Harness::simulated();
    let hero = harness.accounts().await.unwrap()[0];

    let fixed = harness.deploy(hero, contracts::echo_init_code(), TxFormat::Legacy).await.unwrap();
    let wrapped = harness
        .deploy(hero, contracts::wrapped_echo_init_code().unwrap(), TxFormat::Legacy)
        .await
        .unwrap();
    assert_eq!(wrapped.address, derive_create_address(hero, 1));
    assert_eq!(
        harness.code_of(fixed.address).await.unwrap(),
        harness.code_of(wrapped.address).await.unwrap()
    );

    let call = TransactionIntent::build_call(hero, wrapped.address, RawBytes::new(), TxFormat::Legacy);
    assert_eq!(harness.call(&call).await.unwrap().as_slice(), &ECHO_VALUE.to_be_bytes::<32>());
}

#[tokio::test(flavor = "multi_thread")]
async fn successive_deployments_follow_the_nonce() {
    let harness = Harness::simulated();
    let hero = harness.accounts().await.unwrap()[0];
    for nonce in 0..3 {
        let deployment =
            harness.deploy(hero, contracts::echo_init_code(), TxFormat::FeeMarket).await.unwrap();
        assert_eq!(deployment.address, derive_create_address(hero, nonce));
        assert_eq!(deployment.receipt.contract_address, Some(deployment.address));
    }
    assert_eq!(harness.nonce_of(hero).await.unwrap(), 3);
}
