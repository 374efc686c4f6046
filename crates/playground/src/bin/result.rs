//! Deploys the echo contract from its fixed init code and reads its answer.

use alloy_primitives::{U256, utils::format_ether};
use eyre::Result;
use mist_harness::{
    HarnessConfig, TransactionIntent, TxFormat,
    abi::{decode_output, encode_with_signature},
};
use mist_playground::{contracts, handler, utils};

fn main() {
    handler::install();
    utils::subscriber();
    if let Err(err) = run() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn run() -> Result<()> {
    let harness = HarnessConfig::load()?.connect()?;
    let hero = utils::hero(&harness).await?;
    println!("HERO: {hero} {}", format_ether(harness.balance_of(hero).await?));

    let deployment =
        harness.deploy(hero, contracts::echo_init_code(), TxFormat::FeeMarket).await?;
    println!("ADDR: {}", deployment.address);

    let data = encode_with_signature(contracts::ECHO_SIGNATURE, Vec::<String>::new())?;
    println!("DATA: {data}");
    let call = TransactionIntent::build_call(hero, deployment.address, data, TxFormat::FeeMarket)
        .with_value(U256::ZERO);
    let output = harness.call(&call).await?;
    println!("RESULT: {output}");

    let decoded = decode_output(contracts::ECHO_SIGNATURE, output.as_slice())?;
    if let Some((value, _)) = decoded.first().and_then(|value| value.as_uint()) {
        println!("VALUE: {value:#x}");
    }
    Ok(())
}
