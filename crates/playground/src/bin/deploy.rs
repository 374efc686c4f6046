//! Deploys the echo runtime behind a generated constructor and calls it.

use alloy_primitives::utils::format_ether;
use eyre::Result;
use mist_harness::{HarnessConfig, RawBytes, TransactionIntent, TxFormat, asm};
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

    let init_code = contracts::wrapped_echo_init_code()?;
    let deployment = harness.deploy(hero, init_code, TxFormat::Legacy).await?;
    println!("ADDR: {}", deployment.address);
    print!("{}", asm::disassemble(harness.code_of(deployment.address).await?.as_slice()));

    let call =
        TransactionIntent::build_call(hero, deployment.address, RawBytes::new(), TxFormat::Legacy);
    println!("RESULT: {}", harness.call(&call).await?);
    Ok(())
}
