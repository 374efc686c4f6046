//! Walks a capped token through mints, transfers and an allowance spent by a third party.

use alloy_primitives::{Address, U256, utils::format_ether};
use eyre::{Result, bail};
use mist_harness::{
    HarnessConfig, HarnessError, Receipt, RawBytes, TransactionIntent, TxFormat,
    logs::decode_receipt,
};
use mist_playground::{CappedToken, Token, handler, utils};

const TWO: Address = alloy_primitives::address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8");

/// An account nobody holds a key for, driven through impersonation.
const WHALE: Address = Address::repeat_byte(0xc0);

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

    let cap = U256::from(1_000_000);
    let (token, deployment) = Token::deploy(&harness, hero, cap, TxFormat::FeeMarket).await?;
    println!("ADDR: {}", deployment.address);
    let interface = CappedToken::interface()?;
    let print_events = |receipt: &Receipt| -> Result<()> {
        for event in decode_receipt(receipt, &interface)? {
            let values: Vec<String> = event.values().map(|value| format!("{value:?}")).collect();
            println!("  {}({})", event.name, values.join(", "));
        }
        Ok(())
    };

    let receipt = harness.transact(token.mint(hero, hero, U256::from(600_000))?).await?;
    print_events(&receipt)?;
    let receipt = harness.transact(token.transfer(hero, TWO, U256::from(1_000))?).await?;
    print_events(&receipt)?;
    let receipt = harness.transact(token.transfer(hero, WHALE, U256::from(5_000))?).await?;
    print_events(&receipt)?;

    // the whale pays its own gas on nodes that charge for it
    let fund = TransactionIntent::build_call(hero, WHALE, RawBytes::new(), TxFormat::FeeMarket)
        .with_value(U256::from(10).pow(U256::from(18)));
    harness.transact(fund).await?;

    let approve = token.approve(WHALE, hero, U256::from(2_000))?;
    let receipt = harness
        .impersonate(WHALE, |session| async move { session.transact(approve).await })
        .await?;
    print_events(&receipt)?;
    let receipt =
        harness.transact(token.transfer_from(hero, WHALE, TWO, U256::from(1_500))?).await?;
    print_events(&receipt)?;
    println!("ALLOWANCE: {}", token.allowance(WHALE, hero).await?);

    // explicit gas limit, so the node includes the failing mint instead of refusing to estimate
    let over_cap = token.mint(hero, hero, U256::from(500_000))?.with_gas_limit(200_000);
    match harness.transact(over_cap).await {
        Err(HarnessError::Reverted(receipt)) => {
            println!("CAPPED: mint reverted in block {:?}", receipt.block_number)
        }
        Ok(receipt) => bail!("mint past the cap succeeded: {}", receipt.transaction_hash),
        Err(err) => return Err(err.into()),
    }

    println!("SUPPLY: {} / {}", token.total_supply().await?, token.cap().await?);
    for (name, account) in [("HERO", hero), ("TWO", TWO), ("WHALE", WHALE)] {
        println!("{name}: {}", token.balance_of(account).await?);
    }
    Ok(())
}
