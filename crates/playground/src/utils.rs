use alloy_primitives::Address;
use eyre::OptionExt;
use mist_harness::Harness;
use tracing_subscriber::EnvFilter;

/// Installs a `tracing` subscriber filtered by `RUST_LOG`.
pub fn subscriber() {
    let _ = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

/// The first account of the backend, the one the scripts act as.
pub async fn hero(harness: &Harness) -> eyre::Result<Address> {
    harness.accounts().await?.first().copied().ok_or_eyre("the node reports no accounts")
}
