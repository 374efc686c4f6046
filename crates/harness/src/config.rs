//! Harness configuration.
//!
//! Values are layered, later sources winning:
//!
//! 1. built-in defaults
//! 2. `mist.toml` in the working directory
//! 3. `MIST_`-prefixed environment variables, e.g. `MIST_RPC_URL` or `MIST_PRIVATE_KEY`

use crate::{
    backend::{BackendKind, DEV_ACCOUNTS, DEFAULT_CHAIN_ID, Dialect, RpcBackend, SimBackend},
    client::{Harness, Settings},
};
use alloy_signer_local::PrivateKeySigner;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, time::Duration};
use url::Url;

/// Problems with the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Extract(#[from] figment::Error),
    /// The key is never echoed back.
    #[error("private key must be 64 hex digits, optionally prefixed with 0x")]
    InvalidPrivateKey,
    #[error("invalid rpc url `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("a live network needs an rpc_url")]
    MissingRpcUrl,
}

/// Where and how the harness connects.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Node endpoint. Without one, an in-process chain is used.
    pub rpc_url: Option<String>,
    /// Whether the node honours impersonation.
    pub network: BackendKind,
    /// Development method family of the node.
    pub dialect: Dialect,
    /// Chain id of the in-process chain.
    pub chain_id: u64,
    /// Key of the account transactions are signed with locally.
    pub private_key: Option<String>,
    /// Seconds to wait for a receipt.
    pub receipt_timeout: u64,
    /// Milliseconds between receipt lookups.
    pub poll_interval: u64,
}

impl fmt::Debug for HarnessConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HarnessConfig")
            .field("rpc_url", &self.rpc_url)
            .field("network", &self.network)
            .field("dialect", &self.dialect)
            .field("chain_id", &self.chain_id)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("receipt_timeout", &self.receipt_timeout)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            rpc_url: None,
            network: BackendKind::Simulated,
            dialect: Dialect::Anvil,
            chain_id: DEFAULT_CHAIN_ID,
            private_key: None,
            receipt_timeout: 120,
            poll_interval: 250,
        }
    }
}

impl HarnessConfig {
    /// File read from the working directory.
    pub const FILE_NAME: &'static str = "mist.toml";

    /// Prefix of the environment variables that override file values.
    pub const ENV_PREFIX: &'static str = "MIST_";

    /// Loads and validates the configuration from all sources.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_provider(Self::figment())
    }

    /// The layered sources, for callers that want to merge in more.
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(Self::FILE_NAME))
            .merge(Env::prefixed(Self::ENV_PREFIX))
    }

    pub fn from_provider(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        trace!(target: "config", rpc_url = ?config.rpc_url, network = %config.network, "loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(key) = &self.private_key {
            let digits = key.strip_prefix("0x").unwrap_or(key);
            if digits.len() != 64 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(ConfigError::InvalidPrivateKey);
            }
        }
        if self.network == BackendKind::Live && self.rpc_url.is_none() {
            return Err(ConfigError::MissingRpcUrl);
        }
        Ok(())
    }

    /// The local signer, if a private key is configured.
    pub fn signer(&self) -> Result<Option<PrivateKeySigner>, ConfigError> {
        self.private_key
            .as_deref()
            .map(|key| PrivateKeySigner::from_str(key).map_err(|_| ConfigError::InvalidPrivateKey))
            .transpose()
    }

    pub fn settings(&self) -> Settings {
        Settings {
            receipt_timeout: Duration::from_secs(self.receipt_timeout),
            poll_interval: Duration::from_millis(self.poll_interval),
        }
    }

    /// Builds a harness for the configured network.
    ///
    /// Without an `rpc_url` this is a fresh in-process chain whose accounts are the development
    /// accounts plus the configured signer's address.
    pub fn connect(&self) -> Result<Harness, ConfigError> {
        self.validate()?;
        let signer = self.signer()?;
        let harness = match &self.rpc_url {
            None => {
                let accounts = signer.iter().map(|signer| signer.address()).chain(DEV_ACCOUNTS);
                Harness::new(SimBackend::with_accounts(self.chain_id, accounts))
            }
            Some(raw) => {
                let url = Url::parse(raw)
                    .map_err(|source| ConfigError::InvalidUrl { url: raw.clone(), source })?;
                let mut backend = RpcBackend::connect_http(url.clone(), self.dialect, self.network);
                if let Some(signer) = signer {
                    backend = backend.with_signer(url, signer);
                }
                Harness::new(backend)
            }
        };
        Ok(harness.with_settings(self.settings()))
    }
}
