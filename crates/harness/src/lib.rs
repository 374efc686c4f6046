#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

#[macro_use]
extern crate tracing;

pub mod abi;
pub mod address;
pub mod asm;
pub mod backend;
pub mod bytes;
pub mod client;
pub mod config;
pub mod error;
pub mod impersonate;
pub mod logs;
pub mod query;
pub mod receipt;
pub mod tx;

pub use address::derive_create_address;
pub use backend::{Backend, BackendError, BackendKind, Dialect, RpcBackend, SimBackend};
pub use bytes::RawBytes;
pub use client::{Harness, Settings};
pub use config::HarnessConfig;
pub use error::{HarnessError, Result};
pub use impersonate::ImpersonationSession;
pub use logs::{DecodeError, DecodedEvent, DecodedParam, InterfaceDescriptor};
pub use receipt::{Deployment, PendingTransaction, Receipt, ReceiptStatus};
pub use tx::{IntentKind, TransactionIntent, TxFormat};
