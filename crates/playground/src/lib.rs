#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

#[macro_use]
extern crate tracing;

pub mod contracts;
pub mod handler;
pub mod token;
pub mod utils;

pub use token::{CappedToken, Token};
