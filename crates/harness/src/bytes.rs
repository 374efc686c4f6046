//! Opaque byte payloads: init code, call data and return data.

use alloy_primitives::{Bytes, hex};
use std::{fmt, str::FromStr};

/// Malformed hex input.
#[derive(Debug, thiserror::Error)]
#[error("invalid hex payload: {0}")]
pub struct BytesError(#[from] hex::FromHexError);

/// A byte payload carried by a transaction or returned by a call.
///
/// Hex conversion only happens at the edges, through [`FromStr`] and [`fmt::Display`]. An
/// optional `0x` prefix is accepted when parsing; display always adds it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct RawBytes(Bytes);

impl RawBytes {
    /// Creates an empty payload.
    pub const fn new() -> Self {
        Self(Bytes::new())
    }

    /// Parses a hex string.
    ///
    /// Fails on odd length and on non-hex digits. The empty string is an empty payload.
    pub fn from_hex(s: impl AsRef<[u8]>) -> Result<Self, BytesError> {
        Ok(Self(hex::decode(s)?.into()))
    }

    /// Returns the `0x`-prefixed hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode_prefixed(&self.0)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl FromStr for RawBytes {
    type Err = BytesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for RawBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl AsRef<[u8]> for RawBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Bytes> for RawBytes {
    fn from(bytes: Bytes) -> Self {
        Self(bytes)
    }
}

impl From<Vec<u8>> for RawBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes.into())
    }
}

impl From<&[u8]> for RawBytes {
    fn from(bytes: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(bytes))
    }
}

impl From<RawBytes> for Bytes {
    fn from(bytes: RawBytes) -> Self {
        bytes.0
    }
}
