//! Contract address derivation.

use alloy_primitives::{Address, keccak256};
use alloy_rlp::{Encodable, Header};

/// Returns the address a `CREATE` transaction from `sender` with `nonce` deploys to.
///
/// This is `keccak256(rlp([sender, nonce]))[12..]`. The result is only valid for the nonce it was
/// computed with; derive it again whenever the sender's nonce may have moved.
///
/// # Example
///
/// ```
/// use alloy_primitives::address;
/// use mist_harness::derive_create_address;
///
/// let sender = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
/// assert_eq!(
///     derive_create_address(sender, 0),
///     address!("0x5FbDB2315678afecb367f032d93F642f64180aa3")
/// );
/// ```
pub fn derive_create_address(sender: Address, nonce: u64) -> Address {
    let payload_length = sender.length() + nonce.length();
    let mut out = Vec::with_capacity(payload_length + 1);
    Header { list: true, payload_length }.encode(&mut out);
    sender.encode(&mut out);
    nonce.encode(&mut out);
    Address::from_word(keccak256(&out))
}
