//! Fixed contracts used by the scripts.

use alloy_primitives::{U256, hex};
use mist_harness::{RawBytes, asm};

/// Init code of a contract whose runtime returns `0x123 + 0x321` for any call.
///
/// The constructor copies the 25 runtime bytes at offset 12 and returns them.
pub const ECHO_INIT_CODE: [u8; 37] =
    hex!("60198061000c6000396000f3608060405261032161012360206040518383018152f3915050");

/// Offset of the runtime inside [`ECHO_INIT_CODE`].
const ECHO_RUNTIME_OFFSET: usize = 12;

/// The word every call to the echo contract returns.
pub const ECHO_VALUE: U256 = U256::from_limbs([0x444, 0, 0, 0]);

/// Signature the result script calls the echo contract with. The contract ignores call data.
pub const ECHO_SIGNATURE: &str = "something()(uint256)";

pub fn echo_init_code() -> RawBytes {
    RawBytes::from(&ECHO_INIT_CODE[..])
}

pub fn echo_runtime() -> RawBytes {
    RawBytes::from(&ECHO_INIT_CODE[ECHO_RUNTIME_OFFSET..])
}

/// The echo runtime behind a constructor emitted by [`asm::wrap_runtime`].
pub fn wrapped_echo_init_code() -> Result<RawBytes, asm::AsmError> {
    asm::wrap_runtime(&echo_runtime())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_is_the_copied_tail() {
        assert_eq!(echo_runtime().len(), 0x19);
        assert!(asm::disassemble(echo_runtime().as_slice()).contains("| 12 | ADD"));
    }

    #[test]
    fn wrapped_constructor_differs_only_in_prefix() {
        let wrapped = wrapped_echo_init_code().unwrap();
        assert_eq!(&wrapped.as_slice()[..13], &hex!("60198061000d6000396000f3fe"));
        assert_eq!(&wrapped.as_slice()[13..], echo_runtime().as_slice());
    }
}
