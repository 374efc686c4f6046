//! ABI related helper functions.

use crate::bytes::RawBytes;
use alloy_dyn_abi::{DynSolType, DynSolValue, FunctionExt, JsonAbiExt};
use alloy_json_abi::{Function, Param};
use alloy_primitives::Selector;

/// Errors raised while encoding call data or decoding return data.
#[derive(Debug, thiserror::Error)]
pub enum AbiError {
    #[error("could not parse signature `{sig}`: {reason}")]
    Signature { sig: String, reason: String },
    #[error("`{sig}` takes {expected} arguments, got {got}")]
    ArgumentCount { sig: String, expected: usize, got: usize },
    #[error("invalid ABI document: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Coder(#[from] alloy_dyn_abi::Error),
}

/// Given a function signature string, it tries to parse it as a `Function`.
///
/// Both `transfer(address,uint256)` and `function balanceOf(address) returns (uint256)` forms
/// are accepted.
pub fn get_func(sig: &str) -> Result<Function, AbiError> {
    Function::parse(sig)
        .map_err(|err| AbiError::Signature { sig: sig.to_string(), reason: err.to_string() })
}

/// Returns the 4-byte selector of a function signature.
pub fn selector(sig: &str) -> Result<Selector, AbiError> {
    Ok(get_func(sig)?.selector())
}

/// Parses `arg` as a value of the Solidity type `ty`.
pub fn coerce_value(ty: &str, arg: &str) -> Result<DynSolValue, AbiError> {
    let ty = DynSolType::parse(ty)?;
    Ok(DynSolType::coerce_str(&ty, arg)?)
}

pub fn encode_args<I, S>(inputs: &[Param], args: I) -> Result<Vec<DynSolValue>, AbiError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    std::iter::zip(inputs, args)
        .map(|(input, arg)| coerce_value(&input.selector_type(), arg.as_ref()))
        .collect()
}

/// Encodes a call to `sig` with string arguments, selector included.
///
/// # Example
///
/// ```
/// use mist_harness::abi::encode_with_signature;
///
/// let data = encode_with_signature("transfer(address,uint256)", [
///     "0x70997970C51812dc3A010C7d01b50e0d17dc79C8",
///     "1000",
/// ])?;
/// assert_eq!(&data.as_slice()[..4], &[0xa9, 0x05, 0x9c, 0xbb]);
/// # Ok::<_, mist_harness::abi::AbiError>(())
/// ```
pub fn encode_with_signature<I, S>(sig: &str, args: I) -> Result<RawBytes, AbiError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let func = get_func(sig)?;
    let args: Vec<S> = args.into_iter().collect();
    if args.len() != func.inputs.len() {
        return Err(AbiError::ArgumentCount {
            sig: sig.to_string(),
            expected: func.inputs.len(),
            got: args.len(),
        });
    }
    encode_function_args(&func, args)
}

/// Given a function and a vector of string arguments, it proceeds to convert the args to alloy
/// [DynSolValue]s and then ABI encode them.
pub fn encode_function_args<I, S>(func: &Function, args: I) -> Result<RawBytes, AbiError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Ok(func.abi_encode_input(&encode_args(&func.inputs, args)?)?.into())
}

/// Decodes the return data of a call to `sig`, which must declare its outputs, e.g.
/// `balanceOf(address)(uint256)`.
pub fn decode_output(sig: &str, data: &[u8]) -> Result<Vec<DynSolValue>, AbiError> {
    Ok(get_func(sig)?.abi_decode_output(data)?)
}
