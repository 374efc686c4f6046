//! Bytecode assembly for hand-written contracts.

use crate::bytes::RawBytes;
use alloy_primitives::{Address, U256, map::HashMap};
use revm::bytecode::opcode::{
    CODECOPY, DUP1, INVALID, JUMP, JUMPDEST, JUMPI, OpCode, PUSH0, PUSH1, PUSH2, PUSH32, RETURN,
};
use std::fmt::Write;

/// Errors raised while resolving labels.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AsmError {
    #[error("label `{0}` is defined more than once")]
    DuplicateLabel(String),
    #[error("label `{0}` is referenced but never defined")]
    UndefinedLabel(String),
    #[error("label `{label}` resolves to {offset:#x}, which does not fit in two bytes")]
    OffsetOverflow { label: String, offset: usize },
    #[error("cannot push {0} bytes, at most 32 fit in a word")]
    PushTooWide(usize),
}

/// A builder for assembling EVM bytecode with named jump targets.
///
/// Jump targets are always pushed with `PUSH2`, so the code size is limited to 64KiB. Problems
/// such as an undefined label are reported by [`BytecodeBuilder::build`].
#[derive(Debug, Default)]
pub struct BytecodeBuilder {
    code: Vec<u8>,
    labels: HashMap<String, usize>,
    fixups: Vec<(usize, String)>,
    error: Option<AsmError>,
}

impl BytecodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the length of the bytecode emitted so far.
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// Check if the bytecode is empty.
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Append a single opcode or byte.
    pub fn append(mut self, opcode: u8) -> Self {
        self.code.push(opcode);
        self
    }

    /// Append a series of opcodes or bytes.
    pub fn append_many(mut self, items: impl IntoIterator<Item = u8>) -> Self {
        self.code.extend(items);
        self
    }

    /// Append a PUSH opcode and the bytes to push. An empty slice emits `PUSH0`.
    pub fn push_bytes(mut self, bytes: impl AsRef<[u8]>) -> Self {
        let bytes = bytes.as_ref();
        if bytes.len() > 32 {
            self.fail(AsmError::PushTooWide(bytes.len()));
            return self;
        }
        self.code.push(PUSH0 + bytes.len() as u8);
        self.code.extend_from_slice(bytes);
        self
    }

    /// Append the shortest PUSH of `value`. Zero is pushed as `PUSH1 0x00`.
    pub fn push_word(self, value: U256) -> Self {
        let trimmed = value.to_be_bytes_trimmed_vec();
        if trimmed.is_empty() { self.push_bytes([0]) } else { self.push_bytes(trimmed) }
    }

    /// Append the shortest PUSH of `number`.
    pub fn push_number(self, number: u64) -> Self {
        self.push_word(U256::from(number))
    }

    /// Append a `PUSH32` of `value`, regardless of its magnitude.
    pub fn push_u256(self, value: U256) -> Self {
        self.push_bytes(value.to_be_bytes::<32>())
    }

    /// Append a `PUSH20` of `address`.
    pub fn push_address(self, address: Address) -> Self {
        self.push_bytes(address)
    }

    /// Define `name` at the current offset and emit a `JUMPDEST` there.
    pub fn label(self, name: &str) -> Self {
        self.mark(name).append(JUMPDEST)
    }

    /// Define `name` at the current offset without emitting anything.
    ///
    /// Useful for data offsets, such as the start of a runtime appended to init code.
    pub fn mark(mut self, name: &str) -> Self {
        if self.labels.insert(name.to_string(), self.code.len()).is_some() {
            self.fail(AsmError::DuplicateLabel(name.to_string()));
        }
        self
    }

    /// Append a `PUSH2` of the offset of `name`, resolved at build time.
    pub fn push_label(mut self, name: &str) -> Self {
        self.code.push(PUSH2);
        self.fixups.push((self.code.len(), name.to_string()));
        self.code.extend_from_slice(&[0, 0]);
        self
    }

    /// Unconditional jump to `name`.
    pub fn jump(self, name: &str) -> Self {
        self.push_label(name).append(JUMP)
    }

    /// Jump to `name` if the top of the stack is non-zero.
    pub fn jumpi(self, name: &str) -> Self {
        self.push_label(name).append(JUMPI)
    }

    /// Resolve every label reference and return the bytecode.
    pub fn build(mut self) -> Result<RawBytes, AsmError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        for (at, name) in &self.fixups {
            let offset =
                *self.labels.get(name).ok_or_else(|| AsmError::UndefinedLabel(name.clone()))?;
            let offset16 = u16::try_from(offset)
                .map_err(|_| AsmError::OffsetOverflow { label: name.clone(), offset })?;
            self.code[*at..*at + 2].copy_from_slice(&offset16.to_be_bytes());
        }
        Ok(self.code.into())
    }

    fn fail(&mut self, err: AsmError) {
        self.error.get_or_insert(err);
    }
}

/// Wraps runtime code in init code that copies it to memory and returns it.
///
/// The emitted prefix is
/// `PUSHn len; DUP1; PUSH2 offset; PUSH1 0; CODECOPY; PUSH1 0; RETURN; INVALID`, followed by the
/// runtime itself, where `offset` is the length of that prefix.
pub fn wrap_runtime(runtime: &RawBytes) -> Result<RawBytes, AsmError> {
    BytecodeBuilder::new()
        .push_number(runtime.len() as u64)
        .append(DUP1)
        .push_label("runtime")
        .push_number(0)
        .append(CODECOPY)
        .push_number(0)
        .append(RETURN)
        .append(INVALID)
        .mark("runtime")
        .append_many(runtime.as_slice().iter().copied())
        .build()
}

/// Renders `code` one instruction per line, with push immediates inline.
///
/// Bytes that are not assigned an opcode are shown as `UNKNOWN(0x..)`.
pub fn disassemble(code: &[u8]) -> String {
    let mut out = String::new();
    let mut pc = 0;
    while pc < code.len() {
        let byte = code[pc];
        let _ = match OpCode::new(byte) {
            Some(op) => write!(out, "| {pc:02x} | {}", op.as_str()),
            None => write!(out, "| {pc:02x} | UNKNOWN({byte:#04x})"),
        };
        let immediates = if (PUSH1..=PUSH32).contains(&byte) { (byte - PUSH0) as usize } else { 0 };
        for operand in code.iter().skip(pc + 1).take(immediates) {
            let _ = write!(out, " {operand:02x}");
        }
        out.push('\n');
        pc += 1 + immediates;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use revm::bytecode::opcode::{ADD, STOP};

    #[test]
    fn resolves_forward_and_backward_labels() {
        let code = BytecodeBuilder::new()
            .label("start")
            .jump("end")
            .append(STOP)
            .label("end")
            .jump("start")
            .build()
            .unwrap();
        assert_eq!(code.to_string(), "0x5b61000656005b61000056");
    }

    #[test]
    fn undefined_label_fails() {
        let err = BytecodeBuilder::new().jump("nowhere").build().unwrap_err();
        assert_eq!(err, AsmError::UndefinedLabel("nowhere".to_string()));
    }

    #[test]
    fn duplicate_label_fails() {
        let err = BytecodeBuilder::new().label("a").label("a").build().unwrap_err();
        assert_eq!(err, AsmError::DuplicateLabel("a".to_string()));
    }

    #[test]
    fn pushes_are_minimal() {
        let code = BytecodeBuilder::new()
            .push_number(0)
            .push_number(0xff)
            .push_number(0x100)
            .push_bytes([])
            .append(ADD)
            .build()
            .unwrap();
        assert_eq!(code.to_string(), "0x600060ff6101005f01");
        assert_eq!(
            BytecodeBuilder::new().push_bytes([0u8; 33]).build().unwrap_err(),
            AsmError::PushTooWide(33)
        );
    }

    #[test]
    fn wraps_runtime_in_constructor() {
        let runtime: RawBytes =
            "0x608060405261032161012360206040518383018152f3915050".parse().unwrap();
        let init = wrap_runtime(&runtime).unwrap();
        assert_eq!(
            init.to_string(),
            "0x60198061000d6000396000f3fe608060405261032161012360206040518383018152f3915050"
        );
    }

    #[test]
    fn wraps_large_runtime_with_wider_push() {
        let runtime = RawBytes::from(vec![0u8; 0x1234]);
        let init = wrap_runtime(&runtime).unwrap();
        assert_eq!(&init.as_slice()[..14], &hex_literal("6112348061000e6000396000f3fe")[..]);
        assert_eq!(init.len(), 14 + 0x1234);
    }

    #[test]
    fn disassembles_pushes() {
        let listing = disassemble(&hex_literal("60198061000d00fe0c"));
        assert_eq!(
            listing,
            "| 00 | PUSH1 19\n| 02 | DUP1\n| 03 | PUSH2 00 0d\n| 06 | STOP\n| 07 | INVALID\n| 08 | UNKNOWN(0x0c)\n"
        );
    }

    fn hex_literal(s: &str) -> Vec<u8> {
        alloy_primitives::hex::decode(s).unwrap()
    }
}
