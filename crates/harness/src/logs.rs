//! Decoding receipt logs into named events.

use crate::{abi::AbiError, receipt::Receipt};
use alloy_dyn_abi::{DynSolValue, EventExt};
use alloy_json_abi::{Event, Function, JsonAbi};
use alloy_primitives::{Address, B256, Log};

/// A log matched an event of the interface but its layout disagrees with the declaration.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("failed to decode `{event}` log: {source}")]
    Abi {
        event: String,
        #[source]
        source: alloy_dyn_abi::Error,
    },
    #[error("`{event}` declares {expected} parameters but {got} were decoded")]
    Arity { event: String, expected: usize, got: usize },
}

/// The events and functions a contract exposes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InterfaceDescriptor {
    abi: JsonAbi,
}

impl InterfaceDescriptor {
    pub fn new(abi: JsonAbi) -> Self {
        Self { abi }
    }

    /// Parses a JSON ABI document, either the bare array or an artifact with an `abi` field.
    pub fn from_json(json: &str) -> Result<Self, AbiError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let abi = match value {
            serde_json::Value::Object(mut artifact) if artifact.contains_key("abi") => {
                serde_json::from_value(artifact.remove("abi").unwrap_or_default())?
            }
            other => serde_json::from_value(other)?,
        };
        Ok(Self { abi })
    }

    /// Builds an interface from human-readable signatures such as
    /// `event Transfer(address indexed from, address indexed to, uint256 value)`.
    pub fn parse<'a>(signatures: impl IntoIterator<Item = &'a str>) -> Result<Self, AbiError> {
        let signatures: Vec<&str> = signatures.into_iter().collect();
        let abi = JsonAbi::parse(signatures.iter().copied()).map_err(|err| AbiError::Signature {
            sig: signatures.join("; "),
            reason: err.to_string(),
        })?;
        Ok(Self { abi })
    }

    pub fn abi(&self) -> &JsonAbi {
        &self.abi
    }

    /// Finds the non-anonymous event whose selector is `topic0`.
    pub fn event_by_selector(&self, topic0: B256) -> Option<&Event> {
        self.abi.events().find(|event| !event.anonymous && event.selector() == topic0)
    }

    /// Returns the first function called `name`.
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.abi.function(name).and_then(|overloads| overloads.first())
    }
}

/// A decoded event argument.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedParam {
    pub name: String,
    /// Solidity type as declared.
    pub ty: String,
    pub indexed: bool,
    pub value: DynSolValue,
}

/// An event decoded from a log, arguments in declaration order.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedEvent {
    pub name: String,
    /// Contract that emitted the log.
    pub address: Address,
    pub params: Vec<DecodedParam>,
}

impl DecodedEvent {
    /// Looks up an argument by its declared name.
    pub fn param(&self, name: &str) -> Option<&DynSolValue> {
        self.params.iter().find(|param| param.name == name).map(|param| &param.value)
    }

    pub fn values(&self) -> impl Iterator<Item = &DynSolValue> {
        self.params.iter().map(|param| &param.value)
    }
}

/// Decodes `log` against `descriptor`.
///
/// Logs without topics and logs whose first topic matches no event of the interface yield
/// `Ok(None)`. A matching log whose topics or data do not fit the declared layout is an error.
pub fn decode(log: &Log, descriptor: &InterfaceDescriptor) -> Result<Option<DecodedEvent>, DecodeError> {
    let Some(topic0) = log.topics().first() else {
        return Ok(None);
    };
    let Some(event) = descriptor.event_by_selector(*topic0) else {
        return Ok(None);
    };

    let decoded = event
        .decode_log(&log.data)
        .map_err(|source| DecodeError::Abi { event: event.name.clone(), source })?;
    let got = decoded.indexed.len() + decoded.body.len();
    let mut indexed = decoded.indexed.into_iter();
    let mut body = decoded.body.into_iter();

    let params = event
        .inputs
        .iter()
        .map(|input| {
            let value = if input.indexed { indexed.next() } else { body.next() };
            value.map(|value| DecodedParam {
                name: input.name.clone(),
                ty: input.ty.clone(),
                indexed: input.indexed,
                value,
            })
        })
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| DecodeError::Arity {
            event: event.name.clone(),
            expected: event.inputs.len(),
            got,
        })?;

    Ok(Some(DecodedEvent { name: event.name.clone(), address: log.address, params }))
}

/// Decodes every log of `receipt` in emission order, skipping logs the interface does not know.
pub fn decode_receipt(
    receipt: &Receipt,
    descriptor: &InterfaceDescriptor,
) -> Result<Vec<DecodedEvent>, DecodeError> {
    receipt.logs.iter().filter_map(|log| decode(log, descriptor).transpose()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{LogData, U256, address};
    use similar_asserts::assert_eq;

    const TOKEN: Address = address!("0x5FbDB2315678afecb367f032d93F642f64180aa3");
    const FROM: Address = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
    const TO: Address = address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8");

    fn erc20() -> InterfaceDescriptor {
        InterfaceDescriptor::parse([
            "event Transfer(address indexed from, address indexed to, uint256 value)",
            "event Approval(address indexed owner, address indexed spender, uint256 value)",
            "function balanceOf(address owner) returns (uint256)",
        ])
        .unwrap()
    }

    fn transfer_log(value: u64) -> Log {
        let selector = erc20().abi().event("Transfer").unwrap()[0].selector();
        Log {
            address: TOKEN,
            data: LogData::new_unchecked(
                vec![selector, FROM.into_word(), TO.into_word()],
                U256::from(value).to_be_bytes::<32>().to_vec().into(),
            ),
        }
    }

    #[test]
    fn decodes_transfer_in_declaration_order() {
        let event = decode(&transfer_log(1000), &erc20()).unwrap().unwrap();
        assert_eq!(event.name, "Transfer");
        assert_eq!(event.address, TOKEN);
        assert_eq!(
            event.params.iter().map(|p| (p.name.as_str(), p.indexed)).collect::<Vec<_>>(),
            vec![("from", true), ("to", true), ("value", false)]
        );
        assert_eq!(event.param("from"), Some(&DynSolValue::Address(FROM)));
        assert_eq!(event.param("to"), Some(&DynSolValue::Address(TO)));
        assert_eq!(event.param("value"), Some(&DynSolValue::Uint(U256::from(1000), 256)));
    }

    #[test]
    fn decoding_is_idempotent() {
        let log = transfer_log(7);
        let descriptor = erc20();
        assert_eq!(decode(&log, &descriptor).unwrap(), decode(&log, &descriptor).unwrap());
    }

    #[test]
    fn unknown_logs_are_skipped() {
        let descriptor = erc20();
        let anonymous = Log { address: TOKEN, data: LogData::new_unchecked(vec![], vec![1].into()) };
        assert_eq!(decode(&anonymous, &descriptor).unwrap(), None);

        let foreign = Log {
            address: TOKEN,
            data: LogData::new_unchecked(vec![B256::repeat_byte(0xab)], Default::default()),
        };
        assert_eq!(decode(&foreign, &descriptor).unwrap(), None);
    }

    #[test]
    fn mismatched_layout_is_an_error() {
        let mut short = transfer_log(1);
        short.data = LogData::new_unchecked(short.data.topics().to_vec(), vec![0u8; 16].into());
        assert!(matches!(decode(&short, &erc20()), Err(DecodeError::Abi { .. })));

        let mut missing_topic = transfer_log(1);
        missing_topic.data = LogData::new_unchecked(
            missing_topic.data.topics()[..2].to_vec(),
            missing_topic.data.data.clone(),
        );
        assert!(matches!(decode(&missing_topic, &erc20()), Err(DecodeError::Abi { .. })));
    }

    #[test]
    fn receipt_logs_keep_order() {
        let receipt = Receipt {
            transaction_hash: B256::ZERO,
            status: crate::receipt::ReceiptStatus::Success,
            logs: vec![transfer_log(1), Log::default(), transfer_log(2)],
            gas_used: 0,
            contract_address: None,
            block_number: Some(1),
        };
        let events = decode_receipt(&receipt, &erc20()).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].param("value"), Some(&DynSolValue::Uint(U256::from(1), 256)));
        assert_eq!(events[1].param("value"), Some(&DynSolValue::Uint(U256::from(2), 256)));
    }

    #[test]
    fn parses_json_artifacts() {
        let abi = r#"[{"type":"event","name":"Ping","anonymous":false,"inputs":[{"name":"n","type":"uint8","indexed":false}]}]"#;
        let bare = InterfaceDescriptor::from_json(abi).unwrap();
        let artifact = InterfaceDescriptor::from_json(&format!(r#"{{"contractName":"P","abi":{abi}}}"#)).unwrap();
        assert_eq!(bare, artifact);
        assert_eq!(bare.abi().events().count(), 1);
    }
}
