use crate::core::{Block, Transaction, TransactionIndex};
use crate::error::{NodeError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// P2P message types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Version,
    Verack,
    GetData,
    Chain,
    AddBlock,
    AddTx,
}

impl MessageKind {
    /// Wire name of this message type.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Version => "version",
            MessageKind::Verack => "verack",
            MessageKind::GetData => "getdata",
            MessageKind::Chain => "chain",
            MessageKind::AddBlock => "addblock",
            MessageKind::AddTx => "addtx",
        }
    }

    /// Parse a wire name. Unknown names yield `None`; the dispatcher ignores
    /// them rather than treating them as malformed input.
    pub fn parse(name: &str) -> Option<MessageKind> {
        match name {
            "version" => Some(MessageKind::Version),
            "verack" => Some(MessageKind::Verack),
            "getdata" => Some(MessageKind::GetData),
            "chain" => Some(MessageKind::Chain),
            "addblock" => Some(MessageKind::AddBlock),
            "addtx" => Some(MessageKind::AddTx),
            _ => None,
        }
    }
}

/// The wire envelope every packet carries, independent of transport.
///
/// `message` holds a nested JSON-encoded payload (or is empty), and an empty
/// `target` means broadcast; a non-empty target that is not the local
/// identifier causes the packet to be dropped before dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub identifier: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub target: String,
}

impl Envelope {
    pub fn new(kind: MessageKind, identifier: &str, message: String, target: &str) -> Envelope {
        Envelope {
            kind: kind.as_str().to_string(),
            identifier: identifier.to_string(),
            message,
            target: target.to_string(),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Envelope> {
        serde_json::from_slice(bytes)
            .map_err(|e| NodeError::Serialization(format!("Malformed packet: {e}")))
    }

    /// Decode the nested payload. An empty `message` field decodes types
    /// whose fields are all defaulted, matching peers that omit the payload.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T> {
        let raw = if self.message.is_empty() {
            "{}"
        } else {
            self.message.as_str()
        };
        serde_json::from_str(raw)
            .map_err(|e| NodeError::Serialization(format!("Malformed payload: {e}")))
    }
}

/// Encode a payload for the envelope's nested `message` field.
pub fn encode_payload<T: Serialize>(payload: &T) -> Result<String> {
    Ok(serde_json::to_string(payload)?)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionPayload {
    pub height: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetDataPayload {
    /// Correlation id echoed back in the `chain` response, so a stalled
    /// request can be timed out and retried against another peer.
    #[serde(default)]
    pub request_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainPayload {
    pub chain: Vec<Block>,
    #[serde(default)]
    pub tx_info: TransactionIndex,
    #[serde(default)]
    pub request_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddBlockPayload {
    pub block: Block,
    #[serde(default)]
    pub tx_info: TransactionIndex,
    pub height: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTxPayload {
    pub tx: Transaction,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_round_trip() {
        let payload = encode_payload(&VersionPayload { height: 3 }).unwrap();
        let envelope = Envelope::new(MessageKind::Version, "node-a", payload, "");

        let decoded = Envelope::decode(&envelope.encode().unwrap()).unwrap();
        assert_eq!(decoded, envelope);
        assert_eq!(decoded.payload::<VersionPayload>().unwrap().height, 3);
    }

    #[test]
    fn test_wire_field_is_named_type() {
        let envelope = Envelope::new(MessageKind::Verack, "node-a", String::new(), "node-b");
        let raw = String::from_utf8(envelope.encode().unwrap()).unwrap();
        assert!(raw.contains(r#""type":"verack""#));
    }

    #[test]
    fn test_unknown_kind_parses_to_none() {
        assert_eq!(MessageKind::parse("gossip"), None);
        assert_eq!(MessageKind::parse("ADDBLOCK"), None);
        assert_eq!(MessageKind::parse("addblock"), Some(MessageKind::AddBlock));
    }

    #[test]
    fn test_empty_message_decodes_defaulted_payload() {
        let envelope = Envelope::new(MessageKind::GetData, "node-a", String::new(), "");
        let payload: GetDataPayload = envelope.payload().unwrap();
        assert!(payload.request_id.is_empty());
    }

    #[test]
    fn test_malformed_packet_is_an_error() {
        assert!(Envelope::decode(b"not json at all").is_err());
    }

    #[test]
    fn test_missing_target_defaults_to_broadcast() {
        let raw = br#"{"type":"verack","identifier":"node-a","message":""}"#;
        let envelope = Envelope::decode(raw).unwrap();
        assert!(envelope.target.is_empty());
    }
}
