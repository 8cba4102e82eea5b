use serde::{Deserialize, Serialize};
use uuid::Uuid;

use gc_ledger::Block;
use gc_transaction::Transaction;

use crate::error::NodeError;

/// The largest datagram this node will send or accept. Anything bigger is
/// rejected before it's even parsed.
pub const MAX_PAYLOAD_BYTES: usize = 64 * 1024;

/// Every gossip message, tagged by its JSON `type` field. Field names match
/// the wire format exactly; `node_id` identifies the sender, not the chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GossipMessage {
    #[serde(rename = "HELLO")]
    Hello { node_id: Uuid, version: String },

    #[serde(rename = "STATUS")]
    Status {
        node_id: Uuid,
        version: String,
        height: u64,
    },

    #[serde(rename = "GET_BLOCKS")]
    GetBlocks {
        node_id: Uuid,
        start: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        end: Option<u64>,
    },

    #[serde(rename = "BLOCKS")]
    Blocks { node_id: Uuid, blocks: Vec<Block> },

    #[serde(rename = "NEW_TRANSACTION")]
    NewTransaction {
        node_id: Uuid,
        transaction: Transaction,
    },
}

impl GossipMessage {
    pub fn node_id(&self) -> Uuid {
        match self {
            GossipMessage::Hello { node_id, .. } => *node_id,
            GossipMessage::Status { node_id, .. } => *node_id,
            GossipMessage::GetBlocks { node_id, .. } => *node_id,
            GossipMessage::Blocks { node_id, .. } => *node_id,
            GossipMessage::NewTransaction { node_id, .. } => *node_id,
        }
    }
}

/// Serialize a message to the bytes that go on the wire. Rejects payloads
/// that would exceed [`MAX_PAYLOAD_BYTES`] rather than sending a datagram a
/// peer is required to drop.
pub fn encode(msg: &GossipMessage) -> Result<Vec<u8>, NodeError> {
    let bytes = serde_json::to_vec(msg)?;
    if bytes.len() > MAX_PAYLOAD_BYTES {
        return Err(NodeError::PayloadTooLarge(bytes.len()));
    }
    Ok(bytes)
}

/// Parse an inbound datagram. Oversized or malformed payloads are the
/// caller's concern to log; this just reports the error.
pub fn decode(bytes: &[u8]) -> Result<GossipMessage, NodeError> {
    if bytes.len() > MAX_PAYLOAD_BYTES {
        return Err(NodeError::PayloadTooLarge(bytes.len()));
    }
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_round_trips_through_json() {
        let node_id = Uuid::new_v4();
        let msg = GossipMessage::Hello {
            node_id,
            version: "1.0".into(),
        };
        let bytes = encode(&msg).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.node_id(), node_id);
    }

    #[test]
    fn wire_tag_matches_spec_discriminator() {
        let msg = GossipMessage::Status {
            node_id: Uuid::new_v4(),
            version: "1.0".into(),
            height: 3,
        };
        let bytes = encode(&msg).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["type"], "STATUS");
        assert_eq!(value["height"], 3);
    }

    #[test]
    fn get_blocks_omits_end_when_unset() {
        let msg = GossipMessage::GetBlocks {
            node_id: Uuid::new_v4(),
            start: 5,
            end: None,
        };
        let bytes = encode(&msg).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(value.get("end").is_none());
    }

    #[test]
    fn oversized_payload_is_rejected_before_parsing() {
        let bytes = vec![b'0'; MAX_PAYLOAD_BYTES + 1];
        assert!(decode(&bytes).is_err());
    }

    #[test]
    fn malformed_json_yields_decode_error() {
        assert!(decode(b"not json").is_err());
    }
}
