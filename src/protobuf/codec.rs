//! protobuf::codec
//!
//! The self-describing wire envelope.
//!
//! # Format
//!
//! ```text
//! byte 0       magic byte, always 0
//! bytes 1..5   schema id, u32 big-endian
//! varint       N, number of index path elements (zigzag)
//! varint * N   index path elements (zigzag)
//! rest         message in its standard binary encoding
//! ```
//!
//! Decoding never checks the index path against the type the caller decodes
//! into; the schema id and path are returned for the caller to act on.

use prost::Message;
use prost_reflect::{DynamicMessage, MessageDescriptor, ReflectMessage};

use super::index::{message_index_path, MessageIndexPath};
use super::varint::{decode_varint, encode_varint};
use super::{ensure_message_kind, ProtoError};

/// Leading byte of every envelope.
pub const MAGIC_BYTE: u8 = 0;

/// A decoded envelope whose payload is still in binary form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope<'a> {
    /// Registry id of the writer's schema
    pub schema_id: u32,
    /// Location of the message type within the schema file
    pub index_path: MessageIndexPath,
    /// Message bytes following the header
    pub payload: &'a [u8],
}

/// Encode `message` into an envelope tagged with `schema_id`.
///
/// # Errors
///
/// `ProtoError::InvalidArgument` if the message's descriptor is a map entry.
pub fn encode<M: ReflectMessage>(schema_id: u32, message: &M) -> Result<Vec<u8>, ProtoError> {
    let descriptor = message.descriptor();
    ensure_message_kind(&descriptor)?;

    let path = message_index_path(&descriptor.parent_file(), descriptor.full_name());

    let mut buf = Vec::with_capacity(5 + 1 + path.len() + message.encoded_len());
    buf.push(MAGIC_BYTE);
    buf.extend_from_slice(&schema_id.to_be_bytes());
    encode_varint(path.len() as i64, &mut buf);
    for &index in path.as_slice() {
        encode_varint(i64::from(index), &mut buf);
    }
    message
        .encode(&mut buf)
        .map_err(|e| ProtoError::Serialization(e.to_string()))?;

    Ok(buf)
}

/// Split an envelope into schema id, index path and payload.
///
/// # Errors
///
/// `ProtoError::WireFormat` if the magic byte is wrong, the schema id is
/// cut short, or the index path is truncated, negative in length or holds
/// values outside `i32`.
pub fn decode(bytes: &[u8]) -> Result<Envelope<'_>, ProtoError> {
    let (&magic, rest) = bytes
        .split_first()
        .ok_or_else(|| ProtoError::WireFormat("empty message".into()))?;
    if magic != MAGIC_BYTE {
        return Err(ProtoError::WireFormat(format!(
            "invalid magic byte {}, expected {}",
            magic, MAGIC_BYTE
        )));
    }

    if rest.len() < 4 {
        return Err(ProtoError::WireFormat(
            "cannot read schema id: missing data".into(),
        ));
    }
    let (id_bytes, mut rest) = rest.split_at(4);
    let schema_id = u32::from_be_bytes([id_bytes[0], id_bytes[1], id_bytes[2], id_bytes[3]]);

    let (count, n) = decode_varint(rest)?;
    rest = &rest[n..];
    if count < 0 {
        return Err(ProtoError::WireFormat(format!(
            "negative index path length {}",
            count
        )));
    }

    let mut indexes = Vec::new();
    for _ in 0..count {
        let (index, n) = decode_varint(rest)?;
        rest = &rest[n..];
        let index = i32::try_from(index).map_err(|_| {
            ProtoError::WireFormat(format!("index path element {} out of range", index))
        })?;
        indexes.push(index);
    }

    Ok(Envelope {
        schema_id,
        index_path: MessageIndexPath::new(indexes),
        payload: rest,
    })
}

/// Decode an envelope into a generated message type.
///
/// Returns the writer's schema id with the message.
pub fn decode_message<M: Message + Default>(bytes: &[u8]) -> Result<(u32, M), ProtoError> {
    let envelope = decode(bytes)?;
    let message =
        M::decode(envelope.payload).map_err(|e| ProtoError::Serialization(e.to_string()))?;
    Ok((envelope.schema_id, message))
}

/// Decode an envelope into a dynamic message of type `descriptor`.
///
/// Returns the writer's schema id with the message.
pub fn decode_dynamic(
    bytes: &[u8],
    descriptor: MessageDescriptor,
) -> Result<(u32, DynamicMessage), ProtoError> {
    let envelope = decode(bytes)?;
    let message = DynamicMessage::decode(descriptor, envelope.payload)
        .map_err(|e| ProtoError::Serialization(e.to_string()))?;
    Ok((envelope.schema_id, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protobuf::fixtures;
    use prost_reflect::Value;

    fn user(file: &prost_reflect::FileDescriptor) -> DynamicMessage {
        let mut user = DynamicMessage::new(fixtures::message(file, "fixture.User"));
        user.set_field_by_name("id", Value::String("u-1".into()));
        user.set_field_by_name("name", Value::String("Ana".into()));
        user
    }

    #[test]
    fn header_layout() {
        let file = fixtures::file("nested.proto", fixtures::NESTED);
        let c = DynamicMessage::new(fixtures::message(&file, "fixture.B.C"));

        let bytes = encode(0x0102_0304, &c).unwrap();
        // magic, id, count 2, path [1, 0], empty payload
        assert_eq!(bytes, vec![0, 1, 2, 3, 4, 0x04, 0x02, 0x00]);
    }

    #[test]
    fn roundtrip_dynamic() {
        let file = fixtures::file("user.proto", fixtures::USER);
        let user = user(&file);

        let bytes = encode(42, &user).unwrap();
        let envelope = decode(&bytes).unwrap();
        assert_eq!(envelope.schema_id, 42);
        assert_eq!(envelope.index_path.as_slice(), &[0]);

        let (id, decoded) = decode_dynamic(&bytes, user.descriptor()).unwrap();
        assert_eq!(id, 42);
        assert_eq!(decoded, user);
    }

    #[test]
    fn roundtrip_nested_type() {
        let file = fixtures::file("user.proto", fixtures::USER);
        let mut address = DynamicMessage::new(fixtures::message(&file, "fixture.User.Address"));
        address.set_field_by_name("street", Value::String("Kolodvorska 46".into()));
        address.set_field_by_name("city", Value::String("Ljubljana".into()));

        let bytes = encode(7, &address).unwrap();
        let envelope = decode(&bytes).unwrap();
        assert_eq!(envelope.index_path.as_slice(), &[0, 0]);
        assert_eq!(
            envelope.index_path.resolve(&file).unwrap().full_name(),
            "fixture.User.Address"
        );

        let (_, decoded) = decode_dynamic(&bytes, address.descriptor()).unwrap();
        assert_eq!(decoded, address);
    }

    #[test]
    fn map_entry_cannot_be_encoded() {
        let file = fixtures::file("user.proto", fixtures::USER);
        let entry = DynamicMessage::new(fixtures::message(&file, "fixture.User.LabelsEntry"));
        assert!(matches!(encode(1, &entry), Err(ProtoError::InvalidArgument(_))));
    }

    #[test]
    fn wrong_magic_byte() {
        let err = decode(&[1, 0, 0, 0, 1, 0]).unwrap_err();
        assert!(matches!(err, ProtoError::WireFormat(_)));
    }

    #[test]
    fn empty_input() {
        assert!(matches!(decode(&[]), Err(ProtoError::WireFormat(_))));
    }

    #[test]
    fn short_schema_id() {
        assert!(matches!(decode(&[0, 0, 0, 1]), Err(ProtoError::WireFormat(_))));
    }

    #[test]
    fn missing_index_count() {
        assert!(matches!(
            decode(&[0, 0, 0, 0, 1]),
            Err(ProtoError::WireFormat(_))
        ));
    }

    #[test]
    fn truncated_index_path() {
        // count 2, one element present
        assert!(matches!(
            decode(&[0, 0, 0, 0, 1, 0x04, 0x02]),
            Err(ProtoError::WireFormat(_))
        ));
    }

    #[test]
    fn negative_count() {
        assert!(matches!(
            decode(&[0, 0, 0, 0, 1, 0x01]),
            Err(ProtoError::WireFormat(_))
        ));
    }

    #[test]
    fn out_of_range_index() {
        let mut bytes = vec![0, 0, 0, 0, 1, 0x02];
        encode_varint(i64::from(i32::MAX) + 1, &mut bytes);
        assert!(matches!(decode(&bytes), Err(ProtoError::WireFormat(_))));
    }

    #[test]
    fn payload_is_returned_verbatim() {
        let envelope = decode(&[0, 0, 0, 0, 9, 0x00, 0xde, 0xad]).unwrap();
        assert_eq!(envelope.schema_id, 9);
        assert!(envelope.index_path.is_empty());
        assert_eq!(envelope.payload, &[0xde, 0xad]);
    }

    #[test]
    fn undecodable_payload_is_a_serialization_error() {
        let file = fixtures::file("user.proto", fixtures::USER);
        let descriptor = fixtures::message(&file, "fixture.User");
        // field 1, length-delimited, length 5, one byte present
        let bytes = [0, 0, 0, 0, 1, 0x00, 0x0a, 0x05, 0x61];
        assert!(matches!(
            decode_dynamic(&bytes, descriptor),
            Err(ProtoError::Serialization(_))
        ));
    }
}
