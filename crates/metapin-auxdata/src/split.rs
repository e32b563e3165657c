//! Locating the trailing auxdata region of a bytecode hex string.
//!
//! The compiler appends `[CBOR object][u16 big-endian length of the object]`
//! to the runtime code. Nothing else marks the region, so a candidate is only
//! accepted when the referenced bytes decode as exactly one CBOR item.

use ciborium::Value;

/// Hex characters taken by the trailing length field
const LENGTH_FIELD_HEX: usize = 4;

/// Result of one right-to-left split step.
#[derive(Debug, Clone, PartialEq)]
pub enum Split<'a> {
    /// A well-formed region was found at the right edge
    Region {
        /// Hex text left of the region (may be empty)
        execution: &'a str,
        /// The decoded CBOR object
        auxdata: Value,
    },
    /// No further structured auxdata at the right edge
    Boundary,
}

/// Split `body` (hex text without a `0x` prefix) into execution code and the
/// rightmost auxdata object.
pub fn split_auxdata(body: &str) -> Split<'_> {
    match try_split(body) {
        Some((execution, auxdata)) => Split::Region { execution, auxdata },
        None => Split::Boundary,
    }
}

fn try_split(body: &str) -> Option<(&str, Value)> {
    let length_start = body.len().checked_sub(LENGTH_FIELD_HEX)?;

    let mut length_field = [0u8; 2];
    hex::decode_to_slice(body.get(length_start..)?, &mut length_field).ok()?;
    let object_hex_len = usize::from(u16::from_be_bytes(length_field)) * 2;

    let execution_len = length_start.checked_sub(object_hex_len)?;
    let execution = body.get(..execution_len)?;
    let object = hex::decode(body.get(execution_len..length_start)?).ok()?;

    Some((execution, read_single_item(&object)?))
}

/// Decode `object` as exactly one CBOR item with no trailing bytes
pub(crate) fn read_single_item(object: &[u8]) -> Option<Value> {
    let mut rest = object;
    let item: Value = ciborium::de::from_reader(&mut rest).ok()?;
    rest.is_empty().then_some(item)
}

#[cfg(test)]
mod tests {
    use super::*;

    // {"solc": h'000814'}
    const SOLC_ONLY: &str = "a164736f6c6343000814";

    #[test]
    fn test_splits_trailing_region() {
        let body = format!("6080604052{}000a", SOLC_ONLY);
        match split_auxdata(&body) {
            Split::Region { execution, auxdata } => {
                assert_eq!(execution, "6080604052");
                assert!(matches!(auxdata, Value::Map(ref entries) if entries.len() == 1));
            }
            Split::Boundary => panic!("expected a region"),
        }
    }

    #[test]
    fn test_execution_part_may_be_empty() {
        let body = format!("{}000a", SOLC_ONLY);
        assert!(matches!(
            split_auxdata(&body),
            Split::Region { execution: "", .. }
        ));
    }

    #[test]
    fn test_length_longer_than_body_is_boundary() {
        let body = format!("60{}00ff", SOLC_ONLY);
        assert_eq!(split_auxdata(&body), Split::Boundary);
    }

    #[test]
    fn test_object_must_end_at_length_field() {
        // Declared length covers one extra byte before the map; the extra
        // byte is itself a complete CBOR item, so the map is trailing data.
        let body = format!("600001{}000b", SOLC_ONLY);
        assert_eq!(split_auxdata(&body), Split::Boundary);
    }

    #[test]
    fn test_truncated_object_is_boundary() {
        // Map header claims two entries but only one follows
        let body = "6080a264736f6c6343000814000a";
        assert_eq!(split_auxdata(body), Split::Boundary);
    }

    #[test]
    fn test_short_or_non_hex_input_is_boundary() {
        assert_eq!(split_auxdata(""), Split::Boundary);
        assert_eq!(split_auxdata("0a"), Split::Boundary);
        assert_eq!(split_auxdata("6080zz0a"), Split::Boundary);
        assert_eq!(split_auxdata("60800000"), Split::Boundary);
    }

    #[test]
    fn test_read_single_item_rejects_trailing_bytes() {
        let object = hex::decode(SOLC_ONLY).unwrap();
        assert!(read_single_item(&object).is_some());

        let mut padded = object.clone();
        padded.push(0x00);
        assert!(read_single_item(&padded).is_none());
        assert!(read_single_item(&[]).is_none());
    }

    #[test]
    fn test_library_placeholder_left_of_region() {
        let body = format!("73__$1234567890abcdef1234567890abcdef12$__{}000a", SOLC_ONLY);
        match split_auxdata(&body) {
            Split::Region { execution, .. } => {
                assert_eq!(execution, "73__$1234567890abcdef1234567890abcdef12$__");
            }
            Split::Boundary => panic!("expected a region"),
        }
    }
}
