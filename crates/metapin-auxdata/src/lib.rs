//! Decoder for the CBOR metadata sections Solidity appends to bytecode.
//!
//! A deployed bytecode blob may carry several auxdata regions back to back
//! (for example when linked library code is folded into one deployment).
//! [`decode`] peels them off from the right, one region per step, until the
//! right edge no longer holds a well-formed region.

mod address;
mod descriptor;
mod error;
mod split;

pub use address::{AddressParseError, ContentAddress};
pub use descriptor::{CompilerVersion, MetadataDescriptor, EXPERIMENTAL_KEY, IPFS_KEY, SOLC_KEY};
pub use error::AuxdataError;
pub use split::{split_auxdata, Split};

use tracing::debug;

/// Strip surrounding whitespace and the optional `0x` marker.
pub fn normalize(bytecode: &str) -> &str {
    let trimmed = bytecode.trim();
    trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed)
}

/// Decode every trailing auxdata region of `bytecode`.
///
/// Descriptors are returned rightmost (last appended) first. Bytecode
/// without auxdata yields an empty list.
pub fn decode(bytecode: &str) -> Result<Vec<MetadataDescriptor>, AuxdataError> {
    let body = normalize(bytecode);
    if body.is_empty() {
        return Err(AuxdataError::EmptyInput);
    }

    let mut descriptors = Vec::new();
    let mut remaining = body;

    while !remaining.is_empty() {
        let (execution, auxdata) = match split_auxdata(remaining) {
            Split::Region { execution, auxdata } => (execution, auxdata),
            Split::Boundary => break,
        };

        match MetadataDescriptor::from_cbor(auxdata) {
            Some(descriptor) => {
                debug!(
                    region = descriptors.len(),
                    ipfs = ?descriptor.ipfs,
                    remaining_hex = execution.len(),
                    "decoded auxdata region"
                );
                descriptors.push(descriptor);
                remaining = execution;
            }
            None => {
                debug!(
                    region = descriptors.len(),
                    "trailing object is not a metadata map; stopping"
                );
                break;
            }
        }
    }

    Ok(descriptors)
}

/// Decode one auxdata object given as raw CBOR bytes.
///
/// `None` unless the bytes are a single text-keyed CBOR map with nothing
/// after it.
pub fn decode_region(object: &[u8]) -> Option<MetadataDescriptor> {
    split::read_single_item(object).and_then(MetadataDescriptor::from_cbor)
}

/// Content addresses of all decoded descriptors, in decode order.
pub fn content_addresses(descriptors: &[MetadataDescriptor]) -> Vec<&ContentAddress> {
    descriptors.iter().filter_map(|d| d.ipfs.as_ref()).collect()
}
