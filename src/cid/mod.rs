//! IPFS content addresses for metadata documents
//!
//! Computes the CIDv0 an IPFS node assigns to a file added with default
//! settings (`ipfs add --cid-version=0`), without talking to a node:
//!
//! 1. Split the document into 256 KiB chunks
//! 2. Wrap each chunk in a UnixFS `File` node encoded as dag-pb
//! 3. Link chunks into a balanced tree of at most 174 children per node
//! 4. The address is the base58 sha2-256 multihash of the root node
//!
//! Fields are emitted with `prost`'s wire encoders in dag-pb's canonical order.

use metapin_auxdata::ContentAddress;
use prost::encoding::{bytes, encode_key, encode_varint, uint64, WireType};
use sha2::{Digest, Sha256};

/// Fixed chunker size used by `ipfs add`
pub const CHUNK_SIZE: usize = 262_144;

/// Maximum links per node in the balanced layout
pub const MAX_LINKS: usize = 174;

/// Multihash code for sha2-256
const SHA2_256: u8 = 0x12;

/// UnixFS `Data.DataType.File`
const UNIXFS_FILE: u64 = 2;

/// A node already hashed and sized, ready to be linked from a parent
struct Block {
    multihash: Vec<u8>,
    /// Encoded size of this node plus everything below it
    cumulative_size: u64,
    /// Bytes of file content under this node
    file_size: u64,
}

/// Compute the CIDv0 content address of `document`.
pub fn content_address(document: &[u8]) -> ContentAddress {
    let mut level: Vec<Block> = if document.is_empty() {
        vec![leaf(&[])]
    } else {
        document.chunks(CHUNK_SIZE).map(leaf).collect()
    };

    while level.len() > 1 {
        level = level.chunks(MAX_LINKS).map(parent).collect();
    }

    // level always holds exactly one block here
    let root = level.swap_remove(0);
    ContentAddress::from_multihash(&root.multihash)
}

fn leaf(chunk: &[u8]) -> Block {
    let data = unixfs_file(chunk, chunk.len() as u64, &[]);
    let node = dag_pb_node(&[], &data);
    Block {
        multihash: sha256_multihash(&node),
        cumulative_size: node.len() as u64,
        file_size: chunk.len() as u64,
    }
}

fn parent(children: &[Block]) -> Block {
    let file_size = children.iter().map(|c| c.file_size).sum();
    let block_sizes: Vec<u64> = children.iter().map(|c| c.file_size).collect();

    let data = unixfs_file(&[], file_size, &block_sizes);
    let node = dag_pb_node(children, &data);
    let children_size: u64 = children.iter().map(|c| c.cumulative_size).sum();

    Block {
        multihash: sha256_multihash(&node),
        cumulative_size: node.len() as u64 + children_size,
        file_size,
    }
}

/// Length-delimited field from a borrowed slice
fn put_slice(tag: u32, value: &[u8], out: &mut Vec<u8>) {
    encode_key(tag, WireType::LengthDelimited, out);
    encode_varint(value.len() as u64, out);
    out.extend_from_slice(value);
}

/// UnixFS `Data` message for a file node
fn unixfs_file(content: &[u8], file_size: u64, block_sizes: &[u64]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len() + 16);
    uint64::encode(1, &UNIXFS_FILE, &mut out);
    if !content.is_empty() {
        put_slice(2, content, &mut out);
    }
    uint64::encode(3, &file_size, &mut out);
    for size in block_sizes {
        uint64::encode(4, size, &mut out);
    }
    out
}

/// dag-pb `PBNode`.
///
/// Written by hand rather than through a derived message: the canonical
/// form puts Links (tag 2) before Data (tag 1).
fn dag_pb_node(links: &[Block], data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + links.len() * 48 + 8);
    for link in links {
        let mut encoded = Vec::with_capacity(48);
        bytes::encode(1, &link.multihash, &mut encoded);
        put_slice(2, b"", &mut encoded);
        uint64::encode(3, &link.cumulative_size, &mut encoded);
        bytes::encode(2, &encoded, &mut out);
    }
    put_slice(1, data, &mut out);
    out
}

fn sha256_multihash(bytes: &[u8]) -> Vec<u8> {
    let digest = Sha256::digest(bytes);
    let mut multihash = Vec::with_capacity(2 + digest.len());
    multihash.push(SHA2_256);
    multihash.push(digest.len() as u8);
    multihash.extend_from_slice(&digest);
    multihash
}
