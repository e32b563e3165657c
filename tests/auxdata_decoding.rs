//! Auxdata Decoding Tests
//!
//! Properties of `decode` over bytecode built from an execution prefix and
//! any number of compiler-style metadata sections.

use metapin::{content_address, decode, AuxdataError};

/// Execution prefixes of different shapes, none ending in a valid section
const PREFIXES: &[&str] = &[
    "",
    "00",
    "6080604052",
    "6080604052348015600f57600080fd5b50603f80601d6000396000f3fe",
    // unlinked library placeholder
    "7300000000000000000000000000000000000000003014608060405273__$0123456789abcdef0123456789abcdef01$__63",
];

/// Encode `{"ipfs": <multihash>, "solc": <version>}` plus its length field
fn section(document: &str, patch: u8) -> String {
    let multihash = content_address(document.as_bytes()).to_multihash().unwrap();

    let mut object = vec![0xa2, 0x64];
    object.extend(b"ipfs");
    object.extend([0x58, multihash.len() as u8]);
    object.extend(&multihash);
    object.push(0x64);
    object.extend(b"solc");
    object.extend([0x43, 0x00, 0x08, patch]);

    format!(
        "{}{}",
        hex::encode(&object),
        hex::encode((object.len() as u16).to_be_bytes())
    )
}

fn documents(k: usize) -> Vec<String> {
    (0..k).map(|i| format!("{{\"contract\":{}}}", i)).collect()
}

#[test]
fn test_k_sections_decode_in_reverse_order() {
    for prefix in PREFIXES {
        for k in 0..4 {
            let docs = documents(k);
            let mut bytecode = format!("0x{}", prefix);
            for (i, doc) in docs.iter().enumerate() {
                bytecode.push_str(&section(doc, i as u8));
            }

            if bytecode == "0x" {
                assert_eq!(decode(&bytecode), Err(AuxdataError::EmptyInput));
                continue;
            }

            let descriptors = decode(&bytecode).unwrap();
            assert_eq!(descriptors.len(), k, "prefix {:?}, k = {}", prefix, k);

            let expected: Vec<_> = docs
                .iter()
                .rev()
                .map(|doc| content_address(doc.as_bytes()))
                .collect();
            let actual: Vec<_> = descriptors
                .iter()
                .map(|d| d.ipfs.clone().unwrap())
                .collect();
            assert_eq!(actual, expected, "prefix {:?}, k = {}", prefix, k);
        }
    }
}

#[test]
fn test_plain_bytecode_has_no_sections() {
    for prefix in PREFIXES.iter().filter(|p| !p.is_empty()) {
        assert!(decode(prefix).unwrap().is_empty(), "prefix {:?}", prefix);
    }
}

#[test]
fn test_decode_is_deterministic() {
    let bytecode = format!(
        "{}{}{}",
        PREFIXES[3],
        section("{\"a\":1}", 1),
        section("{\"b\":2}", 2)
    );
    let first = decode(&bytecode).unwrap();
    for _ in 0..3 {
        assert_eq!(decode(&bytecode).unwrap(), first);
    }
}

#[test]
fn test_malformed_section_stops_without_error() {
    // Length field claims 3 bytes, but 0x1c is a reserved CBOR header
    let bad = "1c1c1c0003";
    let bytecode = format!("0x{}{}{}", PREFIXES[2], bad, section("{\"ok\":true}", 0));

    let descriptors = decode(&bytecode).unwrap();
    assert_eq!(descriptors.len(), 1);
    assert_eq!(
        descriptors[0].ipfs.as_ref().unwrap(),
        &content_address(b"{\"ok\":true}")
    );
}

#[test]
fn test_empty_input() {
    assert_eq!(decode(""), Err(AuxdataError::EmptyInput));
    assert_eq!(decode("0x"), Err(AuxdataError::EmptyInput));
}

#[test]
fn test_address_text_round_trip() {
    let bytecode = section("{\"round\":\"trip\"}", 7);
    let descriptors = decode(&bytecode).unwrap();
    let address = descriptors[0].ipfs.as_ref().unwrap();

    let multihash = address.to_multihash().unwrap();
    assert_eq!(
        multihash,
        content_address(b"{\"round\":\"trip\"}").to_multihash().unwrap()
    );
    assert_eq!(&multihash[..2], &[0x12, 0x20]);
    assert_eq!(address.as_str().len(), 46);
}
