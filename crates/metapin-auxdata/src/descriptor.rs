//! Decoded form of one auxdata region.

use std::collections::BTreeMap;
use std::fmt;

use ciborium::Value;
use serde::{Serialize, Serializer};

use crate::address::ContentAddress;

/// Key holding the IPFS multihash of the metadata document
pub const IPFS_KEY: &str = "ipfs";

/// Key holding the compiler version
pub const SOLC_KEY: &str = "solc";

/// Key set when experimental compiler features were enabled
pub const EXPERIMENTAL_KEY: &str = "experimental";

/// Compiler version recorded under the `solc` key.
///
/// Release builds store three raw bytes; prerelease builds store the full
/// version string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompilerVersion {
    Release { major: u8, minor: u8, patch: u8 },
    Prerelease(String),
}

impl fmt::Display for CompilerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompilerVersion::Release {
                major,
                minor,
                patch,
            } => write!(f, "{}.{}.{}", major, minor, patch),
            CompilerVersion::Prerelease(version) => f.write_str(version),
        }
    }
}

impl Serialize for CompilerVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One metadata descriptor, newest region first in [`crate::decode`] output.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MetadataDescriptor {
    /// Content address of the metadata document, in text form
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipfs: Option<ContentAddress>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub solc: Option<CompilerVersion>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub experimental: Option<bool>,

    /// Every other entry (`bzzr0`, `bzzr1`, ...), untouched
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl MetadataDescriptor {
    /// Build a descriptor from a decoded CBOR value.
    ///
    /// Returns `None` unless the value is a map whose keys are all text.
    /// Known keys with an unexpected value type are kept in `extra`.
    pub fn from_cbor(value: Value) -> Option<Self> {
        let entries = match value {
            Value::Map(entries) => entries,
            _ => return None,
        };

        let mut descriptor = MetadataDescriptor::default();
        for (key, value) in entries {
            let key = match key {
                Value::Text(key) => key,
                _ => return None,
            };

            let value = match (key.as_str(), value) {
                (IPFS_KEY, Value::Bytes(bytes)) => {
                    descriptor.ipfs = Some(ContentAddress::from_multihash(&bytes));
                    continue;
                }
                (SOLC_KEY, Value::Bytes(bytes)) if bytes.len() == 3 => {
                    descriptor.solc = Some(CompilerVersion::Release {
                        major: bytes[0],
                        minor: bytes[1],
                        patch: bytes[2],
                    });
                    continue;
                }
                (SOLC_KEY, Value::Text(version)) => {
                    descriptor.solc = Some(CompilerVersion::Prerelease(version));
                    continue;
                }
                (EXPERIMENTAL_KEY, Value::Bool(flag)) => {
                    descriptor.experimental = Some(flag);
                    continue;
                }
                (_, value) => value,
            };
            descriptor.extra.insert(key, value);
        }

        Some(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    #[test]
    fn test_release_descriptor() {
        let mut multihash = vec![0x12, 0x20];
        multihash.extend([7u8; 32]);

        let value = Value::Map(vec![
            (text("ipfs"), Value::Bytes(multihash.clone())),
            (text("solc"), Value::Bytes(vec![0, 8, 20])),
        ]);

        let descriptor = MetadataDescriptor::from_cbor(value).unwrap();
        assert_eq!(
            descriptor.ipfs.unwrap().to_multihash().unwrap(),
            multihash
        );
        assert_eq!(descriptor.solc.unwrap().to_string(), "0.8.20");
        assert_eq!(descriptor.experimental, None);
        assert!(descriptor.extra.is_empty());
    }

    #[test]
    fn test_prerelease_and_experimental() {
        let value = Value::Map(vec![
            (text("experimental"), Value::Bool(true)),
            (text("solc"), text("0.8.21-ci.2023.5.1+commit.abc")),
        ]);

        let descriptor = MetadataDescriptor::from_cbor(value).unwrap();
        assert_eq!(descriptor.experimental, Some(true));
        assert_eq!(
            descriptor.solc,
            Some(CompilerVersion::Prerelease(
                "0.8.21-ci.2023.5.1+commit.abc".to_string()
            ))
        );
        assert!(descriptor.ipfs.is_none());
    }

    #[test]
    fn test_unknown_and_mistyped_keys_pass_through() {
        let value = Value::Map(vec![
            (text("bzzr1"), Value::Bytes(vec![1, 2, 3])),
            (text("ipfs"), text("not bytes")),
        ]);

        let descriptor = MetadataDescriptor::from_cbor(value).unwrap();
        assert!(descriptor.ipfs.is_none());
        assert_eq!(descriptor.extra["bzzr1"], Value::Bytes(vec![1, 2, 3]));
        assert_eq!(descriptor.extra["ipfs"], text("not bytes"));
    }

    #[test]
    fn test_rejects_non_map_and_non_text_keys() {
        assert!(MetadataDescriptor::from_cbor(Value::Integer(1u8.into())).is_none());
        assert!(MetadataDescriptor::from_cbor(Value::Map(vec![(
            Value::Integer(1u8.into()),
            Value::Bool(true)
        )]))
        .is_none());
    }

    #[test]
    fn test_serializes_text_fields() {
        let value = Value::Map(vec![(text("solc"), Value::Bytes(vec![0, 8, 19]))]);
        let descriptor = MetadataDescriptor::from_cbor(value).unwrap();

        let json = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(json, serde_json::json!({ "solc": "0.8.19" }));
    }
}
