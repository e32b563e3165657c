//! Text form of content addresses embedded in auxdata.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Base-58 text form of a multihash (`Qm...` for sha2-256 CIDv0 addresses).
///
/// The compiler embeds the raw multihash bytes; everything outside the
/// decoder compares and prints addresses in this text form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentAddress(String);

/// A string that is not valid base-58.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid content address '{address}': {reason}")]
pub struct AddressParseError {
    pub address: String,
    pub reason: String,
}

impl ContentAddress {
    /// Encode raw multihash bytes into their text form
    pub fn from_multihash(bytes: &[u8]) -> Self {
        Self(bs58::encode(bytes).into_string())
    }

    /// Decode back into the raw multihash bytes
    pub fn to_multihash(&self) -> Result<Vec<u8>, AddressParseError> {
        bs58::decode(&self.0)
            .into_vec()
            .map_err(|e| AddressParseError {
                address: self.0.clone(),
                reason: e.to_string(),
            })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ContentAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(AddressParseError {
                address: String::new(),
                reason: "address is empty".to_string(),
            });
        }
        let bytes = bs58::decode(s).into_vec().map_err(|e| AddressParseError {
            address: s.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::from_multihash(&bytes))
    }
}

impl Serialize for ContentAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ContentAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
