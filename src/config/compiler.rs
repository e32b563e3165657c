//! Compiler settings relevant to metadata publishing

use serde::{Deserialize, Serialize};

/// `bytecodeHash` value that embeds an IPFS address in auxdata
pub const IPFS_BYTECODE_HASH: &str = "ipfs";

/// Remediation text shown whenever the build does not embed IPFS addresses
pub const BYTECODE_HASH_GUIDANCE: &str = "You must set `bytecodeHash: 'ipfs'` in your hardhat.config.js compiler settings:

  solidity: {
    compilers: [
      {
        version: '0.8.19',
        settings: {
          metadata: {
            bytecodeHash: 'ipfs',
            ...
          }
        }
      }
    ]
  }";

/// One configured compiler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilerSettings {
    /// Compiler version (e.g. "0.8.20")
    pub version: String,

    /// Metadata hash embedded in bytecode ("ipfs", "bzzr1" or "none")
    #[serde(default = "default_bytecode_hash")]
    pub bytecode_hash: String,
}

fn default_bytecode_hash() -> String {
    IPFS_BYTECODE_HASH.to_string()
}

impl CompilerSettings {
    /// Whether this compiler embeds an IPFS address
    pub fn embeds_ipfs(&self) -> bool {
        self.bytecode_hash.eq_ignore_ascii_case(IPFS_BYTECODE_HASH)
    }
}
