//! In-memory artifact repository

use std::collections::BTreeMap;

use super::{parse_fully_qualified_name, resolve_name, ArtifactError, ArtifactRepository, BuildTarget};
use crate::cid::content_address;

#[derive(Debug, Clone)]
struct StoredContract {
    deployed_bytecode: String,
    metadata: Option<String>,
}

/// Artifact repository backed by a map, keyed by fully qualified name
#[derive(Debug, Clone, Default)]
pub struct MemoryArtifacts {
    contracts: BTreeMap<String, StoredContract>,
}

impl MemoryArtifacts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a contract; `metadata` of `None` models a missing compiler output
    pub fn insert(
        &mut self,
        fully_qualified_name: impl Into<String>,
        deployed_bytecode: impl Into<String>,
        metadata: Option<String>,
    ) {
        self.contracts.insert(
            fully_qualified_name.into(),
            StoredContract {
                deployed_bytecode: deployed_bytecode.into(),
                metadata,
            },
        );
    }

    /// Builder-style [`MemoryArtifacts::insert`]
    pub fn with_contract(
        mut self,
        fully_qualified_name: impl Into<String>,
        deployed_bytecode: impl Into<String>,
        metadata: impl Into<String>,
    ) -> Self {
        self.insert(fully_qualified_name, deployed_bytecode, Some(metadata.into()));
        self
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}

impl ArtifactRepository for MemoryArtifacts {
    fn deployed_bytecode(&self, contract: &str) -> Result<String, ArtifactError> {
        let fqn = resolve_name(contract, self.contracts.keys().map(String::as_str))?;
        Ok(self.contracts[fqn].deployed_bytecode.clone())
    }

    fn build_targets(&self) -> Result<Vec<BuildTarget>, ArtifactError> {
        self.contracts
            .iter()
            .map(|(fqn, stored)| {
                let (_, contract_name) = parse_fully_qualified_name(fqn);
                let metadata = stored
                    .metadata
                    .clone()
                    .ok_or_else(|| ArtifactError::ContractOutputMissing(contract_name.to_string()))?;

                Ok(BuildTarget {
                    fully_qualified_name: fqn.clone(),
                    contract_name: contract_name.to_string(),
                    content_address: content_address(metadata.as_bytes()),
                    metadata,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_bare_name() {
        let artifacts = MemoryArtifacts::new().with_contract("contracts/A.sol:A", "0x6080", "{}");
        assert_eq!(artifacts.deployed_bytecode("A").unwrap(), "0x6080");
        assert_eq!(artifacts.deployed_bytecode("contracts/A.sol:A").unwrap(), "0x6080");
        assert!(matches!(
            artifacts.deployed_bytecode("B"),
            Err(ArtifactError::NotFound(_))
        ));
    }

    #[test]
    fn test_build_targets_carry_addresses() {
        let artifacts = MemoryArtifacts::new()
            .with_contract("contracts/B.sol:B", "0x00", "hello world\n")
            .with_contract("contracts/A.sol:A", "0x00", "hello world");

        let targets = artifacts.build_targets().unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].contract_name, "A");
        assert_eq!(
            targets[1].content_address.as_str(),
            "QmT78zSuBmuS4z925WZfrqQ1qHaJ56DQaTfyMUF7F8ff5o"
        );
    }

    #[test]
    fn test_insert_replaces_by_fully_qualified_name() {
        let mut artifacts = MemoryArtifacts::new();
        assert!(artifacts.is_empty());

        artifacts.insert("contracts/A.sol:A", "0x01", Some("{}".to_string()));
        artifacts.insert("contracts/A.sol:A", "0x02", Some("{}".to_string()));
        artifacts.insert("lib/A.sol:A", "0x03", None);

        assert_eq!(artifacts.len(), 2);
        assert!(!artifacts.is_empty());
        assert_eq!(artifacts.deployed_bytecode("contracts/A.sol:A").unwrap(), "0x02");
    }

    #[test]
    fn test_missing_metadata_is_error() {
        let mut artifacts = MemoryArtifacts::new();
        artifacts.insert("contracts/A.sol:A", "0x00", None);

        let err = artifacts.build_targets().unwrap_err();
        assert_eq!(err.to_string(), "Compiler output contract not found for A");
    }
}
