//! Build artifact repository
//!
//! The publisher needs two things from the build: the deployed bytecode of
//! a contract, and every metadata document the build produced together with
//! its content address.

mod hardhat;
mod memory;

pub use hardhat::{HardhatArtifacts, ARTIFACT_FORMAT, BUILD_INFO_DIR};
pub use memory::MemoryArtifacts;

use std::path::PathBuf;

use metapin_auxdata::ContentAddress;
use serde::Serialize;

/// One compiled contract's metadata document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildTarget {
    /// `source:Name`, e.g. `contracts/Token.sol:Token`
    pub fully_qualified_name: String,

    pub contract_name: String,

    /// Metadata JSON exactly as emitted by the compiler
    #[serde(skip)]
    pub metadata: String,

    /// Content address of `metadata`
    pub content_address: ContentAddress,
}

/// Errors raised by artifact repositories
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Artifact not found for contract '{0}'")]
    NotFound(String),

    #[error("Contract name '{name}' is ambiguous; use one of: {}", .candidates.join(", "))]
    Ambiguous {
        name: String,
        candidates: Vec<String>,
    },

    #[error("Compiler output contract not found for {0}")]
    ContractOutputMissing(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Source of bytecode and metadata documents
pub trait ArtifactRepository {
    /// Deployed (runtime) bytecode as hex text
    ///
    /// `contract` is a bare contract name or a fully qualified `source:Name`.
    fn deployed_bytecode(&self, contract: &str) -> Result<String, ArtifactError>;

    /// Every build target, ordered by fully qualified name
    fn build_targets(&self) -> Result<Vec<BuildTarget>, ArtifactError>;
}

/// Split `source:Name` into its parts; bare names have no source
pub fn parse_fully_qualified_name(name: &str) -> (Option<&str>, &str) {
    match name.rsplit_once(':') {
        Some((source, contract)) => (Some(source), contract),
        None => (None, name),
    }
}

/// Resolve a bare or fully qualified name against known fully qualified names
pub(crate) fn resolve_name<'a>(
    requested: &str,
    known: impl Iterator<Item = &'a str>,
) -> Result<&'a str, ArtifactError> {
    let (source, contract) = parse_fully_qualified_name(requested);
    let matches: Vec<&str> = known
        .filter(|fqn| {
            let (known_source, known_contract) = parse_fully_qualified_name(fqn);
            known_contract == contract && (source.is_none() || source == known_source)
        })
        .collect();

    match matches.as_slice() {
        [] => Err(ArtifactError::NotFound(requested.to_string())),
        [single] => Ok(*single),
        many => Err(ArtifactError::Ambiguous {
            name: requested.to_string(),
            candidates: many.iter().map(|s| s.to_string()).collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fully_qualified_name() {
        assert_eq!(
            parse_fully_qualified_name("contracts/Token.sol:Token"),
            (Some("contracts/Token.sol"), "Token")
        );
        assert_eq!(parse_fully_qualified_name("Token"), (None, "Token"));
    }

    #[test]
    fn test_resolve_bare_and_qualified() {
        let known = ["a/A.sol:A", "b/B.sol:B", "c/B.sol:B"];

        assert_eq!(resolve_name("A", known.iter().copied()).unwrap(), "a/A.sol:A");
        assert_eq!(
            resolve_name("c/B.sol:B", known.iter().copied()).unwrap(),
            "c/B.sol:B"
        );

        let err = resolve_name("B", known.iter().copied()).unwrap_err();
        assert!(matches!(err, ArtifactError::Ambiguous { ref candidates, .. } if candidates.len() == 2));

        let err = resolve_name("Missing", known.iter().copied()).unwrap_err();
        assert!(matches!(err, ArtifactError::NotFound(_)));
    }
}
