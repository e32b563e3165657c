//! Metadata publisher
//!
//! Matches the content addresses embedded in a contract's bytecode against
//! the metadata documents the build produced, uploads each match to the
//! storage backend, checks the backend computed the same address, and keeps
//! a local copy of every verified document.
//!
//! Publishing runs in two phases: every candidate is stored and verified
//! first, and only then are local copies written. Under the abort policy a
//! failed batch leaves no local files behind; under the isolate policy each
//! candidate's failure, including a failed local write, is recorded in the
//! report.

mod output;

pub use output::{metadata_path, stage_metadata, write_metadata, StagedMetadata};

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use metapin_auxdata::{content_addresses, AuxdataError, ContentAddress};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::artifacts::{ArtifactError, ArtifactRepository};
use crate::config::{ConfigError, FailurePolicy, PublisherConfig, BYTECODE_HASH_GUIDANCE};
use crate::storage::{StorageClient, StorageError};

/// A build target whose metadata address appears in the bytecode
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Address embedded in the bytecode (and computed for the document)
    pub address: ContentAddress,
    pub contract_name: String,
    pub fully_qualified_name: String,
    pub metadata: String,
}

/// A document that was stored, verified and written locally
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishedDocument {
    pub contract_name: String,
    pub fully_qualified_name: String,
    pub address: ContentAddress,
    pub path: PathBuf,
    pub pinned: bool,
}

/// Result of publishing one candidate
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CandidateOutcome {
    Published(PublishedDocument),
    Failed {
        contract_name: String,
        address: ContentAddress,
        reason: String,
    },
}

/// Summary of one publish operation
#[derive(Debug, Clone, Serialize)]
pub struct PublishReport {
    /// Address of the first published document
    pub address: ContentAddress,

    /// One outcome per candidate, in discovery order
    pub outcomes: Vec<CandidateOutcome>,

    pub published_at: DateTime<Utc>,
}

impl PublishReport {
    pub fn published(&self) -> impl Iterator<Item = &PublishedDocument> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            CandidateOutcome::Published(document) => Some(document),
            CandidateOutcome::Failed { .. } => None,
        })
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, CandidateOutcome::Failed { .. }))
            .count()
    }
}

/// Publisher errors
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("No IPFS hash found in bytecode metadata. {}", BYTECODE_HASH_GUIDANCE)]
    NoMatchingMetadata,

    #[error("IPFS hash in bytecode does not match the CID of the added metadata for {contract_name}: want {expected}, got {actual}")]
    AddressMismatch {
        contract_name: String,
        expected: ContentAddress,
        actual: ContentAddress,
    },

    #[error("Storage backend error while publishing {contract_name}: {source}")]
    Storage {
        contract_name: String,
        #[source]
        source: StorageError,
    },

    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("Bytecode error: {0}")]
    Auxdata(#[from] AuxdataError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to write metadata for {contract_name} to {path}: {source}")]
    Io {
        contract_name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Publishes metadata documents through injected collaborators
#[derive(Debug)]
pub struct MetadataPublisher<A, S> {
    artifacts: A,
    storage: S,
    config: PublisherConfig,
}

impl<A: ArtifactRepository, S: StorageClient> MetadataPublisher<A, S> {
    /// Create a publisher; fails if `config` does not validate
    pub fn new(artifacts: A, storage: S, config: PublisherConfig) -> Result<Self, PublishError> {
        config.validate()?;
        Ok(Self {
            artifacts,
            storage,
            config,
        })
    }

    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    pub fn artifacts(&self) -> &A {
        &self.artifacts
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Publish the metadata referenced by a contract's deployed bytecode
    pub fn publish_contract(&self, contract: &str) -> Result<PublishReport, PublishError> {
        let bytecode = self.artifacts.deployed_bytecode(contract)?;
        info!(contract, "publishing metadata");
        self.publish_bytecode(&bytecode)
    }

    /// Publish the metadata referenced by `bytecode`
    pub fn publish_bytecode(&self, bytecode: &str) -> Result<PublishReport, PublishError> {
        let candidates = self.find_candidates(bytecode)?;
        if candidates.is_empty() {
            return Err(PublishError::NoMatchingMetadata);
        }

        // Phase 1: store and verify
        let mut stored = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            match self.store_and_verify(candidate) {
                Ok(pinned) => stored.push(Ok(pinned)),
                Err(err) => match self.config.on_failure {
                    FailurePolicy::Abort => return Err(err),
                    FailurePolicy::Isolate => {
                        warn!(contract = %candidate.contract_name, error = %err, "candidate failed");
                        stored.push(Err(err));
                    }
                },
            }
        }

        // Phase 2: persist verified documents
        let metadata_dir = self.config.metadata_dir();
        let results: Vec<Result<(bool, PathBuf), PublishError>> = match self.config.on_failure {
            FailurePolicy::Abort => {
                let pinned: Vec<bool> = stored.into_iter().collect::<Result<_, _>>()?;
                let paths = self.persist_batch(&metadata_dir, &candidates)?;
                pinned.into_iter().zip(paths).map(Ok).collect()
            }
            FailurePolicy::Isolate => candidates
                .iter()
                .zip(stored)
                .map(|(candidate, result)| -> Result<(bool, PathBuf), PublishError> {
                    let pinned = result?;
                    let path = self.persist_one(&metadata_dir, candidate).map_err(|err| {
                        warn!(contract = %candidate.contract_name, error = %err, "failed to save metadata");
                        err
                    })?;
                    Ok((pinned, path))
                })
                .collect(),
        };

        if !results.iter().any(Result::is_ok) {
            return Err(results
                .into_iter()
                .find_map(Result::err)
                .unwrap_or(PublishError::NoMatchingMetadata));
        }

        let outcomes: Vec<CandidateOutcome> = candidates
            .into_iter()
            .zip(results)
            .map(|(candidate, result)| match result {
                Ok((pinned, path)) => CandidateOutcome::Published(PublishedDocument {
                    contract_name: candidate.contract_name,
                    fully_qualified_name: candidate.fully_qualified_name,
                    address: candidate.address,
                    path,
                    pinned,
                }),
                Err(err) => CandidateOutcome::Failed {
                    contract_name: candidate.contract_name,
                    address: candidate.address,
                    reason: err.to_string(),
                },
            })
            .collect();

        let address = outcomes
            .iter()
            .find_map(|outcome| match outcome {
                CandidateOutcome::Published(document) => Some(document.address.clone()),
                CandidateOutcome::Failed { .. } => None,
            })
            .ok_or(PublishError::NoMatchingMetadata)?;

        Ok(PublishReport {
            address,
            outcomes,
            published_at: Utc::now(),
        })
    }

    /// Build targets whose metadata address is embedded in `bytecode`.
    ///
    /// Targets are visited in repository order; each target appears at most
    /// once even if several regions carry its address.
    pub fn find_candidates(&self, bytecode: &str) -> Result<Vec<Candidate>, PublishError> {
        let descriptors = metapin_auxdata::decode(bytecode)?;
        let embedded = content_addresses(&descriptors);
        debug!(
            regions = descriptors.len(),
            addresses = embedded.len(),
            "decoded bytecode metadata"
        );

        if embedded.is_empty() {
            return Ok(Vec::new());
        }

        let candidates = self
            .artifacts
            .build_targets()?
            .into_iter()
            .filter(|target| embedded.contains(&&target.content_address))
            .map(|target| Candidate {
                address: target.content_address,
                contract_name: target.contract_name,
                fully_qualified_name: target.fully_qualified_name,
                metadata: target.metadata,
            })
            .collect();

        Ok(candidates)
    }

    /// Save one verified document
    fn persist_one(&self, metadata_dir: &Path, candidate: &Candidate) -> Result<PathBuf, PublishError> {
        let path = write_metadata(metadata_dir, &candidate.contract_name, candidate.metadata.as_bytes())
            .map_err(|source| io_error(metadata_dir, candidate, source))?;
        info!(contract = %candidate.contract_name, path = %path.display(), "saved metadata");
        Ok(path)
    }

    /// Save every document or none of them.
    ///
    /// All documents are staged before the first rename. If a rename fails,
    /// the remaining staged files are discarded and the copies already
    /// renamed by this batch are removed.
    fn persist_batch(
        &self,
        metadata_dir: &Path,
        candidates: &[Candidate],
    ) -> Result<Vec<PathBuf>, PublishError> {
        let mut staged = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            match stage_metadata(metadata_dir, &candidate.contract_name, candidate.metadata.as_bytes()) {
                Ok(file) => staged.push(file),
                Err(source) => {
                    staged.into_iter().for_each(StagedMetadata::discard);
                    return Err(io_error(metadata_dir, candidate, source));
                }
            }
        }

        let mut written = Vec::with_capacity(staged.len());
        let mut pending = staged.into_iter().zip(candidates);
        while let Some((file, candidate)) = pending.next() {
            match file.commit() {
                Ok(path) => written.push(path),
                Err(source) => {
                    pending.for_each(|(file, _)| file.discard());
                    for path in &written {
                        let _ = fs::remove_file(path);
                    }
                    warn!(
                        contract = %candidate.contract_name,
                        removed = written.len(),
                        "failed to save metadata; rolled back batch"
                    );
                    return Err(io_error(metadata_dir, candidate, source));
                }
            }
        }

        for (path, candidate) in written.iter().zip(candidates) {
            info!(contract = %candidate.contract_name, path = %path.display(), "saved metadata");
        }
        Ok(written)
    }

    /// Upload one candidate, check the returned address, then pin it
    fn store_and_verify(&self, candidate: &Candidate) -> Result<bool, PublishError> {
        let storage_error = |source| PublishError::Storage {
            contract_name: candidate.contract_name.clone(),
            source,
        };

        let actual = self
            .storage
            .add(candidate.metadata.as_bytes())
            .map_err(storage_error)?;
        info!(
            contract = %candidate.contract_name,
            cid = %actual,
            embedded = %candidate.address,
            "added metadata"
        );

        if actual != candidate.address {
            return Err(PublishError::AddressMismatch {
                contract_name: candidate.contract_name.clone(),
                expected: candidate.address.clone(),
                actual,
            });
        }

        if self.config.storage.pin {
            self.storage.pin(&actual).map_err(storage_error)?;
        }

        Ok(self.config.storage.pin)
    }
}

fn io_error(metadata_dir: &Path, candidate: &Candidate, source: std::io::Error) -> PublishError {
    PublishError::Io {
        contract_name: candidate.contract_name.clone(),
        path: metadata_path(metadata_dir, &candidate.contract_name),
        source,
    }
}
