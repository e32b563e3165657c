//! metapin - publish Solidity metadata referenced by bytecode
//!
//! Solidity appends a CBOR section to deployed bytecode that carries the
//! IPFS address of the contract's metadata document. This crate finds the
//! documents a build produced for those addresses, uploads them to an IPFS
//! node, and verifies the node stored them under the embedded address.

pub mod artifacts;
pub mod cid;
pub mod config;
pub mod publisher;
pub mod storage;

pub use artifacts::{ArtifactError, ArtifactRepository, BuildTarget, HardhatArtifacts, MemoryArtifacts};
pub use cid::content_address;
pub use config::{ConfigError, FailurePolicy, PublisherConfig};
pub use metapin_auxdata::{decode, decode_region, AuxdataError, ContentAddress, MetadataDescriptor};
pub use publisher::{CandidateOutcome, MetadataPublisher, PublishError, PublishReport};
pub use storage::{KuboClient, MemoryStorage, StorageClient, StorageError};
