//! Content-addressed storage backends
//!
//! - StorageClient trait: add and pin documents
//! - KuboClient: Kubo (go-ipfs) RPC API over HTTP
//! - MemoryStorage: in-process store for tests

mod kubo;
mod memory;

pub use kubo::KuboClient;
pub use memory::MemoryStorage;

use metapin_auxdata::ContentAddress;

/// Storage backend errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Storage backend returned HTTP {code}: {body}")]
    Status { code: u16, body: String },

    #[error("Invalid response from storage backend: {0}")]
    InvalidResponse(String),

    #[error("Storage backend rejected the request: {0}")]
    Rejected(String),
}

/// A content-addressed store
pub trait StorageClient {
    /// Store a document and return the address the backend computed for it
    fn add(&self, document: &[u8]) -> Result<ContentAddress, StorageError>;

    /// Keep a stored document from being garbage collected
    fn pin(&self, address: &ContentAddress) -> Result<(), StorageError>;
}

impl<T: StorageClient + ?Sized> StorageClient for &T {
    fn add(&self, document: &[u8]) -> Result<ContentAddress, StorageError> {
        (**self).add(document)
    }

    fn pin(&self, address: &ContentAddress) -> Result<(), StorageError> {
        (**self).pin(address)
    }
}
