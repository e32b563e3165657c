//! In-process storage backend

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use metapin_auxdata::ContentAddress;

use super::{StorageClient, StorageError};
use crate::cid::content_address;

#[derive(Debug, Default)]
struct MemoryState {
    documents: BTreeMap<ContentAddress, Vec<u8>>,
    pinned: BTreeSet<ContentAddress>,
    add_calls: usize,
}

/// Stores documents under the address [`content_address`] computes.
///
/// Can be told to report a fixed wrong address or to fail every request.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    state: Mutex<MemoryState>,
    reported_address: Option<ContentAddress>,
    misreported: BTreeMap<ContentAddress, ContentAddress>,
    failure: Option<String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `address` from every `add`, regardless of content
    pub fn reporting(address: ContentAddress) -> Self {
        Self {
            reported_address: Some(address),
            ..Self::default()
        }
    }

    /// Report `reported` whenever a document hashing to `stored` is added
    pub fn misreport(mut self, stored: ContentAddress, reported: ContentAddress) -> Self {
        self.misreported.insert(stored, reported);
        self
    }

    /// Fail every request with a transport error
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Stored document for `address`
    pub fn get(&self, address: &ContentAddress) -> Option<Vec<u8>> {
        self.lock().documents.get(address).cloned()
    }

    pub fn is_pinned(&self, address: &ContentAddress) -> bool {
        self.lock().pinned.contains(address)
    }

    /// Number of `add` requests received
    pub fn add_calls(&self) -> usize {
        self.lock().add_calls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl StorageClient for MemoryStorage {
    fn add(&self, document: &[u8]) -> Result<ContentAddress, StorageError> {
        let mut state = self.lock();
        state.add_calls += 1;

        if let Some(message) = &self.failure {
            return Err(StorageError::Transport(message.clone()));
        }

        let address = content_address(document);
        let reported = self
            .misreported
            .get(&address)
            .or(self.reported_address.as_ref())
            .cloned()
            .unwrap_or_else(|| address.clone());
        state.documents.insert(address, document.to_vec());
        Ok(reported)
    }

    fn pin(&self, address: &ContentAddress) -> Result<(), StorageError> {
        if let Some(message) = &self.failure {
            return Err(StorageError::Transport(message.clone()));
        }

        let mut state = self.lock();
        if !state.documents.contains_key(address) {
            return Err(StorageError::Rejected(format!("{} is not stored", address)));
        }
        state.pinned.insert(address.clone());
        Ok(())
    }
}
