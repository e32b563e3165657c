//! Local copies of published metadata documents
//!
//! A document is first staged to a hidden temp file in the metadata
//! directory and then renamed into place. A failed write never leaves the
//! temp file behind.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicUsize, Ordering};

static STAGE_SEQ: AtomicUsize = AtomicUsize::new(0);

/// Path of the local copy for `contract_name`
pub fn metadata_path(metadata_dir: &Path, contract_name: &str) -> PathBuf {
    metadata_dir.join(format!("{}_metadata.json", contract_name))
}

/// A document written to its temp file but not yet renamed into place
#[derive(Debug)]
pub struct StagedMetadata {
    temp_path: PathBuf,
    final_path: PathBuf,
}

/// Write `document` to a temp file next to the local copy for `contract_name`
pub fn stage_metadata(
    metadata_dir: &Path,
    contract_name: &str,
    document: &[u8],
) -> io::Result<StagedMetadata> {
    fs::create_dir_all(metadata_dir)?;

    let seq = STAGE_SEQ.fetch_add(1, Ordering::Relaxed);
    let staged = StagedMetadata {
        temp_path: metadata_dir.join(format!(
            ".{}_metadata.json.{}.{}.tmp",
            contract_name,
            process::id(),
            seq
        )),
        final_path: metadata_path(metadata_dir, contract_name),
    };

    if let Err(e) = fs::write(&staged.temp_path, document) {
        staged.discard();
        return Err(e);
    }
    Ok(staged)
}

impl StagedMetadata {
    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    /// Rename the temp file into place
    pub fn commit(self) -> io::Result<PathBuf> {
        match fs::rename(&self.temp_path, &self.final_path) {
            Ok(()) => Ok(self.final_path),
            Err(e) => {
                self.discard();
                Err(e)
            }
        }
    }

    /// Remove the temp file
    pub fn discard(self) {
        let _ = fs::remove_file(&self.temp_path);
    }
}

/// Atomically write `document` to the local copy for `contract_name`
pub fn write_metadata(
    metadata_dir: &Path,
    contract_name: &str,
    document: &[u8],
) -> io::Result<PathBuf> {
    stage_metadata(metadata_dir, contract_name, document)?.commit()
}
