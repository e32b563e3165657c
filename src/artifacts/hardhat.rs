//! Hardhat artifacts directory reader
//!
//! Layout:
//! - `<artifacts>/<source>/<Name>.json`: contract artifact with `deployedBytecode`
//! - `<artifacts>/<source>/<Name>.dbg.json`: points at the build-info file
//! - `<artifacts>/build-info/<id>.json`: full compiler input/output; the
//!   metadata document lives at `output.contracts[source][Name].metadata`

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;
use walkdir::WalkDir;

use super::{resolve_name, ArtifactError, ArtifactRepository, BuildTarget};
use crate::cid::content_address;

/// `_format` of contract artifacts
pub const ARTIFACT_FORMAT: &str = "hh-sol-artifact-1";

/// Directory holding build-info files, relative to the artifacts root
pub const BUILD_INFO_DIR: &str = "build-info";

const DEBUG_SUFFIX: &str = ".dbg.json";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArtifact {
    #[serde(rename = "_format")]
    format: Option<String>,
    contract_name: Option<String>,
    source_name: Option<String>,
    deployed_bytecode: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DebugFile {
    build_info: String,
}

#[derive(Debug, Deserialize)]
struct BuildInfo {
    output: BuildOutput,
}

#[derive(Debug, Default, Deserialize)]
struct BuildOutput {
    #[serde(default)]
    contracts: BTreeMap<String, BTreeMap<String, CompilerContract>>,
}

#[derive(Debug, Deserialize)]
struct CompilerContract {
    #[serde(default)]
    metadata: Option<String>,
}

/// A contract artifact found while scanning
#[derive(Debug, Clone)]
struct ArtifactEntry {
    path: PathBuf,
    source_name: String,
    contract_name: String,
    deployed_bytecode: String,
}

type ArtifactIndex = BTreeMap<String, ArtifactEntry>;

/// Reads contract artifacts and build-info files from a Hardhat project.
///
/// The artifacts tree is walked once and the result reused by later
/// lookups; call [`HardhatArtifacts::refresh`] after the build changes.
#[derive(Debug)]
pub struct HardhatArtifacts {
    root: PathBuf,
    index: Mutex<Option<Arc<ArtifactIndex>>>,
}

impl HardhatArtifacts {
    /// `root` is the artifacts directory (usually `<project>/artifacts`)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            index: Mutex::new(None),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Fully qualified names of every contract artifact, sorted
    pub fn fully_qualified_names(&self) -> Result<Vec<String>, ArtifactError> {
        Ok(self.index()?.keys().cloned().collect())
    }

    /// Forget the cached scan
    pub fn refresh(&self) {
        *self.lock_index() = None;
    }

    /// The cached scan, walking the tree on first use
    fn index(&self) -> Result<Arc<ArtifactIndex>, ArtifactError> {
        let mut cached = self.lock_index();
        if let Some(index) = cached.as_ref() {
            return Ok(Arc::clone(index));
        }

        let index = Arc::new(self.scan()?);
        *cached = Some(Arc::clone(&index));
        Ok(index)
    }

    fn lock_index(&self) -> std::sync::MutexGuard<'_, Option<Arc<ArtifactIndex>>> {
        self.index.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Collect contract artifacts keyed by fully qualified name
    fn scan(&self) -> Result<ArtifactIndex, ArtifactError> {
        if !self.root.is_dir() {
            return Err(ArtifactError::Io {
                path: self.root.clone(),
                source: io::Error::new(io::ErrorKind::NotFound, "artifacts directory does not exist"),
            });
        }

        let build_info_dir = self.root.join(BUILD_INFO_DIR);
        let mut entries = BTreeMap::new();

        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.path() != build_info_dir);

        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let file_name = entry.file_name().to_string_lossy();
            if !file_name.ends_with(".json") || file_name.ends_with(DEBUG_SUFFIX) {
                continue;
            }

            let raw: RawArtifact = read_json(entry.path())?;
            if raw.format.as_deref() != Some(ARTIFACT_FORMAT) {
                continue;
            }

            let (Some(source_name), Some(contract_name)) = (raw.source_name, raw.contract_name) else {
                continue;
            };

            entries.insert(
                format!("{}:{}", source_name, contract_name),
                ArtifactEntry {
                    path: entry.path().to_path_buf(),
                    source_name,
                    contract_name,
                    deployed_bytecode: raw.deployed_bytecode.unwrap_or_default(),
                },
            );
        }

        debug!(root = %self.root.display(), contracts = entries.len(), "scanned artifacts");
        Ok(entries)
    }

    /// Locate the build-info file for an artifact through its `.dbg.json`
    fn build_info_path(artifact: &ArtifactEntry) -> Result<PathBuf, ArtifactError> {
        let debug_path = artifact
            .path
            .with_file_name(format!("{}{}", artifact.contract_name, DEBUG_SUFFIX));
        let debug_file: DebugFile = read_json(&debug_path)?;

        let dir = artifact.path.parent().unwrap_or_else(|| Path::new("."));
        let path = dir.join(&debug_file.build_info);
        fs::canonicalize(&path).map_err(|source| ArtifactError::Io { path, source })
    }
}

impl ArtifactRepository for HardhatArtifacts {
    fn deployed_bytecode(&self, contract: &str) -> Result<String, ArtifactError> {
        let index = self.index()?;
        let fqn = resolve_name(contract, index.keys().map(String::as_str))?;
        Ok(index[fqn].deployed_bytecode.clone())
    }

    fn build_targets(&self) -> Result<Vec<BuildTarget>, ArtifactError> {
        let index = self.index()?;
        let mut build_infos: HashMap<PathBuf, BuildInfo> = HashMap::new();
        let mut targets = Vec::with_capacity(index.len());

        for (fqn, artifact) in index.iter() {
            let build_info_path = Self::build_info_path(artifact)?;
            if !build_infos.contains_key(&build_info_path) {
                let build_info: BuildInfo = read_json(&build_info_path)?;
                build_infos.insert(build_info_path.clone(), build_info);
            }

            let metadata = build_infos
                .get(&build_info_path)
                .and_then(|info| info.output.contracts.get(&artifact.source_name))
                .and_then(|contracts| contracts.get(&artifact.contract_name))
                .and_then(|contract| contract.metadata.clone())
                .filter(|metadata| !metadata.is_empty())
                .ok_or_else(|| ArtifactError::ContractOutputMissing(artifact.contract_name.clone()))?;

            targets.push(BuildTarget {
                fully_qualified_name: fqn.clone(),
                contract_name: artifact.contract_name.clone(),
                content_address: content_address(metadata.as_bytes()),
                metadata,
            });
        }

        Ok(targets)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let content = fs::read_to_string(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ArtifactError::Json {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_json(path: &Path, value: serde_json::Value) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
    }

    fn create_project(dir: &Path) {
        let artifacts = dir.join("artifacts");
        write_json(
            &artifacts.join("build-info/abc123.json"),
            json!({
                "_format": "hh-sol-build-info-1",
                "solcVersion": "0.8.20",
                "output": {
                    "contracts": {
                        "contracts/Token.sol": {
                            "Token": { "metadata": "hello world" }
                        },
                        "contracts/lib/Math.sol": {
                            "Math": { "metadata": "hello world\n" }
                        }
                    }
                }
            }),
        );

        for (source, name, bytecode) in [
            ("contracts/Token.sol", "Token", "0x6080aa"),
            ("contracts/lib/Math.sol", "Math", "0x6080bb"),
        ] {
            let dir = artifacts.join(source);
            let depth = source.matches('/').count() + 1;
            let build_info = format!("{}build-info/abc123.json", "../".repeat(depth));

            write_json(
                &dir.join(format!("{}.json", name)),
                json!({
                    "_format": ARTIFACT_FORMAT,
                    "contractName": name,
                    "sourceName": source,
                    "abi": [],
                    "bytecode": bytecode,
                    "deployedBytecode": bytecode,
                }),
            );
            write_json(
                &dir.join(format!("{}.dbg.json", name)),
                json!({ "_format": "hh-sol-dbg-1", "buildInfo": build_info }),
            );
        }
    }

    #[test]
    fn test_fully_qualified_names() {
        let dir = TempDir::new().unwrap();
        create_project(dir.path());

        let repo = HardhatArtifacts::new(dir.path().join("artifacts"));
        assert_eq!(
            repo.fully_qualified_names().unwrap(),
            vec!["contracts/Token.sol:Token", "contracts/lib/Math.sol:Math"]
        );
    }

    #[test]
    fn test_deployed_bytecode() {
        let dir = TempDir::new().unwrap();
        create_project(dir.path());

        let repo = HardhatArtifacts::new(dir.path().join("artifacts"));
        assert_eq!(repo.deployed_bytecode("Math").unwrap(), "0x6080bb");
        assert_eq!(
            repo.deployed_bytecode("contracts/Token.sol:Token").unwrap(),
            "0x6080aa"
        );
        assert!(matches!(
            repo.deployed_bytecode("Missing"),
            Err(ArtifactError::NotFound(_))
        ));
    }

    #[test]
    fn test_build_targets_read_build_info() {
        let dir = TempDir::new().unwrap();
        create_project(dir.path());

        let repo = HardhatArtifacts::new(dir.path().join("artifacts"));
        let targets = repo.build_targets().unwrap();

        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].contract_name, "Token");
        assert_eq!(targets[0].metadata, "hello world");
        assert_eq!(
            targets[0].content_address.as_str(),
            "Qmf412jQZiuVUtdgnB36FXFX7xg5V6KEbSJ4dpQuhkLyfD"
        );
        assert_eq!(targets[1].fully_qualified_name, "contracts/lib/Math.sol:Math");
    }

    #[test]
    fn test_missing_compiler_output() {
        let dir = TempDir::new().unwrap();
        create_project(dir.path());
        write_json(
            &dir.path().join("artifacts/build-info/abc123.json"),
            json!({ "output": { "contracts": {} } }),
        );

        let repo = HardhatArtifacts::new(dir.path().join("artifacts"));
        let err = repo.build_targets().unwrap_err();
        assert!(matches!(err, ArtifactError::ContractOutputMissing(ref name) if name == "Token"));
    }

    #[test]
    fn test_scan_is_reused_until_refresh() {
        let dir = TempDir::new().unwrap();
        create_project(dir.path());

        let repo = HardhatArtifacts::new(dir.path().join("artifacts"));
        assert_eq!(repo.deployed_bytecode("Token").unwrap(), "0x6080aa");

        // Removing the artifact does not affect the cached index
        fs::remove_file(dir.path().join("artifacts/contracts/Token.sol/Token.json")).unwrap();
        assert_eq!(repo.build_targets().unwrap().len(), 2);
        assert_eq!(repo.deployed_bytecode("Token").unwrap(), "0x6080aa");

        repo.refresh();
        assert!(matches!(
            repo.deployed_bytecode("Token"),
            Err(ArtifactError::NotFound(_))
        ));
        assert_eq!(repo.fully_qualified_names().unwrap(), vec!["contracts/lib/Math.sol:Math"]);
    }

    #[test]
    fn test_missing_artifacts_directory() {
        let repo = HardhatArtifacts::new("/nonexistent/artifacts");
        assert!(matches!(repo.build_targets(), Err(ArtifactError::Io { .. })));
    }
}
