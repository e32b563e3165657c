//! Kubo RPC client
//!
//! Talks to the `/api/v0` HTTP API of a Kubo node or pinning gateway:
//! - `POST /add?cid-version=0` with a multipart body returns `{"Hash": ...}`
//! - `POST /pin/add?arg=<cid>` returns `{"Pins": [...]}`

use std::time::Duration;

use metapin_auxdata::ContentAddress;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::{StorageClient, StorageError};
use crate::config::StorageSettings;

#[derive(Debug, Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: String,
}

#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "Pins", default)]
    pins: Vec<String>,
}

/// HTTP client for the Kubo RPC API
#[derive(Clone, Debug)]
pub struct KuboClient {
    /// Base URL including `/api/v0`
    api_url: String,
    http_client: ureq::Agent,
}

impl KuboClient {
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self {
            api_url,
            http_client: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }

    pub fn from_settings(settings: &StorageSettings) -> Self {
        Self::new(
            settings.api_url.clone(),
            Duration::from_secs(settings.timeout_seconds),
        )
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

impl StorageClient for KuboClient {
    fn add(&self, document: &[u8]) -> Result<ContentAddress, StorageError> {
        let url = format!("{}/add?cid-version=0&pin=false", self.api_url);
        let boundary = multipart_boundary(document);
        let body = multipart_body(&boundary, "metadata.json", document);

        debug!(url = %url, bytes = document.len(), "adding document");
        let response: AddResponse = self
            .http_client
            .post(&url)
            .set(
                "Content-Type",
                &format!("multipart/form-data; boundary={}", boundary),
            )
            .send_bytes(&body)
            .map_err(map_ureq_error)?
            .into_json()
            .map_err(|e| StorageError::InvalidResponse(format!("add: {}", e)))?;

        response
            .hash
            .parse()
            .map_err(|e| StorageError::InvalidResponse(format!("add: {}", e)))
    }

    fn pin(&self, address: &ContentAddress) -> Result<(), StorageError> {
        let url = format!("{}/pin/add?arg={}", self.api_url, address);

        debug!(url = %url, "pinning document");
        let response: PinResponse = self
            .http_client
            .post(&url)
            .call()
            .map_err(map_ureq_error)?
            .into_json()
            .map_err(|e| StorageError::InvalidResponse(format!("pin: {}", e)))?;

        if response.pins.iter().any(|pin| pin == address.as_str()) {
            Ok(())
        } else {
            Err(StorageError::Rejected(format!(
                "pin response does not include {}",
                address
            )))
        }
    }
}

fn map_ureq_error(err: ureq::Error) -> StorageError {
    match err {
        ureq::Error::Status(code, response) => StorageError::Status {
            code,
            body: response.into_string().unwrap_or_default(),
        },
        ureq::Error::Transport(transport) => StorageError::Transport(transport.to_string()),
    }
}

/// Boundary derived from the document digest so it cannot be chosen by the
/// document's author
fn multipart_boundary(document: &[u8]) -> String {
    let digest = Sha256::digest(document);
    format!("metapin-{}", hex::encode(&digest[..12]))
}

fn multipart_body(boundary: &str, file_name: &str, document: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(document.len() + 256);
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
            boundary, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(document);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}
