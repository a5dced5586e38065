use base64::Engine;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::collections::HashMap;

use crate::error;

/// Credentials passed to the engine in the X-Registry-Auth header. The header
/// value is the URL-safe base64 encoding of the JSON body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryAuth {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identitytoken: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serveraddress: Option<String>,
}

impl RegistryAuth {
    pub fn to_header(&self) -> crate::Result<String> {
        let body = serde_json::to_string(self).context(error::SerializeSnafu)?;
        Ok(base64::engine::general_purpose::URL_SAFE.encode(body))
    }
}

/// One record of the line-delimited JSON stream the engine emits while
/// pulling.
#[derive(Debug, Clone, Deserialize)]
pub struct PullStatus {
    pub status: Option<String>,
    pub id: Option<String>,
    pub progress: Option<String>,
    pub error: Option<String>,
    #[serde(rename = "errorDetail")]
    pub error_detail: Option<ErrorDetail>,
}

impl PullStatus {
    /// Failure message embedded in the stream, if any.
    pub fn failure(&self) -> Option<&str> {
        self.error_detail
            .as_ref()
            .and_then(|detail| detail.message.as_deref())
            .or(self.error.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
    pub message: Option<String>,
}

/// Error body the engine returns on a non-success status.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineMessage {
    pub message: String,
}

/// Response of GET /distribution/{reference}/json.
#[derive(Debug, Clone, Deserialize)]
pub struct DistributionInspect {
    #[serde(rename = "Descriptor")]
    pub descriptor: Descriptor,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Descriptor {
    #[serde(default)]
    pub digest: String,
    #[serde(rename = "mediaType", default)]
    pub media_type: String,
}

/// Subset of the docker/finch credential file we care about.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialConfig {
    #[serde(default)]
    pub auths: HashMap<String, AuthEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthEntry {
    pub auth: Option<String>,
    pub identitytoken: Option<String>,
}
