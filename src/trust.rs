use async_trait::async_trait;
use base64::Engine;
use snafu::ResultExt;

use crate::models::{AuthEntry, CredentialConfig, RegistryAuth};
use crate::reference::ImageReference;
use crate::{error, Result};

const COMMON_AUTH_FILES: &[&str] = &[".docker/config.json", ".finch/config.json"];
const KEYRING_SERVICE: &str = "docker-credential-helpers";

/// Legacy credential-file keys a docker hub reference may be stored under.
const HUB_ALIASES: &[&str] = &[
    "docker.io",
    "index.docker.io",
    "https://index.docker.io/v1/",
];

/// Resolves registry credentials and trust data for a reference. Implemented
/// separately from the executors so the orchestrator can be tested with
/// deterministic fakes.
#[async_trait]
pub trait TrustDelegate: Send + Sync {
    async fn resolve_trust_and_auth(
        &self,
        reference: &ImageReference,
    ) -> Result<ResolvedRefWithAuth>;
}

/// Performs the actual transfer for whichever path the gate selected.
#[async_trait]
pub trait PullExecutor: Send + Sync {
    async fn trusted_pull(
        &self,
        resolved: &ResolvedRefWithAuth,
        platform: Option<&str>,
        include_source: bool,
    ) -> Result<()>;

    async fn privileged_pull(
        &self,
        resolved: &ResolvedRefWithAuth,
        all_tags: bool,
        platform: Option<&str>,
        include_source: bool,
    ) -> Result<()>;
}

/// Reference bundled with the credentials it resolves against.
#[derive(Debug, Clone)]
pub struct ResolvedRefWithAuth {
    pub reference: ImageReference,
    pub auth: Option<RegistryAuth>,
}

/// Walk the common credential files for an entry matching the registry
/// domain, falling back to the system keyring when the entry is blank.
pub async fn discover_auth(domain: &str) -> Result<Option<RegistryAuth>> {
    let keys: Vec<&str> = if domain == "docker.io" {
        HUB_ALIASES.to_vec()
    } else {
        vec![domain]
    };
    for file in COMMON_AUTH_FILES {
        if let Some(path) = home::home_dir() {
            let path = path.join(file);
            if path.exists() {
                let raw = tokio::fs::read_to_string(&path)
                    .await
                    .context(error::FileSnafu)?;
                let config: CredentialConfig =
                    serde_json::from_str(&raw).context(error::ConfigDeserializeSnafu)?;
                for key in &keys {
                    if let Some(entry) = config.auths.get(*key) {
                        if entry.auth.is_none() && entry.identitytoken.is_none() {
                            // Blank entry means the secret lives in the system keychain
                            if let Ok(stored) = keyring::Entry::new(KEYRING_SERVICE, key) {
                                if let Ok(secret) = stored.get_password() {
                                    return decode_secret(&secret, key).map(Some);
                                }
                            }
                            return Ok(None);
                        }
                        return decode_entry(entry, key);
                    }
                }
            }
        }
    }
    Ok(None)
}

fn decode_entry(entry: &AuthEntry, server: &str) -> Result<Option<RegistryAuth>> {
    if let Some(encoded) = &entry.auth {
        return decode_secret(encoded, server).map(Some);
    }
    if let Some(token) = &entry.identitytoken {
        return Ok(Some(RegistryAuth {
            identitytoken: Some(token.clone()),
            serveraddress: Some(server.to_string()),
            ..Default::default()
        }));
    }
    Ok(None)
}

fn decode_secret(encoded: &str, server: &str) -> Result<RegistryAuth> {
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| {
            error::AuthorizationSnafu {
                reason: format!("invalid base64 in credential entry: {e}"),
            }
            .build()
        })?;
    let decoded = String::from_utf8_lossy(&decoded);
    if let Some((username, password)) = decoded.split_once(':') {
        Ok(RegistryAuth {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
            serveraddress: Some(server.to_string()),
            ..Default::default()
        })
    } else {
        Ok(RegistryAuth {
            identitytoken: Some(decoded.to_string()),
            serveraddress: Some(server.to_string()),
            ..Default::default()
        })
    }
}
