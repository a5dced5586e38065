use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::{RequestBuilder, Response};
use snafu::{ensure, ResultExt};
use url::Url;

use crate::models::{DistributionInspect, EngineMessage, PullStatus, RegistryAuth};
use crate::reference::ImageReference;
use crate::trust::{self, PullExecutor, ResolvedRefWithAuth, TrustDelegate};
use crate::{error, Result};

const API_VERSION: &str = "v1.43";
const DEFAULT_HOST: &str = "http://localhost:2375";
const AUTH_HEADER: &str = "X-Registry-Auth";

/// Client for a container engine's HTTP API. Implements both collaborator
/// seams: credential resolution and the two pull paths. The engine performs
/// the actual layer transfer; this client only dispatches and watches the
/// status stream.
#[derive(Debug, Clone)]
pub struct EngineClient {
    http: reqwest::Client,
    host: Url,
}

impl EngineClient {
    pub fn new(host: &str) -> Result<Self> {
        let host = Url::parse(host).context(error::UrlSnafu)?;
        ensure!(
            matches!(host.scheme(), "http" | "https"),
            error::EngineHostSnafu {
                host: host.to_string(),
            }
        );
        Ok(Self {
            http: reqwest::Client::new(),
            host,
        })
    }

    /// Engine host from DOCKER_HOST, defaulting to the local TCP socket.
    pub fn from_env() -> Result<Self> {
        let host = std::env::var("DOCKER_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        Self::new(&host)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.host
            .join(&format!("/{API_VERSION}/{path}"))
            .context(error::UrlSnafu)
    }

    fn authorize(request: RequestBuilder, auth: Option<&RegistryAuth>) -> Result<RequestBuilder> {
        match auth {
            Some(auth) => Ok(request.header(AUTH_HEADER, auth.to_header()?)),
            None => Ok(request),
        }
    }

    async fn check(response: Response) -> Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let reason: EngineMessage = response
            .json()
            .await
            .context(error::ErrorDeserializeSnafu)?;
        error::EngineStatusSnafu {
            status,
            reason: reason.message,
        }
        .fail()
    }

    /// POST /images/create and watch the line-delimited status stream until
    /// the engine finishes or reports a failure.
    async fn create_image(
        &self,
        reference: &ImageReference,
        all_tags: bool,
        platform: Option<&str>,
        auth: Option<&RegistryAuth>,
    ) -> Result<()> {
        let request = self
            .http
            .post(self.endpoint("images/create")?)
            .query(&pull_query(reference, all_tags, platform));
        let response = Self::authorize(request, auth)?
            .send()
            .await
            .context(error::RequestSnafu)?;
        let response = Self::check(response).await?;
        let mut stream = response.bytes_stream();
        let mut buffer = Vec::new();
        while let Some(chunk) = stream.try_next().await.context(error::ResponseReadSnafu)? {
            buffer.extend_from_slice(&chunk);
            while let Some(line) = take_line(&mut buffer) {
                if line.is_empty() {
                    continue;
                }
                let status: PullStatus =
                    serde_json::from_slice(&line).context(error::ResponseDeserializeSnafu)?;
                if let Some(reason) = status.failure() {
                    return error::EngineReportSnafu { reason }.fail();
                }
                match (&status.id, &status.status) {
                    (Some(id), Some(message)) => debug!(target: "engine", "{id}: {message}"),
                    (None, Some(message)) => debug!(target: "engine", "{message}"),
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// GET /distribution/{reference}/json to pin a reference to the digest
    /// the registry currently serves for it.
    async fn resolve_descriptor(
        &self,
        reference: &ImageReference,
        auth: Option<&RegistryAuth>,
    ) -> Result<String> {
        let request = self
            .http
            .get(self.endpoint(&format!("distribution/{reference}/json"))?);
        let response = Self::authorize(request, auth)?
            .send()
            .await
            .context(error::RequestSnafu)?;
        let inspect: DistributionInspect = Self::check(response)
            .await?
            .json()
            .await
            .context(error::ErrorDeserializeSnafu)?;
        ensure!(
            !inspect.descriptor.digest.is_empty(),
            error::DescriptorMissingSnafu {
                reference: reference.to_string(),
            }
        );
        Ok(inspect.descriptor.digest)
    }

    /// POST /images/{reference}/tag to alias a pinned image back to the tag
    /// the caller asked for.
    async fn tag_image(&self, pinned: &ImageReference, repository: &str, tag: &str) -> Result<()> {
        let response = self
            .http
            .post(self.endpoint(&format!("images/{pinned}/tag"))?)
            .query(&[("repo", repository), ("tag", tag)])
            .send()
            .await
            .context(error::RequestSnafu)?;
        Self::check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl TrustDelegate for EngineClient {
    async fn resolve_trust_and_auth(
        &self,
        reference: &ImageReference,
    ) -> Result<ResolvedRefWithAuth> {
        let auth = trust::discover_auth(reference.domain()).await?;
        debug!(
            target: "engine",
            "resolved credentials for {}: {}",
            reference.domain(),
            if auth.is_some() { "found" } else { "anonymous" }
        );
        Ok(ResolvedRefWithAuth {
            reference: reference.clone(),
            auth,
        })
    }
}

#[async_trait]
impl PullExecutor for EngineClient {
    async fn trusted_pull(
        &self,
        resolved: &ResolvedRefWithAuth,
        platform: Option<&str>,
        include_source: bool,
    ) -> Result<()> {
        let reference = &resolved.reference;
        // A name-only reference on this path means an all-tags pull; the
        // engine can't enumerate signed targets, so refuse rather than pin
        // whatever single tag the registry resolves by default.
        ensure!(!reference.is_name_only(), error::TrustedAllTagsSnafu);
        let digest = self
            .resolve_descriptor(reference, resolved.auth.as_ref())
            .await?;
        let pinned = reference.pinned(&digest)?;
        info!(target: "engine", "Pull (1 of 1): {pinned}");
        self.create_image(&pinned, false, platform, resolved.auth.as_ref())
            .await?;
        if let Some(tag) = reference.tag() {
            self.tag_image(&pinned, reference.repository(), tag).await?;
        }
        if include_source {
            self.create_image(
                reference,
                false,
                Some(crate::plan::SOURCE_PLATFORM),
                resolved.auth.as_ref(),
            )
            .await?;
        }
        Ok(())
    }

    async fn privileged_pull(
        &self,
        resolved: &ResolvedRefWithAuth,
        all_tags: bool,
        platform: Option<&str>,
        include_source: bool,
    ) -> Result<()> {
        self.create_image(
            &resolved.reference,
            all_tags,
            platform,
            resolved.auth.as_ref(),
        )
        .await?;
        if include_source {
            self.create_image(
                &resolved.reference,
                false,
                Some(crate::plan::SOURCE_PLATFORM),
                resolved.auth.as_ref(),
            )
            .await?;
        }
        Ok(())
    }
}

/// Query parameters for POST /images/create. An all-tags pull omits the tag
/// parameter so the engine fetches the whole repository.
fn pull_query(
    reference: &ImageReference,
    all_tags: bool,
    platform: Option<&str>,
) -> Vec<(&'static str, String)> {
    let mut query = vec![("fromImage", reference.repository().to_string())];
    if !all_tags {
        if let Some(tag) = reference.tag() {
            query.push(("tag", tag.to_string()));
        } else if let Some(digest) = reference.digest() {
            query.push(("tag", digest));
        }
    }
    if let Some(platform) = platform {
        query.push(("platform", platform.to_string()));
    }
    query
}

/// Pop the next newline-terminated line off the front of the buffer,
/// tolerating CRLF. Trailing partial lines stay buffered.
fn take_line(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let pos = buffer.iter().position(|b| *b == b'\n')?;
    let mut line: Vec<u8> = buffer.drain(..=pos).collect();
    line.pop();
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Some(line)
}
