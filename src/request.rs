use derive_builder::Builder;
use snafu::ensure;

use crate::error;
use crate::reference::ImageReference;

/// Validated pull intent, built once per invocation and immutable afterward.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct PullRequest {
    /// Raw reference string as given by the caller
    remote: String,
    /// Pull every tag in the repository
    #[builder(default)]
    all_tags: bool,
    /// Optional os/architecture constraint, rewritten for source-only pulls
    #[builder(default)]
    platform: Option<String>,
    /// Explicit opt-out of trust verification
    #[builder(default)]
    untrusted: bool,
    /// Also fetch the source artifact alongside the image
    #[builder(default)]
    include_source: bool,
    /// Fetch only the source artifact, not the image
    #[builder(default)]
    source_only: bool,
}

impl PullRequest {
    pub fn remote(&self) -> &str {
        &self.remote
    }

    pub fn all_tags(&self) -> bool {
        self.all_tags
    }

    pub fn platform(&self) -> Option<&str> {
        self.platform.as_deref()
    }

    pub fn untrusted(&self) -> bool {
        self.untrusted
    }

    pub fn include_source(&self) -> bool {
        self.include_source
    }

    pub fn source_only(&self) -> bool {
        self.source_only
    }
}

/// How to treat `--source` combined with `--source-only`. The legacy behavior
/// lets `--source-only` win silently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SourceFlagPolicy {
    #[default]
    Precedence,
    Strict,
}

/// Reject incompatible flag combinations before any network activity. Rules
/// are evaluated in order and the first match wins.
pub fn validate(
    reference: &ImageReference,
    request: &PullRequest,
    policy: SourceFlagPolicy,
) -> crate::Result<()> {
    ensure!(
        !(request.all_tags() && !reference.is_name_only()),
        error::AllTagsWithReferenceSnafu
    );
    ensure!(
        !(request.all_tags() && (request.include_source() || request.source_only())),
        error::AllTagsWithSourceSnafu
    );
    if policy == SourceFlagPolicy::Strict {
        ensure!(
            !(request.include_source() && request.source_only()),
            error::SourceFlagsConflictSnafu
        );
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use std::str::FromStr;

    use super::{validate, PullRequestBuilder, SourceFlagPolicy};
    use crate::error::Error;
    use crate::reference::ImageReference;

    fn reference(raw: &str) -> ImageReference {
        ImageReference::from_str(raw).unwrap()
    }

    #[test]
    fn test_builder_defaults() {
        let request = PullRequestBuilder::default()
            .remote("alpine")
            .build()
            .unwrap();
        assert_eq!(request.remote(), "alpine");
        assert!(!request.all_tags());
        assert!(request.platform().is_none());
        assert!(!request.untrusted());
        assert!(!request.include_source());
        assert!(!request.source_only());
    }

    #[test]
    fn test_all_tags_rejects_tagged_reference() {
        let request = PullRequestBuilder::default()
            .remote("alpine:3.18")
            .all_tags(true)
            .build()
            .unwrap();
        let result = validate(
            &reference("alpine:3.18"),
            &request,
            SourceFlagPolicy::default(),
        );
        assert!(matches!(result, Err(Error::AllTagsWithReference)));
    }

    #[test]
    fn test_all_tags_rejects_canonical_reference() {
        let raw = "alpine@sha256:a1b2c3d4e5f67890a1b2c3d4e5f67890a1b2c3d4e5f67890a1b2c3d4e5f67890";
        let request = PullRequestBuilder::default()
            .remote(raw)
            .all_tags(true)
            .build()
            .unwrap();
        let result = validate(&reference(raw), &request, SourceFlagPolicy::default());
        assert!(matches!(result, Err(Error::AllTagsWithReference)));
    }

    #[test]
    fn test_all_tags_rejects_source() {
        let request = PullRequestBuilder::default()
            .remote("alpine")
            .all_tags(true)
            .source_only(true)
            .build()
            .unwrap();
        let result = validate(&reference("alpine"), &request, SourceFlagPolicy::default());
        assert!(matches!(result, Err(Error::AllTagsWithSource)));
        let request = PullRequestBuilder::default()
            .remote("alpine")
            .all_tags(true)
            .include_source(true)
            .build()
            .unwrap();
        let result = validate(&reference("alpine"), &request, SourceFlagPolicy::default());
        assert!(matches!(result, Err(Error::AllTagsWithSource)));
    }

    #[test]
    fn test_source_conflict_policy() {
        let request = PullRequestBuilder::default()
            .remote("alpine")
            .include_source(true)
            .source_only(true)
            .build()
            .unwrap();
        // Legacy behavior lets source-only win without complaint.
        assert!(validate(&reference("alpine"), &request, SourceFlagPolicy::Precedence).is_ok());
        let result = validate(&reference("alpine"), &request, SourceFlagPolicy::Strict);
        assert!(matches!(result, Err(Error::SourceFlagsConflict)));
    }

    #[test]
    fn test_plain_request_is_valid() {
        let request = PullRequestBuilder::default()
            .remote("alpine")
            .build()
            .unwrap();
        assert!(validate(&reference("alpine"), &request, SourceFlagPolicy::default()).is_ok());
        let request = PullRequestBuilder::default()
            .remote("alpine")
            .all_tags(true)
            .build()
            .unwrap();
        assert!(validate(&reference("alpine"), &request, SourceFlagPolicy::default()).is_ok());
    }
}
