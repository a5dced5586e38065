use crate::reference::ImageReference;
use crate::request::PullRequest;

/// Platform sentinel that redirects a pull to the source artifact bundled
/// with an image.
pub const SOURCE_PLATFORM: &str = "linux/source";

/// Which execution path a pull is dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullPath {
    /// Resolve signed digests before pulling
    Trusted,
    /// Pull exactly what the caller asked for, no trust resolution
    Privileged,
}

/// Resolved execution intent for a single validated pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullPlan {
    pub path: PullPath,
    pub platform: Option<String>,
    pub include_source: bool,
}

/// Map the source flags to the effective platform and the effective
/// "fetch source alongside image" flag. A source-only pull does not request
/// the image at all: the sentinel platform redirects the pull target.
pub fn resolve_source_mode(
    platform: Option<&str>,
    include_source: bool,
    source_only: bool,
) -> (Option<String>, bool) {
    if source_only {
        (Some(SOURCE_PLATFORM.to_string()), false)
    } else {
        (platform.map(str::to_string), include_source)
    }
}

/// Choose the execution path. A canonical reference is already digest-pinned
/// so there is nothing left to verify.
pub fn decide_path(reference: &ImageReference, untrusted: bool) -> PullPath {
    if reference.is_canonical() || untrusted {
        PullPath::Privileged
    } else {
        PullPath::Trusted
    }
}

/// Build the full plan for a validated request. Must run after validation;
/// the effective platform feeds both execution paths.
pub fn plan(reference: &ImageReference, request: &PullRequest) -> PullPlan {
    let (platform, include_source) = resolve_source_mode(
        request.platform(),
        request.include_source(),
        request.source_only(),
    );
    PullPlan {
        path: decide_path(reference, request.untrusted()),
        platform,
        include_source,
    }
}

#[cfg(test)]
mod test {
    use std::str::FromStr;

    use super::{decide_path, plan, resolve_source_mode, PullPath, SOURCE_PLATFORM};
    use crate::reference::ImageReference;
    use crate::request::PullRequestBuilder;

    const CANONICAL: &str =
        "alpine@sha256:a1b2c3d4e5f67890a1b2c3d4e5f67890a1b2c3d4e5f67890a1b2c3d4e5f67890";

    #[test]
    fn test_resolve_source_mode() {
        assert_eq!(
            resolve_source_mode(Some("linux/arm64"), false, false),
            (Some("linux/arm64".to_string()), false)
        );
        assert_eq!(
            resolve_source_mode(Some("linux/arm64"), true, false),
            (Some("linux/arm64".to_string()), true)
        );
        // source-only overrides the requested platform and never asks for the
        // image itself, whatever include_source says.
        assert_eq!(
            resolve_source_mode(Some("linux/arm64"), true, true),
            (Some(SOURCE_PLATFORM.to_string()), false)
        );
        assert_eq!(
            resolve_source_mode(None, false, true),
            (Some(SOURCE_PLATFORM.to_string()), false)
        );
    }

    #[test]
    fn test_decide_path() {
        let tagged = ImageReference::from_str("alpine:3.18").unwrap();
        assert_eq!(decide_path(&tagged, false), PullPath::Trusted);
        assert_eq!(decide_path(&tagged, true), PullPath::Privileged);
        let name_only = ImageReference::from_str("alpine").unwrap();
        assert_eq!(decide_path(&name_only, false), PullPath::Trusted);
        let canonical = ImageReference::from_str(CANONICAL).unwrap();
        assert_eq!(decide_path(&canonical, false), PullPath::Privileged);
        assert_eq!(decide_path(&canonical, true), PullPath::Privileged);
    }

    #[test]
    fn test_plan_source_only() {
        let reference = ImageReference::from_str("alpine:latest").unwrap();
        let request = PullRequestBuilder::default()
            .remote("alpine")
            .source_only(true)
            .build()
            .unwrap();
        let plan = plan(&reference, &request);
        assert_eq!(plan.path, PullPath::Trusted);
        assert_eq!(plan.platform.as_deref(), Some(SOURCE_PLATFORM));
        assert!(!plan.include_source);
    }

    #[test]
    fn test_plan_passes_platform_through() {
        let reference = ImageReference::from_str("alpine:latest").unwrap();
        let request = PullRequestBuilder::default()
            .remote("alpine")
            .platform("linux/arm64".to_string())
            .include_source(true)
            .untrusted(true)
            .build()
            .unwrap();
        let plan = plan(&reference, &request);
        assert_eq!(plan.path, PullPath::Privileged);
        assert_eq!(plan.platform.as_deref(), Some("linux/arm64"));
        assert!(plan.include_source);
    }
}
