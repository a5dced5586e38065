use snafu::{ensure, OptionExt};
use std::fmt;
use std::fmt::Formatter;
use std::str::FromStr;

use crate::error;

/// Tag applied to a name-only reference before any network operation.
pub const DEFAULT_TAG: &str = "latest";

/// Represents a normalized reference to an image in a registry. A name-only
/// reference is resolved to a tagged one via [`ImageReference::tag_name_only`]
/// before it is handed to any executor, except for all-tags pulls which need
/// the bare repository name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageReference {
    NameOnly {
        repository: String,
    },
    Tagged {
        repository: String,
        tag: String,
    },
    Canonical {
        repository: String,
        algorithm: Algorithm,
        digest: String,
    },
}

impl ImageReference {
    pub fn repository(&self) -> &str {
        match self {
            Self::NameOnly { repository } => repository,
            Self::Tagged { repository, .. } => repository,
            Self::Canonical { repository, .. } => repository,
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::Tagged { tag, .. } => Some(tag),
            _ => None,
        }
    }

    /// Full digest string of a canonical reference, e.g. "sha256:abcd...".
    pub fn digest(&self) -> Option<String> {
        match self {
            Self::Canonical {
                algorithm, digest, ..
            } => Some(format!("{algorithm}:{digest}")),
            _ => None,
        }
    }

    pub fn is_name_only(&self) -> bool {
        matches!(self, Self::NameOnly { .. })
    }

    pub fn is_canonical(&self) -> bool {
        matches!(self, Self::Canonical { .. })
    }

    /// Apply the default-tag policy: a name-only reference becomes a tagged
    /// one, anything else is returned unchanged.
    pub fn tag_name_only(self) -> Self {
        match self {
            Self::NameOnly { repository } => Self::Tagged {
                repository,
                tag: DEFAULT_TAG.to_string(),
            },
            other => other,
        }
    }

    /// Pin this reference's repository to a resolved digest such as
    /// "sha256:abcd...".
    pub fn pinned(&self, digest: &str) -> crate::Result<Self> {
        let (algorithm, value) =
            digest
                .split_once(':')
                .context(error::MalformedReferenceSnafu {
                    reference: digest,
                    reason: "no algorithm was provided for the digest",
                })?;
        ensure!(
            !value.is_empty() && value.chars().all(|c| c.is_ascii_hexdigit()),
            error::MalformedReferenceSnafu {
                reference: digest,
                reason: "digest is not hexadecimal",
            }
        );
        Ok(Self::Canonical {
            repository: self.repository().to_string(),
            algorithm: Algorithm::from_str(algorithm)?,
            digest: value.to_string(),
        })
    }

    /// Registry host this reference resolves against, used for credential
    /// lookup. The first path component counts as a host only when it looks
    /// like one.
    pub fn domain(&self) -> &str {
        match self.repository().split_once('/') {
            Some((head, _)) if head.contains('.') || head.contains(':') || head == "localhost" => {
                head
            }
            _ => "docker.io",
        }
    }
}

fn valid_tag(tag: &str) -> bool {
    let mut chars = tag.chars();
    let starts_clean = matches!(chars.next(), Some(c) if c.is_ascii_alphanumeric() || c == '_');
    starts_clean
        && tag.len() <= 128
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

impl FromStr for ImageReference {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ensure!(
            !s.is_empty(),
            error::MalformedReferenceSnafu {
                reference: s,
                reason: "reference is empty",
            }
        );
        ensure!(
            !s.chars().any(char::is_whitespace),
            error::MalformedReferenceSnafu {
                reference: s,
                reason: "reference contains whitespace",
            }
        );
        if let Some((repository, digest)) = s.rsplit_once('@') {
            ensure!(
                !repository.is_empty(),
                error::MalformedReferenceSnafu {
                    reference: s,
                    reason: "no repository was provided",
                }
            );
            let (algorithm, value) =
                digest
                    .split_once(':')
                    .context(error::MalformedReferenceSnafu {
                        reference: s,
                        reason: "no algorithm was provided for the digest",
                    })?;
            ensure!(
                !value.is_empty() && value.chars().all(|c| c.is_ascii_hexdigit()),
                error::MalformedReferenceSnafu {
                    reference: s,
                    reason: "digest is not hexadecimal",
                }
            );
            return Ok(Self::Canonical {
                repository: repository.to_string(),
                algorithm: Algorithm::from_str(algorithm)?,
                digest: value.to_string(),
            });
        }
        // A ':' before the last '/' belongs to a registry port, not a tag.
        let tag_split = match s.rfind('/') {
            Some(slash) => s[slash..].find(':').map(|i| slash + i),
            None => s.find(':'),
        };
        match tag_split {
            Some(idx) => {
                let (repository, tag) = (&s[..idx], &s[idx + 1..]);
                ensure!(
                    !repository.is_empty(),
                    error::MalformedReferenceSnafu {
                        reference: s,
                        reason: "no repository was provided",
                    }
                );
                ensure!(
                    valid_tag(tag),
                    error::MalformedReferenceSnafu {
                        reference: s,
                        reason: "invalid tag",
                    }
                );
                Ok(Self::Tagged {
                    repository: repository.to_string(),
                    tag: tag.to_string(),
                })
            }
            None => Ok(Self::NameOnly {
                repository: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::NameOnly { repository } => f.write_str(repository),
            Self::Tagged { repository, tag } => {
                f.write_fmt(format_args!("{repository}:{tag}"))
            }
            Self::Canonical {
                repository,
                algorithm,
                digest,
            } => f.write_fmt(format_args!("{repository}@{algorithm}:{digest}")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Algorithm {
    #[default]
    Sha256,
    Sha512,
}

impl FromStr for Algorithm {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha256" => Ok(Self::Sha256),
            "sha512" => Ok(Self::Sha512),
            _ => crate::error::InvalidAlgorithmSnafu {
                algorithm: s.to_string(),
            }
            .fail(),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256 => f.write_str("sha256"),
            Self::Sha512 => f.write_str("sha512"),
        }
    }
}

#[cfg(test)]
mod test {
    use std::str::FromStr;

    use super::ImageReference;

    #[test]
    fn test_parse_name_only() {
        let reference = ImageReference::from_str("alpine").unwrap();
        assert_eq!(
            reference,
            ImageReference::NameOnly {
                repository: "alpine".to_string(),
            }
        );
        assert!(reference.is_name_only());
        assert_eq!(reference.to_string(), "alpine");
        let reference = ImageReference::from_str("localhost:5000/alpine").unwrap();
        assert_eq!(
            reference,
            ImageReference::NameOnly {
                repository: "localhost:5000/alpine".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_tagged() {
        let reference = ImageReference::from_str("alpine:3.18").unwrap();
        assert_eq!(
            reference,
            ImageReference::Tagged {
                repository: "alpine".to_string(),
                tag: "3.18".to_string(),
            }
        );
        assert_eq!(reference.tag(), Some("3.18"));
        assert_eq!(reference.to_string(), "alpine:3.18");
        let reference = ImageReference::from_str("localhost:5000/library/alpine:edge").unwrap();
        assert_eq!(
            reference,
            ImageReference::Tagged {
                repository: "localhost:5000/library/alpine".to_string(),
                tag: "edge".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_canonical() {
        let digest = "a1b2c3d4e5f67890a1b2c3d4e5f67890a1b2c3d4e5f67890a1b2c3d4e5f67890";
        let reference = ImageReference::from_str(&format!("alpine@sha256:{digest}")).unwrap();
        assert_eq!(
            reference,
            ImageReference::Canonical {
                repository: "alpine".to_string(),
                algorithm: super::Algorithm::Sha256,
                digest: digest.to_string(),
            }
        );
        assert!(reference.is_canonical());
        assert_eq!(reference.digest(), Some(format!("sha256:{digest}")));
        assert_eq!(reference.to_string(), format!("alpine@sha256:{digest}"));
    }

    #[test]
    fn test_parse_malformed() {
        assert!(ImageReference::from_str("").is_err());
        assert!(ImageReference::from_str("alpine latest").is_err());
        assert!(ImageReference::from_str("alpine@1234").is_err());
        assert!(ImageReference::from_str("alpine@md5:1234").is_err());
        assert!(ImageReference::from_str("alpine@sha256:not-hex").is_err());
        assert!(ImageReference::from_str("alpine:").is_err());
        assert!(ImageReference::from_str(":latest").is_err());
    }

    #[test]
    fn test_tag_must_start_alphanumeric_or_underscore() {
        assert!(ImageReference::from_str("alpine:-foo").is_err());
        assert!(ImageReference::from_str("alpine:.foo").is_err());
        let reference = ImageReference::from_str("alpine:_foo").unwrap();
        assert_eq!(reference.tag(), Some("_foo"));
        let reference = ImageReference::from_str("alpine:3.18-r0").unwrap();
        assert_eq!(reference.tag(), Some("3.18-r0"));
    }

    #[test]
    fn test_tag_name_only() {
        let reference = ImageReference::from_str("alpine").unwrap().tag_name_only();
        assert_eq!(reference.to_string(), "alpine:latest");
        let reference = ImageReference::from_str("alpine:3.18")
            .unwrap()
            .tag_name_only();
        assert_eq!(reference.to_string(), "alpine:3.18");
    }

    #[test]
    fn test_pinned() {
        let digest = "a1b2c3d4e5f67890a1b2c3d4e5f67890a1b2c3d4e5f67890a1b2c3d4e5f67890";
        let reference = ImageReference::from_str("alpine:3.18").unwrap();
        let pinned = reference.pinned(&format!("sha256:{digest}")).unwrap();
        assert_eq!(pinned.to_string(), format!("alpine@sha256:{digest}"));
        assert!(reference.pinned("1234").is_err());
        assert!(reference.pinned("sha256:").is_err());
    }

    #[test]
    fn test_domain() {
        let reference = ImageReference::from_str("alpine").unwrap();
        assert_eq!(reference.domain(), "docker.io");
        let reference = ImageReference::from_str("library/alpine").unwrap();
        assert_eq!(reference.domain(), "docker.io");
        let reference = ImageReference::from_str("public.ecr.aws/docker/library/alpine").unwrap();
        assert_eq!(reference.domain(), "public.ecr.aws");
        let reference = ImageReference::from_str("localhost:5000/alpine:edge").unwrap();
        assert_eq!(reference.domain(), "localhost:5000");
    }
}
