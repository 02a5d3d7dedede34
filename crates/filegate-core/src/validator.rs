//! Content validation against an allow-list.

use std::collections::BTreeSet;
use std::path::Path;

use tracing::{debug, warn};

use crate::archive;
use crate::config::Policy;
use crate::io;
use crate::signature::{SignatureMatch, TypeTag};
use crate::verdict::{Rejection, Verdict};

/// Set of types a caller is willing to accept. Duplicates collapse and order
/// has no effect on the outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedTypes(BTreeSet<TypeTag>);

impl AllowedTypes {
    /// Build from tags.
    pub fn new(tags: impl IntoIterator<Item = TypeTag>) -> Self {
        Self(tags.into_iter().collect())
    }

    /// Parse tag names and MIME aliases. Unknown names are skipped.
    pub fn parse_lossy<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self(
            names
                .into_iter()
                .filter_map(|name| match name.parse::<TypeTag>() {
                    Ok(tag) => Some(tag),
                    Err(e) => {
                        warn!("Ignoring allowed type: {e}");
                        None
                    }
                })
                .collect(),
        )
    }

    /// Whether `tag` is allowed.
    pub fn contains(&self, tag: TypeTag) -> bool {
        self.0.contains(&tag)
    }

    /// Whether nothing is allowed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Allowed tags in table order.
    pub fn iter(&self) -> impl Iterator<Item = TypeTag> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<TypeTag> for AllowedTypes {
    fn from_iter<I: IntoIterator<Item = TypeTag>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl From<&BTreeSet<TypeTag>> for AllowedTypes {
    fn from(set: &BTreeSet<TypeTag>) -> Self {
        Self(set.clone())
    }
}

/// Validates buffers under a fixed [`Policy`].
///
/// Cheap to clone and safe to share; it holds no mutable state.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    policy: Policy,
}

impl Validator {
    /// Create a validator with the given archive policy.
    pub fn new(policy: Policy) -> Self {
        Self { policy }
    }

    /// The active policy.
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Decide whether `bytes` is one of the `allowed` types.
    ///
    /// Acceptance is existential: any allowed non-archive signature that
    /// matches accepts. A ZIP match hands the decision to archive inspection
    /// and nothing else is consulted.
    pub fn validate(&self, bytes: &[u8], allowed: &AllowedTypes) -> Verdict {
        if allowed.is_empty() {
            return Verdict::Rejected(Rejection::NoAllowedTypes);
        }

        let mut shortest_window: Option<usize> = None;
        let mut all_too_short = true;

        for tag in allowed.iter() {
            match tag.signature().check(bytes) {
                SignatureMatch::Matched if tag.is_archive() => {
                    debug!("Buffer matches {tag}, inspecting entries");
                    return archive::inspect(bytes, &self.policy).into();
                }
                SignatureMatch::Matched => {
                    debug!("Buffer matches {tag}");
                    return Verdict::Accepted;
                }
                SignatureMatch::Mismatch => all_too_short = false,
                SignatureMatch::TooShort { needed } => {
                    shortest_window = Some(shortest_window.map_or(needed, |n| n.min(needed)));
                }
            }
        }

        match shortest_window {
            Some(needed) if all_too_short => Verdict::Rejected(Rejection::BufferTooShort {
                needed,
                actual: bytes.len(),
            }),
            _ => Verdict::Rejected(Rejection::UnsupportedType),
        }
    }

    /// Like [`Validator::validate`], with raw tag names or MIME types.
    pub fn validate_tags(&self, bytes: &[u8], allowed: &[&str]) -> Verdict {
        self.validate(bytes, &AllowedTypes::parse_lossy(allowed.iter().copied()))
    }

    /// Read a file and validate it.
    ///
    /// Without `zip` in the allow-list only the head/tail window the
    /// signatures inspect is read. A read failure is a rejection.
    pub async fn validate_path(&self, path: &Path, allowed: &AllowedTypes) -> Verdict {
        if allowed.is_empty() {
            return Verdict::Rejected(Rejection::NoAllowedTypes);
        }

        let loaded = if allowed.contains(TypeTag::Zip) {
            tokio::fs::read(path).await
        } else {
            let (head, tail) = window_for(allowed);
            io::read_window(path, head, tail).await
        };

        match loaded {
            Ok(bytes) => self.validate(&bytes, allowed),
            Err(e) => {
                warn!("Failed to read {}: {e}", path.display());
                Verdict::Rejected(Rejection::Unreadable(e.to_string()))
            }
        }
    }
}

/// Largest head and tail any allowed signature inspects.
fn window_for(allowed: &AllowedTypes) -> (usize, usize) {
    allowed.iter().fold((0, 0), |(head, tail), tag| {
        let sig = tag.signature();
        (head.max(sig.head.len()), tail.max(sig.tail.len()))
    })
}

/// Validate with the default [`Policy`].
///
/// # Example
///
/// ```
/// use filegate_core::{validate, AllowedTypes, Rejection, TypeTag, Verdict};
///
/// let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
/// assert_eq!(validate(&png, &AllowedTypes::new([TypeTag::Png])), Verdict::Accepted);
/// assert_eq!(
///     validate(&png, &AllowedTypes::new([TypeTag::Pdf])),
///     Verdict::Rejected(Rejection::UnsupportedType)
/// );
/// ```
pub fn validate(bytes: &[u8], allowed: &AllowedTypes) -> Verdict {
    Validator::default().validate(bytes, allowed)
}

/// Validate with raw tag names (unknown names never match).
pub fn validate_tags(bytes: &[u8], allowed: &[&str]) -> Verdict {
    Validator::default().validate_tags(bytes, allowed)
}
