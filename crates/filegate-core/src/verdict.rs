//! Validation outcomes.

use thiserror::Error;

/// Why a file was rejected.
///
/// None of these are faults: every malformed input ends up here instead of
/// propagating as an error or a panic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The allow-list was empty
    #[error("no allowed types specified")]
    NoAllowedTypes,

    /// The buffer is shorter than every allowed signature's check window
    #[error("buffer too short: need {needed} bytes, got {actual}")]
    BufferTooShort {
        /// Smallest window among the allowed signatures
        needed: usize,
        /// Bytes actually available
        actual: usize,
    },

    /// No allowed signature matched
    #[error("file not supported")]
    UnsupportedType,

    /// The archive (or one of its entries) could not be decoded
    #[error("error processing archive: {0}")]
    ArchiveOpenFailure(String),

    /// An archive entry looks like an executable or script
    #[error("executable content detected in archive: {entry}")]
    DisguisedExecutable {
        /// Full path of the offending entry inside the archive
        entry: String,
    },

    /// The archive is too large to inspect under the active policy
    #[error("archive exceeds inspection limits: {0}")]
    ArchiveLimitExceeded(String),

    /// The file could not be read
    #[error("error reading file: {0}")]
    Unreadable(String),
}

impl Rejection {
    /// Stable machine-readable name of the rejection category.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoAllowedTypes => "no_allowed_types",
            Self::BufferTooShort { .. } => "buffer_too_short",
            Self::UnsupportedType => "unsupported_type",
            Self::ArchiveOpenFailure(_) => "archive_open_failure",
            Self::DisguisedExecutable { .. } => "disguised_executable",
            Self::ArchiveLimitExceeded(_) => "archive_limit_exceeded",
            Self::Unreadable(_) => "unreadable",
        }
    }

    pub(crate) fn archive(err: impl std::fmt::Display) -> Self {
        Self::ArchiveOpenFailure(err.to_string())
    }
}

/// Accept/reject decision for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The content matches an allowed type (and, for archives, no entry was flagged)
    Accepted,
    /// The content failed validation
    Rejected(Rejection),
}

impl Verdict {
    /// Whether the file was accepted.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// The rejection, if any.
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Accepted => None,
            Self::Rejected(r) => Some(r),
        }
    }

    /// Human-readable reason for a rejection.
    pub fn reason(&self) -> Option<String> {
        self.rejection().map(ToString::to_string)
    }
}

impl From<Result<(), Rejection>> for Verdict {
    fn from(res: Result<(), Rejection>) -> Self {
        match res {
            Ok(()) => Self::Accepted,
            Err(r) => Self::Rejected(r),
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accepted => write!(f, "accepted"),
            Self::Rejected(r) => write!(f, "rejected: {r}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_names_entry() {
        let v = Verdict::Rejected(Rejection::DisguisedExecutable {
            entry: "payload.exe".to_string(),
        });
        assert!(!v.is_accepted());
        assert_eq!(
            v.reason().as_deref(),
            Some("executable content detected in archive: payload.exe")
        );
    }

    #[test]
    fn test_from_result() {
        assert_eq!(Verdict::from(Ok::<(), Rejection>(())), Verdict::Accepted);
        assert_eq!(
            Verdict::from(Err(Rejection::UnsupportedType)),
            Verdict::Rejected(Rejection::UnsupportedType)
        );
        assert_eq!(Verdict::Accepted.reason(), None);
    }

    #[test]
    fn test_kinds_are_distinct() {
        let all = [
            Rejection::NoAllowedTypes,
            Rejection::BufferTooShort {
                needed: 4,
                actual: 0,
            },
            Rejection::UnsupportedType,
            Rejection::ArchiveOpenFailure(String::new()),
            Rejection::DisguisedExecutable {
                entry: String::new(),
            },
            Rejection::ArchiveLimitExceeded(String::new()),
            Rejection::Unreadable(String::new()),
        ];
        let mut kinds: Vec<_> = all.iter().map(Rejection::kind).collect();
        kinds.sort_unstable();
        kinds.dedup();
        assert_eq!(kinds.len(), all.len());
    }
}
