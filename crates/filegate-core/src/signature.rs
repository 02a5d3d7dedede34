//! Magic-number table.
//!
//! Every supported type maps to exactly one [`Signature`]. The table is a
//! `static` and never changes at runtime, so any number of validations can
//! read it concurrently.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A file type that can appear in an allow-list.
///
/// # Example
///
/// ```
/// use filegate_core::TypeTag;
///
/// let tag: TypeTag = "image/jpg".parse().unwrap();
/// assert_eq!(tag, TypeTag::Jpeg);
/// assert_eq!(tag.to_string(), "jpeg");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypeTag {
    /// PNG image
    Png,
    /// JPEG image (`jpg` is accepted as an alias)
    Jpeg,
    /// PDF document
    Pdf,
    /// ZIP archive; a match triggers entry inspection
    Zip,
}

impl TypeTag {
    /// All tags, in table order.
    pub const ALL: [TypeTag; 4] = [Self::Png, Self::Jpeg, Self::Pdf, Self::Zip];

    /// Canonical short name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Pdf => "pdf",
            Self::Zip => "zip",
        }
    }

    /// Whether a match on this tag hands over to archive inspection.
    pub fn is_archive(&self) -> bool {
        matches!(self, Self::Zip)
    }

    /// The signature registered for this tag.
    pub fn signature(&self) -> &'static Signature {
        match self {
            Self::Png => &SIGNATURES[0],
            Self::Jpeg => &SIGNATURES[1],
            Self::Pdf => &SIGNATURES[2],
            Self::Zip => &SIGNATURES[3],
        }
    }
}

impl std::fmt::Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TypeTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "png" | "image/png" => Ok(Self::Png),
            "jpg" | "jpeg" | "image/jpeg" | "image/jpg" => Ok(Self::Jpeg),
            "pdf" | "application/pdf" => Ok(Self::Pdf),
            "zip" | "application/zip" | "application/x-zip-compressed" => Ok(Self::Zip),
            _ => Err(format!("Unknown file type: {s}")),
        }
    }
}

impl Serialize for TypeTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TypeTag {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Expected leading (and optionally trailing) bytes for one type.
#[derive(Debug, PartialEq, Eq)]
pub struct Signature {
    /// Type this signature identifies
    pub tag: TypeTag,
    /// Bytes the buffer must start with
    pub head: &'static [u8],
    /// Bytes the buffer must end with (empty when only the head is checked)
    pub tail: &'static [u8],
}

/// Outcome of checking one signature against a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureMatch {
    /// Head and tail bytes are as expected
    Matched,
    /// The window was available but the bytes differ
    Mismatch,
    /// The buffer is shorter than the check window
    TooShort {
        /// Bytes the check needs
        needed: usize,
    },
}

impl Signature {
    /// Number of bytes the check inspects. Head and tail never overlap.
    pub fn window(&self) -> usize {
        self.head.len() + self.tail.len()
    }

    /// Compare the buffer's head and tail against this signature.
    pub fn check(&self, bytes: &[u8]) -> SignatureMatch {
        let needed = self.window();
        if bytes.len() < needed {
            return SignatureMatch::TooShort { needed };
        }

        if bytes.starts_with(self.head) && bytes.ends_with(self.tail) {
            SignatureMatch::Matched
        } else {
            SignatureMatch::Mismatch
        }
    }
}

/// The fixed signature table, indexed in [`TypeTag::ALL`] order.
pub static SIGNATURES: [Signature; 4] = [
    Signature {
        tag: TypeTag::Png,
        head: &[0x89, 0x50, 0x4E, 0x47],
        tail: &[],
    },
    Signature {
        tag: TypeTag::Jpeg,
        head: &[0xFF, 0xD8],
        tail: &[0xFF, 0xD9],
    },
    Signature {
        tag: TypeTag::Pdf,
        head: &[0x25, 0x50, 0x44, 0x46],
        tail: &[],
    },
    Signature {
        tag: TypeTag::Zip,
        head: &[0x50, 0x4B, 0x03, 0x04],
        tail: &[],
    },
];

/// Look up a signature by tag name or MIME alias.
pub fn lookup(tag: &str) -> Option<&'static Signature> {
    tag.parse::<TypeTag>().ok().map(|t| t.signature())
}
