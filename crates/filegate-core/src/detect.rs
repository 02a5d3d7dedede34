//! Executable-disguise detection for archive entries.
//!
//! The entry name's lowercase suffix selects at most one rule, and that rule
//! checks the entry content. Names that select no rule are never flagged.

use std::io::Cursor;

use tracing::{debug, warn};
use zip::ZipArchive;

use crate::config::Policy;

/// `MZ`, the DOS/PE header
const MZ: [u8; 2] = [0x4D, 0x5A];
/// `.INF`
const INF: [u8; 4] = [0x2E, 0x49, 0x4E, 0x46];
const OSX: [u8; 2] = [0xCF, 0x2F];

/// Bytes of a `.run` file checked for a shebang
const SHEBANG_WINDOW: usize = 10;

/// Directory that carries the app bundle inside an `.ipa`
const IPA_PAYLOAD_DIR: &str = "Payload/";

/// The rule an entry name selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutableKind {
    /// `.exe`, `.com`, `.pif`
    DosExecutable,
    /// `.bat`, `.cmd`
    BatchScript,
    /// `.inf`
    SetupInformation,
    /// `.ipa`, checked as a nested archive
    IosApp,
    /// `.osx`
    MacBinary,
    /// `.run`
    ShellInstaller,
    /// `.wsh`
    WindowsScriptHost,
}

/// How much of an entry a rule needs to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentNeed {
    /// Only the first `n` bytes
    Prefix(usize),
    /// The whole entry
    Full,
}

impl ExecutableKind {
    /// Select the rule for an entry name, if any.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.to_lowercase();
        let has = |suffix: &str| name.ends_with(suffix);

        if has(".exe") || has(".com") || has(".pif") {
            Some(Self::DosExecutable)
        } else if has(".bat") || has(".cmd") {
            Some(Self::BatchScript)
        } else if has(".inf") {
            Some(Self::SetupInformation)
        } else if has(".ipa") {
            Some(Self::IosApp)
        } else if has(".osx") {
            Some(Self::MacBinary)
        } else if has(".run") {
            Some(Self::ShellInstaller)
        } else if has(".wsh") {
            Some(Self::WindowsScriptHost)
        } else {
            None
        }
    }

    /// Portion of the entry content this rule reads.
    pub fn content_need(&self) -> ContentNeed {
        match self {
            Self::DosExecutable | Self::MacBinary => ContentNeed::Prefix(2),
            Self::SetupInformation => ContentNeed::Prefix(INF.len()),
            Self::ShellInstaller => ContentNeed::Prefix(SHEBANG_WINDOW),
            Self::BatchScript | Self::WindowsScriptHost | Self::IosApp => ContentNeed::Full,
        }
    }

    /// Apply the rule to the entry content.
    ///
    /// `depth` is the nesting level of the archive that holds the entry, so a
    /// nested `.ipa` is opened at `depth + 1`.
    pub fn matches(&self, content: &[u8], depth: u8, policy: &Policy) -> bool {
        match self {
            Self::DosExecutable => content.starts_with(&MZ),
            Self::BatchScript => {
                let text = String::from_utf8_lossy(content);
                text.contains("@echo") || text.contains("echo") || text.contains("pause")
            }
            Self::SetupInformation => content.starts_with(&INF),
            Self::IosApp => ipa_has_payload(content, depth.saturating_add(1), policy),
            Self::MacBinary => content.starts_with(&OSX),
            Self::ShellInstaller => {
                let head = &content[..content.len().min(SHEBANG_WINDOW)];
                let text = String::from_utf8_lossy(head);
                text.starts_with("#!") && (text.contains("bash") || text.contains("sh"))
            }
            Self::WindowsScriptHost => {
                let text = String::from_utf8_lossy(content);
                text.contains("wscript") || text.contains("cscript")
            }
        }
    }
}

/// Whether an entry with this name and content is executable or script
/// content, whatever its name suggests.
///
/// The entry is assumed to sit in a top-level archive and the default
/// nesting limit applies.
///
/// # Example
///
/// ```
/// use filegate_core::is_executable;
///
/// assert!(is_executable("setup.EXE", b"MZ\x90\x00"));
/// assert!(!is_executable("setup.exe", b"PK\x03\x04"));
/// assert!(!is_executable("notes.txt", b"MZ"));
/// ```
pub fn is_executable(name: &str, content: &[u8]) -> bool {
    ExecutableKind::from_name(name)
        .is_some_and(|kind| kind.matches(content, 1, &Policy::default()))
}

/// Open `content` as an archive at nesting level `depth`.
///
/// Fails closed: too deep or undecodable counts as flagged.
fn ipa_has_payload(content: &[u8], depth: u8, policy: &Policy) -> bool {
    if depth > policy.max_archive_depth {
        warn!(
            "Nested archive at depth {depth} exceeds limit {}",
            policy.max_archive_depth
        );
        return true;
    }

    let archive = match ZipArchive::new(Cursor::new(content)) {
        Ok(archive) => archive,
        Err(e) => {
            debug!("Nested archive failed to open: {e}");
            return true;
        }
    };

    if archive.len() > policy.max_archive_entries {
        warn!("Nested archive has {} entries", archive.len());
        return true;
    }

    archive
        .file_names()
        .any(|name| name.starts_with(IPA_PAYLOAD_DIR))
}
