//! ZIP inspection.
//!
//! The archive is opened in memory and walked in central-directory order.
//! Nothing is extracted or executed; an entry is only read when its name
//! selects a detector rule, and then only as far as that rule looks.

use std::collections::BTreeSet;
use std::io::{Cursor, Read};

use tracing::{debug, warn};
use zip::ZipArchive;

use crate::config::Policy;
use crate::detect::{ContentNeed, ExecutableKind};
use crate::verdict::{Rejection, Verdict};

/// `PK\x01\x02`, start of a central-directory file header
const CENTRAL_HEADER_SIG: [u8; 4] = [0x50, 0x4B, 0x01, 0x02];
/// Fixed part of a central-directory file header
const CENTRAL_HEADER_LEN: usize = 46;

/// Inspect a ZIP archive's entries for disguised executables, using the
/// default [`Policy`].
pub fn validate_archive(bytes: &[u8]) -> Verdict {
    inspect(bytes, &Policy::default()).into()
}

/// Walk every entry of a top-level archive; the first flagged entry wins.
pub(crate) fn inspect(bytes: &[u8], policy: &Policy) -> Result<(), Rejection> {
    if policy.max_archive_depth < 1 {
        return Err(Rejection::ArchiveLimitExceeded(format!(
            "nesting depth 1, limit is {}",
            policy.max_archive_depth
        )));
    }

    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(Rejection::archive)?;

    if archive.len() > policy.max_archive_entries {
        return Err(Rejection::ArchiveLimitExceeded(format!(
            "{} entries, limit is {}",
            archive.len(),
            policy.max_archive_entries
        )));
    }

    check_central_directory(bytes, archive.central_directory_start(), archive.len())?;

    debug!("Inspecting archive with {} entries", archive.len());

    for i in 0..archive.len() {
        let entry = archive.by_index(i).map_err(Rejection::archive)?;
        if entry.is_dir() {
            continue;
        }

        let name = entry.name().to_string();
        let Some(kind) = ExecutableKind::from_name(&name) else {
            continue;
        };

        let content = read_entry(entry, &name, kind.content_need(), policy)?;
        if kind.matches(&content, 1, policy) {
            warn!("Flagged archive entry {name} as {kind:?}");
            return Err(Rejection::DisguisedExecutable { entry: name });
        }
    }

    Ok(())
}

/// Walk the raw central-directory records and make sure each one is an entry
/// the reader will hand out.
///
/// The reader keys entries by name, so records sharing a name collapse into
/// one and only the last is ever read. Records past the count in the end
/// record are never read at all. Both would let an entry skip inspection.
fn check_central_directory(bytes: &[u8], start: u64, entries: usize) -> Result<(), Rejection> {
    let truncated = || Rejection::archive("truncated central directory record");

    let mut pos = usize::try_from(start).map_err(Rejection::archive)?;
    let mut records = 0usize;
    let mut names = BTreeSet::new();

    while bytes.get(pos..pos + 4) == Some(&CENTRAL_HEADER_SIG[..]) {
        let header = bytes
            .get(pos..pos + CENTRAL_HEADER_LEN)
            .ok_or_else(truncated)?;
        let field = |at: usize| usize::from(u16::from_le_bytes([header[at], header[at + 1]]));
        let (name_len, extra_len, comment_len) = (field(28), field(30), field(32));

        let name_start = pos + CENTRAL_HEADER_LEN;
        let name = bytes
            .get(name_start..name_start + name_len)
            .ok_or_else(truncated)?;
        if !names.insert(name) {
            return Err(Rejection::archive(format!(
                "duplicate entry name {}",
                String::from_utf8_lossy(name)
            )));
        }

        records += 1;
        pos = name_start + name_len + extra_len + comment_len;
    }

    if records != entries {
        return Err(Rejection::archive(format!(
            "central directory holds {records} records, {entries} readable"
        )));
    }
    Ok(())
}

/// Read as much of an entry as the rule needs.
///
/// Corrupt data (bad CRC, unsupported compression) surfaces as an archive
/// failure rather than as a short read. The CRC is only verified when the
/// read reaches the end of the entry, so prefix-only rules judge the bytes
/// they see.
fn read_entry(
    entry: impl Read,
    name: &str,
    need: ContentNeed,
    policy: &Policy,
) -> Result<Vec<u8>, Rejection> {
    let limit = match need {
        ContentNeed::Prefix(n) => n as u64,
        ContentNeed::Full => policy.max_entry_bytes.saturating_add(1),
    };

    let mut content = Vec::new();
    entry
        .take(limit)
        .read_to_end(&mut content)
        .map_err(|e| Rejection::archive(format!("{name}: {e}")))?;

    if need == ContentNeed::Full && content.len() as u64 > policy.max_entry_bytes {
        return Err(Rejection::ArchiveLimitExceeded(format!(
            "{name} is larger than {} bytes",
            policy.max_entry_bytes
        )));
    }

    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn zip_of(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn stored_zip_of(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn replace_all(bytes: &mut [u8], from: &[u8], to: &[u8]) {
        assert_eq!(from.len(), to.len());
        let mut i = 0;
        while i + from.len() <= bytes.len() {
            if &bytes[i..i + from.len()] == from {
                bytes[i..i + from.len()].copy_from_slice(to);
                i += from.len();
            } else {
                i += 1;
            }
        }
    }

    fn position(bytes: &[u8], needle: &[u8]) -> usize {
        bytes
            .windows(needle.len())
            .position(|w| w == needle)
            .unwrap()
    }

    #[test]
    fn test_benign_archive_accepted() {
        let bytes = zip_of(&[
            ("readme.txt", b"hello"),
            ("photo.png", &[0x89, 0x50, 0x4E, 0x47]),
        ]);
        assert_eq!(validate_archive(&bytes), Verdict::Accepted);
    }

    #[test]
    fn test_empty_archive_accepted() {
        let bytes = zip_of(&[]);
        assert_eq!(validate_archive(&bytes), Verdict::Accepted);
    }

    #[test]
    fn test_disguised_exe_rejected() {
        let bytes = zip_of(&[("readme.txt", b"hi"), ("payload.exe", b"MZ\x90\x00")]);
        assert_eq!(
            validate_archive(&bytes),
            Verdict::Rejected(Rejection::DisguisedExecutable {
                entry: "payload.exe".to_string()
            })
        );
    }

    #[test]
    fn test_first_violation_wins() {
        let bytes = zip_of(&[
            ("b/install.bat", b"@echo off"),
            ("a/payload.exe", b"MZ"),
        ]);
        let verdict = validate_archive(&bytes);
        assert_eq!(
            verdict.rejection(),
            Some(&Rejection::DisguisedExecutable {
                entry: "b/install.bat".to_string()
            })
        );
    }

    #[test]
    fn test_renamed_exe_without_mz_accepted() {
        let bytes = zip_of(&[("game.exe", b"just text")]);
        assert!(validate_archive(&bytes).is_accepted());
    }

    #[test]
    fn test_directories_are_skipped() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .add_directory("tools.exe/", SimpleFileOptions::default())
            .unwrap();
        let bytes = writer.finish().unwrap().into_inner();
        assert!(validate_archive(&bytes).is_accepted());
    }

    #[test]
    fn test_malformed_archive_rejected() {
        let mut bytes = vec![0x50, 0x4B, 0x03, 0x04];
        bytes.extend(std::iter::repeat_n(0xAB, 64));
        assert!(matches!(
            validate_archive(&bytes),
            Verdict::Rejected(Rejection::ArchiveOpenFailure(_))
        ));
    }

    #[test]
    fn test_entry_count_limit() {
        let bytes = zip_of(&[("a.txt", b"a"), ("b.txt", b"b"), ("c.txt", b"c")]);
        let policy = Policy::default().with_max_entries(2);
        assert!(matches!(
            inspect(&bytes, &policy),
            Err(Rejection::ArchiveLimitExceeded(_))
        ));
        assert!(inspect(&bytes, &Policy::default()).is_ok());
    }

    #[test]
    fn test_entry_size_limit_applies_to_full_reads() {
        let script = vec![b'x'; 32];
        let bytes = zip_of(&[("big.bat", &script), ("big.exe", &script)]);
        let policy = Policy::default().with_max_entry_bytes(16);

        let err = inspect(&bytes, &policy).unwrap_err();
        assert_eq!(err.kind(), "archive_limit_exceeded");
        assert!(err.to_string().contains("big.bat"));

        // prefix-only rules are not affected by the limit
        let bytes = zip_of(&[("big.exe", &script)]);
        assert!(inspect(&bytes, &policy).is_ok());
    }

    #[test]
    fn test_nested_ipa_with_payload_rejected() {
        let ipa = zip_of(&[("Payload/App.app/Info.plist", b"<plist/>")]);
        let bytes = zip_of(&[("readme.txt", b"hi"), ("App.ipa", &ipa)]);
        assert_eq!(
            validate_archive(&bytes).rejection(),
            Some(&Rejection::DisguisedExecutable {
                entry: "App.ipa".to_string()
            })
        );
    }

    #[test]
    fn test_nested_ipa_past_depth_limit_rejected() {
        let ipa = zip_of(&[("readme.txt", b"hi")]);
        let bytes = zip_of(&[("App.ipa", &ipa)]);

        assert!(inspect(&bytes, &Policy::default()).is_ok());
        assert!(matches!(
            inspect(&bytes, &Policy::default().with_max_depth(1)),
            Err(Rejection::DisguisedExecutable { .. })
        ));
    }

    #[test]
    fn test_duplicate_entry_names_rejected() {
        // exe first, benign second: the reader would only hand out the second
        let mut bytes = stored_zip_of(&[("a.exe", b"MZ\x90\x00"), ("b.exe", b"hello")]);
        replace_all(&mut bytes, b"b.exe", b"a.exe");
        let verdict = validate_archive(&bytes);
        assert_eq!(
            verdict.rejection().map(Rejection::kind),
            Some("archive_open_failure")
        );
        assert!(verdict.reason().unwrap().contains("duplicate entry name a.exe"));

        let mut bytes = stored_zip_of(&[("b.exe", b"hello"), ("a.exe", b"MZ\x90\x00")]);
        replace_all(&mut bytes, b"b.exe", b"a.exe");
        assert!(matches!(
            validate_archive(&bytes),
            Verdict::Rejected(Rejection::ArchiveOpenFailure(_))
        ));
    }

    #[test]
    fn test_central_directory_walk_counts_records() {
        let bytes = zip_of(&[("a.txt", b"a"), ("b.txt", b"b")]);
        let archive = ZipArchive::new(Cursor::new(&bytes[..])).unwrap();
        let start = archive.central_directory_start();

        assert!(check_central_directory(&bytes, start, 2).is_ok());
        assert!(matches!(
            check_central_directory(&bytes, start, 1),
            Err(Rejection::ArchiveOpenFailure(_))
        ));
    }

    #[test]
    fn test_corrupt_full_read_entry_rejected() {
        let mut bytes = stored_zip_of(&[("install.bat", b"@echo off")]);
        let at = position(&bytes, b"@echo off") + 8;
        bytes[at] ^= 0xFF;

        let verdict = validate_archive(&bytes);
        assert!(matches!(
            verdict,
            Verdict::Rejected(Rejection::ArchiveOpenFailure(_))
        ));
        assert!(verdict.reason().unwrap().contains("install.bat"));
    }

    #[test]
    fn test_corrupt_prefix_read_entry_judged_on_prefix() {
        // only the first two bytes are read, so the CRC is never checked
        let mut bytes = stored_zip_of(&[("payload.exe", b"MZ\x90\x00\x03")]);
        let at = position(&bytes, b"MZ\x90\x00\x03") + 4;
        bytes[at] ^= 0xFF;
        assert!(matches!(
            validate_archive(&bytes),
            Verdict::Rejected(Rejection::DisguisedExecutable { .. })
        ));

        let mut bytes = stored_zip_of(&[("game.exe", b"just text")]);
        let at = position(&bytes, b"just text") + 8;
        bytes[at] ^= 0xFF;
        assert!(validate_archive(&bytes).is_accepted());
    }

    #[test]
    fn test_zero_depth_limit_rejects_outer_archive() {
        let bytes = zip_of(&[("readme.txt", b"hi")]);
        let err = inspect(&bytes, &Policy::default().with_max_depth(0)).unwrap_err();
        assert_eq!(err.kind(), "archive_limit_exceeded");
    }
}
