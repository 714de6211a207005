//! Header probe for a single archive file
//!
//! Opens a `.npz` container, decodes the array header of every member and
//! reports the row count of the primary input tensor. Only headers are read;
//! array bodies are never decompressed past their first few bytes.

use crate::archive::npy::{self, NpyHeader};
use crate::error::{ProbeError, ProbeResult};
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Seek};
use std::path::Path;
use zip::result::ZipError;
use zip::ZipArchive;

/// Entry whose first dimension is the row count of a data file
pub const PRIMARY_ENTRY: &str = "binaryInputNCHWPacked";

/// Outcome of probing one archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveHeaderResult {
    /// Row count of the primary entry
    Rows(u64),

    /// One or more entries failed to decode
    Malformed { bad_entries: Vec<String> },

    /// Container holds no entries
    Empty,

    /// Every entry decoded but the primary entry is absent
    MissingEntry { name: String },
}

/// Decoded headers of every entry in a container
#[derive(Debug, Default)]
pub struct EntryHeaders {
    /// Entries whose header decoded, in container order
    pub headers: Vec<(String, NpyHeader)>,

    /// Entries whose header failed, with the reason
    pub bad: Vec<(String, String)>,
}

/// Probes archives for the row count of a named entry
#[derive(Debug, Clone)]
pub struct HeaderProbe {
    primary_entry: String,
}

impl Default for HeaderProbe {
    fn default() -> Self {
        Self::new(PRIMARY_ENTRY)
    }
}

impl HeaderProbe {
    /// Create a probe looking for `primary_entry`
    pub fn new(primary_entry: impl Into<String>) -> Self {
        Self {
            primary_entry: primary_entry.into(),
        }
    }

    /// Probe the archive at `path`
    pub fn probe(&self, path: &Path) -> ProbeResult<ArchiveHeaderResult> {
        let file = File::open(path).map_err(|e| open_error(path, e))?;
        let mut archive =
            ZipArchive::new(BufReader::new(file)).map_err(|e| container_error(path, e))?;

        let entries = read_entry_headers(&mut archive);
        Ok(self.classify(entries))
    }

    /// Turn decoded entry headers into a probe outcome
    pub fn classify(&self, entries: EntryHeaders) -> ArchiveHeaderResult {
        if !entries.bad.is_empty() {
            return ArchiveHeaderResult::Malformed {
                bad_entries: entries.bad.into_iter().map(|(name, _)| name).collect(),
            };
        }

        if entries.headers.is_empty() {
            return ArchiveHeaderResult::Empty;
        }

        let primary = entries
            .headers
            .iter()
            .find(|(name, _)| logical_entry_name(name) == self.primary_entry);

        match primary {
            Some((name, header)) => match header.rows() {
                Some(rows) => ArchiveHeaderResult::Rows(rows),
                None => ArchiveHeaderResult::Malformed {
                    bad_entries: vec![name.clone()],
                },
            },
            None => ArchiveHeaderResult::MissingEntry {
                name: self.primary_entry.clone(),
            },
        }
    }
}

/// Decode the header of every entry, continuing past failures
pub fn read_entry_headers<R: Read + Seek>(archive: &mut ZipArchive<R>) -> EntryHeaders {
    let mut entries = EntryHeaders::default();

    for index in 0..archive.len() {
        match archive.by_index(index) {
            Ok(mut entry) => {
                let name = entry.name().to_string();
                match npy::read_header(&mut entry) {
                    Ok(header) => entries.headers.push((name, header)),
                    Err(e) => entries.bad.push((name, e.to_string())),
                }
            }
            Err(e) => entries.bad.push((format!("#{}", index), e.to_string())),
        }
    }

    entries
}

/// Entry name with the `.npy` member suffix removed
pub fn logical_entry_name(name: &str) -> &str {
    name.strip_suffix(".npy").unwrap_or(name)
}

fn open_error(path: &Path, err: std::io::Error) -> ProbeError {
    if err.kind() == ErrorKind::PermissionDenied {
        ProbeError::PermissionDenied {
            path: path.to_path_buf(),
        }
    } else {
        ProbeError::Unreadable {
            path: path.to_path_buf(),
            source: err,
        }
    }
}

fn container_error(path: &Path, err: ZipError) -> ProbeError {
    match err {
        ZipError::Io(e) if e.kind() == ErrorKind::PermissionDenied => {
            ProbeError::PermissionDenied {
                path: path.to_path_buf(),
            }
        }
        other => ProbeError::CorruptContainer {
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::npy::encode_header;
    use std::io::{Cursor, Write};
    use zip::write::{FileOptions, ZipWriter};
    use zip::CompressionMethod;

    fn build_archive(entries: &[(&str, Vec<u8>)], method: CompressionMethod) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options: FileOptions<'_, ()> = FileOptions::default().compression_method(method);
        for (name, data) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    fn probe_bytes(bytes: Vec<u8>) -> ArchiveHeaderResult {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        HeaderProbe::default().classify(read_entry_headers(&mut archive))
    }

    #[test]
    fn test_rows_from_primary_entry() {
        let bytes = build_archive(
            &[
                ("binaryInputNCHWPacked.npy", encode_header("|u1", false, &[250, 22, 46])),
                ("globalTargetsNC.npy", encode_header("<f4", false, &[250, 64])),
            ],
            CompressionMethod::Stored,
        );
        assert_eq!(probe_bytes(bytes), ArchiveHeaderResult::Rows(250));
    }

    #[test]
    fn test_deflated_entries() {
        let mut data = encode_header("|u1", false, &[17, 22, 46]);
        data.extend(std::iter::repeat(0u8).take(4096));
        let bytes = build_archive(
            &[("binaryInputNCHWPacked.npy", data)],
            CompressionMethod::Deflated,
        );
        assert_eq!(probe_bytes(bytes), ArchiveHeaderResult::Rows(17));
    }

    #[test]
    fn test_bad_entry_marks_whole_archive_malformed() {
        let bytes = build_archive(
            &[
                ("binaryInputNCHWPacked.npy", encode_header("|u1", false, &[9, 1])),
                ("broken.npy", b"not an array".to_vec()),
                ("alsobroken.npy", Vec::new()),
            ],
            CompressionMethod::Stored,
        );
        assert_eq!(
            probe_bytes(bytes),
            ArchiveHeaderResult::Malformed {
                bad_entries: vec!["broken.npy".to_string(), "alsobroken.npy".to_string()],
            }
        );
    }

    #[test]
    fn test_empty_archive() {
        let bytes = build_archive(&[], CompressionMethod::Stored);
        assert_eq!(probe_bytes(bytes), ArchiveHeaderResult::Empty);
    }

    #[test]
    fn test_missing_primary_entry() {
        let bytes = build_archive(
            &[("policyTargetsNCMove.npy", encode_header("<i2", false, &[4, 2, 362]))],
            CompressionMethod::Stored,
        );
        assert_eq!(
            probe_bytes(bytes),
            ArchiveHeaderResult::MissingEntry {
                name: PRIMARY_ENTRY.to_string()
            }
        );
    }

    #[test]
    fn test_scalar_primary_entry_is_malformed() {
        let bytes = build_archive(
            &[("binaryInputNCHWPacked", encode_header("<f4", false, &[]))],
            CompressionMethod::Stored,
        );
        assert!(matches!(
            probe_bytes(bytes),
            ArchiveHeaderResult::Malformed { .. }
        ));
    }

    #[test]
    fn test_probe_corrupt_container_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.npz");
        std::fs::write(&path, b"definitely not a zip file").unwrap();

        let err = HeaderProbe::default().probe(&path).unwrap_err();
        assert!(matches!(err, ProbeError::CorruptContainer { .. }));
    }

    #[test]
    fn test_probe_missing_file_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let err = HeaderProbe::default()
            .probe(&dir.path().join("gone.npz"))
            .unwrap_err();
        assert!(matches!(err, ProbeError::Unreadable { .. }));
    }

    #[test]
    fn test_permission_denied_on_open() {
        let path = Path::new("/data/locked.npz");
        let err = open_error(path, std::io::Error::from(ErrorKind::PermissionDenied));
        assert!(matches!(err, ProbeError::PermissionDenied { path: p } if p.as_path() == path));

        let err = open_error(path, std::io::Error::from(ErrorKind::Interrupted));
        assert!(matches!(err, ProbeError::Unreadable { .. }));
    }

    #[test]
    fn test_permission_denied_inside_container() {
        let path = Path::new("/data/locked.npz");
        let err = container_error(
            path,
            ZipError::Io(std::io::Error::from(ErrorKind::PermissionDenied)),
        );
        assert!(matches!(err, ProbeError::PermissionDenied { .. }));

        let eof = std::io::Error::from(ErrorKind::UnexpectedEof);
        let err = container_error(path, ZipError::Io(eof));
        assert!(matches!(err, ProbeError::CorruptContainer { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_probe_unreadable_file_is_permission_denied() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locked.npz");
        std::fs::write(&path, b"PK").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o000)).unwrap();

        // Root ignores file modes
        if std::fs::File::open(&path).is_ok() {
            return;
        }
        let err = HeaderProbe::default().probe(&path).unwrap_err();
        assert!(matches!(err, ProbeError::PermissionDenied { .. }));
    }

    #[test]
    fn test_logical_entry_name() {
        assert_eq!(logical_entry_name("binaryInputNCHWPacked.npy"), PRIMARY_ENTRY);
        assert_eq!(logical_entry_name("binaryInputNCHWPacked"), PRIMARY_ENTRY);
    }
}
