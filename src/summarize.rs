//! Per-directory summarization
//!
//! Lists the archive files directly inside one directory, probes each one
//! and produces a record per file. Bad files are data: they get an unknown
//! row count and exactly one warning line. The only fatal condition is a
//! file whose modification time cannot be read.

use crate::archive::{ArchiveHeaderResult, HeaderProbe};
use crate::error::{ProbeError, ProbeResult, Result, SummaryError};
use crate::summary::{DirectorySummary, FileRecord, RowCount, RowCountFailure};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// File extension of training-data archives
pub const ARCHIVE_EXTENSION: &str = ".npz";

/// Whether a file name looks like an in-progress write
pub fn is_temp_like(filename: &str) -> bool {
    filename.contains('_')
}

/// Whether a file name is a candidate archive
pub fn is_archive_name(filename: &str) -> bool {
    filename.ends_with(ARCHIVE_EXTENSION)
}

/// Map a probe outcome to a row count
pub fn row_count_from_probe(outcome: &ProbeResult<ArchiveHeaderResult>) -> RowCount {
    match outcome {
        Ok(ArchiveHeaderResult::Rows(n)) => RowCount::Known(*n),
        Ok(ArchiveHeaderResult::Empty) => RowCount::Unknown(RowCountFailure::EmptyContainer),
        Ok(ArchiveHeaderResult::Malformed { .. }) => {
            RowCount::Unknown(RowCountFailure::MalformedEntries)
        }
        Ok(ArchiveHeaderResult::MissingEntry { .. }) => {
            RowCount::Unknown(RowCountFailure::MissingPrimaryEntry)
        }
        Err(ProbeError::PermissionDenied { .. }) => {
            RowCount::Unknown(RowCountFailure::PermissionDenied)
        }
        Err(ProbeError::CorruptContainer { .. }) => {
            RowCount::Unknown(RowCountFailure::CorruptContainer)
        }
        Err(ProbeError::Unreadable { .. }) => RowCount::Unknown(RowCountFailure::Unreadable),
    }
}

/// Summarizes one directory at a time
#[derive(Debug, Clone, Default)]
pub struct DirectorySummarizer {
    probe: HeaderProbe,
}

impl DirectorySummarizer {
    pub fn new(probe: HeaderProbe) -> Self {
        Self { probe }
    }

    /// Summarize the archive files directly inside `dir`
    pub fn summarize(&self, dir: &Path) -> Result<DirectorySummary> {
        let filenames = list_archives(dir)?;

        let mut records = Vec::with_capacity(filenames.len());
        let mut total_rows = 0u64;

        for filename in filenames {
            let path = dir.join(&filename);
            let mtime = modified_secs(&path)?;

            let row_count = self.count_rows(&path, &filename);
            if let RowCount::Known(n) = row_count {
                total_rows += n;
            }

            records.push(FileRecord::new(filename, mtime, row_count));
        }

        info!(
            rows = total_rows,
            files = records.len(),
            "Summarizing new dir with {} rows: {}",
            total_rows,
            dir.display()
        );

        Ok(DirectorySummary {
            dir_path: dir.to_path_buf(),
            records,
            total_rows,
        })
    }

    fn count_rows(&self, path: &Path, filename: &str) -> RowCount {
        if is_temp_like(filename) {
            warn!(
                path = %path.display(),
                class = %RowCountFailure::TempFile,
                "File looks like a temp file"
            );
            return RowCount::Unknown(RowCountFailure::TempFile);
        }

        let outcome = self.probe.probe(path);
        let row_count = row_count_from_probe(&outcome);

        if let RowCount::Unknown(failure) = row_count {
            let detail = match &outcome {
                Ok(ArchiveHeaderResult::Malformed { bad_entries }) => {
                    format!("bad arrays: {}", bad_entries.join(", "))
                }
                Ok(ArchiveHeaderResult::MissingEntry { name }) => format!("no entry '{}'", name),
                Ok(_) => String::new(),
                Err(e) => e.to_string(),
            };
            warn!(
                path = %path.display(),
                class = %failure,
                detail = %detail,
                "Skipping rows of bad file"
            );
        } else {
            debug!(path = %path.display(), rows = ?row_count.known(), "Probed file");
        }

        row_count
    }
}

/// Archive file names directly inside `dir`, in listing order
fn list_archives(dir: &Path) -> Result<Vec<String>> {
    let list_err = |e: std::io::Error| SummaryError::ListDir {
        path: dir.to_path_buf(),
        source: e,
    };

    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(list_err)? {
        let entry = entry.map_err(list_err)?;
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                debug!(dir = %dir.display(), name = ?raw, "Ignoring non-UTF-8 file name");
                continue;
            }
        };
        if !is_archive_name(&name) || entry.path().is_dir() {
            continue;
        }
        names.push(name);
    }
    Ok(names)
}

/// Modification time of `path` in seconds since the epoch
fn modified_secs(path: &Path) -> Result<f64> {
    let modified = fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| SummaryError::Metadata {
            path: PathBuf::from(path),
            source: e,
        })?;
    Ok(epoch_secs(modified))
}

fn epoch_secs(time: SystemTime) -> f64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs_f64(),
        Err(e) => -e.duration().as_secs_f64(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::npy::encode_header;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;
    use tracing_subscriber::fmt::MakeWriter;
    use zip::write::{FileOptions, ZipWriter};

    /// Log sink shared between the subscriber and the test
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl LogBuffer {
        fn lines(&self) -> Vec<String> {
            let bytes = self.0.lock().unwrap();
            String::from_utf8_lossy(&bytes)
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    impl Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for LogBuffer {
        type Writer = LogBuffer;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn summarize_logged(dir: &Path) -> (Result<DirectorySummary>, Vec<String>) {
        let buffer = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(buffer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish();
        let result = tracing::subscriber::with_default(subscriber, || {
            DirectorySummarizer::default().summarize(dir)
        });
        (result, buffer.lines())
    }

    fn write_npz(path: &Path, rows: u64) {
        let file = fs::File::create(path).unwrap();
        let mut zip = ZipWriter::new(file);
        let options: FileOptions<'_, ()> = FileOptions::default();
        zip.start_file("binaryInputNCHWPacked.npy", options).unwrap();
        zip.write_all(&encode_header("|u1", false, &[rows, 22, 46])).unwrap();
        zip.finish().unwrap();
    }

    #[test]
    fn test_classifiers() {
        assert!(is_temp_like("data_tmp.npz"));
        assert!(!is_temp_like("ABCDEF0123.npz"));
        assert!(is_archive_name("x.npz"));
        assert!(!is_archive_name("x.npz.json"));
        assert!(!is_archive_name("x.npy"));
    }

    #[test]
    fn test_row_count_from_probe() {
        assert_eq!(
            row_count_from_probe(&Ok(ArchiveHeaderResult::Rows(5))),
            RowCount::Known(5)
        );
        assert_eq!(
            row_count_from_probe(&Ok(ArchiveHeaderResult::Empty)),
            RowCount::Unknown(RowCountFailure::EmptyContainer)
        );
        assert_eq!(
            row_count_from_probe(&Err(ProbeError::PermissionDenied {
                path: "/x.npz".into()
            })),
            RowCount::Unknown(RowCountFailure::PermissionDenied)
        );
    }

    #[test]
    fn test_row_accounting() {
        let dir = tempdir().unwrap();
        write_npz(&dir.path().join("a.npz"), 10);
        write_npz(&dir.path().join("b.npz"), 25);
        fs::write(dir.path().join("c.npz"), b"garbage").unwrap();
        write_npz(&dir.path().join("d.npz"), 5);

        let summary = DirectorySummarizer::default().summarize(dir.path()).unwrap();
        assert_eq!(summary.records.len(), 4);
        assert_eq!(summary.total_rows, 40);
        assert_eq!(summary.failed_files(), 1);

        let bad = summary.records.iter().find(|r| r.filename == "c.npz").unwrap();
        assert_eq!(bad.row_count, RowCount::Unknown(RowCountFailure::CorruptContainer));
    }

    #[test]
    fn test_temp_file_is_not_probed() {
        let dir = tempdir().unwrap();
        // Valid content, but the name marks it as in-progress
        write_npz(&dir.path().join("part_1.npz"), 100);

        let summary = DirectorySummarizer::default().summarize(dir.path()).unwrap();
        assert_eq!(summary.total_rows, 0);
        assert_eq!(
            summary.records[0].row_count,
            RowCount::Unknown(RowCountFailure::TempFile)
        );
    }

    #[test]
    fn test_non_archives_and_subdirs_ignored() {
        let dir = tempdir().unwrap();
        write_npz(&dir.path().join("a.npz"), 3);
        fs::write(dir.path().join("notes.txt"), b"hi").unwrap();
        fs::create_dir(dir.path().join("nested.npz")).unwrap();

        let summary = DirectorySummarizer::default().summarize(dir.path()).unwrap();
        assert_eq!(summary.records.len(), 1);
        assert_eq!(summary.records[0].filename, "a.npz");
        assert!(summary.records[0].mtime > 0.0);
    }

    #[test]
    fn test_one_warning_per_failed_file() {
        let dir = tempdir().unwrap();
        write_npz(&dir.path().join("a.npz"), 10);
        fs::write(dir.path().join("c.npz"), b"garbage").unwrap();
        write_npz(&dir.path().join("t_1.npz"), 4);

        let (result, lines) = summarize_logged(dir.path());
        assert_eq!(result.unwrap().total_rows, 10);

        let warnings: Vec<&String> = lines.iter().filter(|l| l.contains(" WARN ")).collect();
        assert_eq!(warnings.len(), 2, "{:#?}", lines);
        assert!(warnings
            .iter()
            .any(|l| l.contains("c.npz") && l.contains("bad zip file")));
        assert!(warnings
            .iter()
            .any(|l| l.contains("t_1.npz") && l.contains("temp file")));

        let infos: Vec<&String> = lines.iter().filter(|l| l.contains(" INFO ")).collect();
        assert_eq!(infos.len(), 1);
        assert!(infos[0].contains("Summarizing new dir with 10 rows"));
    }

    #[test]
    fn test_clean_dir_logs_no_warnings() {
        let dir = tempdir().unwrap();
        write_npz(&dir.path().join("a.npz"), 2);

        let (result, lines) = summarize_logged(dir.path());
        assert!(result.is_ok());
        assert!(!lines.iter().any(|l| l.contains(" WARN ")));
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_mtime_is_fatal() {
        let dir = tempdir().unwrap();
        write_npz(&dir.path().join("a.npz"), 2);
        std::os::unix::fs::symlink(dir.path().join("gone"), dir.path().join("x.npz")).unwrap();

        let err = DirectorySummarizer::default()
            .summarize(dir.path())
            .unwrap_err();
        assert!(matches!(
            err,
            SummaryError::Metadata { ref path, .. } if path.ends_with("x.npz")
        ));
    }

    #[test]
    fn test_missing_dir_is_fatal() {
        let dir = tempdir().unwrap();
        let err = DirectorySummarizer::default()
            .summarize(&dir.path().join("nope"))
            .unwrap_err();
        assert!(matches!(err, SummaryError::ListDir { .. }));
    }
}
