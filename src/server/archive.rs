//! On-demand zip packaging for multi-file downloads.

use chrono::{DateTime, Local};
use std::fs::File;
use std::io::{self, Cursor};
use std::path::PathBuf;
use zip::write::FileOptions;

use crate::common::ArchiveError;

/// Builds a zip archive in memory from the given file paths.
///
/// Each file lands under its base name; duplicate base names are written as
/// repeated entries, so the later one wins on extraction. Paths that vanished
/// since session start are skipped; a partial archive beats a failed
/// download. Fails only when nothing could be added or a write breaks mid-archive.
pub fn build_zip(paths: &[PathBuf]) -> Result<Vec<u8>, ArchiveError> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    let mut added = 0usize;

    for path in paths {
        let mut source = match File::open(path) {
            Ok(file) => file,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "skipping missing file");
                continue;
            }
        };

        let entry_name = path
            .file_name()
            .and_then(|x| x.to_str())
            .unwrap_or("file")
            .to_string();

        writer.start_file(entry_name, options)?;
        io::copy(&mut source, &mut writer)?;
        added += 1;
    }

    if added == 0 {
        return Err(ArchiveError::Empty);
    }

    let cursor = writer.finish()?;
    Ok(cursor.into_inner())
}

/// Timestamped attachment name for archive downloads.
pub fn archive_name(now: DateTime<Local>) -> String {
    format!("sharefast_{}.zip", now.format("%d%b%Y_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).expect("create test file");
        file.write_all(contents).expect("write test file");
        path
    }

    fn entry_names(bytes: &[u8]) -> Vec<String> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("valid zip");
        (0..archive.len())
            .map(|i| archive.by_index(i).expect("entry").name().to_string())
            .collect()
    }

    #[test]
    fn archives_files_under_base_names() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "a.txt", b"alpha");
        let b = write_file(&dir, "b.txt", b"beta");

        let bytes = build_zip(&[a, b]).expect("archive builds");
        assert_eq!(entry_names(&bytes), vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn archive_round_trips_contents() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "data.bin", b"0123456789");

        let bytes = build_zip(&[a]).expect("archive builds");
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut entry = archive.by_name("data.bin").unwrap();
        let mut contents = Vec::new();
        entry.read_to_end(&mut contents).unwrap();
        assert_eq!(contents, b"0123456789");
    }

    #[test]
    fn missing_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        let a = write_file(&dir, "kept.txt", b"kept");
        let gone = dir.path().join("gone.txt");

        let bytes = build_zip(&[gone, a]).expect("partial archive is fine");
        assert_eq!(entry_names(&bytes), vec!["kept.txt"]);
    }

    #[test]
    fn all_missing_is_an_error() {
        let dir = TempDir::new().unwrap();
        let gone = dir.path().join("gone.txt");

        assert!(matches!(build_zip(&[gone]), Err(ArchiveError::Empty)));
    }

    #[test]
    fn archive_name_is_timestamped() {
        let name = archive_name(Local::now());
        assert!(name.starts_with("sharefast_"));
        assert!(name.ends_with(".zip"));
    }
}
