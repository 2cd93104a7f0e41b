mod digest;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::error::{ScanError, ScanResult};

pub use digest::{FileDigests, digest_file};

const HIDDEN_MARKER: u8 = b'.';

/// One hashed file. `md5` is the legacy digest, `sha256` the one sent to the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: PathBuf,
    pub md5: String,
    pub sha256: String,
}

/// What to do with a file that cannot be read once it has been discovered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnreadablePolicy {
    #[default]
    Abort,
    Skip,
}

pub struct Collector {
    policy: UnreadablePolicy,
}

impl Collector {
    pub fn new(policy: UnreadablePolicy) -> Self {
        Self { policy }
    }

    /// Hashes `root` if it is a file, or every visible regular file below it.
    pub fn collect(&self, root: &Path) -> ScanResult<Vec<FileRecord>> {
        let metadata = fs::metadata(root).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => ScanError::NotFound {
                path: root.to_path_buf(),
            },
            _ => ScanError::io(root, err),
        })?;
        let paths = if metadata.is_file() {
            vec![root.to_path_buf()]
        } else {
            self.discover(root)?
        };
        log::debug!("discovered {} file(s) under {:?}", paths.len(), root);
        self.hash_paths(paths)
    }

    fn discover(&self, root: &Path) -> ScanResult<Vec<PathBuf>> {
        let mut paths = Vec::new();
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));
        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_file() => paths.push(entry.into_path()),
                Ok(_) => {}
                Err(err) => {
                    let path = err.path().unwrap_or(root).to_path_buf();
                    self.handle_unreadable(path, io::Error::from(err))?;
                }
            }
        }
        Ok(paths)
    }

    fn hash_paths(&self, paths: Vec<PathBuf>) -> ScanResult<Vec<FileRecord>> {
        let mut records = Vec::with_capacity(paths.len());
        for path in paths {
            match digest_file(&path) {
                Ok(FileDigests { md5, sha256 }) => {
                    log::debug!("{:?}: sha256 {}", path, sha256);
                    records.push(FileRecord { path, md5, sha256 });
                }
                Err(err) => self.handle_unreadable(path, err)?,
            }
        }
        Ok(records)
    }

    fn handle_unreadable(&self, path: PathBuf, err: io::Error) -> ScanResult<()> {
        match self.policy {
            UnreadablePolicy::Abort => Err(ScanError::io(path, err)),
            UnreadablePolicy::Skip => {
                log::warn!("skipping unreadable {:?}: {}", path, err);
                Ok(())
            }
        }
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().as_encoded_bytes().first() == Some(&HIDDEN_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn relative(root: &Path, records: &[FileRecord]) -> Vec<String> {
        records
            .iter()
            .map(|record| {
                record
                    .path
                    .strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn single_file_yields_one_record() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sample.bin");
        fs::write(&path, b"abc").unwrap();

        let records = Collector::new(UnreadablePolicy::Abort)
            .collect(&path)
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].path, path);
        assert_eq!(records[0].md5, "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(
            records[0].sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn missing_root_is_not_found() {
        let dir = tempdir().unwrap();
        let err = Collector::new(UnreadablePolicy::Abort)
            .collect(&dir.path().join("absent"))
            .unwrap_err();
        assert!(matches!(err, ScanError::NotFound { .. }));
    }

    #[test]
    fn walks_tree_in_stable_order_and_skips_hidden_entries() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("nested/deeper")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join("b.txt"), b"b").unwrap();
        fs::write(root.join("a.txt"), b"a").unwrap();
        fs::write(root.join(".hidden"), b"h").unwrap();
        fs::write(root.join(".git/config"), b"c").unwrap();
        fs::write(root.join("nested/.env"), b"e").unwrap();
        fs::write(root.join("nested/deeper/c.txt"), b"c").unwrap();

        let collector = Collector::new(UnreadablePolicy::Abort);
        let first = collector.collect(root).unwrap();
        let second = collector.collect(root).unwrap();
        assert_eq!(
            relative(root, &first),
            vec!["a.txt", "b.txt", "nested/deeper/c.txt"]
        );
        assert_eq!(first, second);
    }

    #[test]
    fn hidden_root_directory_is_still_walked() {
        let dir = tempdir().unwrap();
        let root = dir.path().join(".cache");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("item"), b"x").unwrap();

        let records = Collector::new(UnreadablePolicy::Abort)
            .collect(&root)
            .unwrap();
        assert_eq!(relative(&root, &records), vec!["item"]);
    }

    #[test]
    fn identical_content_yields_identical_digests() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("one"), b"same bytes").unwrap();
        fs::write(dir.path().join("two"), b"same bytes").unwrap();

        let records = Collector::new(UnreadablePolicy::Abort)
            .collect(dir.path())
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].md5, records[1].md5);
        assert_eq!(records[0].sha256, records[1].sha256);
        assert_ne!(records[0].path, records[1].path);
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_not_regular_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("target"), b"t").unwrap();
        std::os::unix::fs::symlink(dir.path().join("target"), dir.path().join("link")).unwrap();

        let records = Collector::new(UnreadablePolicy::Abort)
            .collect(dir.path())
            .unwrap();
        assert_eq!(relative(dir.path(), &records), vec!["target"]);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn hidden_names_that_are_not_utf8_are_skipped() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempdir().unwrap();
        fs::write(dir.path().join(OsStr::from_bytes(b".hidden\xff")), b"h").unwrap();
        let hidden_dir = dir.path().join(OsStr::from_bytes(b".dir\xfe"));
        fs::create_dir(&hidden_dir).unwrap();
        fs::write(hidden_dir.join("inner"), b"i").unwrap();
        fs::write(dir.path().join(OsStr::from_bytes(b"visible\xff")), b"v").unwrap();

        let records = Collector::new(UnreadablePolicy::Abort)
            .collect(dir.path())
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].path.file_name(),
            Some(OsStr::from_bytes(b"visible\xff"))
        );
    }

    #[test]
    fn vanished_file_aborts_by_default() {
        let dir = tempdir().unwrap();
        let gone = dir.path().join("gone");
        let err = Collector::new(UnreadablePolicy::Abort)
            .hash_paths(vec![gone.clone()])
            .unwrap_err();
        match err {
            ScanError::Io { path, .. } => assert_eq!(path, gone),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn vanished_file_is_skipped_when_requested() {
        let dir = tempdir().unwrap();
        let kept = dir.path().join("kept");
        fs::write(&kept, b"k").unwrap();

        let records = Collector::new(UnreadablePolicy::Skip)
            .hash_paths(vec![dir.path().join("gone"), kept.clone()])
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].path, kept);
    }
}
