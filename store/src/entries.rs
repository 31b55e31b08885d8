//! Enumeration of the files inside a repository directory.
//!
//! Entries are classified without following symlinks: regular files and
//! symlinks are yielded, everything else (directories, sockets, fifos,
//! devices) is invisible to the repository.
use std::ffi::{OsStr, OsString};
use std::fs::Metadata;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

/// A regular file or symlink inside a repository directory.
#[derive(Debug)]
pub struct DirEntry {
    name: OsString,
    metadata: Metadata,
    link_target: Option<PathBuf>,
}

impl DirEntry {
    /// The filename, relative to the repository directory.
    pub fn name(&self) -> &OsStr {
        &self.name
    }

    /// Metadata of the entry itself, symlinks are not followed.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// The target of a symlink.
    /// None for regular files, and for symlinks whose target couldn't be read.
    pub fn link_target(&self) -> Option<&Path> {
        self.link_target.as_deref()
    }

    pub fn is_file(&self) -> bool {
        self.metadata.file_type().is_file()
    }

    pub fn is_symlink(&self) -> bool {
        self.metadata.file_type().is_symlink()
    }
}

/// Lazily walks a single directory level, see [entries].
pub struct Entries {
    inner: walkdir::IntoIter,
}

/// Returns an iterator over the regular files and symlinks in `dir`.
///
/// A directory that can't be opened yields nothing; deciding whether that is
/// a problem is up to the caller. The order of entries is unspecified.
/// Entries created or removed during the walk may or may not be seen.
pub fn entries<P: AsRef<Path>>(dir: P) -> Entries {
    Entries {
        inner: WalkDir::new(dir.as_ref())
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .into_iter(),
    }
}

impl Iterator for Entries {
    type Item = DirEntry;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    debug!(err = %e, "skipping unreadable directory entry");
                    continue;
                }
            };

            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) => {
                    debug!(path = %entry.path().display(), err = %e, "unable to stat, skipping");
                    continue;
                }
            };

            let file_type = metadata.file_type();
            let link_target = if file_type.is_symlink() {
                match std::fs::read_link(entry.path()) {
                    Ok(target) => Some(target),
                    Err(e) => {
                        debug!(path = %entry.path().display(), err = %e, "unable to read link target");
                        None
                    }
                }
            } else if file_type.is_file() {
                None
            } else {
                // directories, sockets, fifos and devices
                continue;
            };

            return Some(DirEntry {
                name: entry.file_name().to_owned(),
                metadata,
                link_target,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::entries;
    use std::collections::BTreeMap;
    use std::os::unix::fs::symlink;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn absent_directory_is_empty() {
        let tmpdir = TempDir::new().unwrap();
        assert_eq!(0, entries(tmpdir.path().join("nope")).count());
    }

    #[test]
    fn classifies() {
        let tmpdir = TempDir::new().unwrap();
        std::fs::write(tmpdir.path().join("a.script"), b"keep;").unwrap();
        std::fs::create_dir(tmpdir.path().join("subdir")).unwrap();
        std::fs::write(tmpdir.path().join("subdir/b.script"), b"keep;").unwrap();
        symlink("a.bc", tmpdir.path().join("defaultbc")).unwrap();

        let seen: BTreeMap<_, _> = entries(tmpdir.path())
            .map(|e| {
                (
                    e.name().to_string_lossy().into_owned(),
                    (e.is_file(), e.link_target().map(PathBuf::from)),
                )
            })
            .collect();

        assert_eq!(
            BTreeMap::from([
                ("a.script".to_string(), (true, None)),
                // dangling links are reported, not followed
                ("defaultbc".to_string(), (false, Some(PathBuf::from("a.bc")))),
            ]),
            seen
        );
    }

    #[test]
    fn symlinks_are_not_followed() {
        let tmpdir = TempDir::new().unwrap();
        std::fs::write(tmpdir.path().join("a.bc"), b"bytecode").unwrap();
        symlink("a.bc", tmpdir.path().join("defaultbc")).unwrap();

        let link = entries(tmpdir.path())
            .find(|e| e.name() == "defaultbc")
            .expect("must be found");

        assert!(link.is_symlink());
        assert!(!link.is_file());
    }

    #[test]
    fn stops_early() {
        let tmpdir = TempDir::new().unwrap();
        for i in 0..10 {
            std::fs::write(tmpdir.path().join(format!("{}.script", i)), b"keep;").unwrap();
        }

        let mut it = entries(tmpdir.path());
        assert!(it.next().is_some());
        assert_eq!(9, it.count());
    }
}
