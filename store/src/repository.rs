use std::ffi::OsStr;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use bstr::{BString, ByteSlice};
use tracing::{debug, error, instrument};
use url::Url;

use crate::config::{ConfigError, Layout};
use crate::entries::{entries, DirEntry};
use crate::{Error, ScriptName};

/// A handle to a script repository directory.
///
/// The handle only carries configuration. Which script is active, and which
/// scripts exist, is always read from the filesystem.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Repository {
    path: PathBuf,
    layout: Layout,
}

/// A script found while listing a repository.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptInfo {
    pub name: BString,
    pub active: bool,
}

impl Repository {
    /// Returns a handle to an (existing or not) repository directory.
    pub fn open<P: Into<PathBuf>>(path: P, layout: Layout) -> Result<Self, ConfigError> {
        layout.validate()?;
        Ok(Self {
            path: path.into(),
            layout,
        })
    }

    /// Creates the repository directory (and its parents) if missing.
    pub fn create_dir(&self) -> Result<(), Error> {
        std::fs::create_dir_all(&self.path)
            .map_err(|e| io_error("create directory", &self.path, e))
    }

    /// Constructs a repository handle from an address.
    ///
    /// The following forms are supported:
    /// - a plain filesystem path, using the default [Layout],
    /// - `sievedir:///path/to/dir`, optionally with the [Layout] fields as
    ///   query parameters, e.g. `?script_suffix=.sieve`.
    pub fn from_addr(addr: &str) -> Result<Self, ConfigError> {
        if !addr.contains("://") {
            if addr.is_empty() {
                return Err(ConfigError::MissingPath);
            }
            return Self::open(addr, Layout::default());
        }

        let url = Url::parse(addr)?;
        if url.scheme() != "sievedir" {
            return Err(ConfigError::UnknownScheme(url.scheme().to_string()));
        }
        if url.has_host() {
            return Err(ConfigError::HostNotAllowed);
        }
        if url.path().is_empty() {
            return Err(ConfigError::MissingPath);
        }
        // percent-decodes the path
        let path = url.to_file_path().map_err(|()| ConfigError::MissingPath)?;

        let layout: Layout = serde_qs::from_str(url.query().unwrap_or_default())?;
        Self::open(path, layout)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub(crate) fn join(&self, filename: &OsStr) -> PathBuf {
        self.path.join(filename)
    }

    pub(crate) fn script_path(&self, name: &[u8]) -> PathBuf {
        self.join(&self.layout.script_file(name))
    }

    pub(crate) fn bytecode_path(&self, name: &[u8]) -> PathBuf {
        self.join(&self.layout.bytecode_file(name))
    }

    pub(crate) fn active_path(&self) -> PathBuf {
        self.path.join(&self.layout.active_name)
    }

    /// Iterates over all regular files and symlinks in the repository.
    pub fn entries(&self) -> crate::entries::Entries {
        entries(&self.path)
    }

    fn script_stems(&self) -> impl Iterator<Item = BString> + '_ {
        self.entries().filter_map(|entry: DirEntry| {
            if !entry.is_file() {
                return None;
            }
            self.layout
                .script_stem(entry.name().as_bytes())
                .map(BString::from)
        })
    }

    /// Lists all scripts in the repository, in unspecified order.
    pub fn scripts(&self) -> impl Iterator<Item = ScriptInfo> + '_ {
        let active = self.active();
        self.script_stems().map(move |name| ScriptInfo {
            active: active.as_ref() == Some(&name),
            name,
        })
    }

    /// Returns whether the source file of a script exists.
    pub fn script_exists(&self, name: &ScriptName) -> bool {
        std::fs::metadata(self.script_path(name.as_bytes())).is_ok()
    }

    /// Counts the scripts in the repository, not counting `exclude`.
    #[instrument(skip_all, ret, fields(script.exclude = ?exclude))]
    pub fn count_other_scripts(&self, exclude: Option<&ScriptName>) -> usize {
        self.script_stems()
            .filter(|stem| exclude.map_or(true, |exclude| exclude != stem.as_bytes()))
            .count()
    }

    /// Reads the name of the active script from the active pointer.
    /// Returns Ok(None) if no script is active.
    pub fn try_active(&self) -> Result<Option<BString>, Error> {
        let link = self.active_path();
        match std::fs::read_link(&link) {
            Ok(target) => Ok(self
                .layout
                .active_stem(target.as_os_str().as_bytes())
                .map(BString::from)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error("readlink", &link, e)),
        }
    }

    /// Returns the name of the active script, if any.
    /// Faults reading the active pointer are logged and treated as "no active
    /// script", see [Repository::try_active] to handle them instead.
    pub fn active(&self) -> Option<BString> {
        self.try_active().unwrap_or(None)
    }

    /// Returns whether the given script is the active one.
    pub fn is_active(&self, name: &ScriptName) -> bool {
        self.active()
            .is_some_and(|active| active.as_bytes() == name.as_bytes())
    }

    /// Returns the contents of a script's source file.
    /// A source file that can't be opened, for whatever reason, is reported
    /// as [Error::NotFound]. Faults while reading it are [Error::Io].
    #[instrument(skip_all, fields(script.name = %name))]
    pub fn script_source(&self, name: &ScriptName) -> Result<Vec<u8>, Error> {
        let path = self.script_path(name.as_bytes());
        let mut file = File::open(&path).map_err(|e| {
            debug!(path = %path.display(), err = %e, "unable to open script source");
            Error::NotFound(name.as_bytes().into())
        })?;

        let mut contents = Vec::new();
        file.read_to_end(&mut contents)
            .map_err(|e| io_error("read", &path, e))?;

        Ok(contents)
    }
}

/// Logs a filesystem fault and classifies it as [Error::Io].
pub(crate) fn io_error(op: &'static str, path: &Path, e: std::io::Error) -> Error {
    error!(path = %path.display(), err = %e, "IOERROR: unable to {}", op);
    Error::Io {
        op,
        path: path.to_path_buf(),
        source: e,
    }
}

/// Logs a failed rename and classifies it as [Error::Rename].
pub(crate) fn rename_error(from: &Path, to: &Path, e: std::io::Error) -> Error {
    error!(from = %from.display(), to = %to.display(), err = %e, "IOERROR: unable to rename");
    Error::Rename {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source: e,
    }
}

/// Removes a file, ignoring all errors.
/// Used to clean up temporary files after a failure was already reported.
pub(crate) fn remove_quietly(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), err = %e, "unable to remove temporary file");
        }
    }
}
