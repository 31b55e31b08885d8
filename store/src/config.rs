use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::OsStringExt;

pub const DEFAULT_SCRIPT_SUFFIX: &str = ".script";
pub const DEFAULT_BYTECODE_SUFFIX: &str = ".bc";
pub const DEFAULT_ACTIVE_NAME: &str = "defaultbc";

/// Appended to a canonical filename while its new contents are staged.
pub const TEMP_SUFFIX: &str = ".NEW";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unable to parse url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("unknown scheme: {0}")]
    UnknownScheme(String),

    #[error("no host allowed")]
    HostNotAllowed,

    #[error("missing repository path")]
    MissingPath,

    #[error("invalid layout parameters: {0}")]
    InvalidParameters(#[from] serde_qs::Error),

    #[error("invalid layout: {0}")]
    InvalidLayout(String),
}

/// The on-disk naming conventions of a repository.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Layout {
    /// Suffix of script source files.
    pub script_suffix: String,
    /// Suffix of compiled bytecode files.
    pub bytecode_suffix: String,
    /// Name of the symlink pointing at the active bytecode file.
    pub active_name: String,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            script_suffix: DEFAULT_SCRIPT_SUFFIX.to_string(),
            bytecode_suffix: DEFAULT_BYTECODE_SUFFIX.to_string(),
            active_name: DEFAULT_ACTIVE_NAME.to_string(),
        }
    }
}

fn check_component(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::InvalidLayout(format!("{} is empty", field)));
    }
    if value.contains('/') || value.contains('\0') {
        return Err(ConfigError::InvalidLayout(format!(
            "{} {:?} contains a slash or null byte",
            field, value
        )));
    }
    Ok(())
}

impl Layout {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_component("script_suffix", &self.script_suffix)?;
        check_component("bytecode_suffix", &self.bytecode_suffix)?;
        check_component("active_name", &self.active_name)?;

        if self.script_suffix == self.bytecode_suffix {
            return Err(ConfigError::InvalidLayout(
                "script and bytecode suffix must differ".to_string(),
            ));
        }

        // the pointer would otherwise be listed as a script or bytecode file
        if self.active_name.ends_with(&self.script_suffix)
            || self.active_name.ends_with(&self.bytecode_suffix)
        {
            return Err(ConfigError::InvalidLayout(format!(
                "active_name {:?} must not end with a script or bytecode suffix",
                self.active_name
            )));
        }

        Ok(())
    }

    /// Filename of the source of the given script.
    pub fn script_file(&self, name: &[u8]) -> OsString {
        join(name, &self.script_suffix)
    }

    /// Filename of the bytecode of the given script.
    /// This is also the target of the active pointer.
    pub fn bytecode_file(&self, name: &[u8]) -> OsString {
        join(name, &self.bytecode_suffix)
    }

    /// Strips the script suffix from a directory entry name, returning the
    /// script name if the entry is a script source.
    pub fn script_stem<'a>(&self, filename: &'a [u8]) -> Option<&'a [u8]> {
        if filename.len() <= self.script_suffix.len() {
            return None;
        }
        filename.strip_suffix(self.script_suffix.as_bytes())
    }

    /// Derives the active script name from the active pointer target.
    /// Targets not longer than the bytecode suffix name no script.
    pub fn active_stem<'a>(&self, target: &'a [u8]) -> Option<&'a [u8]> {
        let suffix_len = self.bytecode_suffix.len();
        if target.len() <= suffix_len {
            return None;
        }
        Some(&target[..target.len() - suffix_len])
    }
}

fn join(name: &[u8], suffix: &str) -> OsString {
    let mut buf = Vec::with_capacity(name.len() + suffix.len());
    buf.extend_from_slice(name);
    buf.extend_from_slice(suffix.as_bytes());
    OsString::from_vec(buf)
}

/// Appends [TEMP_SUFFIX] to a filename.
pub(crate) fn temp_file(filename: &OsStr) -> OsString {
    let mut tmp = filename.to_owned();
    tmp.push(TEMP_SUFFIX);
    tmp
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, Layout};
    use rstest::rstest;

    #[test]
    fn default_layout_is_valid() {
        Layout::default().validate().expect("must be valid");
    }

    #[rstest]
    #[case::empty_suffix(Layout { script_suffix: "".into(), ..Default::default() })]
    #[case::slash_in_suffix(Layout { bytecode_suffix: "/bc".into(), ..Default::default() })]
    #[case::same_suffixes(Layout { bytecode_suffix: ".script".into(), ..Default::default() })]
    #[case::pointer_looks_like_script(Layout { active_name: "active.script".into(), ..Default::default() })]
    #[case::pointer_looks_like_bytecode(Layout { active_name: "default.bc".into(), ..Default::default() })]
    fn invalid_layouts(#[case] layout: Layout) {
        assert!(matches!(
            layout.validate(),
            Err(ConfigError::InvalidLayout(_))
        ));
    }

    #[rstest]
    #[case::script(b"vacation.script", Some(&b"vacation"[..]))]
    #[case::suffix_only(b".script", None)]
    #[case::bytecode(b"vacation.bc", None)]
    #[case::pointer(b"defaultbc", None)]
    #[case::temp(b"vacation.script.NEW", None)]
    fn script_stem(#[case] filename: &[u8], #[case] expected: Option<&[u8]>) {
        assert_eq!(expected, Layout::default().script_stem(filename));
    }

    #[rstest]
    #[case::bytecode(b"vacation.bc", Some(&b"vacation"[..]))]
    #[case::suffix_only(b".bc", None)]
    #[case::short(b"a", None)]
    fn active_stem(#[case] target: &[u8], #[case] expected: Option<&[u8]>) {
        assert_eq!(expected, Layout::default().active_stem(target));
    }
}
