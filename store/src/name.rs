use bstr::ByteSlice;
use std::fmt::{self, Debug, Display};
use std::str::FromStr;

/// Names of this length or longer are rejected, leaving room for the
/// directory prefix and the longest suffix under `PATH_MAX`.
pub const MAX_NAME_LEN: usize = 1013;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NameError {
    #[error("script name must not be empty")]
    Empty,

    #[error("script name {0:?} contains a slash or null byte")]
    InvalidCharacter(bytes::Bytes),

    #[error("script name is {0} bytes long, must be shorter than {MAX_NAME_LEN}")]
    TooLong(usize),
}

/// Checks a candidate script name, returning the reason it is rejected.
fn check_name(name: &[u8]) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    if name.contains(&b'/') || name.contains(&0x00) {
        return Err(NameError::InvalidCharacter(bytes::Bytes::copy_from_slice(
            name,
        )));
    }
    if name.len() >= MAX_NAME_LEN {
        return Err(NameError::TooLong(name.len()));
    }

    Ok(())
}

/// Returns whether the given bytes are usable as a script name.
/// Everything but '/' and '\0' is allowed, as long as the name is not empty
/// and shorter than [MAX_NAME_LEN].
pub fn is_valid_name<B: AsRef<[u8]>>(name: B) -> bool {
    check_name(name.as_ref()).is_ok()
}

/// A validated script name.
/// Internally uses a [bytes::Bytes], so cloning is cheap.
#[repr(transparent)]
#[derive(Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScriptName {
    inner: bytes::Bytes,
}

impl ScriptName {
    pub fn as_bytes(&self) -> &[u8] {
        self.inner.as_ref()
    }
}

impl AsRef<[u8]> for ScriptName {
    fn as_ref(&self) -> &[u8] {
        self.inner.as_ref()
    }
}

impl From<ScriptName> for bytes::Bytes {
    fn from(value: ScriptName) -> Self {
        value.inner
    }
}

impl TryFrom<bytes::Bytes> for ScriptName {
    type Error = NameError;

    fn try_from(value: bytes::Bytes) -> Result<Self, Self::Error> {
        check_name(&value)?;
        Ok(Self { inner: value })
    }
}

impl TryFrom<&[u8]> for ScriptName {
    type Error = NameError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        check_name(value)?;
        Ok(Self {
            inner: bytes::Bytes::copy_from_slice(value),
        })
    }
}

impl TryFrom<&str> for ScriptName {
    type Error = NameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.as_bytes().try_into()
    }
}

impl TryFrom<String> for ScriptName {
    type Error = NameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        check_name(value.as_bytes())?;
        Ok(Self {
            inner: bytes::Bytes::from(value.into_bytes()),
        })
    }
}

impl FromStr for ScriptName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.try_into()
    }
}

impl PartialEq<[u8]> for ScriptName {
    fn eq(&self, other: &[u8]) -> bool {
        self.inner.as_ref() == other
    }
}

impl Debug for ScriptName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        Debug::fmt(self.inner.as_bstr(), f)
    }
}

impl Display for ScriptName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        Display::fmt(self.inner.as_bstr(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::{is_valid_name, NameError, ScriptName, MAX_NAME_LEN};
    use rstest::rstest;

    #[rstest]
    #[case::simple("vacation")]
    #[case::digits("rule42")]
    #[case::spaces("my filter")]
    #[case::dots("a.b.c")]
    #[case::unicode("urlaub-größe")]
    fn accepts(#[case] name: &str) {
        assert!(is_valid_name(name));
        let parsed: ScriptName = name.parse().expect("must parse");
        assert_eq!(name, parsed.to_string());
    }

    #[rstest]
    #[case::empty(b"", NameError::Empty)]
    #[case::slash(b"a/b", NameError::InvalidCharacter(bytes::Bytes::from_static(b"a/b")))]
    #[case::leading_slash(b"/etc", NameError::InvalidCharacter(bytes::Bytes::from_static(b"/etc")))]
    #[case::null(b"a\0b", NameError::InvalidCharacter(bytes::Bytes::from_static(b"a\0b")))]
    fn rejects(#[case] name: &'static [u8], #[case] expected: NameError) {
        assert!(!is_valid_name(name));
        assert_eq!(
            expected,
            ScriptName::try_from(name).expect_err("must fail")
        );
    }

    #[test]
    fn length_boundary() {
        let longest = "x".repeat(MAX_NAME_LEN - 1);
        assert!(is_valid_name(&longest));

        let too_long = "x".repeat(MAX_NAME_LEN);
        assert_eq!(
            NameError::TooLong(MAX_NAME_LEN),
            ScriptName::try_from(too_long).expect_err("must fail")
        );
    }
}
