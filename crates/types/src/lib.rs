//! Validated value types shared by the locker crates.
//!
//! Everything that crosses a crate boundary as a "checked" string lives here, so that the
//! blob store and the index never have to re-validate a name or a digest they were handed.

mod hash;

pub use hash::Sha256Hash;

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,

    /// The input contained a path separator, so it is not a single file name
    #[error("Name must not contain path separators: {0}")]
    PathSeparator(String),

    /// The input contained NUL or another control character
    #[error("Name must not contain control characters")]
    ControlCharacter,

    /// The input started or ended with whitespace
    #[error("Name must not start or end with whitespace: {0:?}")]
    SurroundingWhitespace(String),

    /// The input was `.` or `..`
    #[error("Name must not be a relative directory reference: {0}")]
    Reserved(String),

    /// The input was not a 64-character lowercase hex SHA-256 digest
    #[error("Invalid SHA-256 digest: {0}")]
    InvalidDigest(String),
}

/// A string type that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is automatically trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// The input is trimmed of leading and trailing whitespace. If the trimmed
    /// result is empty, an error is returned.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// The name an owner refers to a stored file by.
///
/// A logical name is a single file name: non-empty, without leading or trailing whitespace,
/// free of path separators and control characters, and never `.` or `..`. The physical
/// location of the bytes is derived from it, but the name itself is never used as a path.
///
/// Unlike [`NonEmptyText`] the input is not trimmed, so `" notes.txt"` and `"notes.txt"`
/// can never refer to the same file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogicalName(NonEmptyText);

impl LogicalName {
    /// Validates `input` as a logical file name.
    ///
    /// # Errors
    ///
    /// Returns a [`TextError`] describing the first rule the input breaks.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let input = input.as_ref();
        let text = NonEmptyText::new(input)?;
        let name = text.as_str();

        if name.len() != input.len() {
            return Err(TextError::SurroundingWhitespace(input.to_owned()));
        }

        if name.contains(['/', '\\']) {
            return Err(TextError::PathSeparator(name.to_owned()));
        }
        if name.chars().any(char::is_control) {
            return Err(TextError::ControlCharacter);
        }
        if name == "." || name == ".." {
            return Err(TextError::Reserved(name.to_owned()));
        }

        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the suffix after the last `.`, if the name has one.
    ///
    /// Leading dots do not count, so `.bashrc` has no extension while `notes.txt` has `txt`.
    pub fn extension(&self) -> Option<&str> {
        let name = self.as_str();
        match name.rfind('.') {
            Some(idx) if idx > 0 && idx + 1 < name.len() => Some(&name[idx + 1..]),
            _ => None,
        }
    }
}

impl std::fmt::Display for LogicalName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for LogicalName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl serde::Serialize for LogicalName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for LogicalName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        LogicalName::new(&s).map_err(serde::de::Error::custom)
    }
}
