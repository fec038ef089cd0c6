use crate::TextError;
use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 digest (64 lowercase hexadecimal characters).
///
/// Once constructed the value is guaranteed to be canonical, so it can be compared,
/// displayed and persisted without further checks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sha256Hash(String);

impl Sha256Hash {
    /// Computes the digest of `bytes`.
    pub fn digest(bytes: impl AsRef<[u8]>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes.as_ref());
        let hash_array: [u8; 32] = hasher.finalize().into();
        Self::from_bytes(&hash_array)
    }

    /// Wraps an already computed raw digest.
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Validates an externally supplied digest string.
    ///
    /// Uppercase input is rejected rather than normalised, so that two spellings of the same
    /// digest never end up in storage.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::InvalidDigest`] unless `input` is exactly 64 lowercase hex chars.
    pub fn parse(input: &str) -> Result<Self, TextError> {
        let canonical = input.len() == 64
            && input
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !canonical {
            return Err(TextError::InvalidDigest(input.to_owned()));
        }
        Ok(Self(input.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Sha256Hash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Sha256Hash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for Sha256Hash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for Sha256Hash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Sha256Hash::parse(&s).map_err(serde::de::Error::custom)
    }
}
