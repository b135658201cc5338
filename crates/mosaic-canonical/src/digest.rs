//! Content digests
//!
//! Provides [`Digest`], the fixed-size change detector computed over a
//! canonical form. The digest is 64 bits of a Blake3 hash over the form's
//! single, unambiguous UTF-8 JSON encoding — the same bytes whether the
//! form originated from a browser payload or a server-side structure, so
//! both sides always agree. This is a change detector, not a security
//! boundary; comparison is exact equality only.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::normalize::CanonicalForm;

/// Width of a digest in bytes
pub const DIGEST_LEN: usize = 8;

/// A 64-bit content digest
///
/// Immutable and cheap to copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    /// Create a digest from raw bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Reference to the underlying bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Compute the digest of arbitrary bytes
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        let hash = blake3::hash(data);
        let mut bytes = [0u8; DIGEST_LEN];
        bytes.copy_from_slice(&hash.as_bytes()[..DIGEST_LEN]);
        Self(bytes)
    }

    /// Compute the digest of a canonical form
    ///
    /// Encodes the form as UTF-8 JSON; `serde_json` escaping is
    /// deterministic, so multi-byte delimiter characters inside prop
    /// expressions encode identically on every producer.
    ///
    /// # Errors
    /// Returns [`DigestError::Serialization`] if the form fails to encode,
    /// which for well-typed canonical values is a programming error.
    pub fn of_canonical(form: &CanonicalForm) -> Result<Self, DigestError> {
        let bytes = serde_json::to_vec(form.as_value())?;
        Ok(Self::compute(&bytes))
    }

    /// Create a digest from a byte slice
    ///
    /// # Errors
    /// Returns an error if the slice is not exactly [`DIGEST_LEN`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, DigestError> {
        if bytes.len() != DIGEST_LEN {
            return Err(DigestError::InvalidLength {
                expected: DIGEST_LEN,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; DIGEST_LEN];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }
}

impl Display for Digest {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for Digest {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        Self::from_slice(&bytes)
    }
}

impl serde::Serialize for Digest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_string())
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> serde::Deserialize<'de> for Digest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct DigestVisitor;

        impl serde::de::Visitor<'_> for DigestVisitor {
            type Value = Digest;

            fn expecting(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
                formatter.write_str("an 8-byte digest as hex string or byte array")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                value.parse().map_err(serde::de::Error::custom)
            }

            fn visit_bytes<E>(self, value: &[u8]) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Digest::from_slice(value).map_err(serde::de::Error::custom)
            }
        }

        if deserializer.is_human_readable() {
            deserializer.deserialize_str(DigestVisitor)
        } else {
            deserializer.deserialize_bytes(DigestVisitor)
        }
    }
}

/// Errors that can occur when working with digests
#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    /// Invalid digest length
    #[error("invalid digest length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected byte count
        expected: usize,
        /// Actual byte count
        actual: usize,
    },

    /// Hex decoding error
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),

    /// Canonical form failed to encode
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityData;
    use crate::normalize::{Normalizer, NormalizerConfig};
    use serde_json::json;

    fn form(label: &str) -> CanonicalForm {
        let entity = EntityData::new("page", "1").with_field("label", json!(label));
        Normalizer::new(NormalizerConfig::default()).normalize(&entity)
    }

    #[test]
    fn digest_deterministic() {
        let h1 = Digest::of_canonical(&form("Hello")).unwrap();
        let h2 = Digest::of_canonical(&form("Hello")).unwrap();
        assert_eq!(h1, h2);
    }

    #[test]
    fn digest_distinguishes_content() {
        let h1 = Digest::of_canonical(&form("Hello")).unwrap();
        let h2 = Digest::of_canonical(&form("World")).unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn digest_stable_across_reencoding_round_trips() {
        let original = form("Hello");
        let reencoded: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(original.as_value()).unwrap()).unwrap();
        assert_eq!(
            Digest::compute(&serde_json::to_vec(&reencoded).unwrap()),
            Digest::of_canonical(&original).unwrap()
        );
    }

    #[test]
    fn multibyte_delimiters_hash_identically_after_round_trip() {
        // Prop expressions exchange the ℞ delimiter between client and
        // server; a round trip through text must not change the digest.
        let entity = EntityData::new("page", "1").with_field("expr", json!("℞string␟heading"));
        let form = Normalizer::new(NormalizerConfig::default()).normalize(&entity);

        let text = serde_json::to_string(form.as_value()).unwrap();
        let back: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            Digest::compute(&serde_json::to_vec(&back).unwrap()),
            Digest::of_canonical(&form).unwrap()
        );
    }

    #[test]
    fn display_and_parse() {
        let digest = Digest::compute(b"test");
        let s = digest.to_string();
        assert_eq!(s.len(), DIGEST_LEN * 2);
        let parsed: Digest = s.parse().unwrap();
        assert_eq!(digest, parsed);
    }

    #[test]
    fn from_slice_rejects_wrong_length() {
        let result = Digest::from_slice(&[0u8; 7]);
        assert!(matches!(
            result,
            Err(DigestError::InvalidLength {
                expected: 8,
                actual: 7
            })
        ));
    }

    #[test]
    fn serde_json_round_trip() {
        let digest = Digest::compute(b"test");
        let json = serde_json::to_string(&digest).unwrap();
        let decoded: Digest = serde_json::from_str(&json).unwrap();
        assert_eq!(digest, decoded);
    }
}
