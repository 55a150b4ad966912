//! Hex SHA-256 digest recorded against each provider entry.

use std::fmt;

const DIGEST_HEX_LEN: usize = 64;

/// A string that is not 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid SHA-256 digest \"{value}\": expected 64 lowercase hex characters")]
pub struct InvalidDigest {
    value: String,
}

/// A lowercase hex SHA-256 digest.
///
/// # Examples
///
/// ```
/// use boxpub::checksum::Sha256Digest;
///
/// let digest = Sha256Digest::try_from("a".repeat(64).as_str()).unwrap();
/// assert_eq!(digest.as_str().len(), 64);
/// assert!(Sha256Digest::try_from("A".repeat(64).as_str()).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sha256Digest(String);

impl Sha256Digest {
    /// The digest as hex.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for Sha256Digest {
    type Error = InvalidDigest;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let is_hex = value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if value.len() == DIGEST_HEX_LEN && is_hex {
            Ok(Self(value.to_owned()))
        } else {
            Err(InvalidDigest {
                value: value.to_owned(),
            })
        }
    }
}

impl fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn accepts_lowercase_hex() {
        let hex = format!("{}{}", "0123456789abcdef".repeat(3), "f".repeat(16));
        let digest = Sha256Digest::try_from(hex.as_str()).expect("valid digest");
        assert_eq!(digest.to_string(), hex);
    }

    #[rstest]
    #[case::too_short("abcdef".to_owned())]
    #[case::too_long("a".repeat(65))]
    #[case::non_hex(format!("{}g", "a".repeat(63)))]
    #[case::uppercase("A".repeat(64))]
    fn rejects_malformed_digests(#[case] value: String) {
        let err = Sha256Digest::try_from(value.as_str()).expect_err("malformed");
        assert!(err.to_string().contains(&value));
    }
}
