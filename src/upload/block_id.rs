//! Deterministic block identifiers.
//!
//! A block-blob store requires every identifier within one object to have
//! the same length, so the index is zero-padded to eleven decimal digits
//! before base64 encoding. Identifiers therefore sort in upload order.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt;

/// Width of the zero-padded decimal index.
pub const INDEX_WIDTH: usize = 11;

/// Errors raised when decoding a block identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid block identifier \"{value}\": {reason}")]
pub struct InvalidBlockId {
    value: String,
    reason: String,
}

/// The base64 identifier of one uploaded block.
///
/// # Examples
///
/// ```
/// use boxpub::upload::BlockId;
///
/// let id = BlockId::for_index(0);
/// assert_eq!(id.as_str(), "MDAwMDAwMDAwMDA=");
/// assert_eq!(id.index().unwrap(), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlockId(String);

impl BlockId {
    /// Build the identifier for the block at `index`.
    #[must_use]
    pub fn for_index(index: u64) -> Self {
        let padded = format!("{index:0width$}", width = INDEX_WIDTH);
        Self(STANDARD.encode(padded))
    }

    /// Accept an encoded identifier produced by [`Self::for_index`].
    ///
    /// # Errors
    ///
    /// Returns [`InvalidBlockId`] if `encoded` does not decode to an
    /// eleven-digit index.
    pub fn parse(encoded: &str) -> Result<Self, InvalidBlockId> {
        let id = Self(encoded.to_owned());
        id.padded_index()?;
        Ok(id)
    }

    /// Return the encoded identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode the identifier back to the zero-padded index text.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidBlockId`] if the identifier is not base64 or does not
    /// wrap an eleven-digit decimal string.
    pub fn padded_index(&self) -> Result<String, InvalidBlockId> {
        let invalid = |reason: String| InvalidBlockId {
            value: self.0.clone(),
            reason,
        };
        let bytes = STANDARD.decode(&self.0).map_err(|e| invalid(e.to_string()))?;
        let text = String::from_utf8(bytes).map_err(|e| invalid(e.to_string()))?;
        if text.len() != INDEX_WIDTH || !text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid(format!(
                "expected {INDEX_WIDTH} decimal digits, got \"{text}\""
            )));
        }
        Ok(text)
    }

    /// Decode the identifier back to its numeric index.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidBlockId`] under the same conditions as
    /// [`Self::padded_index`].
    pub fn index(&self) -> Result<u64, InvalidBlockId> {
        let text = self.padded_index()?;
        text.parse().map_err(|e: std::num::ParseIntError| InvalidBlockId {
            value: self.0.clone(),
            reason: e.to_string(),
        })
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BlockId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, "00000000000")]
    #[case(7, "00000000007")]
    #[case(1234, "00000001234")]
    #[case(99_999_999_999, "99999999999")]
    fn decodes_to_padded_index(#[case] index: u64, #[case] padded: &str) {
        let id = BlockId::for_index(index);
        assert_eq!(id.padded_index().expect("decodes"), padded);
        assert_eq!(id.index().expect("decodes"), index);
    }

    #[test]
    fn identifiers_share_one_length() {
        let lengths: Vec<usize> = [0, 9, 10, 4096, 1_000_000]
            .into_iter()
            .map(|i| BlockId::for_index(i).as_str().len())
            .collect();
        assert!(lengths.windows(2).all(|w| w.first() == w.last()));
    }

    #[test]
    fn identifiers_are_unique_and_increasing() {
        let ids: Vec<BlockId> = (0..200).map(BlockId::for_index).collect();
        let indices: Vec<u64> = ids.iter().map(|id| id.index().expect("decodes")).collect();
        assert!(indices.windows(2).all(|w| w.first() < w.last()));
        let unique: std::collections::HashSet<&str> = ids.iter().map(BlockId::as_str).collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn rejects_foreign_identifier() {
        let id = BlockId(STANDARD.encode("block-one"));
        assert!(id.index().is_err());
        assert!(BlockId::parse("not base64!").is_err());
    }

    #[test]
    fn parse_accepts_generated_identifier() {
        let id = BlockId::for_index(42);
        assert_eq!(BlockId::parse(id.as_str()), Ok(id));
    }
}
