//! Streaming SHA-256 checksums for box files.
//!
//! The digest is computed before upload and recorded in the manifest; it is
//! never re-verified against the uploaded object.

mod digest;

pub use digest::{InvalidDigest, Sha256Digest};

use camino::{Utf8Path, Utf8PathBuf};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, Read};

/// Size of the read buffer used while hashing.
const READ_BUFFER_LEN: usize = 64 * 1024;

/// The checksum type written alongside every digest in the manifest.
pub const CHECKSUM_TYPE: &str = "sha256";

/// Errors arising while computing a file checksum.
#[derive(Debug, thiserror::Error)]
pub enum ChecksumError {
    /// The file could not be opened or read to the end.
    #[error("failed to read {path} for checksum: {source}")]
    Read {
        /// The offending file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Compute the SHA-256 digest of the file at `path`.
///
/// # Errors
///
/// Returns [`ChecksumError::Read`] if the file cannot be opened or read.
///
/// # Examples
///
/// ```
/// use boxpub::checksum::compute_sha256;
/// use camino::Utf8PathBuf;
///
/// let dir = tempfile::tempdir().unwrap();
/// let path = Utf8PathBuf::try_from(dir.path().join("empty.box")).unwrap();
/// std::fs::write(&path, b"").unwrap();
///
/// let digest = compute_sha256(&path).unwrap();
/// assert_eq!(
///     digest.as_str(),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
pub fn compute_sha256(path: &Utf8Path) -> Result<Sha256Digest, ChecksumError> {
    let to_error = |source| ChecksumError::Read {
        path: path.to_owned(),
        source,
    };
    let file = fs::File::open(path).map_err(to_error)?;
    sha256_reader(file).map_err(to_error)
}

/// Hash everything `reader` yields, one buffer at a time.
///
/// # Errors
///
/// Propagates any read error other than [`io::ErrorKind::Interrupted`].
pub fn sha256_reader(mut reader: impl Read) -> io::Result<Sha256Digest> {
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; READ_BUFFER_LEN];
    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(buffer.get(..bytes_read).unwrap_or_default());
    }
    let hex = format!("{:x}", hasher.finalize());
    Sha256Digest::try_from(hex.as_str()).map_err(io::Error::other)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn temp_dir() -> TempDir {
        tempfile::tempdir().expect("temp dir")
    }

    fn write_file(dir: &TempDir, name: &str, contents: &[u8]) -> Utf8PathBuf {
        let path = Utf8PathBuf::try_from(dir.path().join(name)).expect("UTF-8 path");
        fs::write(&path, contents).expect("write test file");
        path
    }

    #[rstest]
    fn known_vector_for_abc(temp_dir: TempDir) {
        let path = write_file(&temp_dir, "abc.box", b"abc");
        let digest = compute_sha256(&path).expect("checksum");
        assert_eq!(
            digest.as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[rstest]
    fn repeated_runs_agree(temp_dir: TempDir) {
        let path = write_file(&temp_dir, "stable.box", &vec![7u8; READ_BUFFER_LEN * 3 + 11]);
        let first = compute_sha256(&path).expect("first");
        let second = compute_sha256(&path).expect("second");
        assert_eq!(first, second);
    }

    #[rstest]
    fn single_byte_change_alters_digest(temp_dir: TempDir) {
        let mut contents = vec![0u8; READ_BUFFER_LEN + 5];
        let original = write_file(&temp_dir, "a.box", &contents);
        if let Some(last) = contents.last_mut() {
            *last = 1;
        }
        let changed = write_file(&temp_dir, "b.box", &contents);
        assert_ne!(
            compute_sha256(&original).expect("original"),
            compute_sha256(&changed).expect("changed")
        );
    }

    #[rstest]
    fn file_and_reader_digests_match(temp_dir: TempDir) {
        let contents = b"vagrant box payload".repeat(1000);
        let path = write_file(&temp_dir, "c.box", &contents);
        let from_file = compute_sha256(&path).expect("file digest");
        let from_reader = sha256_reader(contents.as_slice()).expect("reader digest");
        assert_eq!(from_file, from_reader);
    }

    #[rstest]
    fn missing_file_reports_path(temp_dir: TempDir) {
        let path = Utf8PathBuf::try_from(temp_dir.path().join("absent.box")).expect("UTF-8 path");
        let err = compute_sha256(&path).expect_err("missing file must fail");
        assert!(err.to_string().contains("absent.box"));
    }
}
