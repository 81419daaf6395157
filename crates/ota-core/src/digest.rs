//! # Streaming SHA-256 Digests
//!
//! Devices validate a downloaded image against the hex digest returned by the
//! `latest` operation, so the digest must be a pure function of the file's
//! bytes. Files are folded into the hasher in fixed-size chunks; memory use
//! does not grow with artifact size.
//!
//! [`DigestCache`] memoizes digests keyed by (path, size, modification
//! time). Any write to the file changes the key, so a cached answer is
//! always the answer a fresh computation would give.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use parking_lot::Mutex;
use sha2::{Digest, Sha256};

/// Read buffer size for streaming digests.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// A SHA-256 digest of an artifact's full byte content.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sha256Digest([u8; 32]);

impl Sha256Digest {
    /// Wrap raw digest bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw 32-byte digest value.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Return the digest as a 64-character lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl std::fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::fmt::Debug for Sha256Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sha256Digest({})", self.to_hex())
    }
}

/// Digest an in-memory byte slice.
pub fn digest_bytes(bytes: &[u8]) -> Sha256Digest {
    Sha256Digest(Sha256::digest(bytes).into())
}

/// Digest everything a reader yields, one chunk at a time.
///
/// # Errors
///
/// Propagates read errors other than `Interrupted`, which is retried.
pub fn digest_reader<R: Read>(mut reader: R) -> io::Result<Sha256Digest> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => hasher.update(&buf[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(Sha256Digest(hasher.finalize().into()))
}

/// Digest a file, surfacing the I/O error on failure.
///
/// # Errors
///
/// Returns the error from opening or reading the file.
pub fn try_digest_file(path: &Path) -> io::Result<Sha256Digest> {
    digest_reader(File::open(path)?)
}

/// Digest a file, or `None` if it does not exist or cannot be read.
///
/// "Missing" and "unreadable" are deliberately not distinguished here; use
/// [`try_digest_file`] when the difference matters.
pub fn digest_file(path: &Path) -> Option<Sha256Digest> {
    try_digest_file(path).ok()
}

#[derive(Debug, Clone, Copy)]
struct CachedDigest {
    len: u64,
    modified: SystemTime,
    digest: Sha256Digest,
}

/// Digest memo keyed by (path, size, modification time).
///
/// One entry per path; a lookup whose size or mtime disagrees with the stored
/// entry is a miss and the recomputed digest replaces it. Files without a
/// modification time are never cached. The lock is held only for map
/// access, never while hashing.
#[derive(Debug, Default)]
pub struct DigestCache {
    entries: Mutex<HashMap<PathBuf, CachedDigest>>,
}

impl DigestCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached digest for this file state, or compute and store it.
    ///
    /// # Errors
    ///
    /// Propagates the error from `compute`; failures are not cached.
    pub fn get_or_compute(
        &self,
        path: &Path,
        len: u64,
        modified: Option<SystemTime>,
        compute: impl FnOnce() -> io::Result<Sha256Digest>,
    ) -> io::Result<Sha256Digest> {
        let Some(modified) = modified else {
            return compute();
        };

        if let Some(hit) = self.entries.lock().get(path) {
            if hit.len == len && hit.modified == modified {
                return Ok(hit.digest);
            }
        }

        let digest = compute()?;
        self.entries.lock().insert(
            path.to_path_buf(),
            CachedDigest {
                len,
                modified,
                digest,
            },
        );
        Ok(digest)
    }

    /// Number of cached paths.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;
    use std::time::Duration;

    // SHA-256 of the empty string and of "abc" (FIPS 180-2 test vectors).
    const EMPTY_HEX: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
    const ABC_HEX: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

    #[test]
    fn known_vectors() {
        assert_eq!(digest_bytes(b"").to_hex(), EMPTY_HEX);
        assert_eq!(digest_bytes(b"abc").to_hex(), ABC_HEX);
    }

    #[test]
    fn hex_is_64_lowercase_chars() {
        let hex = digest_bytes(b"firmware").to_hex();
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn reader_matches_one_shot_across_chunk_boundaries() {
        let data: Vec<u8> = (0..(CHUNK_SIZE * 3 + 17)).map(|i| (i % 251) as u8).collect();
        let streamed = digest_reader(std::io::Cursor::new(&data)).unwrap();
        assert_eq!(streamed, digest_bytes(&data));
    }

    #[test]
    fn file_digest_matches_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("v1.0.bin");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"abc")
            .unwrap();
        assert_eq!(digest_file(&path).unwrap().to_hex(), ABC_HEX);
        assert_eq!(try_digest_file(&path).unwrap().to_hex(), ABC_HEX);
    }

    #[test]
    fn missing_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        assert!(digest_file(&dir.path().join("nope.bin")).is_none());
        let err = try_digest_file(&dir.path().join("nope.bin")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn display_and_debug_render_hex() {
        let d = digest_bytes(b"abc");
        assert_eq!(d.to_string(), ABC_HEX);
        assert!(format!("{d:?}").contains(ABC_HEX));
    }

    // -- DigestCache --

    #[test]
    fn cache_hits_on_same_key() {
        let cache = DigestCache::new();
        let path = Path::new("/fw/v1.bin");
        let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(100);
        let first = cache
            .get_or_compute(path, 3, Some(mtime), || Ok(digest_bytes(b"abc")))
            .unwrap();
        let second = cache
            .get_or_compute(path, 3, Some(mtime), || panic!("should be cached"))
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn cache_misses_when_mtime_or_size_changes() {
        let cache = DigestCache::new();
        let path = Path::new("/fw/v1.bin");
        let t1 = SystemTime::UNIX_EPOCH + Duration::from_secs(100);
        let t2 = SystemTime::UNIX_EPOCH + Duration::from_secs(200);
        cache
            .get_or_compute(path, 3, Some(t1), || Ok(digest_bytes(b"abc")))
            .unwrap();

        let changed = cache
            .get_or_compute(path, 3, Some(t2), || Ok(digest_bytes(b"xyz")))
            .unwrap();
        assert_eq!(changed, digest_bytes(b"xyz"));

        let resized = cache
            .get_or_compute(path, 4, Some(t2), || Ok(digest_bytes(b"wxyz")))
            .unwrap();
        assert_eq!(resized, digest_bytes(b"wxyz"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn cache_skips_files_without_mtime() {
        let cache = DigestCache::new();
        cache
            .get_or_compute(Path::new("/fw/a"), 1, None, || Ok(digest_bytes(b"a")))
            .unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn cache_does_not_store_failures() {
        let cache = DigestCache::new();
        let mtime = SystemTime::UNIX_EPOCH;
        let err = cache.get_or_compute(Path::new("/fw/a"), 1, Some(mtime), || {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        });
        assert!(err.is_err());
        assert!(cache.is_empty());
        cache.clear();
    }

    proptest! {
        #[test]
        fn digest_is_deterministic(data in proptest::collection::vec(any::<u8>(), 0..4096)) {
            let a = digest_bytes(&data);
            let b = digest_reader(std::io::Cursor::new(&data)).unwrap();
            prop_assert_eq!(a, b);
        }

        #[test]
        fn distinct_inputs_give_distinct_digests(
            a in proptest::collection::vec(any::<u8>(), 0..256),
            b in proptest::collection::vec(any::<u8>(), 0..256),
        ) {
            prop_assume!(a != b);
            prop_assert_ne!(digest_bytes(&a), digest_bytes(&b));
        }
    }
}
