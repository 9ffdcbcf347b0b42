//! Content digest computation.
//!
//! Digests are MD5 hex strings because object-storage services report an
//! object's etag as the MD5 of its payload. The chunk-skip protocol compares
//! a locally computed digest against that remote etag, so the two must agree.

/// Compute the MD5 digest of a byte slice.
///
/// # Arguments
/// * `data` - Bytes to hash
///
/// # Returns
/// 32-character lowercase hex string (128 bits).
pub fn hash_bytes(data: &[u8]) -> String {
    format!("{:032x}", md5::compute(data))
}

/// Streaming hasher for incremental MD5 digests.
///
/// Use this when data arrives in pieces, such as when hashing a byte range
/// read from a file in fixed-size buffers.
pub struct Md5Hasher {
    inner: md5::Context,
}

impl Md5Hasher {
    /// Create a new streaming hasher.
    pub fn new() -> Self {
        Self {
            inner: md5::Context::new(),
        }
    }

    /// Update the hasher with additional data.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.consume(data);
    }

    /// Finalize and return the digest as a 32-char hex string.
    pub fn finish_hex(self) -> String {
        format!("{:032x}", self.inner.compute())
    }
}

impl Default for Md5Hasher {
    fn default() -> Self {
        Self::new()
    }
}
