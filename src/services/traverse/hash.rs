//! Streaming content hashes used as file identity.

use sha2::digest::DynDigest;
use sha2::{Digest, Sha256};
use std::fmt::Write;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;

const READ_BUFFER: usize = 64 * 1024;

/// Produces a fresh hasher for every file.
pub type HasherFactory = Arc<dyn Fn() -> Box<dyn DynDigest> + Send + Sync>;

/// SHA-256, the default content hash.
#[must_use]
pub fn sha256() -> Box<dyn DynDigest> {
    Box::new(Sha256::new())
}

#[must_use]
pub fn default_factory() -> HasherFactory {
    Arc::new(sha256)
}

/// Stream the file at `path` through `hasher` and return the lowercase hex digest.
pub fn hash_file(path: &Path, mut hasher: Box<dyn DynDigest>) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut buffer = vec![0u8; READ_BUFFER];

    loop {
        let n = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        hasher.update(&buffer[..n]);
    }

    let digest = hasher.finalize();
    log::trace!("Hashed {}: {} bytes of digest", path.display(), digest.len());
    Ok(to_hex(&digest))
}

#[must_use]
pub fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(&mut out, "{byte:02x}");
    }
    out
}
