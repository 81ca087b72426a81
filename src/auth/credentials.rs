//! Credential digests
//!
//! Clients never send a cleartext password; they send a one-way digest and the
//! server stores and compares that string as-is.

use sha2::{Digest, Sha256};

const DIGEST_PREFIX: &str = "sha256:";

/// Returns `sha256:<hex>` for the given cleartext password
pub fn digest_password(password: &str) -> String {
    let digest = Sha256::digest(password.as_bytes());
    format!("{}{:x}", DIGEST_PREFIX, digest)
}
