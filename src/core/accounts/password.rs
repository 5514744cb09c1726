//! Salted, iterated SHA-256 password hashes.
//!
//! Stored format: `sha256$<iterations>$<salt>$<digest>` with unpadded
//! base64 for the binary parts.

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

pub const DEFAULT_ITERATIONS: u32 = 10_000;

const SCHEME: &str = "sha256";
const SALT_LEN: usize = 16;

/// Hash `password` with a fresh random salt.
pub fn hash_password(password: &str, iterations: u32) -> String {
    let iterations = iterations.max(1);
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);

    let digest = derive(password.as_bytes(), &salt, iterations);
    format!(
        "{}${}${}${}",
        SCHEME,
        iterations,
        STANDARD_NO_PAD.encode(salt),
        STANDARD_NO_PAD.encode(digest)
    )
}

/// Check `password` against a stored hash. Malformed hashes never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let parts: Vec<&str> = stored.split('$').collect();
    let [scheme, iterations, salt, digest] = parts.as_slice() else {
        return false;
    };
    if *scheme != SCHEME {
        return false;
    }

    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (STANDARD_NO_PAD.decode(salt), STANDARD_NO_PAD.decode(digest))
    else {
        return false;
    };
    if iterations == 0 {
        return false;
    }

    let actual = derive(password.as_bytes(), &salt, iterations);
    constant_time_eq(&actual, &expected)
}

fn derive(password: &[u8], salt: &[u8], iterations: u32) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());

    for _ in 1..iterations {
        let mut hasher = Sha256::new();
        hasher.update(out);
        hasher.update(password);
        out.copy_from_slice(&hasher.finalize());
    }
    out
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
