//! Request-addressed cache key generation.

use sha2::{Digest, Sha256};

use crate::Request;

/// Compute the cache key for a method + URL pair.
pub fn compute_cache_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

/// Cache key for a request, ignoring its fragment.
pub fn request_key(request: &Request) -> String {
    compute_cache_key(&request.method, request.cache_url().as_str())
}
