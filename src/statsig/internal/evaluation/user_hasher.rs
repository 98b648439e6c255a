use std::collections::HashMap;
use std::sync::Mutex;

use sha2::{Digest, Sha256};

const HASH_CACHE_CAPACITY: usize = 1000;

/// First 8 bytes of SHA-256(value), read as a big-endian u64.
pub fn compute_user_hash(value: &str) -> u64 {
    let mut sha256 = Sha256::new();
    sha256.update(value.as_bytes());
    let result = sha256.finalize();

    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&result[..8]);
    u64::from_be_bytes(bytes)
}

/// Memoizes `compute_user_hash`. The cache is dropped wholesale once it fills up; it is never
/// consulted for correctness, only to skip repeated hashing.
pub struct UserHasher {
    cache: Mutex<HashMap<String, u64>>,
}

impl UserHasher {
    pub fn new() -> Self {
        UserHasher {
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn hash(&self, input: &str) -> u64 {
        if let Ok(cache) = self.cache.lock() {
            if let Some(hash) = cache.get(input) {
                return *hash;
            }
        }

        let hash = compute_user_hash(input);

        if let Ok(mut cache) = self.cache.lock() {
            if cache.len() >= HASH_CACHE_CAPACITY {
                cache.clear();
            }
            cache.insert(input.to_string(), hash);
        }

        hash
    }

    #[cfg(test)]
    fn cached_entries(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }
}
