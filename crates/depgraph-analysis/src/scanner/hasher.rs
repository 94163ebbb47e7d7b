//! Content hashing via xxh3.

use xxhash_rust::xxh3::xxh3_64;

/// Compute the xxh3 64-bit hash of unit content.
#[inline]
pub fn hash_content(content: &[u8]) -> u64 {
    xxh3_64(content)
}

/// Hex form stored in node properties (`content_hash`).
pub fn hash_hex(hash: u64) -> String {
    format!("{hash:016x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_hash() {
        let data = "Процедура Тест()\nКонецПроцедуры".as_bytes();
        assert_eq!(hash_content(data), hash_content(data));
    }

    #[test]
    fn different_content_different_hash() {
        assert_ne!(hash_content(b"hello"), hash_content(b"world"));
    }

    #[test]
    fn hex_is_fixed_width() {
        assert_eq!(hash_hex(0x1f).len(), 16);
    }
}
