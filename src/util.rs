use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::LazyLock;

use base64::Engine as _;

static ID_GENERATOR: LazyLock<IdGenerator> = LazyLock::new(IdGenerator::new);

struct IdGenerator {
    seed: u128,
    counter: AtomicU64,
}

impl IdGenerator {
    fn new() -> Self {
        let seed_hi = u128::from(fastrand::u64(..));
        let seed_lo = u128::from(fastrand::u64(..));
        Self {
            seed: (seed_hi << 64) | seed_lo,
            counter: AtomicU64::new(1),
        }
    }

    fn next_uuid(&self) -> uuid::Uuid {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        uuid::Uuid::from_u128(self.seed ^ u128::from(seq))
    }
}

/// Process-unique identifier; never repeats within one process.
#[inline]
pub(crate) fn generate_id() -> String {
    ID_GENERATOR.next_uuid().simple().to_string()
}

#[inline]
pub(crate) fn encode_base64(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

#[inline]
pub(crate) fn without_trailing_slash(url: &str) -> &str {
    url.strip_suffix('/').unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_ids_are_distinct() {
        let ids: HashSet<String> = (0..256).map(|_| generate_id()).collect();
        assert_eq!(ids.len(), 256);
    }

    #[test]
    fn test_encode_base64() {
        assert_eq!(encode_base64(b"hello"), "aGVsbG8=");
        assert_eq!(encode_base64(b""), "");
    }

    #[test]
    fn test_without_trailing_slash() {
        assert_eq!(without_trailing_slash("https://gw.test/"), "https://gw.test");
        assert_eq!(without_trailing_slash("https://gw.test"), "https://gw.test");
    }
}
