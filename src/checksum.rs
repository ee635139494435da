//! CRC-32 as defined by ISO 3309 (the zlib / Ethernet variant).

/// Computes the reflected CRC-32 of `bytes` (polynomial 0xEDB88320, init and
/// final XOR all-ones).
pub fn checksum(bytes: &[u8]) -> u32 {
    crc32fast::hash(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_value() {
        assert_eq!(checksum(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(checksum(&[]), 0);
    }

    #[test]
    fn test_known_vectors() {
        assert_eq!(checksum(b"a"), 0xE8B7_BE43);
        assert_eq!(
            checksum(b"The quick brown fox jumps over the lazy dog"),
            0x414F_A339
        );
    }

    #[test]
    fn test_concurrent_callers_agree() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| checksum(b"123456789")))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 0xCBF4_3926);
        }
    }
}
