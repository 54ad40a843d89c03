//! CRC-32 checksum computation for archive entries
//!
//! Every archive entry records the CRC-32 of its *uncompressed* bytes.
//! The algorithm is the standard IEEE CRC-32 (reflected polynomial
//! 0xEDB88320, initial and final XOR 0xFFFFFFFF), so containers stay
//! readable by generic zip tooling.

use crc32fast::Hasher;

/// CRC-32 of `data`; zero for empty input
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector_check_string() {
        assert_eq!(compute_checksum(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn test_empty_input_is_zero() {
        assert_eq!(compute_checksum(&[]), 0x0000_0000);
    }

    #[test]
    fn test_known_vector_pangram() {
        assert_eq!(
            compute_checksum(b"The quick brown fox jumps over the lazy dog"),
            0x414F_A339
        );
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        let data = b"header initial-state current-state operations";
        let mut hasher = Hasher::new();
        for chunk in data.chunks(7) {
            hasher.update(chunk);
        }
        assert_eq!(hasher.finalize(), compute_checksum(data));
    }

    #[test]
    fn test_single_bit_flip_changes_checksum() {
        let mut data = b"{\"state\":{}}".to_vec();
        let original = compute_checksum(&data);
        data[3] ^= 0x01;
        assert_ne!(original, compute_checksum(&data));
    }
}
