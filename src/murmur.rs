//! MurmurHash64A, the engine's hash for resource types and names.
//!
//! Every identifier in a bundle is the 64-bit hash of a string with seed 0.
//! The strings themselves are never stored, so the only way back from a
//! hash to a name is to hash candidate strings and compare.

const M: u64 = 0xc6a4_a793_5bd1_e995;
const R: u32 = 47;

/// Compute MurmurHash64A of `data` with the given seed.
///
/// # Examples
///
/// ```
/// use bitsquid_extract::murmur::murmur64a;
///
/// assert_eq!(murmur64a(b"lua", 0), 0xa14e_8dfa_2cd1_17e2);
/// ```
pub fn murmur64a(data: &[u8], seed: u64) -> u64 {
    let mut h = seed ^ (data.len() as u64).wrapping_mul(M);

    let mut blocks = data.chunks_exact(8);
    for block in &mut blocks {
        let mut k = u64::from_le_bytes([
            block[0], block[1], block[2], block[3], block[4], block[5], block[6], block[7],
        ]);
        k = k.wrapping_mul(M);
        k ^= k >> R;
        k = k.wrapping_mul(M);

        h ^= k;
        h = h.wrapping_mul(M);
    }

    let tail = blocks.remainder();
    if !tail.is_empty() {
        for (i, &byte) in tail.iter().enumerate() {
            h ^= u64::from(byte) << (8 * i);
        }
        h = h.wrapping_mul(M);
    }

    h ^= h >> R;
    h = h.wrapping_mul(M);
    h ^= h >> R;
    h
}

/// Hash a string the way the engine hashes resource names.
#[inline]
pub fn hash_str(s: &str) -> u64 {
    murmur64a(s.as_bytes(), 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_hashes_to_zero() {
        assert_eq!(murmur64a(b"", 0), 0);
    }

    #[test]
    fn known_type_hashes() {
        assert_eq!(hash_str("lua"), 0xa14e_8dfa_2cd1_17e2);
        assert_eq!(hash_str("texture"), 0xcd42_38c6_a0c6_9e32);
        assert_eq!(hash_str("package"), 0xad9c_6d9e_d1e5_e77a);
        assert_eq!(hash_str("config"), 0x8264_5835_e6b7_3232);
        assert_eq!(hash_str("unit"), 0xe0a4_8d0b_e9a7_453f);
    }

    #[test]
    fn tail_lengths_are_distinct() {
        // 9 bytes exercises one full block plus a one byte tail.
        assert_eq!(hash_str("animation"), 0x931e_336d_7646_cc26);
        assert_ne!(hash_str("animation"), hash_str("animatio"));
    }

    #[test]
    fn seed_changes_result() {
        assert_ne!(murmur64a(b"unit", 0), murmur64a(b"unit", 1));
    }
}
