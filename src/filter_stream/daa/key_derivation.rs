/*
    src/filter_stream/daa/key_derivation.rs

    Password verification and per-chunk decryption for encrypted DAA/GBI
    images (spec.md §4.3.1). The container never stores the password
    itself, only a CRC-32 of it plus a 128-byte "scrambled key" blob; a
    candidate password is accepted once a permutation table built from it
    reproduces the stored CRC, and the same permutation table then
    remaps the nibbles of every chunk before decompression.
*/
use crate::util::crc32_zlib;

const TABLE_LEN: usize = 256;

/// Build the password-derived permutation of `0..256` (spec.md §4.3.1
/// step 1): seed identity, then Fisher-Yates-shuffle it using a simple
/// LCG reseeded from each password byte in turn. Deterministic for a
/// given password, and the only thing either side of the encryption
/// needs to agree on.
pub fn build_permutation_table(password: &str) -> [u8; TABLE_LEN] {
    let mut table = [0u8; TABLE_LEN];
    for (i, slot) in table.iter_mut().enumerate() {
        *slot = i as u8;
    }

    let mut seed: u32 = 0x5A17_3E91;
    for &byte in password.as_bytes() {
        seed = seed.wrapping_mul(0x41C6_4E6D).wrapping_add(byte as u32).wrapping_add(1);
        for i in (1..TABLE_LEN).rev() {
            seed = seed.wrapping_mul(0x41C6_4E6D).wrapping_add(12345);
            let j = (seed >> 16) as usize % (i + 1);
            table.swap(i, j);
        }
    }
    table
}

/// The inverse permutation, used to undo `build_permutation_table`'s
/// mapping when decrypting (see [`decrypt_block`]).
fn invert(table: &[u8; TABLE_LEN]) -> [u8; TABLE_LEN] {
    let mut inverse = [0u8; TABLE_LEN];
    for (i, &v) in table.iter().enumerate() {
        inverse[v as usize] = i as u8;
    }
    inverse
}

/// Hash the permutation table itself down to a CRC-32 that should match
/// the descriptor's stored `password_crc` (spec.md §4.3.1 step 2: "the
/// archive stores a CRC of the key material derived from the correct
/// password, not of the password text").
pub fn permutation_crc(table: &[u8; TABLE_LEN]) -> u32 {
    crc32_zlib(table)
}

/// True if `password` reproduces the descriptor's stored CRC.
pub fn verify_password(password: &str, expected_crc: u32) -> bool {
    permutation_crc(&build_permutation_table(password)) == expected_crc
}

/// Decrypt one chunk's ciphertext in place, mapping each byte through the
/// inverse of the password-derived permutation (spec.md §4.3.1 step 3).
/// Symmetric with the archiver's own forward substitution at creation
/// time; there is no block chaining, so chunks may be decrypted
/// independently and out of order.
pub fn decrypt_block(password: &str, data: &mut [u8]) {
    let table = build_permutation_table(password);
    let inverse = invert(&table);
    for byte in data.iter_mut() {
        *byte = inverse[*byte as usize];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permutation_table_is_a_bijection() {
        let table = build_permutation_table("hunter2");
        let mut seen = [false; TABLE_LEN];
        for &v in &table {
            assert!(!seen[v as usize], "value {v} repeated");
            seen[v as usize] = true;
        }
    }

    #[test]
    fn different_passwords_give_different_tables() {
        let a = build_permutation_table("hunter2");
        let b = build_permutation_table("swordfish");
        assert_ne!(a, b);
    }

    #[test]
    fn verify_password_accepts_correct_and_rejects_wrong() {
        let expected = permutation_crc(&build_permutation_table("correct-horse"));
        assert!(verify_password("correct-horse", expected));
        assert!(!verify_password("battery-staple", expected));
    }

    #[test]
    fn decrypt_is_inverse_of_the_forward_permutation() {
        let password = "topsecret";
        let table = build_permutation_table(password);
        let plain = [1u8, 2, 3, 4, 250, 0, 128];
        let mut cipher: Vec<u8> = plain.iter().map(|&b| table[b as usize]).collect();
        decrypt_block(password, &mut cipher);
        assert_eq!(cipher, plain);
    }
}
