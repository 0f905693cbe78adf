/*
    src/util/msf.rs

    MSF/LBA/BCD helpers (C1). 75 frames per second; the "+150" offset accounts
    for the 2-second pregap before LBA 0 (see spec.md GLOSSARY).
*/

/// A Minute/Second/Frame triplet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Msf {
    pub m: u8,
    pub s: u8,
    pub f: u8,
}

impl Msf {
    pub fn new(m: u8, s: u8, f: u8) -> Self {
        Msf { m, s, f }
    }
}

/// Convert an LBA to an (M, S, F) triplet. When `diff` is true, 150 is added
/// to `lba` first (the "absolute" MSF used in sector headers and Q
/// subchannel absolute addresses); when false, the conversion is a plain
/// division (the "track-relative" MSF used for Q subchannel relative
/// addresses, which must NOT have 150 added per spec.md §4.1).
pub fn lba_to_msf(lba: i32, diff: bool) -> Msf {
    let total = if diff { lba + 150 } else { lba };
    let total = total.max(0);
    let m = total / (60 * 75);
    let s = (total / 75) % 60;
    let f = total % 75;
    Msf::new(m as u8, s as u8, f as u8)
}

/// Inverse of [`lba_to_msf`].
pub fn msf_to_lba(m: u8, s: u8, f: u8, diff: bool) -> i32 {
    let total = (m as i32 * 60 + s as i32) * 75 + f as i32;
    if diff {
        total - 150
    } else {
        total
    }
}

/// Convert a hex (binary) value in `[0, 99]` to its two-nibble BCD encoding.
pub fn hex_to_bcd(hex: u8) -> u8 {
    debug_assert!(hex <= 99, "hex_to_bcd out of range: {hex}");
    ((hex / 10) << 4) | (hex % 10)
}

/// Convert a BCD-encoded byte back to its hex (binary) value.
pub fn bcd_to_hex(bcd: u8) -> u8 {
    ((bcd >> 4) * 10) + (bcd & 0x0F)
}

/// Encode an MSF triplet as three BCD bytes.
pub fn msf_to_bcd(msf: Msf) -> [u8; 3] {
    [hex_to_bcd(msf.m), hex_to_bcd(msf.s), hex_to_bcd(msf.f)]
}

/// Decode three BCD bytes into an MSF triplet.
pub fn bcd_to_msf(bytes: [u8; 3]) -> Msf {
    Msf::new(bcd_to_hex(bytes[0]), bcd_to_hex(bytes[1]), bcd_to_hex(bytes[2]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invariant_5_msf_lba_roundtrip() {
        // For every (m, s, f) with m < 100, s < 60, f < 75:
        // lba_to_msf(msf_to_lba(m, s, f, diff=true), diff=true) == (m, s, f)
        for m in 0u8..100 {
            for s in 0u8..60 {
                for f in 0u8..75 {
                    let lba = msf_to_lba(m, s, f, true);
                    let back = lba_to_msf(lba, true);
                    assert_eq!(back, Msf::new(m, s, f), "m={m} s={s} f={f} lba={lba}");
                }
            }
        }
    }

    #[test]
    fn invariant_6_bcd_hex_roundtrip() {
        for hex in 0u8..=99 {
            assert_eq!(bcd_to_hex(hex_to_bcd(hex)), hex);
        }
    }

    #[test]
    fn s2_header_msf_for_lba_16() {
        // S2: Header bytes at [12..16) equal 00 00 10 01 (MSF of LBA 166 = 00:02:16 BCD, mode 1).
        let msf = lba_to_msf(16 + 150, false);
        assert_eq!(msf, Msf::new(0, 2, 16));
        let bcd = msf_to_bcd(msf);
        assert_eq!(bcd, [0x00, 0x02, 0x16]);
    }
}
