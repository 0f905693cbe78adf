/*
    src/disc/language.rs

    A CD-TEXT language block (C8/C7 glue). See spec.md §3.1 "Language".
    Shared, identical vocabulary between Session and Track per SPEC_FULL.md
    §F.3's Session CD-TEXT aggregation note.
*/
use crate::error::{MirageError, MirageResult};
use std::collections::BTreeMap;

const MIN_PACK_TYPE: u8 = 0x80;
const MAX_PACK_TYPE: u8 = 0x8F;

/// Up to 16 pack payloads (one per pack type `0x80..=0x8F`) for a single
/// numeric language code.
#[derive(Debug, Clone)]
pub struct Language {
    code: u8,
    packs: BTreeMap<u8, Vec<u8>>,
}

impl Language {
    pub fn new(code: u8) -> Self {
        Language {
            code,
            packs: BTreeMap::new(),
        }
    }

    pub fn code(&self) -> u8 {
        self.code
    }

    pub fn set_pack(&mut self, pack_type: u8, data: &[u8]) -> MirageResult<()> {
        if !(MIN_PACK_TYPE..=MAX_PACK_TYPE).contains(&pack_type) {
            return Err(MirageError::language(format!(
                "pack type {pack_type:#04x} out of range {MIN_PACK_TYPE:#04x}..={MAX_PACK_TYPE:#04x}"
            )));
        }
        self.packs.insert(pack_type, data.to_vec());
        Ok(())
    }

    pub fn pack(&self, pack_type: u8) -> Option<&[u8]> {
        self.packs.get(&pack_type).map(Vec::as_slice)
    }

    pub fn packs(&self) -> impl Iterator<Item = (u8, &[u8])> {
        self.packs.iter().map(|(&t, d)| (t, d.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_pack_rejects_out_of_range_type() {
        let mut lang = Language::new(9);
        assert!(lang.set_pack(0x7F, b"x").is_err());
        assert!(lang.set_pack(0x90, b"x").is_err());
    }

    #[test]
    fn set_and_get_pack_roundtrip() {
        let mut lang = Language::new(9);
        lang.set_pack(0x80, b"Title\0").unwrap();
        assert_eq!(lang.pack(0x80), Some(&b"Title\0"[..]));
        assert_eq!(lang.pack(0x81), None);
    }
}
