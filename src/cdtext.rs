/*
    libmirage
    https://github.com/dbalsom/fluxfox

    Copyright 2024-2025 Daniel Balsom

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the “Software”),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    --------------------------------------------------------------------------

    src/cdtext.rs

    CD-TEXT pack codec (C7): encode/decode 18-byte packs across up to 8
    language blocks, each carrying its own size-info packs. See spec.md §4.4.
*/
use crate::error::{MirageError, MirageResult};
use crate::util::crc16_wire;

pub const PACK_SIZE: usize = 18;
pub const MAX_BLOCKS: usize = 8;
const SIZE_INFO_TYPE: u8 = 0x8F;

#[derive(Debug, Clone, Default)]
struct BlockInfo {
    used: bool,
    code: u8,
    charset: u8,
    copyright: bool,
    first_track: u8,
    last_track: u8,
}

#[derive(Debug, Clone)]
struct Record {
    block: usize,
    pack_type: u8,
    track: u8,
    data: Vec<u8>,
}

/// Builds a CD-TEXT pack stream from block metadata plus per-(block, type,
/// track) data records.
#[derive(Debug, Default)]
pub struct CdTextEncoder {
    blocks: [BlockInfo; MAX_BLOCKS],
    records: Vec<Record>,
}

impl CdTextEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_block_info(&mut self, block: usize, code: u8, charset: u8, copyright: bool) -> MirageResult<()> {
        if block >= MAX_BLOCKS {
            return Err(MirageError::language(format!("block {block} out of range (max {MAX_BLOCKS})")));
        }
        self.blocks[block] = BlockInfo {
            used: true,
            code,
            charset,
            copyright,
            first_track: 0,
            last_track: 0,
        };
        Ok(())
    }

    fn find_block(&self, code: u8) -> MirageResult<usize> {
        self.blocks
            .iter()
            .position(|b| b.used && b.code == code)
            .ok_or_else(|| MirageError::language(format!("code {code} is not registered to any block")))
    }

    /// Append a data record for the language identified by `code`, inserted
    /// in `(block, pack_type, track)` order to guarantee deterministic
    /// encoder output.
    pub fn add_data(&mut self, code: u8, pack_type: u8, track: u8, data: &[u8]) -> MirageResult<()> {
        let block = self.find_block(code)?;
        let key = (block, pack_type, track);
        let pos = self
            .records
            .partition_point(|r| (r.block, r.pack_type, r.track) < key);
        self.records.insert(
            pos,
            Record {
                block,
                pack_type,
                track,
                data: data.to_vec(),
            },
        );
        let info = &mut self.blocks[block];
        if info.first_track == 0 || track < info.first_track {
            info.first_track = track;
        }
        if track > info.last_track {
            info.last_track = track;
        }
        Ok(())
    }

    /// Emit the encoded pack stream: `18 * total_pack_count` bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let language_codes: [u8; MAX_BLOCKS] = std::array::from_fn(|b| self.blocks[b].code);

        for block in 0..MAX_BLOCKS {
            if !self.blocks[block].used {
                continue;
            }
            let mut pack_counts = [0u32; 16];
            // (pack_type, track, block_with_carry, data)
            let mut packs: Vec<(u8, u8, u8, [u8; 12])> = Vec::new();

            for rec in self.records.iter().filter(|r| r.block == block) {
                let chunks: Vec<&[u8]> = if rec.data.is_empty() {
                    vec![&[][..]]
                } else {
                    rec.data.chunks(12).collect()
                };
                let mut carried = 0usize;
                for (i, chunk) in chunks.iter().enumerate() {
                    let mut data = [0u8; 12];
                    data[..chunk.len()].copy_from_slice(chunk);
                    let carry_nibble = if i == 0 { 0u8 } else { carried.min(15) as u8 };
                    let block_with_carry = ((block as u8) << 4) | carry_nibble;
                    packs.push((rec.pack_type, rec.track, block_with_carry, data));
                    carried += chunk.len();
                    pack_counts[(rec.pack_type - 0x80) as usize] += 1;
                }
            }

            let size_info_start = packs.len();
            for _ in 0..3 {
                packs.push((SIZE_INFO_TYPE, 0, (block as u8) << 4, [0u8; 12]));
            }
            pack_counts[(SIZE_INFO_TYPE - 0x80) as usize] = 3;

            let mut info = [0u8; 36];
            info[0] = self.blocks[block].charset;
            info[1] = self.blocks[block].first_track;
            info[2] = self.blocks[block].last_track;
            info[3] = self.blocks[block].copyright as u8;
            for (i, count) in pack_counts.iter().enumerate() {
                info[4 + i] = (*count).min(255) as u8;
            }
            let mut last_seqnum = [0u8; 8];
            last_seqnum[block] = (packs.len() - 1) as u8;
            info[20..28].copy_from_slice(&last_seqnum);
            info[28..36].copy_from_slice(&language_codes);

            for (i, chunk) in info.chunks(12).enumerate() {
                packs[size_info_start + i].3.copy_from_slice(chunk);
            }

            for (seq, (pack_type, track, block_with_carry, data)) in packs.into_iter().enumerate() {
                let mut first16 = [0u8; 16];
                first16[0] = pack_type;
                first16[1] = track;
                first16[2] = seq as u8;
                first16[3] = block_with_carry;
                first16[4..16].copy_from_slice(&data);
                let crc = crc16_wire(&first16);
                out.extend_from_slice(&first16);
                out.extend_from_slice(&crc);
            }
        }
        out
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct BlockMeta {
    code: u8,
    charset: u8,
    copyright: bool,
    first_track: u8,
    last_track: u8,
}

/// Parses a CD-TEXT pack stream back into per-block data records.
#[derive(Debug)]
pub struct CdTextDecoder {
    records: Vec<Record>,
    meta: [Option<BlockMeta>; MAX_BLOCKS],
}

impl CdTextDecoder {
    pub fn decode(buffer: &[u8]) -> MirageResult<Self> {
        if buffer.len() % PACK_SIZE != 0 {
            return Err(MirageError::language(format!(
                "buffer length {} is not a multiple of the 18-byte pack size",
                buffer.len()
            )));
        }
        let num_packs = buffer.len() / PACK_SIZE;

        for i in 0..num_packs {
            let off = i * PACK_SIZE;
            let expected = crc16_wire(&buffer[off..off + 16]);
            if buffer[off + 16..off + 18] != expected {
                return Err(MirageError::language(format!("pack {i}: CRC mismatch")));
            }
        }

        let mut info_acc: [Vec<u8>; MAX_BLOCKS] = Default::default();
        let mut language_codes = [0u8; MAX_BLOCKS];
        for i in 0..num_packs {
            let off = i * PACK_SIZE;
            if buffer[off] != SIZE_INFO_TYPE {
                continue;
            }
            let block = (buffer[off + 3] >> 4) as usize;
            if info_acc[block].len() < 36 {
                info_acc[block].extend_from_slice(&buffer[off + 4..off + 16]);
            }
        }
        for block in 0..MAX_BLOCKS {
            if info_acc[block].len() >= 36 {
                language_codes.copy_from_slice(&info_acc[block][28..36]);
                break;
            }
        }

        let mut meta: [Option<BlockMeta>; MAX_BLOCKS] = Default::default();
        for block in 0..MAX_BLOCKS {
            if info_acc[block].len() == 36 {
                let info = &info_acc[block];
                meta[block] = Some(BlockMeta {
                    code: language_codes[block],
                    charset: info[0],
                    first_track: info[1],
                    last_track: info[2],
                    copyright: info[3] != 0,
                });
            }
        }

        let mut block_scratch: [Vec<u8>; MAX_BLOCKS] = Default::default();
        let mut block_type = [0u8; MAX_BLOCKS];
        let mut block_track = [0u8; MAX_BLOCKS];
        let mut records = Vec::new();
        for i in 0..num_packs {
            let off = i * PACK_SIZE;
            let pack_type = buffer[off];
            if pack_type == SIZE_INFO_TYPE {
                continue;
            }
            let track = buffer[off + 1];
            let block = (buffer[off + 3] >> 4) as usize;
            let data = &buffer[off + 4..off + 16];

            if pack_type != block_type[block] || track != block_track[block] {
                if !block_scratch[block].is_empty() {
                    records.push(Record {
                        block,
                        pack_type: block_type[block],
                        track: block_track[block],
                        data: std::mem::take(&mut block_scratch[block]),
                    });
                }
                block_type[block] = pack_type;
                block_track[block] = track;
            }
            block_scratch[block].extend_from_slice(data);
        }
        for block in 0..MAX_BLOCKS {
            if !block_scratch[block].is_empty() {
                records.push(Record {
                    block,
                    pack_type: block_type[block],
                    track: block_track[block],
                    data: std::mem::take(&mut block_scratch[block]),
                });
            }
        }
        records.sort_by_key(|r| (r.block, r.pack_type, r.track));

        Ok(CdTextDecoder { records, meta })
    }

    pub fn block_language_code(&self, block: usize) -> Option<u8> {
        self.meta.get(block).copied().flatten().map(|m| m.code)
    }

    /// Walk the sorted record list for `block`, invoking `callback(code,
    /// pack_type, track, data)`; stops early if the callback returns `false`.
    pub fn get_data(&self, block: usize, mut callback: impl FnMut(u8, u8, u8, &[u8]) -> bool) {
        let code = self.block_language_code(block).unwrap_or(0);
        for rec in self.records.iter().filter(|r| r.block == block) {
            if !callback(code, rec.pack_type, rec.track, &rec.data) {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s5_cdtext_roundtrip() {
        let mut enc = CdTextEncoder::new();
        enc.set_block_info(0, 9, 0, false).unwrap();
        enc.add_data(9, 0x80, 1, b"HELLO\0").unwrap();
        enc.add_data(9, 0x80, 2, b"WORLD\0").unwrap();
        let buffer = enc.encode();

        let dec = CdTextDecoder::decode(&buffer).unwrap();
        let mut seen = Vec::new();
        dec.get_data(0, |code, pack_type, track, data| {
            seen.push((code, pack_type, track, data.to_vec()));
            true
        });
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, 9);
        assert_eq!(seen[0].1, 0x80);
        assert_eq!(seen[0].2, 1);
        assert!(seen[0].3.starts_with(b"HELLO\0"));
        assert_eq!(seen[1].2, 2);
        assert!(seen[1].3.starts_with(b"WORLD\0"));
    }

    #[test]
    fn add_data_rejects_unregistered_code() {
        let mut enc = CdTextEncoder::new();
        enc.set_block_info(0, 9, 0, false).unwrap();
        let err = enc.add_data(99, 0x80, 1, b"X\0").unwrap_err();
        assert_eq!(err.kind(), crate::error::MirageErrorKind::Language);
    }

    #[test]
    fn set_block_info_rejects_out_of_range_block() {
        let mut enc = CdTextEncoder::new();
        assert!(enc.set_block_info(8, 9, 0, false).is_err());
    }

    #[test]
    fn every_encoded_pack_has_valid_crc() {
        let mut enc = CdTextEncoder::new();
        enc.set_block_info(0, 9, 0, false).unwrap();
        enc.add_data(9, 0x80, 1, b"TITLE\0").unwrap();
        let buffer = enc.encode();
        assert_eq!(buffer.len() % PACK_SIZE, 0);
        for pack in buffer.chunks(PACK_SIZE) {
            let expected = crc16_wire(&pack[0..16]);
            assert_eq!(&pack[16..18], &expected);
        }
    }

    #[test]
    fn decode_rejects_corrupted_crc() {
        let mut enc = CdTextEncoder::new();
        enc.set_block_info(0, 9, 0, false).unwrap();
        enc.add_data(9, 0x80, 1, b"TITLE\0").unwrap();
        let mut buffer = enc.encode();
        buffer[4] ^= 0xFF;
        assert!(CdTextDecoder::decode(&buffer).is_err());
    }
}
