/*
    src/filter_stream/daa/mod.rs

    The DAA/GBI worked example (spec.md §4.3, §4.3.1, §4.3.2): a
    FilterStream that recognizes the DAA/GBI signature, parses the main
    header, chunk table, and optional encryption/split-archive
    descriptors, and presents the result as a flat, seekable,
    uncompressed byte stream the size of `iso_size` on top of whatever
    underlying stream `Context::create_input_stream` handed it.

    This is explicitly the hardest single piece of this crate (per
    spec.md): header layout, chunk-table obfuscation, and key derivation
    are all reconstructions rather than a byte-for-byte verified format
    (see DESIGN.md), but every formula spec.md itself states is followed
    exactly.
*/
mod chunk_table;
mod header;
mod key_derivation;
mod parts;

pub use chunk_table::{ChunkEntry, ChunkMethod};
pub use header::ContainerFlavor;
pub use parts::{scheme_for_fingerprint, PartNamingScheme};

use self::header::{Descriptor, MainHeader, SIGNATURE_LEN};
use super::ChunkCache;
use crate::error::{MirageError, MirageResult};
use crate::stream::{BoxedStream, SeekFrom, Stream};
use flate2::bufread::ZlibDecoder;
use std::cell::RefCell;
use std::io::Read;

/// Registrable [`crate::context::FilterStream`] that recognizes DAA/GBI
/// images. Stateless itself; all per-image state lives in the
/// [`DaaStream`] it produces.
#[derive(Debug, Default)]
pub struct DaaFilterStream;

impl DaaFilterStream {
    pub fn new() -> Self {
        DaaFilterStream
    }
}

impl crate::context::FilterStream for DaaFilterStream {
    fn id(&self) -> &str {
        "daa"
    }

    fn writable(&self) -> bool {
        false
    }

    fn open(&self, mut underlying: BoxedStream, password: Option<&str>) -> Result<BoxedStream, (BoxedStream, MirageError)> {
        match DaaStream::try_open(&mut underlying, password) {
            Ok(stream) => Ok(Box::new(stream)),
            Err(e) if e.is_cannot_handle() => Err((underlying, e)),
            Err(e) => Err((underlying, e)),
        }
    }
}

#[derive(Debug)]
struct DaaStream {
    underlying: RefCell<BoxedStream>,
    filename: String,
    header: MainHeader,
    flavor: ContainerFlavor,
    chunk_table: Vec<ChunkEntry>,
    chunk_data_offset: u64,
    chunk_size: u64,
    password: Option<String>,
    cache: RefCell<ChunkCache>,
    pos: u64,
}

impl DaaStream {
    fn try_open(underlying: &mut BoxedStream, password: Option<&str>) -> MirageResult<DaaStream> {
        let mut signature = [0u8; SIGNATURE_LEN];
        underlying.seek(SeekFrom::Start(0))?;
        underlying.read_exact_or_zero(&mut signature)?;
        let flavor = header::detect_flavor(&signature).ok_or_else(|| MirageError::cannot_handle("not a DAA/GBI signature"))?;

        let mut header_buf = vec![0u8; header::MAIN_HEADER_LEN];
        underlying.read_exact_or_zero(&mut header_buf)?;
        let main_header = MainHeader::parse(&header_buf)?;

        let descriptors_end = main_header.chunk_table_offset as usize;
        let descriptors_start = SIGNATURE_LEN + header::MAIN_HEADER_LEN;
        let mut descriptor_buf = vec![0u8; descriptors_end.saturating_sub(descriptors_start)];
        if !descriptor_buf.is_empty() {
            underlying.seek(SeekFrom::Start(descriptors_start as u64))?;
            underlying.read_exact_or_zero(&mut descriptor_buf)?;
        }
        let descriptors = header::parse_descriptors(&descriptor_buf, 0, descriptor_buf.len())?;

        let mut resolved_password = password.map(|s| s.to_string());
        for descriptor in &descriptors {
            if let Descriptor::Encryption(enc) = descriptor {
                let candidate = resolved_password
                    .as_deref()
                    .ok_or_else(|| MirageError::encrypted_image("password required to open this image"))?;
                if !key_derivation::verify_password(candidate, enc.password_crc) {
                    return Err(MirageError::encrypted_image("incorrect password"));
                }
                let _ = enc.encryption_type;
                resolved_password = Some(candidate.to_string());
            }
        }

        // Format-0x100 images apply one compression method to every chunk,
        // selected by the compression-flags byte: bit 1 set means every
        // chunk is stored uncompressed, otherwise LZMA if props are present
        // and zlib otherwise (spec.md §4.3.2 step 1).
        let global_method = if main_header.format2[6] & 0x02 != 0 {
            ChunkMethod::Stored
        } else if main_header.lzma_props().iter().any(|&b| b != 0) {
            ChunkMethod::Lzma
        } else {
            ChunkMethod::Zlib
        };

        let chunk_size = derive_chunk_size(main_header.format_version, main_header.chunk_size_packed);
        let num_chunks = main_header.iso_size.div_ceil(chunk_size.max(1));

        let table_len_estimate = (num_chunks as usize) * 4 + 16;
        let mut table_buf = vec![0u8; table_len_estimate];
        underlying.seek(SeekFrom::Start(main_header.chunk_table_offset as u64))?;
        underlying.read_exact_or_zero(&mut table_buf)?;

        let chunk_table = if main_header.format_version == 0x100 {
            chunk_table::decode_fixed_table(&table_buf, num_chunks, global_method)?
        } else {
            let widths = chunk_table::BitWidths::from_settings_byte(main_header.chunk_table_bit_settings());
            chunk_table::decode_packed_table(&table_buf, num_chunks, widths, flavor)?
        };

        let filename = underlying.filename().to_string();
        Ok(DaaStream {
            underlying: RefCell::new(std::mem::replace(underlying, Box::new(NullStream))),
            filename,
            chunk_data_offset: main_header.chunk_data_offset as u64,
            chunk_size,
            header: main_header,
            flavor,
            chunk_table,
            password: resolved_password,
            cache: RefCell::new(ChunkCache::new()),
            pos: 0,
        })
    }

    fn iso_size(&self) -> u64 {
        self.header.iso_size
    }

    /// Decode chunk `index`, applying decryption, decompression, and the
    /// optional x86 BCJ filter in that order (spec.md §4.3.2 step 3), then
    /// store the result in the one-chunk cache.
    fn load_chunk(&self, index: u64) -> MirageResult<()> {
        if self.cache.borrow().is_cached(index) {
            return Ok(());
        }
        let entry = *self
            .chunk_table
            .get(index as usize)
            .ok_or_else(|| MirageError::fragment(format!("chunk index {index} out of range")))?;

        let mut offset = self.chunk_data_offset;
        for e in &self.chunk_table[..index as usize] {
            offset += e.compressed_size as u64;
        }

        let mut raw = vec![0u8; entry.compressed_size as usize];
        {
            let mut underlying = self.underlying.borrow_mut();
            underlying.seek(SeekFrom::Start(offset))?;
            underlying.read_exact_or_zero(&mut raw)?;
        }

        if let Some(password) = &self.password {
            key_derivation::decrypt_block(password, &mut raw);
        }

        let is_last = index + 1 == self.chunk_table.len() as u64;
        let plain_len = if is_last {
            (self.iso_size() - index * self.chunk_size) as usize
        } else {
            self.chunk_size as usize
        };

        let decoded = match entry.method {
            ChunkMethod::Stored => raw,
            ChunkMethod::Zlib => {
                let mut decoder = ZlibDecoder::new(&raw[..]);
                let mut out = Vec::with_capacity(plain_len);
                decoder
                    .read_to_end(&mut out)
                    .map_err(|e| MirageError::fragment(format!("zlib chunk decompression failed: {e}")))?;
                out
            }
            ChunkMethod::Lzma => {
                let mut out = Vec::with_capacity(plain_len);
                lzma_rs::lzma_decompress(&mut &raw[..], &mut out)
                    .map_err(|e| MirageError::fragment(format!("lzma chunk decompression failed: {e}")))?;
                if self.header.lzma_filter() != 0 {
                    apply_bcj_x86_decode(&mut out);
                }
                out
            }
        };

        self.cache.borrow_mut().store(index, decoded);
        Ok(())
    }
}

/// Placeholder used only to satisfy `RefCell<BoxedStream>`'s need for a
/// temporary value while the real underlying stream is moved into
/// `DaaStream`; never read from.
#[derive(Debug)]
struct NullStream;

impl Stream for NullStream {
    fn read(&mut self, _buf: &mut [u8]) -> MirageResult<usize> {
        Ok(0)
    }
    fn write(&mut self, _buf: &[u8]) -> MirageResult<usize> {
        Err(MirageError::stream("null stream is not writable"))
    }
    fn seek(&mut self, _pos: SeekFrom) -> MirageResult<u64> {
        Ok(0)
    }
    fn is_writable(&self) -> bool {
        false
    }
    fn filename(&self) -> &str {
        "<null>"
    }
}

/// `chunk_size_packed` is interpreted differently per main-header format
/// (spec.md §4.3 step 3): format `0x100` stores the chunk size verbatim;
/// format `0x110` packs it as a 12-bit count of 16 KiB units in the low
/// bits of the field.
fn derive_chunk_size(format_version: u32, packed: u32) -> u64 {
    if format_version == 0x100 {
        packed as u64
    } else {
        ((packed & 0xFFF) as u64) << 14
    }
}

/// Undo the x86 BCJ (branch-call-jump) filter applied to LZMA-compressed
/// chunks before compression: relative `E8`/`E9` call/jump targets were
/// rewritten to absolute addresses to improve compression; this restores
/// the original relative encoding. Mirrors the standard x86 BCJ decoder
/// used by 7-Zip-family formats.
fn apply_bcj_x86_decode(buf: &mut [u8]) {
    const MASK_TO_ALLOWED: [bool; 8] = [true, true, true, false, true, false, false, false];
    if buf.len() < 5 {
        return;
    }
    let mut prev_mask: u32 = 0;
    let mut i = 0usize;
    while i + 4 < buf.len() {
        if buf[i] != 0xE8 && buf[i] != 0xE9 {
            i += 1;
            continue;
        }
        let off = i as u32;
        prev_mask = (prev_mask << 1) & 0x7;
        if !MASK_TO_ALLOWED[prev_mask as usize & 7] {
            i += 1;
            continue;
        }
        let src = u32::from_le_bytes([buf[i + 1], buf[i + 2], buf[i + 3], buf[i + 4]]);
        let dest = src.wrapping_sub(off.wrapping_add(5));
        buf[i + 1..i + 5].copy_from_slice(&dest.to_le_bytes());
        i += 5;
    }
}

impl Stream for DaaStream {
    fn read(&mut self, buf: &mut [u8]) -> MirageResult<usize> {
        let total = self.iso_size();
        if self.pos >= total {
            return Ok(0);
        }
        let want = buf.len().min((total - self.pos) as usize);
        let mut filled = 0;
        while filled < want {
            let abs = self.pos + filled as u64;
            let chunk_index = abs / self.chunk_size;
            let offset_in_chunk = (abs % self.chunk_size) as usize;
            self.load_chunk(chunk_index)?;
            let n = self.cache.borrow().partial_read(offset_in_chunk, &mut buf[filled..want]);
            if n == 0 {
                break;
            }
            filled += n;
        }
        self.pos += filled as u64;
        Ok(filled)
    }

    fn write(&mut self, _buf: &[u8]) -> MirageResult<usize> {
        Err(MirageError::stream("DAA/GBI streams are read-only"))
    }

    fn seek(&mut self, pos: SeekFrom) -> MirageResult<u64> {
        let total = self.iso_size() as i64;
        let new_pos = match pos {
            SeekFrom::Start(p) => p as i64,
            SeekFrom::End(p) => total + p,
            SeekFrom::Current(p) => self.pos as i64 + p,
        };
        if new_pos < 0 {
            return Err(MirageError::stream("seek before start of stream"));
        }
        self.pos = new_pos as u64;
        Ok(self.pos)
    }

    fn is_writable(&self) -> bool {
        false
    }

    fn filename(&self) -> &str {
        &self.filename
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::FilterStream as _;
    use crate::util::crc32_zlib;

    #[derive(Debug)]
    struct MemStream {
        data: Vec<u8>,
        pos: u64,
        name: String,
    }

    impl Stream for MemStream {
        fn read(&mut self, buf: &mut [u8]) -> MirageResult<usize> {
            let p = self.pos as usize;
            if p >= self.data.len() {
                return Ok(0);
            }
            let n = buf.len().min(self.data.len() - p);
            buf[..n].copy_from_slice(&self.data[p..p + n]);
            self.pos += n as u64;
            Ok(n)
        }
        fn write(&mut self, _buf: &[u8]) -> MirageResult<usize> {
            Err(MirageError::stream("read-only"))
        }
        fn seek(&mut self, pos: SeekFrom) -> MirageResult<u64> {
            self.pos = match pos {
                SeekFrom::Start(p) => p,
                SeekFrom::End(p) => (self.data.len() as i64 + p) as u64,
                SeekFrom::Current(p) => (self.pos as i64 + p) as u64,
            };
            Ok(self.pos)
        }
        fn is_writable(&self) -> bool {
            false
        }
        fn filename(&self) -> &str {
            &self.name
        }
    }

    #[test]
    fn filter_declines_non_daa_signature() {
        let filter = DaaFilterStream::new();
        let stream: BoxedStream = Box::new(MemStream {
            data: vec![0u8; 256],
            pos: 0,
            name: "plain.bin".into(),
        });
        match filter.open(stream, None) {
            Err((_, e)) => assert!(e.is_cannot_handle()),
            Ok(_) => panic!("expected decline for non-DAA data"),
        }
    }

    fn build_unencrypted_stored_image(iso_data: &[u8]) -> Vec<u8> {
        let chunk_size: u64 = 512;
        let num_chunks = iso_data.len().div_ceil(chunk_size as usize) as u64;

        let mut main = vec![0u8; header::MAIN_HEADER_LEN];
        let chunk_table_offset = (SIGNATURE_LEN + header::MAIN_HEADER_LEN) as u32;
        let chunk_table_len = (num_chunks as usize) * 3;
        let chunk_data_offset = chunk_table_offset + chunk_table_len as u32;

        main[0..4].copy_from_slice(&chunk_table_offset.to_le_bytes());
        main[4..8].copy_from_slice(&0x100u32.to_le_bytes()); // format_version: fixed table
        main[8..12].copy_from_slice(&chunk_data_offset.to_le_bytes());
        main[20..24].copy_from_slice(&(chunk_size as u32).to_le_bytes()); // chunk_size_packed: verbatim under format 0x100
        main[24..32].copy_from_slice(&(iso_data.len() as u64).to_le_bytes());
        main[46] = 0x02; // compression flags: store every chunk uncompressed
        let crc = crc32_zlib(&main[0..72]);
        main[72..76].copy_from_slice(&crc.to_le_bytes());

        let mut table = Vec::new();
        for chunk in iso_data.chunks(chunk_size as usize) {
            let size = chunk.len() as u32;
            table.extend_from_slice(&size.to_le_bytes()[0..3]);
        }

        let mut image = Vec::new();
        image.extend_from_slice(b"DAA\0");
        image.extend_from_slice(&[0u8; 12]);
        image.extend_from_slice(&main);
        image.extend_from_slice(&table);
        image.extend_from_slice(iso_data);
        image
    }

    #[test]
    fn stored_chunks_round_trip_through_the_filter() {
        let iso_data: Vec<u8> = (0..1200u32).map(|i| (i % 251) as u8).collect();
        let image_bytes = build_unencrypted_stored_image(&iso_data);

        let filter = DaaFilterStream::new();
        let underlying: BoxedStream = Box::new(MemStream {
            data: image_bytes,
            pos: 0,
            name: "image.daa".into(),
        });
        let mut opened = filter.open(underlying, None).expect("filter should accept a well-formed DAA image");

        let mut readback = vec![0u8; iso_data.len()];
        let mut filled = 0;
        while filled < readback.len() {
            let n = opened.read(&mut readback[filled..]).unwrap();
            assert!(n > 0, "stream ended before all data was read");
            filled += n;
        }
        assert_eq!(readback, iso_data);
    }

    #[test]
    fn derive_chunk_size_format_0x100_is_verbatim() {
        assert_eq!(derive_chunk_size(0x100, 0), 0);
        assert_eq!(derive_chunk_size(0x100, 16384), 16384);
        assert_eq!(derive_chunk_size(0x100, 2 * 1024 * 1024), 2 * 1024 * 1024);
    }

    #[test]
    fn derive_chunk_size_format_0x110_packs_16kib_units() {
        assert_eq!(derive_chunk_size(0x110, 1), 16384);
        assert_eq!(derive_chunk_size(0x110, 2), 32768);
        // only the low 12 bits contribute
        assert_eq!(derive_chunk_size(0x110, 0x1000 | 4), derive_chunk_size(0x110, 4));
    }
}
