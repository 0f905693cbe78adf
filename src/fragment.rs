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

    src/fragment.rs

    The Fragment I/O layer (C5): mapping a track-relative sector address to a
    byte range in an underlying stream, per spec.md §4.2.
*/
use crate::error::{MirageError, MirageResult};
use crate::stream::{BoxedStream, SeekFrom, Stream};
use crate::util::{deinterleave_channel, interleave_pw};
use std::cell::RefCell;
use std::rc::Rc;

/// Shared ownership of a stream: Fragments share main/subchannel streams by
/// reference (spec.md §3.2), and the Context's stream cache holds weak
/// references to the same underlying stream.
pub type SharedStream = Rc<RefCell<BoxedStream>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainFormat {
    Data,
    AudioLe,
    AudioBeSwap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubchannelLocation {
    /// Subchannel data is appended immediately after each main-channel
    /// sector within the same stream.
    Internal,
    /// Subchannel data lives in its own stream with its own per-sector size.
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubchannelFormat {
    Pw96Interleaved,
    Pw96Linear,
    Q16,
}

impl SubchannelFormat {
    /// The raw on-stream byte length of one sector's worth of subchannel
    /// data in this format.
    pub fn raw_sector_size(self) -> usize {
        match self {
            SubchannelFormat::Pw96Interleaved | SubchannelFormat::Pw96Linear => 96,
            SubchannelFormat::Q16 => 16,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MainStreamDescriptor {
    pub stream: SharedStream,
    pub sector_size: usize,
    pub format: MainFormat,
    pub file_offset: u64,
}

#[derive(Debug, Clone)]
pub struct SubchannelStreamDescriptor {
    pub stream: SharedStream,
    pub location: SubchannelLocation,
    pub format: SubchannelFormat,
    pub file_offset: u64,
}

#[derive(Debug, Clone)]
pub struct Fragment {
    /// Track-relative start address, in sectors.
    start: u32,
    /// Length in sectors. Derived once from the backing stream if
    /// `rest_of_file` is set.
    length: u32,
    rest_of_file: bool,
    main: Option<MainStreamDescriptor>,
    subchannel: Option<SubchannelStreamDescriptor>,
}

impl Fragment {
    pub fn new(start: u32, length: u32) -> Self {
        Fragment {
            start,
            length,
            rest_of_file: false,
            main: None,
            subchannel: None,
        }
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn set_start(&mut self, start: u32) {
        self.start = start;
    }

    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn set_length(&mut self, length: u32) {
        self.length = length;
        self.rest_of_file = false;
    }

    pub fn set_main_stream(&mut self, desc: MainStreamDescriptor) {
        self.main = Some(desc);
        if self.rest_of_file {
            self.resolve_rest_of_file();
        }
    }

    pub fn set_subchannel_stream(&mut self, desc: SubchannelStreamDescriptor) {
        self.subchannel = Some(desc);
    }

    pub fn has_subchannel(&self) -> bool {
        self.subchannel.is_some()
    }

    /// Flag this fragment as "use rest of file": length is derived once,
    /// from whichever main stream is bound (or immediately, if one already
    /// is).
    pub fn set_use_rest_of_file(&mut self) {
        self.rest_of_file = true;
        if self.main.is_some() {
            self.resolve_rest_of_file();
        }
    }

    fn effective_sector_size(&self) -> usize {
        let main = self.main.as_ref().map(|m| m.sector_size).unwrap_or(0);
        let sub = match &self.subchannel {
            Some(s) if s.location == SubchannelLocation::Internal => s.format.raw_sector_size(),
            _ => 0,
        };
        main + sub
    }

    fn resolve_rest_of_file(&mut self) {
        let Some(main) = self.main.clone() else { return };
        let effective = self.effective_sector_size() as u64;
        if effective == 0 {
            return;
        }
        let stream_size = main.stream.borrow_mut().len().unwrap_or(main.file_offset);
        let remaining = stream_size.saturating_sub(main.file_offset);
        self.length = (remaining / effective) as u32;
    }

    fn check_address(&self, a: u32) -> MirageResult<()> {
        if a >= self.length {
            return Err(MirageError::fragment(format!(
                "sector address {a} out of range [0, {})",
                self.length
            )));
        }
        Ok(())
    }

    fn main_byte_offset(&self, main: &MainStreamDescriptor, a: u32) -> u64 {
        let stride = main.sector_size as u64 + self.internal_subchannel_size() as u64;
        main.file_offset + a as u64 * stride
    }

    fn internal_subchannel_size(&self) -> usize {
        match &self.subchannel {
            Some(s) if s.location == SubchannelLocation::Internal => s.format.raw_sector_size(),
            _ => 0,
        }
    }

    /// Read `main_sector_size` bytes of main-channel data at track-relative
    /// address `a`. Absent a main stream, returns zeros (pregap/postgap
    /// fragments).
    pub fn read_main(&self, a: u32) -> MirageResult<Vec<u8>> {
        self.check_address(a)?;
        let Some(main) = &self.main else {
            // modelled pregap/postgap: size is unknown without a stream, so
            // callers that need a main stream-less fragment read should use
            // `main_sector_size()` themselves to size the zero buffer.
            return Ok(Vec::new());
        };
        let offset = self.main_byte_offset(main, a);
        let mut buf = vec![0u8; main.sector_size];
        let mut stream = main.stream.borrow_mut();
        stream.seek(SeekFrom::Start(offset))?;
        stream.read_exact_or_zero(&mut buf)?;
        drop(stream);
        if main.format == MainFormat::AudioBeSwap {
            byte_swap_pairs(&mut buf);
        }
        Ok(buf)
    }

    pub fn main_sector_size(&self) -> usize {
        self.main.as_ref().map(|m| m.sector_size).unwrap_or(0)
    }

    /// Concatenate every sector's main-channel bytes across the whole
    /// fragment, in address order. Used by `Track::content_hash`.
    pub fn read_all_main(&self) -> MirageResult<Vec<u8>> {
        let mut out = Vec::with_capacity(self.length as usize * self.main_sector_size());
        for a in 0..self.length {
            out.extend(self.read_main(a)?);
        }
        Ok(out)
    }

    /// Write `data` (must be exactly `main_sector_size` bytes) at `a`.
    /// Writes to a fragment without a main stream are silently accepted
    /// no-ops; writes to a read-only main stream fail.
    pub fn write_main(&mut self, a: u32, data: &[u8]) -> MirageResult<()> {
        self.check_address(a)?;
        let Some(main) = &self.main else {
            return Ok(());
        };
        if !main.stream.borrow().is_writable() {
            return Err(MirageError::fragment("InvalidOperation: main stream is read-only"));
        }
        if data.len() != main.sector_size {
            return Err(MirageError::fragment(format!(
                "write_main: expected {} bytes, got {}",
                main.sector_size,
                data.len()
            )));
        }
        let mut payload = data.to_vec();
        if main.format == MainFormat::AudioBeSwap {
            byte_swap_pairs(&mut payload);
        }
        let offset = self.main_byte_offset(main, a);
        let mut stream = main.stream.borrow_mut();
        stream.seek(SeekFrom::Start(offset))?;
        stream.write(&payload)?;
        Ok(())
    }

    fn subchannel_byte_offset(&self, sub: &SubchannelStreamDescriptor, a: u32) -> MirageResult<u64> {
        match sub.location {
            SubchannelLocation::Internal => {
                let main = self
                    .main
                    .as_ref()
                    .ok_or_else(|| MirageError::fragment("internal subchannel requires a main stream"))?;
                Ok(self.main_byte_offset(main, a) + main.sector_size as u64)
            }
            SubchannelLocation::External => Ok(sub.file_offset + a as u64 * sub.format.raw_sector_size() as u64),
        }
    }

    /// Read and canonicalize subchannel data at `a` into the 96-byte
    /// interleaved PW representation, synthesizing nothing (Sector is
    /// responsible for synthesis when no subchannel is present at all).
    pub fn read_subchannel(&self, a: u32) -> MirageResult<Option<[u8; 96]>> {
        self.check_address(a)?;
        let Some(sub) = &self.subchannel else {
            return Ok(None);
        };
        let offset = self.subchannel_byte_offset(sub, a)?;
        let raw_len = sub.format.raw_sector_size();
        let mut raw = vec![0u8; raw_len];
        let stream = match sub.location {
            SubchannelLocation::Internal => self.main.as_ref().unwrap().stream.clone(),
            SubchannelLocation::External => sub.stream.clone(),
        };
        {
            let mut stream = stream.borrow_mut();
            stream.seek(SeekFrom::Start(offset))?;
            stream.read_exact_or_zero(&mut raw)?;
        }
        Ok(Some(raw_to_canonical(sub.format, &raw)))
    }

    /// Write canonical 96-byte interleaved PW subchannel data at `a`,
    /// converting to whatever raw format the underlying stream actually
    /// stores. This fixes the source's latent bug (spec.md §9 Open
    /// Questions #4) where a non-interleaved subchannel format was written
    /// without conversion: here an unconvertible combination is rejected
    /// with `InvalidFormat` instead of corrupting the stream.
    pub fn write_subchannel(&mut self, a: u32, canonical: &[u8; 96]) -> MirageResult<()> {
        self.check_address(a)?;
        let Some(sub) = self.subchannel.clone() else {
            return Ok(());
        };
        let stream = match sub.location {
            SubchannelLocation::Internal => self
                .main
                .as_ref()
                .ok_or_else(|| MirageError::fragment("internal subchannel requires a main stream"))?
                .stream
                .clone(),
            SubchannelLocation::External => sub.stream.clone(),
        };
        if !stream.borrow().is_writable() {
            return Err(MirageError::fragment("InvalidOperation: subchannel stream is read-only"));
        }
        let raw = canonical_to_raw(sub.format, canonical)?;
        let offset = self.subchannel_byte_offset(&sub, a)?;
        let mut stream = stream.borrow_mut();
        stream.seek(SeekFrom::Start(offset))?;
        stream.write(&raw)?;
        Ok(())
    }
}

fn byte_swap_pairs(buf: &mut [u8]) {
    let mut i = 0;
    while i + 1 < buf.len() {
        buf.swap(i, i + 1);
        i += 2;
    }
}

fn raw_to_canonical(format: SubchannelFormat, raw: &[u8]) -> [u8; 96] {
    match format {
        SubchannelFormat::Pw96Interleaved => {
            let mut out = [0u8; 96];
            out.copy_from_slice(&raw[..96]);
            out
        }
        SubchannelFormat::Pw96Linear => {
            let mut channels = [[0u8; 12]; 8];
            for (ch, chunk) in channels.iter_mut().zip(raw.chunks_exact(12)) {
                ch.copy_from_slice(chunk);
            }
            interleave_pw(&channels)
        }
        SubchannelFormat::Q16 => {
            let mut channels = [[0u8; 12]; 8];
            channels[6].copy_from_slice(&raw[0..12]);
            interleave_pw(&channels)
        }
    }
}

fn canonical_to_raw(format: SubchannelFormat, canonical: &[u8; 96]) -> MirageResult<Vec<u8>> {
    match format {
        SubchannelFormat::Pw96Interleaved => Ok(canonical.to_vec()),
        SubchannelFormat::Pw96Linear => {
            let mut raw = Vec::with_capacity(96);
            for ch in 0..8 {
                raw.extend_from_slice(&deinterleave_channel(canonical, ch));
            }
            Ok(raw)
        }
        SubchannelFormat::Q16 => {
            let q = deinterleave_channel(canonical, 6);
            let mut raw = vec![0u8; 16];
            raw[0..12].copy_from_slice(&q);
            Ok(raw)
        }
    }
}
