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

    src/stream/mod.rs

    Defines the Stream trait (C2): the bottom of every I/O chain.
*/
mod file_stream;

pub use file_stream::FileStream;

use crate::error::MirageResult;
use std::fmt::Debug;

/// Random-access read/write/seek on a named resource. This is the bottom of
/// every I/O chain; FilterStream implementors wrap one `Stream` and present
/// another.
pub trait Stream: Debug {
    /// Read up to `buf.len()` bytes starting at the stream's current
    /// position, advancing the position by the number of bytes read. Returns
    /// the number of bytes actually read (0 at end of stream).
    fn read(&mut self, buf: &mut [u8]) -> MirageResult<usize>;

    /// Write `buf.len()` bytes at the stream's current position, advancing
    /// the position. Fails with `Stream("read-only")` if the stream is not
    /// writable.
    fn write(&mut self, buf: &[u8]) -> MirageResult<usize>;

    /// Reposition the stream; `whence` matches `std::io::SeekFrom` semantics
    /// collapsed to an absolute offset by the caller via [`SeekFrom`].
    fn seek(&mut self, pos: SeekFrom) -> MirageResult<u64>;

    /// Current absolute position.
    fn tell(&mut self) -> MirageResult<u64> {
        self.seek(SeekFrom::Current(0))
    }

    /// Whether this stream accepts `write`.
    fn is_writable(&self) -> bool;

    /// The canonical filename backing this stream, used as the Context
    /// stream-cache key.
    fn filename(&self) -> &str;

    /// Total logical length of the stream in bytes.
    fn len(&mut self) -> MirageResult<u64> {
        let cur = self.tell()?;
        let end = self.seek(SeekFrom::End(0))?;
        self.seek(SeekFrom::Start(cur))?;
        Ok(end)
    }

    fn is_empty(&mut self) -> MirageResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Read exactly `buf.len()` bytes, zero-filling any shortfall past the
    /// logical end of stream (used throughout Fragment/Sector reconstruction,
    /// which must never fail just because the backing file is short).
    fn read_exact_or_zero(&mut self, buf: &mut [u8]) -> MirageResult<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read(&mut buf[filled..])?;
            if n == 0 {
                for b in &mut buf[filled..] {
                    *b = 0;
                }
                break;
            }
            filled += n;
        }
        Ok(())
    }
}

/// Mirrors `std::io::SeekFrom` without depending on `std::io::Seek`, since
/// streams here report `MirageError` rather than `std::io::Error`.
#[derive(Debug, Clone, Copy)]
pub enum SeekFrom {
    Start(u64),
    End(i64),
    Current(i64),
}

/// Boxed dynamic stream. The crate is single-threaded and synchronous (see
/// SPEC_FULL.md §5), so streams need not be `Send`/`Sync`; shared ownership
/// is via `Rc<RefCell<_>>` (see [`crate::fragment::SharedStream`]), matching
/// the teacher's `Rc<RefCell<T>>` interior-mutability idiom (src/disk_lock.rs)
/// rather than its `Arc`-based lock types, which exist there only to support
/// multi-threaded GUI tooling this crate has no analogue of.
pub type BoxedStream = Box<dyn Stream>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct MemStream {
        data: Vec<u8>,
        pos: u64,
    }

    impl Stream for MemStream {
        fn read(&mut self, buf: &mut [u8]) -> MirageResult<usize> {
            let pos = self.pos as usize;
            if pos >= self.data.len() {
                return Ok(0);
            }
            let n = buf.len().min(self.data.len() - pos);
            buf[..n].copy_from_slice(&self.data[pos..pos + n]);
            self.pos += n as u64;
            Ok(n)
        }

        fn write(&mut self, buf: &[u8]) -> MirageResult<usize> {
            let pos = self.pos as usize;
            if pos + buf.len() > self.data.len() {
                self.data.resize(pos + buf.len(), 0);
            }
            self.data[pos..pos + buf.len()].copy_from_slice(buf);
            self.pos += buf.len() as u64;
            Ok(buf.len())
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
            true
        }

        fn filename(&self) -> &str {
            "<mem>"
        }
    }

    #[test]
    fn read_exact_or_zero_pads_short_reads() {
        let mut s = MemStream {
            data: vec![1, 2, 3],
            pos: 0,
        };
        let mut buf = [0u8; 5];
        s.read_exact_or_zero(&mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3, 0, 0]);
    }

    #[test]
    fn len_restores_position() {
        let mut s = MemStream {
            data: vec![0; 10],
            pos: 4,
        };
        assert_eq!(s.len().unwrap(), 10);
        assert_eq!(s.tell().unwrap(), 4);
    }
}
