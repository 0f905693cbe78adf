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

    src/filter_stream/mod.rs

    The stackable FilterStream chain (C3): the [`crate::context::FilterStream`]
    trait lives on `Context` (it is discovered through `Context`'s stream
    cache), so this module supplies the two things every concrete filter
    needs on top of that trait: a generic one-chunk LRU cache (spec.md §4.3
    "every compressed filter uses a one-chunk LRU cache") and the DAA/GBI
    worked example (§4.3, §4.3.1, §4.3.2) in the `daa` submodule.
*/
pub mod daa;

/// A logical stream of `chunk_size * num_chunks` bytes backed by one
/// decoded chunk at a time. A read at logical position `p` translates to
/// chunk `p / chunk_size`, offset `p % chunk_size`; if the requested chunk
/// differs from the cached one, the caller must decode a fresh chunk and
/// call [`ChunkCache::store`] before [`ChunkCache::read`] can serve it.
/// Deliberately just one slot (spec.md §4.3, §9 "One-chunk cache"): the
/// typical access pattern is sequential, so a richer cache would add
/// complexity without measurable benefit.
#[derive(Debug, Default)]
pub struct ChunkCache {
    cached_index: Option<u64>,
    buffer: Vec<u8>,
}

impl ChunkCache {
    pub fn new() -> Self {
        ChunkCache::default()
    }

    pub fn cached_index(&self) -> Option<u64> {
        self.cached_index
    }

    pub fn is_cached(&self, index: u64) -> bool {
        self.cached_index == Some(index)
    }

    /// Replace the cached chunk. `data` becomes the new inflate buffer.
    pub fn store(&mut self, index: u64, data: Vec<u8>) {
        self.cached_index = Some(index);
        self.buffer = data;
    }

    /// Serve `min(requested, remaining in chunk)` bytes starting at
    /// `offset_in_chunk`, mirroring `partial_read`'s contract: callers loop
    /// to satisfy a read that spans more than one chunk.
    pub fn partial_read(&self, offset_in_chunk: usize, out: &mut [u8]) -> usize {
        if offset_in_chunk >= self.buffer.len() {
            return 0;
        }
        let n = out.len().min(self.buffer.len() - offset_in_chunk);
        out[..n].copy_from_slice(&self.buffer[offset_in_chunk..offset_in_chunk + n]);
        n
    }

    pub fn chunk_len(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_serves_only_what_is_cached() {
        let mut cache = ChunkCache::new();
        assert!(!cache.is_cached(0));
        cache.store(3, vec![1, 2, 3, 4, 5]);
        assert!(cache.is_cached(3));
        assert!(!cache.is_cached(0));

        let mut out = [0u8; 3];
        let n = cache.partial_read(1, &mut out);
        assert_eq!(n, 3);
        assert_eq!(out, [2, 3, 4]);
    }

    #[test]
    fn partial_read_clamps_to_remaining_bytes() {
        let mut cache = ChunkCache::new();
        cache.store(0, vec![9, 9, 9]);
        let mut out = [0u8; 8];
        let n = cache.partial_read(1, &mut out);
        assert_eq!(n, 2);
        assert_eq!(&out[..2], &[9, 9]);
    }
}
