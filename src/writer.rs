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

    src/writer.rs

    The Writer trait (C10): the mirror image of Parser, for producing
    images. See spec.md §6.2 and SPEC_FULL.md §F.4.8. Concrete writers
    (CUE/TOC/... ) are out of scope; this crate only specifies the contract.
*/
use crate::disc::Disc;
use crate::error::MirageResult;
use crate::fragment::Fragment;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct WriterInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
}

/// Which role a newly created Fragment plays within a track, mirroring
/// spec.md §6.2's `FragmentRole`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentRole {
    Data,
    AudioData,
    Pregap,
    Postgap,
}

/// A format back-end that produces an on-disk image from a `Disc`.
/// `finalize_image` is the point at which an implementation should flush
/// any buffered table-of-contents/lead-out data; mirroring the original's
/// comment that `finalize_image` "shouldn't do anything apart from writing
/// out session lead-out/TOC, if applicable."
pub trait Writer: std::fmt::Debug {
    fn info(&self) -> WriterInfo;

    /// Open (creating if necessary) the output image at `filename` and
    /// return a fresh, empty `Disc` to populate via the writer's own
    /// fragment-creation calls.
    fn open_image(&mut self, filename: &Path) -> MirageResult<Disc>;

    /// Allocate a Fragment of the given `role` for `track` within
    /// `session`, bound to whatever underlying stream(s) this writer
    /// manages for the image being produced.
    fn create_fragment(&mut self, session: u8, track: u8, role: FragmentRole) -> MirageResult<Fragment>;

    /// Flush any buffered table-of-contents/lead-out data. Must be called
    /// exactly once, after every fragment has been created and written.
    fn finalize_image(&mut self) -> MirageResult<()>;
}
