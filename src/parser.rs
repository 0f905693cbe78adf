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

    src/parser.rs

    The Parser trait (C9) and its open registry. See spec.md §6.1, §6.3 and
    SPEC_FULL.md §F.6.7 for why the registry is an open `Vec<Box<dyn Parser>>`
    rather than the teacher's closed enum dispatch.
*/
use crate::context::Context;
use crate::disc::Disc;
use crate::error::{MirageError, MirageResult};
use crate::fragment::SharedStream;

/// Static identity for a Parser implementation: id, display name, and the
/// set of MIME types/file extensions it claims, mirroring `ParserInfo` in
/// spec.md §6.1's trait sketch.
#[derive(Debug, Clone)]
pub struct ParserInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub mime_types: &'static [&'static str],
}

/// A format front-end that builds a `Disc` from one or more input streams.
/// Concrete implementations (CUE/TOC/MDS/... parsers) are out of scope for
/// this crate (spec.md §1 Non-goals); callers register their own via
/// [`Context::register_parser`](crate::context::Context::register_parser).
pub trait Parser: std::fmt::Debug {
    fn info(&self) -> ParserInfo;

    /// Attempt to load an image from `streams`. Return
    /// `Err(MirageError::cannot_handle)` if the structural checks at the
    /// front of the image reveal it is not this parser's format, so the
    /// dispatcher can move on to the next registered parser.
    fn load_image(&self, ctx: &Context, streams: &[SharedStream]) -> MirageResult<Disc>;
}

/// Open filenames as input streams through `ctx`, then try every parser
/// registered on `ctx` (via [`Context::register_parser`]) in registration
/// order; the first whose `load_image` returns `Ok` wins. A parser declining
/// with `CannotHandle` is silent; any other error is propagated immediately.
/// If no parser accepts the image, returns `MirageError::no_parser`
/// (spec.md §4.6: "If no parser handles the image, return NoParser.").
pub fn load_image(ctx: &mut Context, filenames: &[&str]) -> MirageResult<Disc> {
    let streams: Vec<SharedStream> = filenames
        .iter()
        .map(|f| ctx.create_input_stream(f))
        .collect::<MirageResult<_>>()?;

    for parser in ctx.parsers() {
        match parser.load_image(ctx, &streams) {
            Ok(disc) => return Ok(disc),
            Err(e) if e.is_cannot_handle() => continue,
            Err(e) => return Err(e),
        }
    }
    Err(MirageError::no_parser("no registered parser accepted the supplied streams"))
}
