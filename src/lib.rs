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
*/

//! # libmirage
//!
//! libmirage is a Rust library for reading optical disc images of the kind
//! used by CD/DVD burning and emulation tools: CUE/BIN-style sheets,
//! monolithic container formats, and the compressed/encrypted archive
//! formats built on top of them.
//!
//! A disc image is modeled as a [`disc::Disc`] tree (sessions, tracks,
//! indices, and per-track languages for CD-TEXT), with each track's actual
//! bytes supplied by one or more [`fragment::Fragment`]s that map a
//! track-relative address range onto a byte range of some underlying
//! [`stream::Stream`]. Byte streams are opened through a [`context::Context`],
//! which runs every registered [`context::FilterStream`] against a file in
//! turn until one accepts it — this is how transparent decompression and
//! decryption (see [`filter_stream::daa`]) are layered on top of a plain
//! file without the rest of the crate needing to know about either.
//!
//! [`parser::Parser`] and [`writer::Writer`] are the two format-specific
//! seams: a concrete sheet/container format parser turns a set of streams
//! into a `Disc`, and a writer does the reverse. This crate defines both
//! contracts and the format-independent plumbing around them but does not
//! ship a parser for any one sheet format itself.
pub mod cdtext;
pub mod context;
pub mod disc;
pub mod error;
pub mod filter_stream;
pub mod fragment;
pub mod parser;
pub mod sector;
pub mod stream;
pub mod util;
pub mod writer;

pub use crate::context::{Context, DebugLevel, DebugMask, FilterStream, OptionValue};
pub use crate::disc::session::Session;
pub use crate::disc::track::Track;
pub use crate::disc::{Disc, MediumType};
pub use crate::error::{MirageError, MirageErrorKind, MirageResult};
pub use crate::fragment::{Fragment, SharedStream};
pub use crate::parser::{load_image, Parser, ParserInfo};
pub use crate::sector::Sector;
pub use crate::stream::{BoxedStream, FileStream, SeekFrom, Stream};
pub use crate::writer::{FragmentRole, Writer, WriterInfo};

/// Sector payload size for the Yellow Book data-track sector kinds this
/// crate codes directly (Mode1 and Mode2 Form1); Form2 and Audio sectors
/// carry 2324 and 2352 bytes of payload respectively and are represented
/// through [`sector::SectorKind`] rather than this constant.
pub const MODE1_USER_DATA_SIZE: usize = 2048;
/// The size of every raw CD sector regardless of kind (sync + header +
/// payload + ECC, or the raw audio frame).
pub const RAW_SECTOR_SIZE: usize = 2352;
/// The size of the interleaved P-W subchannel appended after a raw sector
/// when external/synthesized subchannel data is requested.
pub const SUBCHANNEL_SIZE: usize = 96;
