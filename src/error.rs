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

    src/error.rs

    Defines the error taxonomy surfaced at the public boundary.
*/

use std::fmt;

/// Coarse error category. Each category carries a free-form message describing
/// what went wrong; there is deliberately no further sub-typing, matching the
/// source library's use of a single error domain with string messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirageErrorKind {
    Library,
    Parser,
    Fragment,
    Disc,
    Language,
    Sector,
    Session,
    Track,
    Stream,
    ImageFile,
    DataFile,
    /// Internal-only: a dispatch participant (Parser / FilterStream) declined
    /// to handle the input. This kind must never escape `load_image` or
    /// `create_input_stream`; see the crate's error-handling policy.
    CannotHandle,
    EncryptedImage,
    Writer,
    /// No registered parser accepted the supplied streams.
    NoParser,
}

/// The single error type returned by every fallible operation in this crate.
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct MirageError {
    pub kind: MirageErrorKind,
    pub message: String,
}

impl MirageError {
    pub fn new(kind: MirageErrorKind, message: impl Into<String>) -> Self {
        let err = MirageError {
            kind,
            message: message.into(),
        };
        // Every error is routed through the log facade at Warning level before
        // being returned to the caller, mirroring the source's policy of never
        // printing directly to stdout/stderr and always going through the
        // debug/warning channel first.
        log::warn!("{err}");
        err
    }

    pub fn kind(&self) -> MirageErrorKind {
        self.kind
    }

    /// True if this error is the internal dispatch-only `CannotHandle` kind.
    pub fn is_cannot_handle(&self) -> bool {
        self.kind == MirageErrorKind::CannotHandle
    }
}

macro_rules! ctor {
    ($name:ident, $kind:ident) => {
        pub fn $name(message: impl Into<String>) -> MirageError {
            MirageError::new(MirageErrorKind::$kind, message)
        }
    };
}

impl MirageError {
    ctor!(library, Library);
    ctor!(parser, Parser);
    ctor!(fragment, Fragment);
    ctor!(disc, Disc);
    ctor!(language, Language);
    ctor!(sector, Sector);
    ctor!(session, Session);
    ctor!(track, Track);
    ctor!(stream, Stream);
    ctor!(image_file, ImageFile);
    ctor!(data_file, DataFile);
    ctor!(encrypted_image, EncryptedImage);
    ctor!(writer, Writer);
    ctor!(no_parser, NoParser);

    pub(crate) fn cannot_handle(message: impl Into<String>) -> MirageError {
        MirageError::new(MirageErrorKind::CannotHandle, message)
    }
}

impl From<std::io::Error> for MirageError {
    fn from(e: std::io::Error) -> Self {
        MirageError::stream(e.to_string())
    }
}

impl fmt::Display for MirageErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

pub type MirageResult<T> = Result<T, MirageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cannot_handle_is_internal_marker() {
        let e = MirageError::cannot_handle("not our signature");
        assert!(e.is_cannot_handle());
    }

    #[test]
    fn display_includes_kind_and_message() {
        let e = MirageError::disc("session 3 not found");
        let s = e.to_string();
        assert!(s.contains("Disc"));
        assert!(s.contains("session 3 not found"));
    }
}
