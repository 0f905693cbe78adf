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

    src/context.rs

    Carries cross-cutting state (debug mask, typed options, password
    callback, stream caches, format registries) through the object graph
    without globals (C4). See spec.md §4.6.
*/
use crate::error::MirageResult;
use crate::fragment::SharedStream;
use crate::parser::Parser;
use crate::stream::{BoxedStream, FileStream, Stream};
use crate::writer::Writer;
use bitflags::bitflags;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

bitflags! {
    /// Mirrors `MIRAGE_DEBUG_*`. `Error` and `Warning` always print
    /// regardless of mask (see [`Context::debug`]).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DebugMask: u32 {
        const ERROR = 0b0000_0001;
        const WARNING = 0b0000_0010;
        const INFO = 0b0000_0100;
        const PARSER = 0b0000_1000;
        const FILTER_STREAM = 0b0001_0000;
        const WRITER = 0b0010_0000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugLevel {
    Error,
    Warning,
    Info,
    Parser,
    FilterStream,
    Writer,
}

impl DebugLevel {
    fn mask_bit(self) -> DebugMask {
        match self {
            DebugLevel::Error => DebugMask::ERROR,
            DebugLevel::Warning => DebugMask::WARNING,
            DebugLevel::Info => DebugMask::INFO,
            DebugLevel::Parser => DebugMask::PARSER,
            DebugLevel::FilterStream => DebugMask::FILTER_STREAM,
            DebugLevel::Writer => DebugMask::WRITER,
        }
    }

    fn always_prints(self) -> bool {
        matches!(self, DebugLevel::Error | DebugLevel::Warning)
    }
}

/// A typed configuration value (spec.md §6.5). Closed enum rather than
/// `Box<dyn Any>`, matching how the teacher keeps every closed set a plain
/// enum instead of reaching for runtime type erasure.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Bool(bool),
    Str(String),
    Int(i64),
}

/// Something that can decide whether to handle a byte stream (Parser or
/// FilterStream), used by the discovery loops in [`Context::create_input_stream`]
/// and a future `load_image`.
pub trait FilterStream: std::fmt::Debug {
    fn id(&self) -> &str;
    fn writable(&self) -> bool;
    /// Try to wrap `underlying`. On decline (signature/structure doesn't
    /// match this filter) returns the stream back alongside
    /// `MirageError::cannot_handle`, so the discovery loop can offer it to
    /// the next filter. `password` is whatever `Context::password()`
    /// resolved at the start of discovery (spec.md §4.3 step 4: "resolve
    /// the password via the Context's password callback or the `password`
    /// option"); filters that don't need one simply ignore it.
    fn open(&self, underlying: BoxedStream, password: Option<&str>) -> Result<BoxedStream, (BoxedStream, MirageError)>;
}

type StreamCache = HashMap<String, Weak<RefCell<BoxedStream>>>;

/// Cross-cutting state threaded through the object graph: debug mask,
/// options, password callback, the two stream caches, and the open
/// FilterStream registry. Holds no concrete Parser/Writer/FilterStream
/// implementations itself (spec.md's Non-goals exclude concrete formats);
/// callers register their own via [`Context::register_filter_stream`].
pub struct Context {
    name: String,
    mask: DebugMask,
    options: HashMap<String, OptionValue>,
    password_callback: Option<Box<dyn Fn() -> Option<String>>>,
    input_cache: StreamCache,
    output_cache: StreamCache,
    filter_streams: Vec<Box<dyn FilterStream>>,
    parsers: Vec<Box<dyn Parser>>,
    writers: Vec<Box<dyn Writer>>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("name", &self.name)
            .field("mask", &self.mask)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Default for Context {
    fn default() -> Self {
        Context {
            name: String::new(),
            mask: DebugMask::ERROR | DebugMask::WARNING,
            options: HashMap::new(),
            password_callback: None,
            input_cache: HashMap::new(),
            output_cache: HashMap::new(),
            filter_streams: Vec::new(),
            parsers: Vec::new(),
            writers: Vec::new(),
        }
    }
}

impl Context {
    pub fn new(name: impl Into<String>) -> Self {
        Context {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn set_debug_mask(&mut self, mask: DebugMask) {
        self.mask = mask;
    }

    pub fn debug_mask(&self) -> DebugMask {
        self.mask
    }

    /// Forward `message` to the `log` facade if `level` is enabled by the
    /// mask, or unconditionally for `Error`/`Warning`, mirroring
    /// `mirage_debuggable_messagev`'s policy.
    pub fn debug(&self, level: DebugLevel, message: &str) {
        if !level.always_prints() && !self.mask.contains(level.mask_bit()) {
            return;
        }
        match level {
            DebugLevel::Error => log::error!("[{}] {message}", self.name),
            DebugLevel::Warning => log::warn!("[{}] {message}", self.name),
            _ => log::debug!("[{}] {message}", self.name),
        }
    }

    pub fn set_option(&mut self, key: impl Into<String>, value: OptionValue) {
        self.options.insert(key.into(), value);
    }

    pub fn option(&self, key: &str) -> Option<&OptionValue> {
        self.options.get(key)
    }

    pub fn set_password_callback(&mut self, callback: impl Fn() -> Option<String> + 'static) {
        self.password_callback = Some(Box::new(callback));
    }

    /// Returns a password: the `password` option if set, else the callback's
    /// result, else `None`.
    pub fn password(&self) -> Option<String> {
        if let Some(OptionValue::Str(s)) = self.options.get("password") {
            return Some(s.clone());
        }
        self.password_callback.as_ref().and_then(|cb| cb())
    }

    pub fn register_filter_stream(&mut self, filter: Box<dyn FilterStream>) {
        self.filter_streams.push(filter);
    }

    /// Register a format front-end, tried in registration order by
    /// [`crate::parser::load_image`] (spec.md §6.3, SPEC_FULL.md §F.6.7: the
    /// open registry this crate uses in place of the teacher's closed
    /// `DiskImageFileFormat` dispatch).
    pub fn register_parser(&mut self, parser: Box<dyn Parser>) {
        self.parsers.push(parser);
    }

    pub fn parsers(&self) -> &[Box<dyn Parser>] {
        &self.parsers
    }

    /// Register a format back-end (spec.md §6.2, SPEC_FULL.md §F.6.7); callers
    /// pick one from [`Context::writers`] by matching on its [`WriterInfo`](crate::writer::WriterInfo).
    pub fn register_writer(&mut self, writer: Box<dyn Writer>) {
        self.writers.push(writer);
    }

    pub fn writers(&self) -> &[Box<dyn Writer>] {
        &self.writers
    }

    /// Open `filename` as an input stream: return the cached instance if
    /// still alive, otherwise open a file-backed stream and try every
    /// registered FilterStream against it in registration order, stopping
    /// at the first that accepts (chain-of-responsibility discovery).
    pub fn create_input_stream(&mut self, filename: &str) -> MirageResult<SharedStream> {
        if let Some(shared) = self.input_cache.get(filename).and_then(Weak::upgrade) {
            return Ok(shared);
        }

        let mut stream: BoxedStream = Box::new(FileStream::open_read(filename)?);
        let password = self.password();
        // Repeatedly offer the current head-of-stack to every registered
        // filter until none of them accept it (chain-of-responsibility
        // discovery, so e.g. a compression filter can itself be wrapped by
        // an encryption filter on top).
        loop {
            let mut accepted = false;
            for filter in &self.filter_streams {
                match filter.open(stream, password.as_deref()) {
                    Ok(wrapped) => {
                        stream = wrapped;
                        accepted = true;
                        break;
                    }
                    Err((returned, e)) if e.is_cannot_handle() => stream = returned,
                    Err((_, e)) => return Err(e),
                }
            }
            if !accepted {
                break;
            }
        }

        let shared: SharedStream = Rc::new(RefCell::new(stream));
        self.input_cache.insert(filename.to_string(), Rc::downgrade(&shared));
        Ok(shared)
    }

    pub fn create_output_stream(&mut self, filename: &str) -> MirageResult<SharedStream> {
        if let Some(shared) = self.output_cache.get(filename).and_then(Weak::upgrade) {
            return Ok(shared);
        }
        let stream: BoxedStream = Box::new(FileStream::open_read_write(filename)?);
        let shared: SharedStream = Rc::new(RefCell::new(stream));
        self.output_cache.insert(filename.to_string(), Rc::downgrade(&shared));
        Ok(shared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_option_takes_priority_over_callback() {
        let mut ctx = Context::new("test");
        ctx.set_password_callback(|| Some("from-callback".to_string()));
        ctx.set_option("password", OptionValue::Str("from-option".to_string()));
        assert_eq!(ctx.password().as_deref(), Some("from-option"));
    }

    #[test]
    fn password_falls_back_to_callback() {
        let mut ctx = Context::new("test");
        ctx.set_password_callback(|| Some("from-callback".to_string()));
        assert_eq!(ctx.password().as_deref(), Some("from-callback"));
    }

    #[test]
    fn no_password_source_returns_none() {
        let ctx = Context::new("test");
        assert_eq!(ctx.password(), None);
    }

    #[test]
    fn debug_mask_gates_info_but_not_warning() {
        let mut ctx = Context::new("test");
        ctx.set_debug_mask(DebugMask::ERROR | DebugMask::WARNING);
        assert!(ctx.debug_mask().contains(DebugMask::WARNING));
        assert!(!ctx.debug_mask().contains(DebugMask::INFO));
        // Exercised for side effects only (forwarding to `log`); nothing to
        // assert beyond "does not panic" since level gating is private.
        ctx.debug(DebugLevel::Info, "suppressed");
        ctx.debug(DebugLevel::Warning, "always printed");
    }

    #[test]
    fn parser_and_writer_registries_preserve_registration_order() {
        use crate::disc::Disc;
        use crate::disc::MediumType;
        use crate::error::MirageResult;
        use crate::fragment::{Fragment, SharedStream};
        use crate::writer::{FragmentRole, WriterInfo};
        use std::path::Path;

        #[derive(Debug)]
        struct NoopParser(u8);
        impl crate::parser::Parser for NoopParser {
            fn info(&self) -> crate::parser::ParserInfo {
                crate::parser::ParserInfo {
                    id: "noop",
                    name: "Noop",
                    version: "0.0",
                    description: "",
                    mime_types: &[],
                }
            }
            fn load_image(&self, _ctx: &Context, _streams: &[SharedStream]) -> MirageResult<Disc> {
                Err(MirageError::cannot_handle("noop"))
            }
        }
        #[derive(Debug)]
        struct NoopWriter(u8);
        impl Writer for NoopWriter {
            fn info(&self) -> WriterInfo {
                WriterInfo {
                    id: "noop",
                    name: "Noop",
                    version: "0.0",
                    description: "",
                }
            }
            fn open_image(&mut self, _filename: &Path) -> MirageResult<Disc> {
                Ok(Disc::new(MediumType::Cd))
            }
            fn create_fragment(&mut self, _session: u8, _track: u8, _role: FragmentRole) -> MirageResult<Fragment> {
                Ok(Fragment::new(0, 0))
            }
            fn finalize_image(&mut self) -> MirageResult<()> {
                Ok(())
            }
        }

        let mut ctx = Context::new("test");
        ctx.register_parser(Box::new(NoopParser(1)));
        ctx.register_parser(Box::new(NoopParser(2)));
        ctx.register_writer(Box::new(NoopWriter(1)));
        assert_eq!(ctx.parsers().len(), 2);
        assert_eq!(ctx.writers().len(), 1);
    }

    #[test]
    fn input_stream_cache_returns_same_instance() {
        let mut tmp = std::env::temp_dir();
        tmp.push(format!("libmirage_context_test_{}", std::process::id()));
        std::fs::write(&tmp, b"data").unwrap();

        let mut ctx = Context::new("test");
        let a = ctx.create_input_stream(tmp.to_str().unwrap()).unwrap();
        let b = ctx.create_input_stream(tmp.to_str().unwrap()).unwrap();
        assert!(Rc::ptr_eq(&a, &b));
        std::fs::remove_file(&tmp).ok();
    }
}
