/*
    src/stream/file_stream.rs

    File-backed Stream (C2). Grounded on the teacher's pattern of wrapping a
    plain `std::fs::File` with a canonical-filename field used as a cache key
    (see Context's stream cache, C4).
*/
use crate::error::{MirageError, MirageResult};
use crate::stream::{SeekFrom as MirageSeekFrom, Stream};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom as IoSeekFrom, Write};
use std::path::Path;

#[derive(Debug)]
pub struct FileStream {
    file: File,
    filename: String,
    writable: bool,
}

impl FileStream {
    /// Open `path` read-only.
    pub fn open_read(path: impl AsRef<Path>) -> MirageResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| MirageError::stream(format!("{}: {e}", path.display())))?;
        Ok(FileStream {
            file,
            filename: canonical_name(path),
            writable: false,
        })
    }

    /// Open `path` for read-write, creating it if it does not exist.
    pub fn open_read_write(path: impl AsRef<Path>) -> MirageResult<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)
            .map_err(|e| MirageError::stream(format!("{}: {e}", path.display())))?;
        Ok(FileStream {
            file,
            filename: canonical_name(path),
            writable: true,
        })
    }
}

fn canonical_name(path: &Path) -> String {
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

impl Stream for FileStream {
    fn read(&mut self, buf: &mut [u8]) -> MirageResult<usize> {
        self.file.read(buf).map_err(MirageError::from)
    }

    fn write(&mut self, buf: &[u8]) -> MirageResult<usize> {
        if !self.writable {
            return Err(MirageError::stream("stream is read-only"));
        }
        self.file.write(buf).map_err(MirageError::from)
    }

    fn seek(&mut self, pos: MirageSeekFrom) -> MirageResult<u64> {
        let io_pos = match pos {
            MirageSeekFrom::Start(p) => IoSeekFrom::Start(p),
            MirageSeekFrom::End(p) => IoSeekFrom::End(p),
            MirageSeekFrom::Current(p) => IoSeekFrom::Current(p),
        };
        self.file.seek(io_pos).map_err(MirageError::from)
    }

    fn is_writable(&self) -> bool {
        self.writable
    }

    fn filename(&self) -> &str {
        &self.filename
    }
}
