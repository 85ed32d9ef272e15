use crate::config::parent_dir;
use crate::error::{Error, Result};
use crate::record_codec_util::{decode_all, Record};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, ErrorKind, Read, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::warn;

const STREAM_BUFFER_SIZE: usize = 1 << 16;

/// Sequential reader over a record file with one decoded value of lookahead.
///
/// The reader is primed on open, so `peek` is the current value and `advance`
/// moves to the next one. Trailing bytes that cannot form a whole record end
/// the stream and are counted in `dropped_bytes`.
pub struct RecordReader<R: Record> {
    path: PathBuf,
    reader: BufReader<File>,
    window: Vec<u8>,
    current: Option<R>,
    records_read: u64,
    dropped_bytes: usize,
}

impl<R: Record> RecordReader<R> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        let mut ret = Self {
            path: path.to_path_buf(),
            reader: BufReader::with_capacity(STREAM_BUFFER_SIZE, file),
            window: vec![0u8; R::SIZE],
            current: None,
            records_read: 0,
            dropped_bytes: 0,
        };
        ret.advance()?;
        Ok(ret)
    }

    #[inline]
    pub fn peek(&self) -> Option<R> {
        self.current
    }

    /// Replaces the current value with the next record, or `None` at the end.
    pub fn advance(&mut self) -> Result<()> {
        let filled = self.fill_window()?;
        self.current = if filled == R::SIZE {
            self.records_read += 1;
            R::decode(&self.window)
        } else {
            if filled > 0 {
                self.dropped_bytes = filled;
                warn!(
                    path = ?self.path,
                    bytes = filled,
                    "dropping trailing partial record"
                );
            }
            None
        };
        Ok(())
    }

    /// Records decoded so far, including the current one.
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    pub fn dropped_bytes(&self) -> usize {
        self.dropped_bytes
    }

    fn fill_window(&mut self) -> Result<usize> {
        let mut filled = 0;
        while filled < R::SIZE {
            match self.reader.read(&mut self.window[filled..]) {
                Ok(0) => break, // eof
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::io(&self.path, e)),
            }
        }
        Ok(filled)
    }
}

/// Buffered record writer whose output only appears under its final name once
/// [`RecordWriter::commit`] succeeds.
///
/// Records go to a temporary file in the target's directory; `commit` flushes
/// it and renames it into place. Dropping the writer without committing
/// removes the temporary file.
pub struct RecordWriter<R: Record> {
    target: PathBuf,
    writer: BufWriter<NamedTempFile>,
    written: u64,
    _record: PhantomData<R>,
}

impl<R: Record> RecordWriter<R> {
    pub fn create(target: &Path) -> Result<Self> {
        let dir = parent_dir(target);
        let tmp = tempfile::Builder::new()
            .prefix(".partial.")
            .tempfile_in(&dir)
            .map_err(|e| Error::io(&dir, e))?;
        Ok(Self {
            target: target.to_path_buf(),
            writer: BufWriter::with_capacity(STREAM_BUFFER_SIZE, tmp),
            written: 0,
            _record: PhantomData,
        })
    }

    #[inline]
    pub fn write_record(&mut self, value: &R) -> Result<()> {
        self.writer
            .write_all(value.encode().as_ref())
            .map_err(|e| Error::io(&self.target, e))?;
        self.written += 1;
        Ok(())
    }

    pub fn write_records(&mut self, values: &[R]) -> Result<()> {
        for value in values {
            self.write_record(value)?;
        }
        Ok(())
    }

    /// Flushes and publishes the file, returning the number of records.
    pub fn commit(self) -> Result<u64> {
        let target = self.target;
        let tmp = self
            .writer
            .into_inner()
            .map_err(|e| Error::io(&target, e.into_error()))?;
        tmp.as_file()
            .sync_data()
            .map_err(|e| Error::io(&target, e))?;
        tmp.persist(&target)
            .map_err(|e| Error::io(&target, e.error))?;
        Ok(self.written)
    }
}

/// Whole-file contents decoded into memory.
#[derive(Debug)]
pub struct LoadedRecords<R> {
    pub values: Vec<R>,
    pub dropped_bytes: usize,
}

pub fn read_records<R: Record>(path: &Path) -> Result<LoadedRecords<R>> {
    let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
    let (values, dropped_bytes) = decode_all::<R>(&bytes);
    if dropped_bytes > 0 {
        warn!(path = ?path, bytes = dropped_bytes, "dropping trailing partial record");
    }
    Ok(LoadedRecords {
        values,
        dropped_bytes,
    })
}

/// Atomically replaces `path` with `values`.
pub fn write_records<R: Record>(path: &Path, values: &[R]) -> Result<u64> {
    let mut writer = RecordWriter::<R>::create(path)?;
    writer.write_records(values)?;
    writer.commit()
}

pub fn file_len(path: &Path) -> Result<u64> {
    fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| Error::io(path, e))
}

pub fn remove_file(path: &Path) -> Result<()> {
    fs::remove_file(path).map_err(|e| Error::io(path, e))
}

/// Moves `from` to `to`, copying when a rename is not possible.
pub fn move_file(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    copy_into_place(from, to)?;
    remove_file(from)
}

/// Copies `from` to `to` through a temporary file in `to`'s directory, so a
/// failed copy never leaves a partial `to` behind.
pub fn copy_into_place(from: &Path, to: &Path) -> Result<u64> {
    let mut source = File::open(from).map_err(|e| Error::io(from, e))?;
    let dir = parent_dir(to);
    let mut tmp = tempfile::Builder::new()
        .prefix(".partial.")
        .tempfile_in(&dir)
        .map_err(|e| Error::io(&dir, e))?;
    let copied = io::copy(&mut source, &mut tmp).map_err(|e| Error::io(to, e))?;
    tmp.as_file().sync_data().map_err(|e| Error::io(to, e))?;
    tmp.persist(to).map_err(|e| Error::io(to, e.error))?;
    Ok(copied)
}
