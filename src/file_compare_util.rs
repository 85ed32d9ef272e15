use crate::error::{Error, Result};
use crate::record_stream_util::file_len;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

const COMPARE_BUFFER_SIZE: usize = 1 << 16;

/// Compares two files byte for byte, streaming both in fixed-size buffers.
pub fn files_identical(path_a: &Path, path_b: &Path) -> Result<bool> {
    if file_len(path_a)? != file_len(path_b)? {
        return Ok(false);
    }
    let mut reader_a = open(path_a)?;
    let mut reader_b = open(path_b)?;
    let mut buf_a = vec![0u8; COMPARE_BUFFER_SIZE];
    let mut buf_b = vec![0u8; COMPARE_BUFFER_SIZE];
    loop {
        let n_a = fill(&mut reader_a, &mut buf_a, path_a)?;
        let n_b = fill(&mut reader_b, &mut buf_b, path_b)?;
        if n_a != n_b || buf_a[..n_a] != buf_b[..n_b] {
            return Ok(false);
        }
        if n_a == 0 {
            return Ok(true);
        }
    }
}

fn open(path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| Error::io(path, e))
}

/// Reads until `buf` is full or the file ends.
fn fill(reader: &mut impl Read, buf: &mut [u8], path: &Path) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::io(path, e)),
        }
    }
    Ok(filled)
}
