use crate::error::{Error, Result};
use crate::record_codec_util::{record_count, trailing_bytes, Record};
use crate::record_stream_util::file_len;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Largest number of chunks one source file may be split into.
pub const MAX_CHUNK_COUNT: u64 = u32::MAX as u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitPlan {
    /// Requested chunk size rounded down to whole records.
    pub chunk_size_bytes: u64,
    pub chunk_count: u64,
}

impl SplitPlan {
    /// Byte length of chunk `index` (0-based) for a source of `source_len`.
    pub fn chunk_len(&self, source_len: u64, index: u64) -> u64 {
        let start = index * self.chunk_size_bytes;
        source_len.saturating_sub(start).min(self.chunk_size_bytes)
    }
}

pub fn plan_split<R: Record>(source_len: u64, chunk_size_bytes: u64) -> Result<SplitPlan> {
    let size = R::SIZE as u64;
    let aligned = chunk_size_bytes - chunk_size_bytes % size;
    if aligned == 0 {
        return Err(Error::Configuration(format!(
            "chunk size of {} bytes holds no {}-byte record",
            chunk_size_bytes,
            R::SIZE
        )));
    }
    let chunk_count = source_len.div_ceil(aligned);
    if chunk_count > MAX_CHUNK_COUNT {
        return Err(Error::TooManyChunks {
            chunks: chunk_count,
            chunk_size_bytes: aligned,
        });
    }
    Ok(SplitPlan {
        chunk_size_bytes: aligned,
        chunk_count,
    })
}

/// Path of chunk `index` (0-based): `<stem>.<index + 1><.ext>` in `output_dir`.
pub fn chunk_path(source: &Path, output_dir: &Path, index: u64) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "records".to_string());
    let name = match source.extension() {
        Some(ext) => format!("{}.{}.{}", stem, index + 1, ext.to_string_lossy()),
        None => format!("{}.{}", stem, index + 1),
    };
    output_dir.join(name)
}

/// Copies `source` into consecutive chunk files of at most `chunk_size_bytes`
/// (rounded down to whole records), in source order.
///
/// The output directory is created if it does not exist. The source is only
/// read.
pub fn split_file<R: Record>(
    source: &Path,
    chunk_size_bytes: u64,
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let source_len = file_len(source)?;
    let plan = plan_split::<R>(source_len, chunk_size_bytes)?;
    fs::create_dir_all(output_dir).map_err(|e| Error::io(output_dir, e))?;
    info!(
        source = ?source,
        bytes = source_len,
        records = record_count::<R>(source_len),
        trailing_bytes = trailing_bytes::<R>(source_len),
        chunks = plan.chunk_count,
        chunk_size_bytes = plan.chunk_size_bytes,
        "splitting file"
    );

    let file = File::open(source).map_err(|e| Error::io(source, e))?;
    let mut reader = BufReader::new(file);
    let mut outputs = Vec::new();
    for index in 0..plan.chunk_count {
        let path = chunk_path(source, output_dir, index);
        let out = File::create(&path).map_err(|e| Error::io(&path, e))?;
        let mut writer = BufWriter::new(out);
        let mut window = (&mut reader).take(plan.chunk_len(source_len, index));
        let copied = io::copy(&mut window, &mut writer).map_err(|e| Error::io(source, e))?;
        writer.flush().map_err(|e| Error::io(&path, e))?;
        debug!(chunk = ?path, bytes = copied, "wrote chunk");
        outputs.push(path);
    }
    Ok(outputs)
}
