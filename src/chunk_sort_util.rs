use crate::config::CancelFlag;
use crate::error::Result;
use crate::record_codec_util::Record;
use crate::record_stream_util::{read_records, write_records};
use std::path::{Path, PathBuf};
use std::thread;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkSortReport {
    pub records: u64,
    pub dropped_bytes: u64,
}

impl ChunkSortReport {
    fn add(&mut self, other: ChunkSortReport) {
        self.records += other.records;
        self.dropped_bytes += other.dropped_bytes;
    }
}

/// Loads the whole chunk, sorts it and replaces the file with the result.
///
/// The sorted content is written to a sibling temporary file and renamed
/// over the chunk, so a failure never leaves a half-written chunk behind.
pub fn sort_chunk<R: Record>(path: &Path, threads: usize) -> Result<ChunkSortReport> {
    let mut loaded = read_records::<R>(path)?;
    R::sort_records(&mut loaded.values, threads);
    let records = write_records(path, &loaded.values)?;
    debug!(chunk = ?path, records, "sorted chunk");
    Ok(ChunkSortReport {
        records,
        dropped_bytes: loaded.dropped_bytes as u64,
    })
}

/// Sorts every chunk in place using up to `threads` workers.
///
/// Each worker takes a contiguous slice of `paths` and sorts those chunks one
/// after another, so at most `threads` chunks are held in memory at once.
pub fn sort_chunks<R: Record>(
    paths: &[PathBuf],
    threads: usize,
    cancel: &CancelFlag,
) -> Result<ChunkSortReport> {
    let workers = threads.clamp(1, paths.len().max(1));
    info!(chunks = paths.len(), workers, "sorting chunks");
    if workers == 1 {
        return sort_chunk_slice::<R>(paths, cancel);
    }

    let per_worker = paths.len().div_ceil(workers);
    let mut total = ChunkSortReport::default();
    thread::scope(|scope| -> Result<()> {
        let mut children = Vec::with_capacity(workers);
        for slice in paths.chunks(per_worker) {
            children.push(scope.spawn(move || sort_chunk_slice::<R>(slice, cancel)));
        }
        let mut first_error = None;
        for child in children {
            match child.join() {
                Ok(Ok(report)) => total.add(report),
                Ok(Err(e)) => {
                    first_error.get_or_insert(e);
                }
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    })?;
    Ok(total)
}

fn sort_chunk_slice<R: Record>(paths: &[PathBuf], cancel: &CancelFlag) -> Result<ChunkSortReport> {
    let mut report = ChunkSortReport::default();
    for path in paths {
        cancel.check()?;
        report.add(sort_chunk::<R>(path, 1)?);
    }
    Ok(report)
}
