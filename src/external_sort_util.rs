use crate::chunk_sort_util::sort_chunks;
use crate::config::{parent_dir, SortConfig};
use crate::error::{Error, Result};
use crate::file_split_util::split_file;
use crate::merge_orchestrator_util::{reduce_to_sorted, MergeOptions};
use crate::record_codec_util::Record;
use crate::record_stream_util::{file_len, move_file, read_records, write_records};
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Outcome of sorting one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortReport {
    pub sorted_path: PathBuf,
    pub records: u64,
    /// Trailing bytes that did not form a whole record and were dropped.
    pub dropped_bytes: u64,
    /// Number of chunks the source was split into; zero when it was sorted
    /// entirely in memory.
    pub chunks: u64,
}

/// `<dir>/sorted_<file name>` next to `source`.
pub fn sorted_path_for(source: &Path) -> PathBuf {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "records".to_string());
    parent_dir(source).join(format!("sorted_{}", name))
}

/// Sorts record files of any size with split, in-memory chunk sort and
/// pairwise merging.
#[derive(Debug, Clone)]
pub struct ExternalSorter<R: Record> {
    config: SortConfig,
    _record: PhantomData<R>,
}

impl<R: Record> ExternalSorter<R> {
    pub fn new(config: SortConfig) -> Result<Self> {
        config.validate::<R>()?;
        Ok(Self {
            config,
            _record: PhantomData,
        })
    }

    /// Sorts `source` into [`sorted_path_for`]`(source)`, leaving the source
    /// untouched.
    pub fn sort_file(&self, source: &Path) -> Result<SortReport> {
        self.sort_file_to(source, &sorted_path_for(source))
    }

    pub fn sort_file_to(&self, source: &Path, output: &Path) -> Result<SortReport> {
        self.config.cancel.check()?;
        let source_len = file_len(source)?;
        let chunk_size = self.config.aligned_chunk_size::<R>();
        let report = if source_len <= chunk_size {
            self.sort_in_memory(source, output)?
        } else {
            self.sort_external(source, output, source_len)?
        };
        if report.dropped_bytes > 0 {
            warn!(
                source = ?source,
                bytes = report.dropped_bytes,
                "source length is not a whole number of records"
            );
        }
        info!(
            source = ?source,
            output = ?report.sorted_path,
            records = report.records,
            chunks = report.chunks,
            "sorted file"
        );
        Ok(report)
    }

    fn sort_in_memory(&self, source: &Path, output: &Path) -> Result<SortReport> {
        let mut loaded = read_records::<R>(source)?;
        R::sort_records(&mut loaded.values, self.config.threads);
        let records = write_records(output, &loaded.values)?;
        Ok(SortReport {
            sorted_path: output.to_path_buf(),
            records,
            dropped_bytes: loaded.dropped_bytes as u64,
            chunks: 0,
        })
    }

    fn sort_external(&self, source: &Path, output: &Path, source_len: u64) -> Result<SortReport> {
        let temp_root = self.config.temp_root_for(source);
        fs::create_dir_all(&temp_root).map_err(|e| Error::io(&temp_root, e))?;
        let prefix = format!(
            "{}.",
            source
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "records".to_string())
        );
        // removed on drop, whether or not the sort succeeds
        let work_dir = tempfile::Builder::new()
            .prefix(&prefix)
            .tempdir_in(&temp_root)
            .map_err(|e| Error::io(&temp_root, e))?;
        info!(
            source = ?source,
            bytes = source_len,
            work_dir = ?work_dir.path(),
            "starting external sort"
        );

        let chunks = split_file::<R>(source, self.config.chunk_size_bytes, work_dir.path())?;
        let chunk_count = chunks.len() as u64;
        let sorted = sort_chunks::<R>(&chunks, self.config.threads, &self.config.cancel)?;

        let options = MergeOptions {
            threads: self.config.threads,
            cancel: self.config.cancel.clone(),
        };
        let last_run = reduce_to_sorted::<R>(chunks, work_dir.path(), &options)?;
        move_file(&last_run, output)?;
        work_dir
            .close()
            .map_err(|e| Error::io(&temp_root, e))?;

        Ok(SortReport {
            sorted_path: output.to_path_buf(),
            records: sorted.records,
            dropped_bytes: sorted.dropped_bytes,
            chunks: chunk_count,
        })
    }
}

/// Sorts `path` with `chunk_size_bytes` chunks and default settings otherwise,
/// returning the path of the sorted copy.
pub fn sort_large_file<R: Record>(path: &Path, chunk_size_bytes: u64) -> Result<PathBuf> {
    let sorter = ExternalSorter::<R>::new(SortConfig::new(chunk_size_bytes))?;
    Ok(sorter.sort_file(path)?.sorted_path)
}
