//! Error types shared by every stage of the sort and join pipeline.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for record file operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while splitting, sorting, merging or joining record files.
#[derive(Debug, Error)]
pub enum Error {
    /// Opening, reading, writing, renaming or deleting `path` failed.
    #[error("I/O error on {path:?}: {source}")]
    Io {
        /// The file or directory the failed operation touched.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// Chunk size, thread count or record width do not make sense together.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// The chunk index range cannot address this many chunks.
    #[error(
        "splitting needs {chunks} chunks of {chunk_size_bytes} bytes, more than can be addressed; use a larger chunk size"
    )]
    TooManyChunks {
        /// Number of chunks the split would have produced.
        chunks: u64,
        /// The (rounded) chunk size that was requested.
        chunk_size_bytes: u64,
    },

    /// The caller raised the cancellation flag.
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Error::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
