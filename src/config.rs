use crate::error::{Error, Result};
use crate::record_codec_util::Record;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const ONE_MB: u64 = 1024 * 1024;
pub const DEFAULT_CHUNK_SIZE_BYTES: u64 = 1024 * ONE_MB;
pub const DEFAULT_THREADS: usize = 8;

/// Record type selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueType {
    U8,
    U16,
    #[default]
    U32,
    U64,
    U128,
    I8,
    I16,
    I32,
    I64,
    I128,
}

impl FromStr for ValueType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "u8" => Ok(ValueType::U8),
            "u16" => Ok(ValueType::U16),
            "u32" => Ok(ValueType::U32),
            "u64" => Ok(ValueType::U64),
            "u128" => Ok(ValueType::U128),
            "i8" => Ok(ValueType::I8),
            "i16" => Ok(ValueType::I16),
            "i32" => Ok(ValueType::I32),
            "i64" => Ok(ValueType::I64),
            "i128" => Ok(ValueType::I128),
            other => Err(Error::Configuration(format!(
                "unknown value type {:?}; expected one of u8, u16, u32, u64, u128, i8, i16, i32, i64, i128",
                other
            ))),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::U8 => "u8",
            ValueType::U16 => "u16",
            ValueType::U32 => "u32",
            ValueType::U64 => "u64",
            ValueType::U128 => "u128",
            ValueType::I8 => "i8",
            ValueType::I16 => "i16",
            ValueType::I32 => "i32",
            ValueType::I64 => "i64",
            ValueType::I128 => "i128",
        };
        f.write_str(name)
    }
}

/// Calls `$run::<R>($args...)` with `R` the record type named by `$value_type`.
#[macro_export]
macro_rules! with_value_type {
    ($value_type:expr, $run:ident($($args:expr),*)) => {
        match $value_type {
            $crate::ValueType::U8 => $run::<u8>($($args),*),
            $crate::ValueType::U16 => $run::<u16>($($args),*),
            $crate::ValueType::U32 => $run::<u32>($($args),*),
            $crate::ValueType::U64 => $run::<u64>($($args),*),
            $crate::ValueType::U128 => $run::<u128>($($args),*),
            $crate::ValueType::I8 => $run::<i8>($($args),*),
            $crate::ValueType::I16 => $run::<i16>($($args),*),
            $crate::ValueType::I32 => $run::<i32>($($args),*),
            $crate::ValueType::I64 => $run::<i64>($($args),*),
            $crate::ValueType::I128 => $run::<i128>($($args),*),
        }
    };
}

/// Shared flag that stops the sort from starting new chunk sorts or merges.
///
/// Work already in flight on a single file runs to completion; the next
/// scheduling point returns [`Error::Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}

/// Settings for [`crate::ExternalSorter`].
#[derive(Debug, Clone)]
pub struct SortConfig {
    /// Upper bound on the bytes loaded into memory per chunk, per worker.
    pub chunk_size_bytes: u64,
    /// Where the per-sort work directory is created. `None` uses the
    /// directory of the file being sorted.
    pub temp_root: Option<PathBuf>,
    /// Number of chunk sorts or pairwise merges allowed to run at once.
    pub threads: usize,
    pub cancel: CancelFlag,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            chunk_size_bytes: DEFAULT_CHUNK_SIZE_BYTES,
            temp_root: None,
            threads: DEFAULT_THREADS,
            cancel: CancelFlag::new(),
        }
    }
}

impl SortConfig {
    pub fn new(chunk_size_bytes: u64) -> Self {
        Self {
            chunk_size_bytes,
            ..Self::default()
        }
    }

    pub fn with_chunk_size_mb(mut self, chunk_size_mb: u64) -> Self {
        self.chunk_size_bytes = chunk_size_mb.saturating_mul(ONE_MB);
        self
    }

    pub fn with_temp_root(mut self, temp_root: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(temp_root.into());
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Chunk size rounded down to a whole number of `R` records.
    pub fn aligned_chunk_size<R: Record>(&self) -> u64 {
        let size = R::SIZE as u64;
        self.chunk_size_bytes - self.chunk_size_bytes % size
    }

    pub fn validate<R: Record>(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(Error::Configuration(
                "at least one worker thread is required".to_string(),
            ));
        }
        if self.aligned_chunk_size::<R>() == 0 {
            return Err(Error::Configuration(format!(
                "chunk size of {} bytes holds no {}-byte record",
                self.chunk_size_bytes,
                R::SIZE
            )));
        }
        Ok(())
    }

    /// The directory the work directory for `source` will be created in.
    pub fn temp_root_for(&self, source: &Path) -> PathBuf {
        match &self.temp_root {
            Some(root) => root.clone(),
            None => parent_dir(source),
        }
    }
}

pub(crate) fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::function_name::named;

    #[test]
    #[named]
    fn chunk_size_is_rounded_down_to_whole_records() {
        let config = SortConfig::new(4097);
        assert!(
            config.aligned_chunk_size::<u32>() == 4096,
            "{} failed",
            function_name!()
        );
        assert!(
            config.aligned_chunk_size::<u128>() == 4096,
            "{} failed",
            function_name!()
        );
        assert!(
            SortConfig::new(15).aligned_chunk_size::<u64>() == 8,
            "{} failed",
            function_name!()
        );
    }

    #[test]
    #[named]
    fn chunk_smaller_than_record_is_rejected() {
        let result = SortConfig::new(3).validate::<u32>();
        assert!(
            matches!(result, Err(Error::Configuration(_))),
            "{} failed",
            function_name!()
        );
        assert!(
            SortConfig::new(4).validate::<u32>().is_ok(),
            "{} failed",
            function_name!()
        );
    }

    #[test]
    #[named]
    fn zero_threads_is_rejected() {
        let result = SortConfig::new(1024).with_threads(0).validate::<u32>();
        assert!(
            matches!(result, Err(Error::Configuration(_))),
            "{} failed",
            function_name!()
        );
    }

    #[test]
    #[named]
    fn cancel_flag_is_shared_between_clones() {
        let flag = CancelFlag::new();
        let config = SortConfig::default().with_cancel_flag(flag.clone());
        assert!(config.cancel.check().is_ok(), "{} failed", function_name!());
        flag.cancel();
        assert!(
            matches!(config.cancel.check(), Err(Error::Cancelled)),
            "{} failed",
            function_name!()
        );
    }

    #[test]
    #[named]
    fn value_types_parse_case_insensitively() {
        assert!(
            "U32".parse::<ValueType>().ok() == Some(ValueType::U32),
            "{} failed",
            function_name!()
        );
        assert!(
            "i128".parse::<ValueType>().ok() == Some(ValueType::I128),
            "{} failed",
            function_name!()
        );
        assert!(
            matches!("f32".parse::<ValueType>(), Err(Error::Configuration(_))),
            "{} failed",
            function_name!()
        );
        assert!(
            ValueType::default().to_string() == "u32",
            "{} failed",
            function_name!()
        );
    }

    #[test]
    #[named]
    fn temp_root_defaults_to_source_directory() {
        let config = SortConfig::default();
        assert!(
            config.temp_root_for(Path::new("/data/input.bin")) == PathBuf::from("/data"),
            "{} failed",
            function_name!()
        );
        assert!(
            config.temp_root_for(Path::new("input.bin")) == PathBuf::from("."),
            "{} failed",
            function_name!()
        );
        let config = config.with_temp_root("/scratch");
        assert!(
            config.temp_root_for(Path::new("/data/input.bin")) == PathBuf::from("/scratch"),
            "{} failed",
            function_name!()
        );
    }
}
