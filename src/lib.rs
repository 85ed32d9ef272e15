//! Distinct intersection of two arbitrarily large files of fixed-width binary
//! records.
//!
//! Each input is ordered with an external sort (split into bounded chunks,
//! sort every chunk in memory, merge the sorted runs pairwise until one is
//! left) and the two sorted files are then joined in a single forward pass.

pub mod chunk_sort_util;
pub mod config;
pub mod distinct_join_util;
pub mod error;
pub mod external_sort_util;
pub mod file_compare_util;
pub mod file_split_util;
pub mod logging;
pub mod merge_orchestrator_util;
pub mod record_codec_util;
pub mod record_generator_util;
pub mod record_stream_util;
pub mod two_way_merge_util;

pub use config::{CancelFlag, SortConfig, ValueType};
pub use distinct_join_util::{intersect_distinct, intersect_distinct_to_file};
pub use error::{Error, Result};
pub use external_sort_util::{sort_large_file, ExternalSorter, SortReport};
pub use record_codec_util::Record;
