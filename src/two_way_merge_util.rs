use crate::error::Result;
use crate::record_codec_util::Record;
use crate::record_stream_util::{RecordReader, RecordWriter};
use std::path::Path;
use tracing::debug;

/// Merges two sorted runs into `output`, keeping every record of both.
///
/// On equal values the left run is emitted first. Only one value per side is
/// held in memory. The output is written under a temporary name and renamed
/// into place once complete, so `output` never holds a partial merge.
pub fn merge_runs<R: Record>(left: &Path, right: &Path, output: &Path) -> Result<u64> {
    let mut left_reader = RecordReader::<R>::open(left)?;
    let mut right_reader = RecordReader::<R>::open(right)?;
    let mut writer = RecordWriter::<R>::create(output)?;

    loop {
        match (left_reader.peek(), right_reader.peek()) {
            (Some(l), Some(r)) => {
                if l <= r {
                    writer.write_record(&l)?;
                    left_reader.advance()?;
                } else {
                    writer.write_record(&r)?;
                    right_reader.advance()?;
                }
            }
            (Some(l), None) => {
                writer.write_record(&l)?;
                left_reader.advance()?;
            }
            (None, Some(r)) => {
                writer.write_record(&r)?;
                right_reader.advance()?;
            }
            (None, None) => break,
        }
    }

    let written = writer.commit()?;
    debug!(
        left = ?left,
        right = ?right,
        output = ?output,
        records = written,
        "merged runs"
    );
    Ok(written)
}
