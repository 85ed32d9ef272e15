//! Single-pass distinct intersection of two sorted record files.
//!
//! Both inputs must already be sorted ascending (for instance by
//! [`crate::ExternalSorter`]). Order is not re-checked here; feeding unsorted
//! files produces an arbitrary subset of the true intersection.

use crate::error::Result;
use crate::record_codec_util::Record;
use crate::record_stream_util::{RecordReader, RecordWriter};
use std::path::Path;
use tracing::{debug, info};

/// Returns every value present in both sorted files, ascending, each once.
///
/// Memory use is one current value per input plus the last value emitted. A
/// read error discards everything found so far.
pub fn intersect_distinct<R: Record>(sorted_a: &Path, sorted_b: &Path) -> Result<Vec<R>> {
    let mut shared = Vec::new();
    join_distinct::<R, _>(sorted_a, sorted_b, |v| {
        shared.push(v);
        Ok(())
    })?;
    info!(shared = shared.len(), "intersected sorted files");
    Ok(shared)
}

/// Same as [`intersect_distinct`], writing the values to `output` as a record
/// file. `output` only appears once the whole join has succeeded.
pub fn intersect_distinct_to_file<R: Record>(
    sorted_a: &Path,
    sorted_b: &Path,
    output: &Path,
) -> Result<u64> {
    let mut writer = RecordWriter::<R>::create(output)?;
    join_distinct::<R, _>(sorted_a, sorted_b, |v| writer.write_record(&v))?;
    let written = writer.commit()?;
    info!(output = ?output, shared = written, "intersected sorted files");
    Ok(written)
}

fn join_distinct<R, F>(sorted_a: &Path, sorted_b: &Path, mut emit: F) -> Result<()>
where
    R: Record,
    F: FnMut(R) -> Result<()>,
{
    let mut a = RecordReader::<R>::open(sorted_a)?;
    let mut b = RecordReader::<R>::open(sorted_b)?;
    let mut last_emitted: Option<R> = None;
    let mut last_a: Option<R> = None;
    let mut last_b: Option<R> = None;

    while let (Some(va), Some(vb)) = (a.peek(), b.peek()) {
        if va == vb {
            if last_emitted != Some(va) {
                emit(va)?;
                last_emitted = Some(va);
            }
            last_a = Some(va);
            last_b = Some(vb);
            a.advance()?;
            b.advance()?;
        } else if va < vb {
            last_a = Some(va);
            a.advance()?;
        } else {
            last_b = Some(vb);
            b.advance()?;
        }
    }

    // One side ran out. Its final value can still match the other side's
    // current value once; anything past that is larger.
    let tail = match (a.peek(), b.peek()) {
        (Some(live), None) => last_b.filter(|&done| done == live),
        (None, Some(live)) => last_a.filter(|&done| done == live),
        _ => None,
    };
    if let Some(v) = tail {
        if last_emitted != Some(v) {
            emit(v)?;
        }
    }

    debug!(
        a = ?sorted_a,
        b = ?sorted_b,
        records_a = a.records_read(),
        records_b = b.records_read(),
        "join finished"
    );
    Ok(())
}
