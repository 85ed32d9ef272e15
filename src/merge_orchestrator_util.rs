use crate::config::CancelFlag;
use crate::error::{Error, Result};
use crate::record_codec_util::Record;
use crate::record_stream_util::remove_file;
use crate::two_way_merge_util::merge_runs;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::thread;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Pairwise merges of one level allowed to run at once.
    pub threads: usize,
    pub cancel: CancelFlag,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            threads: 1,
            cancel: CancelFlag::new(),
        }
    }
}

/// Name of the run produced by merging `left` and `right`: the first eight
/// bytes of SHA-256 over both file names, in hex.
pub fn merged_run_path(left: &Path, right: &Path, temp_dir: &Path) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(left.as_os_str().as_encoded_bytes());
    hasher.update(b"\0");
    hasher.update(right.as_os_str().as_encoded_bytes());
    let digest = hasher.finalize();
    let hex: String = digest[..8].iter().map(|b| format!("{:02x}", b)).collect();
    temp_dir.join(format!("{}.bin", hex))
}

/// Merges sorted runs level by level until a single run remains.
///
/// Within a level, run `i` is merged with run `i + n / 2`; both inputs are
/// deleted as soon as their merge succeeds. With an odd count the last run is
/// folded into the last run produced by the level. A failure aborts the
/// level; runs already produced are left on disk for the caller.
pub fn reduce_to_sorted<R: Record>(
    runs: Vec<PathBuf>,
    temp_dir: &Path,
    options: &MergeOptions,
) -> Result<PathBuf> {
    if runs.is_empty() {
        return Err(Error::Configuration(
            "at least one sorted run is required".to_string(),
        ));
    }
    let mut runs = runs;
    let mut level = 0;
    while runs.len() > 1 {
        level += 1;
        info!(level, runs = runs.len(), "merging level");
        runs = merge_level::<R>(&runs, temp_dir, options)?;
    }
    // exactly one run left
    Ok(runs.swap_remove(0))
}

/// Runs one level of pairwise merges and returns the produced runs.
pub fn merge_level<R: Record>(
    runs: &[PathBuf],
    temp_dir: &Path,
    options: &MergeOptions,
) -> Result<Vec<PathBuf>> {
    let pairs = runs.len() / 2;
    let (front, back) = runs.split_at(pairs);
    let jobs: Vec<(&Path, &Path)> = front
        .iter()
        .zip(back.iter())
        .map(|(l, r)| (l.as_path(), r.as_path()))
        .collect();

    let mut merged = Vec::with_capacity(pairs);
    for batch in jobs.chunks(options.threads.max(1)) {
        options.cancel.check()?;
        merged.extend(merge_batch::<R>(batch, temp_dir)?);
    }

    if runs.len() % 2 == 1 {
        if let (Some(last_merged), Some(spare)) = (merged.pop(), runs.last()) {
            options.cancel.check()?;
            merged.push(merge_and_delete::<R>(&last_merged, spare, temp_dir)?);
        }
    }
    Ok(merged)
}

fn merge_batch<R: Record>(batch: &[(&Path, &Path)], temp_dir: &Path) -> Result<Vec<PathBuf>> {
    if batch.len() == 1 {
        let (left, right) = batch[0];
        return Ok(vec![merge_and_delete::<R>(left, right, temp_dir)?]);
    }
    thread::scope(|scope| {
        let children: Vec<_> = batch
            .iter()
            .map(|&(left, right)| scope.spawn(move || merge_and_delete::<R>(left, right, temp_dir)))
            .collect();
        let mut outputs = Vec::with_capacity(children.len());
        let mut first_error = None;
        for child in children {
            match child.join() {
                Ok(Ok(path)) => outputs.push(path),
                Ok(Err(e)) => {
                    first_error.get_or_insert(e);
                }
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(outputs),
        }
    })
}

fn merge_and_delete<R: Record>(left: &Path, right: &Path, temp_dir: &Path) -> Result<PathBuf> {
    let output = merged_run_path(left, right, temp_dir);
    let records = merge_runs::<R>(left, right, &output)?;
    remove_file(left)?;
    remove_file(right)?;
    debug!(output = ?output, records, "replaced pair with merged run");
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record_codec_util::{decode_all, encode_all};
    use ::function_name::named;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::fs;

    fn write_sorted_runs(dir: &Path, runs: &[Vec<u32>]) -> Vec<PathBuf> {
        runs.iter()
            .enumerate()
            .map(|(i, values)| {
                let mut sorted = values.clone();
                sorted.sort();
                let path = dir.join(format!("run.{}.bin", i + 1));
                fs::write(&path, encode_all(&sorted)).unwrap();
                path
            })
            .collect()
    }

    fn remaining_files(dir: &Path) -> usize {
        fs::read_dir(dir).unwrap().count()
    }

    #[test]
    #[named]
    fn single_run_is_returned_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let runs = write_sorted_runs(dir.path(), &[vec![3, 1, 2]]);
        let result =
            reduce_to_sorted::<u32>(runs.clone(), dir.path(), &MergeOptions::default()).unwrap();
        assert!(result == runs[0], "{} failed", function_name!());
    }

    #[test]
    #[named]
    fn empty_run_list_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = reduce_to_sorted::<u32>(Vec::new(), dir.path(), &MergeOptions::default());
        assert!(
            matches!(result, Err(Error::Configuration(_))),
            "{} failed",
            function_name!()
        );
    }

    #[test]
    #[named]
    fn level_pairs_front_half_with_back_half() {
        let dir = tempfile::tempdir().unwrap();
        let runs = write_sorted_runs(dir.path(), &[vec![1], vec![2], vec![3], vec![4]]);
        let level = merge_level::<u32>(&runs, dir.path(), &MergeOptions::default()).unwrap();
        assert!(level.len() == 2, "{} failed", function_name!());
        assert!(
            level[0] == merged_run_path(&runs[0], &runs[2], dir.path()),
            "{} failed",
            function_name!()
        );
        let (first, _) = decode_all::<u32>(&fs::read(&level[0]).unwrap());
        let (second, _) = decode_all::<u32>(&fs::read(&level[1]).unwrap());
        assert!(first == vec![1, 3], "{} failed", function_name!());
        assert!(second == vec![2, 4], "{} failed", function_name!());
        assert!(
            runs.iter().all(|p| !p.exists()),
            "{} failed",
            function_name!()
        );
    }

    #[test]
    #[named]
    fn odd_run_is_folded_into_last_merge() {
        let dir = tempfile::tempdir().unwrap();
        let runs = write_sorted_runs(dir.path(), &[vec![1], vec![2], vec![3], vec![4], vec![0]]);
        let level = merge_level::<u32>(&runs, dir.path(), &MergeOptions::default()).unwrap();
        assert!(level.len() == 2, "{} failed", function_name!());
        let (last, _) = decode_all::<u32>(&fs::read(&level[1]).unwrap());
        assert!(last == vec![0, 2, 4], "{} failed", function_name!());
        assert!(remaining_files(dir.path()) == 2, "{} failed", function_name!());
    }

    #[test]
    #[named]
    fn many_runs_reduce_to_one_sorted_union() {
        let mut rng = StdRng::seed_from_u64(42);
        for (count, threads) in [(2, 1), (3, 2), (7, 3), (10, 4), (13, 1)] {
            let dir = tempfile::tempdir().unwrap();
            let raw: Vec<Vec<u32>> = (0..count)
                .map(|_| (0..rng.gen_range(0..50)).map(|_| rng.gen_range(0..100)).collect())
                .collect();
            let mut expected: Vec<u32> = raw.concat();
            expected.sort();

            let runs = write_sorted_runs(dir.path(), &raw);
            let options = MergeOptions {
                threads,
                cancel: CancelFlag::new(),
            };
            let result = reduce_to_sorted::<u32>(runs, dir.path(), &options).unwrap();
            let (values, _) = decode_all::<u32>(&fs::read(&result).unwrap());
            assert!(
                values == expected,
                "{} failed for {} runs",
                function_name!(),
                count
            );
            assert!(
                remaining_files(dir.path()) == 1,
                "{} failed for {} runs",
                function_name!(),
                count
            );
        }
    }

    #[test]
    #[named]
    fn cancelled_merge_reports_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let runs = write_sorted_runs(dir.path(), &[vec![1], vec![2]]);
        let options = MergeOptions::default();
        options.cancel.cancel();
        let result = reduce_to_sorted::<u32>(runs.clone(), dir.path(), &options);
        assert!(
            matches!(result, Err(Error::Cancelled)),
            "{} failed",
            function_name!()
        );
        assert!(runs.iter().all(|p| p.exists()), "{} failed", function_name!());
    }

    #[test]
    #[named]
    fn failed_merge_keeps_runs_produced_so_far() {
        let dir = tempfile::tempdir().unwrap();
        let runs = write_sorted_runs(dir.path(), &[vec![1], vec![2], vec![3], vec![4]]);
        fs::remove_file(&runs[2]).unwrap();
        let options = MergeOptions {
            threads: 2,
            cancel: CancelFlag::new(),
        };
        let result = reduce_to_sorted::<u32>(runs.clone(), dir.path(), &options);
        assert!(
            matches!(result, Err(Error::Io { .. })),
            "{} failed",
            function_name!()
        );
        assert!(
            merged_run_path(&runs[1], &runs[3], dir.path()).exists(),
            "{} failed",
            function_name!()
        );
        assert!(
            !merged_run_path(&runs[0], &runs[2], dir.path()).exists(),
            "{} failed",
            function_name!()
        );
        assert!(runs[0].exists(), "{} failed", function_name!());
        assert!(remaining_files(dir.path()) == 2, "{} failed", function_name!());
    }

    #[test]
    #[named]
    fn merged_names_depend_on_both_inputs() {
        let dir = Path::new("/tmp/work");
        let ab = merged_run_path(Path::new("a.1.bin"), Path::new("a.2.bin"), dir);
        let ba = merged_run_path(Path::new("a.2.bin"), Path::new("a.1.bin"), dir);
        assert!(ab != ba, "{} failed", function_name!());
        assert!(
            ab.extension().and_then(|e| e.to_str()) == Some("bin"),
            "{} failed",
            function_name!()
        );
        assert!(
            ab.file_stem().map(|s| s.len()) == Some(16),
            "{} failed",
            function_name!()
        );
    }
}
