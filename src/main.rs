use anyhow::{bail, Context, Result};
use getopts::Options;
use shared_records::config::DEFAULT_THREADS;
use shared_records::logging::setup_tracing;
use shared_records::{
    intersect_distinct_to_file, with_value_type, ExternalSorter, Record, SortConfig, ValueType,
};
use std::path::{Path, PathBuf};
use std::{env, process};
use tracing::info;

const DEFAULT_CHUNK_SIZE_MB: u64 = 1024;

fn print_usage(program: &str, opts: &Options) {
    let brief = format!("Usage: {} -a FILE -b FILE [options]", program);
    print!("{}", opts.usage(&brief));
    process::exit(0);
}

struct Job {
    file_a: PathBuf,
    file_b: PathBuf,
    output: PathBuf,
    config: SortConfig,
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("a", "file1", "first record file", "FILE");
    opts.optopt("b", "file2", "second record file", "FILE");
    opts.optopt(
        "o",
        "output",
        "set output file name. default is shared_<file1 name> next to file1",
        "NAME",
    );
    opts.optopt(
        "c",
        "chunk-size",
        "chunk size in MB loaded into memory per thread. default value is 1024.",
        "MB",
    );
    opts.optopt(
        "t",
        "thread",
        "number of threads used for chunk sorting and merging. default value is 8.",
        "THREAD",
    );
    opts.optopt(
        "w",
        "work-dir",
        "directory for temporary chunk files. default is the input file's directory",
        "DIR",
    );
    opts.optopt(
        "y",
        "value-type",
        "record type: u8, u16, u32, u64, u128, i8, i16, i32, i64, i128. default is u32.",
        "TYPE",
    );
    opts.optopt("l", "log-level", "log level. default is info.", "LEVEL");
    opts.optflag("h", "help", "print this help menu");

    let matches = opts.parse(&args[1..]).context("failed to parse arguments")?;
    if matches.opt_present("h") {
        print_usage(&program, &opts);
    }

    let log_level = matches.opt_str("l").unwrap_or_else(|| "info".to_string());
    setup_tracing(&log_level)?;

    let (file_a, file_b) = match (matches.opt_str("a"), matches.opt_str("b")) {
        (Some(a), Some(b)) => (PathBuf::from(a), PathBuf::from(b)),
        _ => bail!("both -a and -b are required; see {} -h", program),
    };

    let chunk_size_mb: u64 = match matches.opt_str("c") {
        Some(v) => v.parse().context("chunk size must be a whole number of MB")?,
        None => DEFAULT_CHUNK_SIZE_MB,
    };
    let threads: usize = match matches.opt_str("t") {
        Some(v) => v.parse().context("thread count must be a whole number")?,
        None => DEFAULT_THREADS,
    };
    let value_type: ValueType = match matches.opt_str("y") {
        Some(v) => v.parse()?,
        None => ValueType::default(),
    };
    let output = match matches.opt_str("o") {
        Some(o) => PathBuf::from(o),
        None => default_output(&file_a),
    };

    let mut config = SortConfig::default()
        .with_chunk_size_mb(chunk_size_mb)
        .with_threads(threads);
    if let Some(dir) = matches.opt_str("w") {
        config = config.with_temp_root(dir);
    }

    info!(
        file_a = ?file_a,
        file_b = ?file_b,
        output = ?output,
        %value_type,
        chunk_size_bytes = config.chunk_size_bytes,
        threads,
        "starting"
    );
    let job = Job {
        file_a,
        file_b,
        output,
        config,
    };
    let shared = with_value_type!(value_type, run(&job))?;
    println!("{}", shared);
    Ok(())
}

fn default_output(file_a: &Path) -> PathBuf {
    let name = file_a
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "records.bin".to_string());
    file_a.with_file_name(format!("shared_{}", name))
}

fn run<R: Record>(job: &Job) -> Result<u64> {
    let sorter = ExternalSorter::<R>::new(job.config.clone())?;
    let sorted_a = sorter
        .sort_file(&job.file_a)
        .with_context(|| format!("failed to sort {:?}", job.file_a))?;
    let sorted_b = sorter
        .sort_file(&job.file_b)
        .with_context(|| format!("failed to sort {:?}", job.file_b))?;

    let shared = intersect_distinct_to_file::<R>(
        &sorted_a.sorted_path,
        &sorted_b.sorted_path,
        &job.output,
    )
    .context("failed to intersect sorted files")?;
    info!(
        records_a = sorted_a.records,
        records_b = sorted_b.records,
        shared,
        output = ?job.output,
        "finished"
    );
    Ok(shared)
}
