use anyhow::{Context, Result};
use getopts::Options;
use shared_records::logging::setup_tracing;
use shared_records::record_generator_util::generate_random_file;
use std::env;
use std::path::PathBuf;

fn print_usage(program: &str, opts: &Options) {
    let brief = format!("Usage: {} -s SIZE -r SEED [options]", program);
    print!("{}", opts.usage(&brief));
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("s", "size", "file size in bytes", "BYTES");
    opts.optopt("r", "seed", "seed for the pseudo-random generator", "SEED");
    opts.optopt(
        "o",
        "output",
        "set output file name. default is <seed>.bin",
        "NAME",
    );
    opts.optflag("h", "help", "print this help menu");

    let matches = opts.parse(&args[1..]).context("failed to parse arguments")?;
    if matches.opt_present("h") {
        print_usage(&program, &opts);
        return Ok(());
    }
    setup_tracing("info")?;

    let size: u64 = matches
        .opt_str("s")
        .context("-s is required")?
        .parse()
        .context("size must be a whole number of bytes")?;
    let seed: u64 = matches
        .opt_str("r")
        .context("-r is required")?
        .parse()
        .context("seed must be a whole number")?;
    let output = matches
        .opt_str("o")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(format!("{}.bin", seed)));

    let written = generate_random_file(&output, size, seed)?;
    eprintln!("{} bytes written.", written);
    Ok(())
}
