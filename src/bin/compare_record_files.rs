use anyhow::{bail, Context, Result};
use getopts::Options;
use shared_records::file_compare_util::files_identical;
use std::path::PathBuf;
use std::{env, process};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    let mut opts = Options::new();
    opts.optflag("h", "help", "print this help menu");

    let matches = opts.parse(&args[1..]).context("failed to parse arguments")?;
    if matches.opt_present("h") || matches.free.len() != 2 {
        println!(
            "{}",
            opts.usage(&format!("Usage: {} FILE1 FILE2 [options]", args[0]))
        );
        if matches.opt_present("h") {
            return Ok(());
        }
        bail!("expected exactly two files");
    }

    let file1 = PathBuf::from(&matches.free[0]);
    let file2 = PathBuf::from(&matches.free[1]);
    if files_identical(&file1, &file2)? {
        println!("identical");
        Ok(())
    } else {
        println!("different");
        process::exit(1);
    }
}
