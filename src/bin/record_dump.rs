use anyhow::{Context, Result};
use getopts::Options;
use shared_records::logging::setup_tracing;
use shared_records::record_stream_util::RecordReader;
use shared_records::{with_value_type, Record, ValueType};
use std::env;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    let mut opts = Options::new();
    opts.optflag("h", "help", "print this help menu");
    opts.optmulti("i", "inputfiles", "set input file names", "NAME");
    opts.optopt(
        "o",
        "outputfile",
        "set output file name. default is stdout",
        "NAME",
    );
    opts.optopt(
        "y",
        "value-type",
        "record type: u8, u16, u32, u64, u128, i8, i16, i32, i64, i128. default is u32.",
        "TYPE",
    );

    let matches = opts.parse(&args[1..]).context("failed to parse arguments")?;
    if matches.opt_present("h") {
        println!("{}", opts.usage(&format!("Usage: {} [options]", args[0])));
        return Ok(());
    }
    setup_tracing("warn")?;

    let value_type: ValueType = match matches.opt_str("y") {
        Some(v) => v.parse()?,
        None => ValueType::default(),
    };
    let mut w: Box<dyn Write> = match matches.opt_str("o") {
        Some(path) => Box::new(BufWriter::new(
            File::create(&path).with_context(|| format!("failed to create {}", path))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    for file in matches.opt_strs("i") {
        let path = PathBuf::from(file);
        let count = with_value_type!(value_type, dump(&path, &mut w))?;
        eprintln!("| {} | {} |", path.display(), count);
    }
    w.flush()?;
    Ok(())
}

fn dump<R: Record>(path: &Path, w: &mut Box<dyn Write>) -> Result<u64> {
    let mut reader = RecordReader::<R>::open(path)?;
    while let Some(value) = reader.peek() {
        writeln!(w, "{:?}", value)?;
        reader.advance()?;
    }
    Ok(reader.records_read())
}
