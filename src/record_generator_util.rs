use crate::error::{Error, Result};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

const GENERATOR_BUFFER_SIZE: usize = 1 << 20;

/// Writes `size_bytes` pseudo-random bytes to `path`. The same seed always
/// produces the same file.
pub fn generate_random_file(path: &Path, size_bytes: u64, seed: u64) -> Result<u64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    let mut writer = BufWriter::new(file);
    let mut buffer = vec![0u8; GENERATOR_BUFFER_SIZE.min(size_bytes as usize)];

    let mut total_written: u64 = 0;
    while total_written < size_bytes {
        rng.fill_bytes(&mut buffer);
        let amount = (size_bytes - total_written).min(buffer.len() as u64) as usize;
        writer
            .write_all(&buffer[..amount])
            .map_err(|e| Error::io(path, e))?;
        total_written += amount as u64;
    }
    writer.flush().map_err(|e| Error::io(path, e))?;
    info!(path = ?path, bytes = total_written, seed, "generated random file");
    Ok(total_written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::function_name::named;
    use std::fs;

    #[test]
    #[named]
    fn file_has_requested_length() {
        let dir = tempfile::tempdir().unwrap();
        for size in [0u64, 1, 4095, 3 * GENERATOR_BUFFER_SIZE as u64 + 17] {
            let path = dir.path().join(format!("{}.bin", size));
            let written = generate_random_file(&path, size, 518).unwrap();
            assert!(written == size, "{} failed", function_name!());
            assert!(
                fs::metadata(&path).unwrap().len() == size,
                "{} failed for {}",
                function_name!(),
                size
            );
        }
    }

    #[test]
    #[named]
    fn same_seed_same_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.bin");
        let b = dir.path().join("b.bin");
        let c = dir.path().join("c.bin");
        generate_random_file(&a, 10_000, 5185).unwrap();
        generate_random_file(&b, 10_000, 5185).unwrap();
        generate_random_file(&c, 10_000, 518).unwrap();
        assert!(
            fs::read(&a).unwrap() == fs::read(&b).unwrap(),
            "{} failed",
            function_name!()
        );
        assert!(
            fs::read(&a).unwrap() != fs::read(&c).unwrap(),
            "{} failed",
            function_name!()
        );
    }
}
