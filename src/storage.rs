use chrono::Local;
use std::env;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

const DATA_DIR_NAME: &str = "segsieve";
const WRITE_BUFFER_BYTES: usize = 256 * 1024;

pub const PRIMES_TEXT_FILE: &str = "primes.txt";
pub const PRIMES_BINARY_FILE: &str = "primes.bin";
pub const EXECUTION_LOG_FILE: &str = "execution_log.txt";

/// `$XDG_DATA_HOME/segsieve`, falling back to `$HOME/.local/share/segsieve`.
pub fn data_dir() -> io::Result<PathBuf> {
    let xdg_data_home = env::var("XDG_DATA_HOME")
        .ok()
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
        .or_else(|| {
            env::var("HOME")
                .ok()
                .map(|home| PathBuf::from(home).join(".local/share"))
        })
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                "could not determine data directory (set XDG_DATA_HOME or HOME)",
            )
        })?;

    Ok(xdg_data_home.join(DATA_DIR_NAME))
}

fn create_truncated(path: &Path) -> io::Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;
    Ok(BufWriter::with_capacity(WRITE_BUFFER_BYTES, file))
}

/// Write one decimal prime per line.
/// Returns the number of primes written.
pub fn save_primes_text(path: &Path, primes: &[u64]) -> io::Result<usize> {
    let mut writer = create_truncated(path)?;

    // itoa skips the fmt machinery, which dominates for hundreds of millions of lines
    let mut itoa_buf = itoa::Buffer::new();
    for &prime in primes {
        writer.write_all(itoa_buf.format(prime).as_bytes())?;
        writer.write_all(b"\n")?;
    }

    writer.flush()?;
    Ok(primes.len())
}

/// Binary format: 8 bytes per prime (little-endian u64).
/// Returns the number of primes written.
pub fn save_primes_binary(path: &Path, primes: &[u64]) -> io::Result<usize> {
    let mut writer = create_truncated(path)?;
    for &prime in primes {
        writer.write_all(&prime.to_le_bytes())?;
    }
    writer.flush()?;
    Ok(primes.len())
}

pub fn load_primes_text(path: &Path) -> io::Result<Vec<u64>> {
    let reader = BufReader::new(File::open(path)?);
    let mut primes = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let prime = trimmed.parse::<u64>().map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("bad prime {:?}: {}", trimmed, e))
        })?;
        primes.push(prime);
    }
    Ok(primes)
}

pub fn load_primes_binary(path: &Path) -> io::Result<Vec<u64>> {
    let mut bytes = Vec::new();
    File::open(path)?.read_to_end(&mut bytes)?;
    if bytes.len() % 8 != 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{} is not a whole number of u64 values ({} bytes)", path.display(), bytes.len()),
        ));
    }
    Ok(bytes
        .chunks_exact(8)
        .map(|chunk| {
            let mut word = [0_u8; 8];
            word.copy_from_slice(chunk);
            u64::from_le_bytes(word)
        })
        .collect())
}

/// Append one line to the execution log in `dir`:
/// `timestamp | subcommand | args | strategy | Nus`
pub fn log_execution(
    dir: &Path,
    subcommand: &str,
    args: &str,
    strategy: &str,
    duration_us: u128,
) -> io::Result<()> {
    fs::create_dir_all(dir)?;

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(EXECUTION_LOG_FILE))?;

    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");

    writeln!(
        file,
        "{} | {} | {} | {} | {}us",
        timestamp, subcommand, args, strategy, duration_us
    )?;

    Ok(())
}
