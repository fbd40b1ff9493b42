//! Smart opening of local manifest and cluster files.
//!
//! BPM and EGT files are decoded in one sequential pass, so they are opened
//! as a single `BufRead` stream:
//!
//! - gzip-compressed files (magic `1f 8b`) are decompressed on the fly
//! - files at or above [`DecodeOptions::mmap_threshold`] are memory-mapped
//! - everything else goes through a `BufReader<File>`
//!
//! GTC files are not opened here; they need `Seek` for TOC-based access.

use crate::config::DecodeOptions;
use crate::error::Result;
use flate2::bufread::MultiGzDecoder;
use log::debug;
use memmap2::Mmap;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::Path;

/// Gzip magic bytes (31, 139)
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Open a local file for sequential decoding.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be opened, mapped or peeked.
///
/// # Example
///
/// ```no_run
/// use beadchip::io::open_source;
/// use beadchip::DecodeOptions;
///
/// # fn main() -> beadchip::Result<()> {
/// let reader = open_source("cluster.egt.gz", &DecodeOptions::default())?;
/// # Ok(())
/// # }
/// ```
pub fn open_source<P: AsRef<Path>>(
    path: P,
    options: &DecodeOptions,
) -> Result<Box<dyn BufRead + Send>> {
    let path = path.as_ref();
    let mut reader = open_local_file(path, options.mmap_threshold())?;

    let is_gzipped = {
        let peeked = reader.fill_buf()?;
        peeked.len() >= 2 && peeked[..2] == GZIP_MAGIC
    };

    if is_gzipped {
        debug!("{}: gzip-compressed, decompressing while decoding", path.display());
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(reader))))
    } else {
        Ok(reader)
    }
}

fn open_local_file(path: &Path, mmap_threshold: u64) -> Result<Box<dyn BufRead + Send>> {
    let file_size = std::fs::metadata(path)?.len();

    // Zero-length files cannot be mapped on every platform.
    if file_size > 0 && file_size >= mmap_threshold {
        debug!("{}: {} bytes, memory-mapping", path.display(), file_size);
        open_mmap_file(path)
    } else {
        let file = File::open(path)?;
        Ok(Box::new(BufReader::new(file)))
    }
}

fn open_mmap_file(path: &Path) -> Result<Box<dyn BufRead + Send>> {
    let file = File::open(path)?;
    // SAFETY: the mapping is read-only and dropped with the returned reader.
    // Concurrent truncation of the file by another process is not supported.
    let mmap = unsafe { Mmap::map(&file)? };
    Ok(Box::new(Cursor::new(mmap)))
}
