//! I/O module: opening local files for decoding
//!
//! Sequential decoders (BPM, EGT, CSV) read through [`open_source`], which
//! detects gzip compression and memory-maps large files. GTC stores open
//! their own seekable file handle.

pub mod source;

pub use source::open_source;
