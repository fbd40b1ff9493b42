//! Illumina bead-array file format decoders.
//!
//! - [`bpm`]: BPM manifest (locus catalogue)
//! - [`egt`]: EGT cluster file (per-locus cluster statistics)
//! - [`gtc`]: GTC genotype-call file (per-sample calls and intensities)
//! - [`csv_manifest`]: CSV rendition of the manifest
//! - [`primitives`]: little-endian scalars, arrays and length-prefixed strings
//!
//! BPM and EGT files are decoded eagerly in one sequential pass. GTC files
//! are read lazily through their table of contents.
//!
//! All binary values are little-endian. Every decoder fails fast: a short
//! read, bad magic or out-of-range value returns an error and no partial
//! result.

pub mod bpm;
pub mod csv_manifest;
pub mod egt;
pub mod gtc;
pub mod primitives;
