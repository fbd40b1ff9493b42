//! beadchip: readers for Illumina bead-array genotyping files
//!
//! # Overview
//!
//! beadchip decodes the three binary files produced by an Illumina
//! genotyping run:
//!
//! - **BPM** manifest: the catalogue of loci on the chip
//! - **EGT** cluster file: per-locus genotype cluster statistics
//! - **GTC** genotype-call file: one sample's calls, intensities and metadata
//!
//! plus the CSV rendition of the manifest that ships alongside each BPM.
//!
//! ## Quick Start
//!
//! ```no_run
//! use beadchip::{ClusterSet, GenotypeCallStore, Manifest};
//!
//! # fn main() -> beadchip::Result<()> {
//! let manifest = Manifest::from_path("GSA-24v3-0_A1.bpm")?;
//! let clusters = ClusterSet::from_path("GSA-24v3-0_A1_ClusterFile.egt")?;
//! let mut gtc = GenotypeCallStore::open("205000000001_R01C01.gtc")?;
//!
//! let calls = gtc.base_calls()?;
//! for (name, call) in manifest.names().iter().zip(&calls) {
//!     if let Some(record) = clusters.get(name) {
//!         println!("{}\t{}\t{:.3}", name, call, record.score.total_score);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`formats`]: BPM, EGT, GTC and CSV manifest decoders
//! - [`io`]: File opening (gzip detection, memory mapping)
//! - [`config`]: Decode options
//! - [`error`]: Error type

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod error;
pub mod formats;
pub mod io;

// Re-export commonly used types
pub use config::DecodeOptions;
pub use error::{BeadchipError, Result};
pub use formats::bpm::{LocusEntry, Manifest};
pub use formats::csv_manifest::{CsvLocusEntry, CsvManifest};
pub use formats::egt::{ClusterRecord, ClusterScore, ClusterSet, ClusterStats};
pub use formats::gtc::{GenotypeCallStore, NormalizationTransform, ScannerData};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
