//! GTC genotype-call file reader.
//!
//! A GTC file holds the output of genotype calling for a single sample:
//! per-locus genotype codes, base calls, scores, raw and normalized
//! intensities, plus sample and run metadata. The file starts with the
//! magic `gtc`, a one-byte version (3, 4 or 5) and a table of contents
//! mapping field ids to byte offsets.
//!
//! # Format
//!
//! ```text
//! "gtc" | version (u8) | toc count (i32) | (id i16, value i32) * count | field bodies...
//! ```
//!
//! Fields are decoded lazily through [`GenotypeCallStore`]: opening a store
//! reads only the table of contents.
//!
//! # Example
//!
//! ```no_run
//! use beadchip::{GenotypeCallStore, Manifest};
//!
//! # fn main() -> beadchip::Result<()> {
//! let manifest = Manifest::from_path("GSA-24v3-0_A1.bpm")?;
//! let mut gtc = GenotypeCallStore::open("sample.gtc")?;
//!
//! let (x, y) = gtc.normalized_intensities(manifest.normalization_ids())?;
//! println!("{} normalized pairs", x.len().min(y.len()));
//! # Ok(())
//! # }
//! ```

mod genotype;
mod store;
mod toc;
mod transform;

pub use genotype::{
    base_calls, genotype_composition, top_strand_call, GENOTYPE_CODES, MISSING_BASE_CALL,
};
pub use store::{GenotypeCallStore, ScannerData};
pub use toc::{FieldId, Toc};
pub use transform::{rect_to_polar, NormalizationTransform, TRANSFORM_BLOCK_SIZE};
