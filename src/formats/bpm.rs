//! BPM (bead pool manifest) decoding.
//!
//! A manifest lists every probe on the array in a canonical order together
//! with its normalization bin and a per-locus annotation record.
//!
//! # Format
//!
//! ```text
//! BPM:
//! - 3 bytes: magic "BPM"
//! - 1 byte: reserved
//! - int32: version (0x1000 flag -> stored as 0)
//! - string: manifest name
//! - string: control config (version > 1 only)
//! - int32: locus count N
//! - N x int32: unused
//! - N x string: probe names (canonical order)
//! - N x byte: normalization ids (< 100)
//! - N x locus entry (version 8 layout, see read_locus_entry)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use beadchip::Manifest;
//!
//! # fn main() -> beadchip::Result<()> {
//! let manifest = Manifest::from_path("GSA-24v3-0_A1.bpm")?;
//! println!("{}: {} loci", manifest.name(), manifest.num_loci());
//!
//! for locus in manifest.loci_in_order() {
//!     println!("{}\t{}\t{}", locus.name, locus.chrom, locus.map_info);
//! }
//! # Ok(())
//! # }
//! ```

use crate::config::DecodeOptions;
use crate::error::{BeadchipError, Result};
use crate::formats::primitives::{
    read_bytes, read_count, read_i32, read_string, read_u8, skip_bytes,
};
use crate::io::open_source;
use log::debug;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// BPM magic bytes.
const BPM_MAGIC: &[u8; 3] = b"BPM";

/// Version bit that zeroes the stored version.
const VERSION_FLAG: i32 = 0x1000;

/// Normalization ids must be below this value.
const MAX_NORMALIZATION_ID: u8 = 100;

/// The only locus-entry layout that can be decoded.
const LOCUS_ENTRY_VERSION: i32 = 8;

/// Upper bound on speculative pre-allocation from a file-declared count.
const PREALLOC_LIMIT: usize = 1 << 20;

/// One probe's annotation record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocusEntry {
    /// Record layout version (always 8 for decoded entries)
    pub version: i32,
    /// Illumina probe identifier
    pub ilmn_id: String,
    /// Probe name (map key)
    pub name: String,
    /// SNP alleles, e.g. `[A/G]`
    pub snp: String,
    /// Chromosome
    pub chrom: String,
    /// Map position
    pub map_info: i32,
    /// Bead address of allele A
    pub address_a: i32,
    /// Bead address of allele B (0 for Infinium II)
    pub address_b: i32,
    /// Assay type byte
    pub assay_type: u8,
    /// Reference strand
    pub ref_strand: String,
    /// Source strand
    pub source_strand: String,
    /// Illumina strand
    pub ilmn_strand: String,
    /// Genome build
    pub genome_build: String,
    /// Source of the annotation
    pub source: String,
    /// Source version
    pub source_version: String,
    /// Ploidy
    pub ploidy: String,
    /// Species
    pub species: String,
}

/// Decoded BPM manifest.
///
/// An immutable snapshot: all loci are decoded up front and the file is
/// released before the manifest is returned.
#[derive(Debug, Clone)]
pub struct Manifest {
    version: i32,
    name: String,
    control_config: Option<String>,
    num_loci: usize,
    names: Vec<String>,
    normalization_ids: Vec<u8>,
    loci: HashMap<String, LocusEntry>,
}

impl Manifest {
    /// Decode a manifest from a file path.
    ///
    /// Gzip-compressed manifests are decompressed transparently.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The file cannot be opened
    /// - The magic bytes are not "BPM"
    /// - A normalization id is out of range
    /// - A locus entry has an unsupported version or a non-empty reserved field
    /// - The file ends early
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_path_with(path, &DecodeOptions::default())
    }

    /// Decode a manifest from a file path with explicit options.
    pub fn from_path_with<P: AsRef<Path>>(path: P, options: &DecodeOptions) -> Result<Self> {
        let mut reader = open_source(path, options)?;
        Self::from_reader(&mut reader)
    }

    /// Decode a manifest from any byte stream.
    pub fn from_reader<R: Read>(reader: &mut R) -> Result<Self> {
        let magic = read_bytes(reader, BPM_MAGIC.len())?;
        if magic[..] != BPM_MAGIC[..] {
            return Err(BeadchipError::format(format!(
                "invalid BPM magic: expected {:?}, got {:?}",
                BPM_MAGIC, magic
            )));
        }
        read_u8(reader)?;

        let mut version = read_i32(reader)?;
        if version & VERSION_FLAG == VERSION_FLAG {
            // The flag zeroes the whole version rather than clearing the bit.
            version = 0;
        }

        let name = read_string(reader)?;
        let control_config = if version > 1 {
            Some(read_string(reader)?)
        } else {
            None
        };

        let num_loci = read_count(reader)?;
        debug!(
            "BPM header: version={}, name={:?}, loci={}",
            version, name, num_loci
        );
        skip_bytes(
            reader,
            num_loci.checked_mul(4).ok_or_else(|| {
                BeadchipError::format(format!("locus count {} is too large", num_loci))
            })?,
        )?;

        let mut names = Vec::with_capacity(num_loci.min(PREALLOC_LIMIT));
        for _ in 0..num_loci {
            names.push(read_string(reader)?);
        }

        let normalization_ids = read_bytes(reader, num_loci)?;
        if let Some((index, id)) = normalization_ids
            .iter()
            .enumerate()
            .find(|(_, &id)| id >= MAX_NORMALIZATION_ID)
        {
            return Err(BeadchipError::format(format!(
                "invalid normalization id {} for locus {}",
                id, index
            )));
        }

        let mut loci = HashMap::with_capacity(num_loci.min(PREALLOC_LIMIT));
        for _ in 0..num_loci {
            let entry = read_locus_entry(reader)?;
            loci.insert(entry.name.clone(), entry);
        }
        debug!("BPM decoded: {} unique locus entries", loci.len());

        Ok(Self {
            version,
            name,
            control_config,
            num_loci,
            names,
            normalization_ids,
            loci,
        })
    }

    /// Manifest format version (0 when the 0x1000 flag was set).
    pub fn version(&self) -> i32 {
        self.version
    }

    /// Manifest name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Control configuration, present for versions above 1.
    pub fn control_config(&self) -> Option<&str> {
        self.control_config.as_deref()
    }

    /// Declared number of loci.
    pub fn num_loci(&self) -> usize {
        self.num_loci
    }

    /// Probe names in canonical order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Normalization bin per locus, in canonical order.
    ///
    /// These are the lookup ids expected by
    /// [`GenotypeCallStore::normalized_intensities`](crate::GenotypeCallStore::normalized_intensities).
    pub fn normalization_ids(&self) -> &[u8] {
        &self.normalization_ids
    }

    /// All locus entries keyed by probe name.
    pub fn loci(&self) -> &HashMap<String, LocusEntry> {
        &self.loci
    }

    /// Look up a locus entry by probe name.
    pub fn locus(&self, name: &str) -> Option<&LocusEntry> {
        self.loci.get(name)
    }

    /// Locus entries following the canonical name order.
    ///
    /// Names without an entry of the same name are skipped.
    pub fn loci_in_order(&self) -> impl Iterator<Item = &LocusEntry> + '_ {
        self.names.iter().filter_map(move |name| self.loci.get(name))
    }

    /// Number of distinct locus entries.
    pub fn len(&self) -> usize {
        self.loci.len()
    }

    /// True if the manifest has no locus entries.
    pub fn is_empty(&self) -> bool {
        self.loci.is_empty()
    }
}

/// Read a reserved string that must be empty.
fn read_placeholder<R: Read>(reader: &mut R, position: &str) -> Result<()> {
    let value = read_string(reader)?;
    if !value.is_empty() {
        return Err(BeadchipError::format(format!(
            "reserved field {} of locus entry must be empty, got {:?}",
            position, value
        )));
    }
    Ok(())
}

/// Read one locus entry.
///
/// Only the version 8 layout is decodable:
///
/// ```text
/// int32 version, ilmn_id, name, 3 x reserved, int32 index, reserved,
/// ilmn_strand, snp, chrom, ploidy, species, map_info (decimal string),
/// reserved, source_strand, int32 address_a, int32 address_b, 2 x reserved,
/// genome_build, source, source_version, source_strand (repeat), reserved,
/// 3 bytes, byte assay_type, 16 bytes, ref_strand
/// ```
pub fn read_locus_entry<R: Read>(reader: &mut R) -> Result<LocusEntry> {
    let version = read_i32(reader)?;
    match version {
        LOCUS_ENTRY_VERSION => {}
        6 | 7 => {
            return Err(BeadchipError::VersionUnsupported {
                what: "locus entry layout",
                version,
            })
        }
        _ => {
            return Err(BeadchipError::format(format!(
                "unknown locus entry version {}",
                version
            )))
        }
    }

    let ilmn_id = read_string(reader)?;
    let name = read_string(reader)?;
    for position in ["1", "2", "3"] {
        read_placeholder(reader, position)?;
    }
    // Descending locus index; carries no information.
    read_i32(reader)?;
    read_placeholder(reader, "4")?;

    let ilmn_strand = read_string(reader)?;
    let snp = read_string(reader)?;
    let chrom = read_string(reader)?;
    let ploidy = read_string(reader)?;
    let species = read_string(reader)?;

    let raw_map_info = read_string(reader)?;
    let map_info = raw_map_info
        .parse::<i32>()
        .map_err(|_| BeadchipError::Encoding {
            field: "MapInfo",
            value: raw_map_info.clone(),
        })?;
    read_placeholder(reader, "5")?;

    let source_strand = read_string(reader)?;
    let address_a = read_i32(reader)?;
    let address_b = read_i32(reader)?;
    read_placeholder(reader, "6")?;
    read_placeholder(reader, "7")?;

    let genome_build = read_string(reader)?;
    let source = read_string(reader)?;
    let source_version = read_string(reader)?;
    // Second copy of the source strand.
    read_string(reader)?;
    read_placeholder(reader, "8")?;

    skip_bytes(reader, 3)?;
    let assay_type = read_u8(reader)?;
    // Four float32 fraction fields, unused.
    skip_bytes(reader, 16)?;
    let ref_strand = read_string(reader)?;

    Ok(LocusEntry {
        version,
        ilmn_id,
        name,
        snp,
        chrom,
        map_info,
        address_a,
        address_b,
        assay_type,
        ref_strand,
        source_strand,
        ilmn_strand,
        genome_build,
        source,
        source_version,
        ploidy,
        species,
    })
}
