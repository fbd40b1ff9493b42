//! Delimited-text manifest reader.
//!
//! Illumina ships every BPM manifest alongside a CSV rendition with the same
//! loci and a few extra columns (probe sequences, bead set, expected
//! clusters). The file has a `[Heading]` section, an `[Assay]` section whose
//! first row names the columns (starting with `IlmnID`), and a trailing
//! `[Controls]` section:
//!
//! ```text
//! Illumina, Inc.
//! [Heading]
//! Descriptor File Name,GSA-24v3-0_A1.bpm
//! [Assay]
//! IlmnID,Name,IlmnStrand,SNP,AddressA_ID,...
//! rs1-131_T_F_2,rs1,TOP,[A/G],0012345,...
//! [Controls]
//! ...
//! ```
//!
//! Only the assay rows are decoded. Columns are resolved by header name, so
//! their order does not matter and absent columns read as empty strings.

use crate::config::DecodeOptions;
use crate::error::{BeadchipError, Result};
use crate::io::open_source;
use log::debug;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// First column of the assay header row.
const HEADER_MARKER: &str = "IlmnID";

/// Row that ends the assay section.
const CONTROLS_MARKER: &str = "[Controls]";

/// One assay row of a CSV manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvLocusEntry {
    /// Illumina identifier
    pub ilmn_id: String,
    /// Locus name
    pub name: String,
    /// Illumina strand designation
    pub ilmn_strand: String,
    /// SNP alleles, e.g. `[A/G]`
    pub snp: String,
    /// Address of the A probe
    pub address_a_id: String,
    /// A probe sequence
    pub allele_a_probe_seq: String,
    /// Address of the B probe
    pub address_b_id: String,
    /// B probe sequence
    pub allele_b_probe_seq: String,
    /// Genome build
    pub genome_build: String,
    /// Chromosome
    pub chr: String,
    /// Position on the chromosome
    pub map_info: i32,
    /// Ploidy
    pub ploidy: String,
    /// Species
    pub species: String,
    /// Annotation source
    pub source: String,
    /// Annotation source version
    pub source_version: String,
    /// Source strand
    pub source_strand: String,
    /// Source sequence
    pub source_seq: String,
    /// Top genomic sequence
    pub top_genomic_seq: String,
    /// Bead set identifier
    pub bead_set_id: String,
    /// Expected number of clusters
    pub exp_clusters: String,
    /// Reference strand
    pub ref_strand: String,
}

/// Decoded CSV manifest: ordered locus names and a name → entry map.
#[derive(Debug, Clone, Default)]
pub struct CsvManifest {
    names: Vec<String>,
    loci: HashMap<String, CsvLocusEntry>,
}

/// Column positions resolved from the header row.
#[derive(Debug)]
struct Columns {
    index: HashMap<String, usize>,
}

impl Columns {
    fn from_header(header: &csv::StringRecord) -> Self {
        let mut index = HashMap::new();
        for (i, column) in header.iter().enumerate() {
            // First occurrence wins
            index.entry(column.trim().to_string()).or_insert(i);
        }
        Self { index }
    }

    fn get<'r>(&self, record: &'r csv::StringRecord, column: &str) -> &'r str {
        self.index
            .get(column)
            .and_then(|&i| record.get(i))
            .unwrap_or("")
    }

    fn string(&self, record: &csv::StringRecord, column: &str) -> String {
        self.get(record, column).to_string()
    }

    fn parse(&self, record: &csv::StringRecord) -> Result<CsvLocusEntry> {
        let raw_map_info = self.get(record, "MapInfo");
        let map_info = raw_map_info
            .trim()
            .parse::<i32>()
            .map_err(|_| BeadchipError::Encoding {
                field: "MapInfo",
                value: raw_map_info.to_string(),
            })?;

        Ok(CsvLocusEntry {
            ilmn_id: self.string(record, "IlmnID"),
            name: self.string(record, "Name"),
            ilmn_strand: self.string(record, "IlmnStrand"),
            snp: self.string(record, "SNP"),
            address_a_id: self.string(record, "AddressA_ID"),
            allele_a_probe_seq: self.string(record, "AlleleA_ProbeSeq"),
            address_b_id: self.string(record, "AddressB_ID"),
            allele_b_probe_seq: self.string(record, "AlleleB_ProbeSeq"),
            genome_build: self.string(record, "GenomeBuild"),
            chr: self.string(record, "Chr"),
            map_info,
            ploidy: self.string(record, "Ploidy"),
            species: self.string(record, "Species"),
            source: self.string(record, "Source"),
            source_version: self.string(record, "SourceVersion"),
            source_strand: self.string(record, "SourceStrand"),
            source_seq: self.string(record, "SourceSeq"),
            top_genomic_seq: self.string(record, "TopGenomicSeq"),
            bead_set_id: self.string(record, "BeadSetID"),
            exp_clusters: self.string(record, "Exp_Clusters"),
            ref_strand: self.string(record, "RefStrand"),
        })
    }
}

impl CsvManifest {
    /// Decode a CSV manifest file (optionally gzip-compressed).
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The file cannot be opened
    /// - The header row has no `Name` column
    /// - A MapInfo value is not an integer
    /// - The CSV itself is malformed
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_path_with(path, &DecodeOptions::default())
    }

    /// Decode a CSV manifest file with explicit options.
    pub fn from_path_with<P: AsRef<Path>>(path: P, options: &DecodeOptions) -> Result<Self> {
        let reader = open_source(path, options)?;
        Self::from_reader(reader)
    }

    /// Decode a CSV manifest from any reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut manifest = Self::default();
        let mut columns: Option<Columns> = None;

        for record in rdr.records() {
            let record = record?;
            let first = record.get(0).unwrap_or("").trim();

            if first == CONTROLS_MARKER {
                break;
            }

            if columns.is_none() {
                if first == HEADER_MARKER {
                    let cols = Columns::from_header(&record);
                    if !cols.index.contains_key("Name") {
                        return Err(BeadchipError::format(
                            "CSV manifest header has no Name column",
                        ));
                    }
                    columns = Some(cols);
                }
                continue;
            }
            let Some(cols) = columns.as_ref() else {
                continue;
            };

            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }

            let entry = cols.parse(&record)?;
            manifest.names.push(entry.name.clone());
            manifest.loci.insert(entry.name.clone(), entry);
        }

        debug!("CSV manifest: {} loci", manifest.names.len());
        Ok(manifest)
    }

    /// Locus names in file order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Entries keyed by locus name.
    pub fn loci(&self) -> &HashMap<String, CsvLocusEntry> {
        &self.loci
    }

    /// Look up one locus by name.
    pub fn locus(&self, name: &str) -> Option<&CsvLocusEntry> {
        self.loci.get(name)
    }

    /// Number of assay rows.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True if the manifest has no assay rows.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
