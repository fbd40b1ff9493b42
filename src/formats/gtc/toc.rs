//! GTC table of contents.
//!
//! The TOC maps a 16-bit field id to a 32-bit value. For most fields the
//! value is the byte offset of the field body; for a few small integer
//! fields (SNP count, ploidy, ploidy type) the value itself is the data.

use crate::error::Result;
use crate::formats::primitives::{read_count, read_i16, read_i32};
use std::collections::HashMap;
use std::io::{self, Read};

/// Field identifiers used in the GTC table of contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum FieldId {
    /// Number of SNPs (value stored in the TOC)
    NumSnps = 1,
    /// Ploidy (value stored in the TOC)
    Ploidy = 2,
    /// Ploidy type (value stored in the TOC)
    PloidyType = 3,
    /// Sample name
    SampleName = 10,
    /// Sample plate
    SamplePlate = 11,
    /// Sample well
    SampleWell = 12,
    /// Cluster file name
    ClusterFile = 100,
    /// SNP manifest name
    SnpManifest = 101,
    /// Imaging date
    ImagingDate = 200,
    /// AutoCall date
    AutocallDate = 201,
    /// AutoCall version
    AutocallVersion = 300,
    /// Normalization transforms
    NormalizationTransforms = 400,
    /// Control bead X intensities
    ControlsX = 500,
    /// Control bead Y intensities
    ControlsY = 501,
    /// Raw X intensities
    RawX = 1000,
    /// Raw Y intensities
    RawY = 1001,
    /// Genotype codes
    Genotypes = 1002,
    /// Base calls
    BaseCalls = 1003,
    /// Genotype scores
    GenotypeScores = 1004,
    /// Scanner data
    ScannerData = 1005,
    /// Call rate
    CallRate = 1006,
    /// Gender
    Gender = 1007,
    /// LogR deviation
    LogrDev = 1008,
    /// GC10 score
    Gc10 = 1009,
    /// GC50 score (followed by the call counters)
    Gc50 = 1011,
    /// B-allele frequencies
    BAlleleFreqs = 1012,
    /// LogR ratios
    LogrRatios = 1013,
    /// X percentiles
    PercentilesX = 1014,
    /// Y percentiles
    PercentilesY = 1015,
    /// Slide identifier
    SlideIdentifier = 1016,
}

impl FieldId {
    /// Raw TOC id.
    pub fn id(self) -> i16 {
        self as i16
    }
}

/// Decoded table of contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Toc {
    entries: HashMap<i16, i32>,
}

impl Toc {
    /// Read the int32 entry count and `(int16 id, int32 value)` pairs.
    ///
    /// A repeated id keeps its last value.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let count = read_count(reader)?;
        let mut entries = HashMap::new();
        for _ in 0..count {
            let id = read_i16(reader)?;
            let value = read_i32(reader)?;
            entries.insert(id, value);
        }
        Ok(Self { entries })
    }

    /// Raw value stored for a field.
    pub fn value(&self, field: FieldId) -> Option<i32> {
        self.entries.get(&field.id()).copied()
    }

    /// Byte offset of a field body.
    ///
    /// # Errors
    ///
    /// Returns an I/O error of kind `NotFound` if the field is absent, and
    /// `InvalidData` if the stored offset is negative.
    pub fn offset(&self, field: FieldId) -> Result<u64> {
        let value = self.value(field).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("GTC field {:?} ({}) not in table of contents", field, field.id()),
            )
        })?;
        u64::try_from(value).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("GTC field {:?} has negative offset {}", field, value),
            )
            .into()
        })
    }

    /// True if the field has an entry.
    pub fn contains(&self, field: FieldId) -> bool {
        self.entries.contains_key(&field.id())
    }

    /// All raw entries.
    pub fn entries(&self) -> &HashMap<i16, i32> {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
