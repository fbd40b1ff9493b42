//! TOC-indexed random-access reader over a GTC file.

use super::genotype;
use super::toc::{FieldId, Toc};
use super::transform::{NormalizationTransform, TRANSFORM_BLOCK_SIZE};
use crate::error::{BeadchipError, Result};
use crate::formats::primitives::{
    read_bytes, read_count, read_f32, read_f32_array, read_i16_array, read_i32, read_string,
    read_u16_array, read_u8,
};
use log::{debug, trace};
use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// GTC magic bytes.
const GTC_MAGIC: &[u8; 3] = b"gtc";

/// Readable GTC file versions.
const SUPPORTED_VERSIONS: [u8; 3] = [3, 4, 5];

/// First version that stores B-allele frequencies and LogR ratios.
const COPY_NUMBER_MIN_VERSION: u8 = 4;

/// Number of bytes inspected by [`GenotypeCallStore::is_gtc_file`].
const SNIFF_LEN: usize = 512;

/// Scanner metadata recorded when the array was imaged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannerData {
    /// Scanner name
    pub name: String,
    /// Green PMT gain
    pub pmt_green: i32,
    /// Red PMT gain
    pub pmt_red: i32,
    /// Scanner software version
    pub version: String,
    /// Operator
    pub user: String,
}

/// Random-access reader over one GTC file.
///
/// The table of contents is read when the store is opened; every accessor
/// seeks to its field and decodes it on demand. The store owns its reader
/// exclusively. Accessors take `&mut self` because each one moves the
/// shared seek position, so a store cannot be used from several threads
/// without external locking.
///
/// Genotype codes are cached after the first read.
///
/// # Example
///
/// ```no_run
/// use beadchip::GenotypeCallStore;
///
/// # fn main() -> beadchip::Result<()> {
/// let mut gtc = GenotypeCallStore::open("sample.gtc")?;
/// println!("{}: call rate {}", gtc.sample_name()?, gtc.call_rate()?);
///
/// let calls = gtc.base_calls()?;
/// println!("first call: {}", calls[0]);
///
/// gtc.close();
/// assert!(gtc.call_rate().is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct GenotypeCallStore<R = BufReader<File>> {
    reader: Option<R>,
    name: String,
    version: u8,
    toc: Toc,
    genotypes: Option<Vec<u8>>,
}

impl GenotypeCallStore<BufReader<File>> {
    /// Open a GTC file and read its table of contents.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The file cannot be opened
    /// - The magic bytes are not "gtc"
    /// - The version is not 3, 4 or 5
    /// - The table of contents is truncated
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), path.to_string_lossy())
    }

    /// Check whether a file looks like a GTC file.
    ///
    /// True when the file starts with `gtc` and its first 512 bytes are
    /// binary. A text file that happens to start with "gtc" (for example a
    /// list of paths under a `gtc/` directory) is rejected.
    pub fn is_gtc_file<P: AsRef<Path>>(path: P) -> Result<bool> {
        let mut file = File::open(path)?;
        let mut head = Vec::with_capacity(SNIFF_LEN);
        file.by_ref().take(SNIFF_LEN as u64).read_to_end(&mut head)?;
        Ok(head.len() > GTC_MAGIC.len() && head.starts_with(GTC_MAGIC) && !looks_like_text(&head))
    }
}

impl<R: Read + Seek> GenotypeCallStore<R> {
    /// Open a GTC store over any seekable reader.
    ///
    /// `name` is the source file name; its stem is the fallback sample name.
    /// The reader must be positioned at the start of the GTC data.
    pub fn from_reader(mut reader: R, name: impl Into<String>) -> Result<Self> {
        let name = name.into();

        let magic = read_bytes(&mut reader, GTC_MAGIC.len())?;
        if magic[..] != GTC_MAGIC[..] {
            return Err(BeadchipError::format(format!(
                "invalid GTC magic: expected {:?}, got {:?}",
                GTC_MAGIC, magic
            )));
        }

        let version = read_u8(&mut reader)?;
        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(BeadchipError::format(format!(
                "unsupported GTC file version {}",
                version
            )));
        }

        let toc = Toc::read(&mut reader)?;
        debug!("GTC {}: version {}, {} TOC entries", name, version, toc.len());

        Ok(Self {
            reader: Some(reader),
            name,
            version,
            toc,
            genotypes: None,
        })
    }

    /// GTC file version.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Table of contents.
    pub fn toc(&self) -> &Toc {
        &self.toc
    }

    /// Source name given at open time.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True until [`close`](Self::close) is called.
    pub fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    /// Release the underlying reader. Every later accessor fails with
    /// [`BeadchipError::Closed`].
    pub fn close(&mut self) {
        if self.reader.take().is_some() {
            debug!("GTC {}: closed", self.name);
        }
        self.genotypes = None;
    }

    fn ensure_open(&self) -> Result<()> {
        if self.reader.is_some() {
            Ok(())
        } else {
            Err(BeadchipError::Closed)
        }
    }

    fn require_version(&self, min: u8, what: &'static str) -> Result<()> {
        if self.version < min {
            return Err(BeadchipError::VersionUnsupported {
                what,
                version: i32::from(self.version),
            });
        }
        Ok(())
    }

    fn seek_to(&mut self, offset: u64) -> Result<&mut R> {
        let reader = self.reader.as_mut().ok_or(BeadchipError::Closed)?;
        reader.seek(SeekFrom::Start(offset))?;
        Ok(reader)
    }

    fn seek_field(&mut self, field: FieldId) -> Result<&mut R> {
        self.ensure_open()?;
        let offset = self.toc.offset(field)?;
        trace!("GTC {}: {:?} at offset {}", self.name, field, offset);
        self.seek_to(offset)
    }

    fn toc_value(&self, field: FieldId) -> Result<i32> {
        self.ensure_open()?;
        self.toc.value(field).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("GTC field {:?} not in table of contents", field),
            )
            .into()
        })
    }

    fn float_field(&mut self, field: FieldId) -> Result<f32> {
        read_f32(self.seek_field(field)?)
    }

    fn string_field(&mut self, field: FieldId) -> Result<String> {
        read_string(self.seek_field(field)?)
    }

    /// Counters stored directly after the GC50 score.
    fn gc50_counter(&mut self, delta: u64) -> Result<i32> {
        self.ensure_open()?;
        let offset = self.toc.offset(FieldId::Gc50)? + delta;
        read_i32(self.seek_to(offset)?)
    }

    // Scalars ---------------------------------------------------------------

    /// Number of SNPs, stored in the TOC itself.
    pub fn num_snps(&self) -> Result<i32> {
        self.toc_value(FieldId::NumSnps)
    }

    /// Ploidy, stored in the TOC itself.
    pub fn ploidy(&self) -> Result<i32> {
        self.toc_value(FieldId::Ploidy)
    }

    /// Ploidy type, stored in the TOC itself.
    pub fn ploidy_type(&self) -> Result<i32> {
        self.toc_value(FieldId::PloidyType)
    }

    /// Call rate.
    pub fn call_rate(&mut self) -> Result<f32> {
        self.float_field(FieldId::CallRate)
    }

    /// LogR deviation.
    pub fn logr_dev(&mut self) -> Result<f32> {
        self.float_field(FieldId::LogrDev)
    }

    /// GenCall score, 10th percentile.
    pub fn gc10(&mut self) -> Result<f32> {
        self.float_field(FieldId::Gc10)
    }

    /// GenCall score, 50th percentile.
    pub fn gc50(&mut self) -> Result<f32> {
        self.float_field(FieldId::Gc50)
    }

    /// Number of calls (int32 at GC50 offset + 4).
    pub fn num_calls(&mut self) -> Result<i32> {
        self.gc50_counter(4)
    }

    /// Number of no-calls (int32 at GC50 offset + 8).
    pub fn num_no_calls(&mut self) -> Result<i32> {
        self.gc50_counter(8)
    }

    /// Number of intensity-only loci (int32 at GC50 offset + 12).
    pub fn num_intensity_only(&mut self) -> Result<i32> {
        self.gc50_counter(12)
    }

    /// Gender as a single character (`M`, `F` or `U`).
    pub fn gender(&mut self) -> Result<char> {
        Ok(char::from(read_u8(self.seek_field(FieldId::Gender)?)?))
    }

    // Strings ---------------------------------------------------------------

    /// Sample name; falls back to the source file stem when empty.
    pub fn sample_name(&mut self) -> Result<String> {
        let name = self.string_field(FieldId::SampleName)?;
        if !name.is_empty() {
            return Ok(name);
        }
        let stem = Path::new(&self.name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        debug!("GTC {}: empty sample name, using {:?}", self.name, stem);
        Ok(stem)
    }

    /// Sample plate.
    pub fn sample_plate(&mut self) -> Result<String> {
        self.string_field(FieldId::SamplePlate)
    }

    /// Sample well.
    pub fn sample_well(&mut self) -> Result<String> {
        self.string_field(FieldId::SampleWell)
    }

    /// Name of the cluster file used for calling.
    pub fn cluster_file(&mut self) -> Result<String> {
        self.string_field(FieldId::ClusterFile)
    }

    /// Name of the SNP manifest used for calling.
    pub fn snp_manifest(&mut self) -> Result<String> {
        self.string_field(FieldId::SnpManifest)
    }

    /// Imaging date.
    pub fn imaging_date(&mut self) -> Result<String> {
        self.string_field(FieldId::ImagingDate)
    }

    /// AutoCall date.
    pub fn autocall_date(&mut self) -> Result<String> {
        self.string_field(FieldId::AutocallDate)
    }

    /// AutoCall version.
    pub fn autocall_version(&mut self) -> Result<String> {
        self.string_field(FieldId::AutocallVersion)
    }

    /// Slide identifier.
    pub fn slide_identifier(&mut self) -> Result<String> {
        self.string_field(FieldId::SlideIdentifier)
    }

    /// Scanner metadata.
    pub fn scanner_data(&mut self) -> Result<ScannerData> {
        let reader = self.seek_field(FieldId::ScannerData)?;
        Ok(ScannerData {
            name: read_string(reader)?,
            pmt_green: read_i32(reader)?,
            pmt_red: read_i32(reader)?,
            version: read_string(reader)?,
            user: read_string(reader)?,
        })
    }

    // Calls -----------------------------------------------------------------

    /// Genotype code per locus, indexing
    /// [`GENOTYPE_CODES`](super::GENOTYPE_CODES).
    ///
    /// Read once and cached for the life of the store.
    pub fn genotypes(&mut self) -> Result<&[u8]> {
        self.ensure_open()?;
        if self.genotypes.is_none() {
            let reader = self.seek_field(FieldId::Genotypes)?;
            let count = read_count(reader)?;
            let codes = read_bytes(reader, count)?;
            debug!("GTC {}: cached {} genotype codes", self.name, codes.len());
            self.genotypes = Some(codes);
        }
        Ok(self.genotypes.as_deref().unwrap_or_default())
    }

    /// Top-strand base calls, one string per locus (`-` for no-calls).
    pub fn base_calls(&mut self) -> Result<Vec<String>> {
        let ploidy_type = self.ploidy_type()?;
        self.genotypes()?;

        let reader = self.seek_field(FieldId::BaseCalls)?;
        let count = read_count(reader)?;
        let len = count.checked_mul(2).ok_or_else(|| {
            BeadchipError::format(format!("base call count {} is too large", count))
        })?;
        let pairs = read_bytes(reader, len)?;

        let genotypes = self.genotypes.as_deref().unwrap_or_default();
        genotype::base_calls(ploidy_type, genotypes, &pairs)
    }

    /// Genotype scores.
    pub fn genotype_scores(&mut self) -> Result<Vec<f32>> {
        let reader = self.seek_field(FieldId::GenotypeScores)?;
        let count = read_count(reader)?;
        read_f32_array(reader, count)
    }

    /// B-allele frequencies (GTC version 4 and later).
    pub fn b_allele_freqs(&mut self) -> Result<Vec<f32>> {
        self.require_version(COPY_NUMBER_MIN_VERSION, "B allele frequencies")?;
        let reader = self.seek_field(FieldId::BAlleleFreqs)?;
        let count = read_count(reader)?;
        read_f32_array(reader, count)
    }

    /// LogR ratios (GTC version 4 and later).
    pub fn logr_ratios(&mut self) -> Result<Vec<f32>> {
        self.require_version(COPY_NUMBER_MIN_VERSION, "LogR ratios")?;
        let reader = self.seek_field(FieldId::LogrRatios)?;
        let count = read_count(reader)?;
        read_f32_array(reader, count)
    }

    // Intensities -----------------------------------------------------------

    fn i16_field(&mut self, field: FieldId) -> Result<Vec<i16>> {
        let reader = self.seek_field(field)?;
        let count = read_count(reader)?;
        read_i16_array(reader, count)
    }

    fn u16_field(&mut self, field: FieldId) -> Result<Vec<u16>> {
        let reader = self.seek_field(field)?;
        let count = read_count(reader)?;
        read_u16_array(reader, count)
    }

    /// Raw X intensities of assay bead types.
    pub fn raw_x_intensities(&mut self) -> Result<Vec<i16>> {
        self.i16_field(FieldId::RawX)
    }

    /// Raw Y intensities of assay bead types.
    pub fn raw_y_intensities(&mut self) -> Result<Vec<i16>> {
        self.i16_field(FieldId::RawY)
    }

    /// X intensities of control bead types.
    pub fn control_x_intensities(&mut self) -> Result<Vec<u16>> {
        self.u16_field(FieldId::ControlsX)
    }

    /// Y intensities of control bead types.
    pub fn control_y_intensities(&mut self) -> Result<Vec<u16>> {
        self.u16_field(FieldId::ControlsY)
    }

    /// 5th, 50th and 95th percentile of X intensity.
    pub fn percentiles_x(&mut self) -> Result<Vec<u16>> {
        self.u16_field(FieldId::PercentilesX)
    }

    /// 5th, 50th and 95th percentile of Y intensity.
    pub fn percentiles_y(&mut self) -> Result<Vec<u16>> {
        self.u16_field(FieldId::PercentilesY)
    }

    /// Per-bin normalization transforms.
    ///
    /// Each transform occupies a 52-byte block of which only the first 28
    /// bytes are decoded.
    pub fn normalization_transforms(&mut self) -> Result<Vec<NormalizationTransform>> {
        let reader = self.seek_field(FieldId::NormalizationTransforms)?;
        let count = read_count(reader)?;
        let mut transforms = Vec::with_capacity(count.min(u8::MAX as usize + 1));
        for _ in 0..count {
            let block = read_bytes(reader, TRANSFORM_BLOCK_SIZE)?;
            transforms.push(NormalizationTransform::read(&mut block.as_slice())?);
        }
        Ok(transforms)
    }

    /// Normalized X and Y intensities.
    ///
    /// `lookup_ids[i]` selects the transform for locus `i`; these are the
    /// manifest's normalization ids in canonical order. Negative results are
    /// clamped to 0 and `(0, 0)` raw pairs yield NaN.
    ///
    /// # Errors
    ///
    /// Returns a format error if the raw X and Y arrays differ in length,
    /// if fewer lookup ids than loci are given, or if a lookup id has no
    /// transform.
    pub fn normalized_intensities(&mut self, lookup_ids: &[u8]) -> Result<(Vec<f32>, Vec<f32>)> {
        let transforms = self.normalization_transforms()?;
        let raw_x = self.raw_x_intensities()?;
        let raw_y = self.raw_y_intensities()?;

        if raw_x.len() != raw_y.len() {
            return Err(BeadchipError::format(format!(
                "raw X has {} loci but raw Y has {}",
                raw_x.len(),
                raw_y.len()
            )));
        }
        if lookup_ids.len() < raw_x.len() {
            return Err(BeadchipError::format(format!(
                "{} normalization lookups for {} loci",
                lookup_ids.len(),
                raw_x.len()
            )));
        }

        let mut xs = Vec::with_capacity(raw_x.len());
        let mut ys = Vec::with_capacity(raw_y.len());
        for ((&x, &y), &lookup) in raw_x.iter().zip(&raw_y).zip(lookup_ids) {
            let transform = transforms.get(usize::from(lookup)).ok_or_else(|| {
                BeadchipError::format(format!(
                    "normalization lookup {} out of range ({} transforms)",
                    lookup,
                    transforms.len()
                ))
            })?;
            let (nx, ny) = transform.normalize_intensities(f32::from(x), f32::from(y), true);
            xs.push(nx);
            ys.push(ny);
        }
        Ok((xs, ys))
    }
}

/// Control bytes that never appear in text files.
fn looks_like_text(head: &[u8]) -> bool {
    !head.iter().any(|&b| {
        matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn header(version: u8, entries: &[(i16, i32)]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(b"gtc");
        data.push(version);
        data.extend_from_slice(&(entries.len() as i32).to_le_bytes());
        for (id, value) in entries {
            data.extend_from_slice(&id.to_le_bytes());
            data.extend_from_slice(&value.to_le_bytes());
        }
        data
    }

    #[test]
    fn test_open_reads_toc() {
        let data = header(5, &[(1, 10), (2, 2), (3, 1)]);
        let store = GenotypeCallStore::from_reader(Cursor::new(data), "a.gtc").unwrap();
        assert_eq!(store.version(), 5);
        assert_eq!(store.toc().len(), 3);
        assert_eq!(store.num_snps().unwrap(), 10);
        assert_eq!(store.ploidy().unwrap(), 2);
        assert_eq!(store.ploidy_type().unwrap(), 1);
    }

    #[test]
    fn test_bad_magic_and_version() {
        let mut data = header(5, &[]);
        data[0] = b'G';
        assert!(matches!(
            GenotypeCallStore::from_reader(Cursor::new(data), "a.gtc"),
            Err(BeadchipError::Format { .. })
        ));

        let data = header(6, &[]);
        assert!(matches!(
            GenotypeCallStore::from_reader(Cursor::new(data), "a.gtc"),
            Err(BeadchipError::Format { .. })
        ));
    }

    #[test]
    fn test_closed_store() {
        let data = header(5, &[(1, 10)]);
        let mut store = GenotypeCallStore::from_reader(Cursor::new(data), "a.gtc").unwrap();
        store.close();
        assert!(!store.is_open());
        assert!(matches!(store.num_snps(), Err(BeadchipError::Closed)));
        assert!(matches!(store.call_rate(), Err(BeadchipError::Closed)));
        assert!(matches!(store.genotypes(), Err(BeadchipError::Closed)));
    }

    #[test]
    fn test_looks_like_text() {
        assert!(looks_like_text(b"gtc/sample1.gtc\ngtc/sample2.gtc\n"));
        assert!(!looks_like_text(b"gtc\x05\x1d\x00\x00\x00"));
    }
}
