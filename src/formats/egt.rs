//! EGT (cluster definition) decoding.
//!
//! A cluster file holds, for every probe, the polar-coordinate statistics of
//! the AA, AB and BB genotype clusters plus a cluster-quality score.
//!
//! # Format
//!
//! ```text
//! EGT:
//! - int32: version (3)
//! - 5 x string: gencall, cluster, call, normalization versions, date created
//! - byte: is-WGT flag (non-zero)
//! - string: manifest name
//! - int32: data block version (8 or 9; only 9 has a decodable record layout)
//! - string: file name (unused)
//! - int32: record count N
//! - N x cluster record: 3 x int32 N, 13 x float32, 14 x float32 (unused)
//! - N x cluster score: 3 x float32, byte edited
//! - N x string: genotype labels (unused)
//! - N x string: probe names
//! - N x int32: bead addresses
//! - N x 3 x int32: AA/AB/BB counts (repeat of the record N values)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use beadchip::ClusterSet;
//!
//! # fn main() -> beadchip::Result<()> {
//! let clusters = ClusterSet::from_path("cluster.egt")?;
//! if let Some(record) = clusters.get("rs12345") {
//!     println!("AB theta mean: {}", record.ab.theta_mean);
//! }
//! # Ok(())
//! # }
//! ```

use crate::config::DecodeOptions;
use crate::error::{BeadchipError, Result};
use crate::formats::primitives::{
    read_count, read_f32, read_f32_array, read_i32, read_i32_array, read_string, read_u8,
    skip_bytes,
};
use crate::io::open_source;
use log::debug;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// Supported cluster file version.
const EGT_VERSION: i32 = 3;

/// Data block version with an implemented record layout.
const RECORD_LAYOUT_VERSION: i32 = 9;

/// Number of meaningful float32 values per cluster record.
const RECORD_FLOATS: usize = 13;

/// Number of trailing float32 values per record that are skipped.
const RESERVED_RECORD_FLOATS: usize = 14;

/// Upper bound on speculative pre-allocation from a file-declared count.
const PREALLOC_LIMIT: usize = 1 << 20;

/// Statistics of one genotype cluster.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClusterStats {
    /// Mean normalized theta
    pub theta_mean: f32,
    /// Standard deviation of normalized theta
    pub theta_dev: f32,
    /// Mean normalized R
    pub r_mean: f32,
    /// Standard deviation of normalized R
    pub r_dev: f32,
    /// Number of samples in the cluster
    pub n: i32,
}

/// Cluster quality scores for one probe.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClusterScore {
    /// Cluster separation score
    pub cluster_separation: f32,
    /// Total score
    pub total_score: f32,
    /// Original score
    pub original_score: f32,
    /// Whether the cluster was manually edited
    pub edited: bool,
}

/// Cluster definition for one probe.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClusterRecord {
    /// AA cluster
    pub aa: ClusterStats,
    /// AB cluster
    pub ab: ClusterStats,
    /// BB cluster
    pub bb: ClusterStats,
    /// Intensity threshold
    pub intensity_threshold: f32,
    /// Cluster scores
    pub score: ClusterScore,
    /// Bead address of the probe
    pub address: i32,
}

/// Decoded EGT cluster file.
#[derive(Debug, Clone)]
pub struct ClusterSet {
    gencall_version: String,
    cluster_version: String,
    call_version: String,
    normalization_version: String,
    date_created: String,
    manifest_name: String,
    data_block_version: i32,
    records: HashMap<String, ClusterRecord>,
}

impl ClusterSet {
    /// Decode a cluster file from a path (gzip-compressed files accepted).
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_path_with(path, &DecodeOptions::default())
    }

    /// Decode a cluster file from a path with explicit options.
    pub fn from_path_with<P: AsRef<Path>>(path: P, options: &DecodeOptions) -> Result<Self> {
        let mut reader = open_source(path, options)?;
        Self::from_reader_with(&mut reader, options)
    }

    /// Decode a cluster file from any byte stream with default options.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The version is not 3 or the file is not a WGT cluster file
    /// - The data block version is not 8 or 9
    /// - Records are present under data block version 8 (no decodable layout)
    /// - The redundant cluster counts disagree with the record counts
    /// - The stream ends early
    pub fn from_reader<R: Read>(reader: &mut R) -> Result<Self> {
        Self::from_reader_with(reader, &DecodeOptions::default())
    }

    /// Decode a cluster file from any byte stream.
    pub fn from_reader_with<R: Read>(reader: &mut R, options: &DecodeOptions) -> Result<Self> {
        let version = read_i32(reader)?;
        if version != EGT_VERSION {
            return Err(BeadchipError::format(format!(
                "cluster file version {} not supported",
                version
            )));
        }

        let gencall_version = read_string(reader)?;
        let cluster_version = read_string(reader)?;
        let call_version = read_string(reader)?;
        let normalization_version = read_string(reader)?;
        let date_created = read_string(reader)?;

        if read_u8(reader)? == 0 {
            return Err(BeadchipError::format("only WGT cluster files are supported"));
        }

        let manifest_name = read_string(reader)?;

        let data_block_version = read_i32(reader)?;
        if data_block_version != 8 && data_block_version != 9 {
            return Err(BeadchipError::format(format!(
                "data block version {} not supported",
                data_block_version
            )));
        }

        // File name, unused.
        read_string(reader)?;

        let num_records = read_count(reader)?;
        debug!(
            "EGT header: manifest={:?}, data block version={}, records={}",
            manifest_name, data_block_version, num_records
        );

        let capacity = num_records.min(PREALLOC_LIMIT);
        let mut records = Vec::with_capacity(capacity);
        for _ in 0..num_records {
            records.push(read_cluster_record(reader, data_block_version)?);
        }

        for record in records.iter_mut() {
            record.score = read_cluster_score(reader)?;
        }

        // Genotype labels, unused.
        for _ in 0..num_records {
            read_string(reader)?;
        }

        let mut names = Vec::with_capacity(capacity);
        for _ in 0..num_records {
            names.push(read_string(reader)?);
        }

        let addresses = read_i32_array(reader, num_records)?;
        for (record, address) in records.iter_mut().zip(addresses) {
            record.address = address;
        }

        if options.verify_cluster_counts() {
            for (index, record) in records.iter().enumerate() {
                let counts = [read_i32(reader)?, read_i32(reader)?, read_i32(reader)?];
                let expected = [record.aa.n, record.ab.n, record.bb.n];
                if counts != expected {
                    return Err(BeadchipError::format(format!(
                        "cluster counts {:?} for record {} disagree with record counts {:?}",
                        counts, index, expected
                    )));
                }
            }
        } else {
            let len = num_records.checked_mul(12).ok_or_else(|| {
                BeadchipError::format(format!("record count {} is too large", num_records))
            })?;
            skip_bytes(reader, len)?;
        }

        let records: HashMap<String, ClusterRecord> = names.into_iter().zip(records).collect();
        debug!("EGT decoded: {} unique probe names", records.len());

        Ok(Self {
            gencall_version,
            cluster_version,
            call_version,
            normalization_version,
            date_created,
            manifest_name,
            data_block_version,
            records,
        })
    }

    /// GenCall version string
    pub fn gencall_version(&self) -> &str {
        &self.gencall_version
    }

    /// Clustering algorithm version string
    pub fn cluster_version(&self) -> &str {
        &self.cluster_version
    }

    /// Calling algorithm version string
    pub fn call_version(&self) -> &str {
        &self.call_version
    }

    /// Normalization algorithm version string
    pub fn normalization_version(&self) -> &str {
        &self.normalization_version
    }

    /// Creation date as stored in the file
    pub fn date_created(&self) -> &str {
        &self.date_created
    }

    /// Name of the manifest the clusters were built for
    pub fn manifest_name(&self) -> &str {
        &self.manifest_name
    }

    /// Data block version
    pub fn data_block_version(&self) -> i32 {
        self.data_block_version
    }

    /// All cluster records keyed by probe name
    pub fn records(&self) -> &HashMap<String, ClusterRecord> {
        &self.records
    }

    /// Look up a cluster record by probe name
    pub fn get(&self, name: &str) -> Option<&ClusterRecord> {
        self.records.get(name)
    }

    /// Number of distinct probe names
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if the file holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Read one cluster record body (address and score are filled in later).
///
/// Float layout: R-dev x3, R-mean x3, theta-dev x3, theta-mean x3, threshold.
fn read_cluster_record<R: Read>(reader: &mut R, data_block_version: i32) -> Result<ClusterRecord> {
    if data_block_version != RECORD_LAYOUT_VERSION {
        return Err(BeadchipError::VersionUnsupported {
            what: "cluster record layout",
            version: data_block_version,
        });
    }

    let aa_n = read_i32(reader)?;
    let ab_n = read_i32(reader)?;
    let bb_n = read_i32(reader)?;
    let v = read_f32_array(reader, RECORD_FLOATS)?;
    skip_bytes(reader, RESERVED_RECORD_FLOATS * 4)?;

    let stats = |class: usize, n: i32| ClusterStats {
        theta_mean: v[9 + class],
        theta_dev: v[6 + class],
        r_mean: v[3 + class],
        r_dev: v[class],
        n,
    };

    Ok(ClusterRecord {
        aa: stats(0, aa_n),
        ab: stats(1, ab_n),
        bb: stats(2, bb_n),
        intensity_threshold: v[12],
        ..ClusterRecord::default()
    })
}

fn read_cluster_score<R: Read>(reader: &mut R) -> Result<ClusterScore> {
    Ok(ClusterScore {
        cluster_separation: read_f32(reader)?,
        total_score: read_f32(reader)?,
        original_score: read_f32(reader)?,
        edited: read_u8(reader)? != 0,
    })
}
