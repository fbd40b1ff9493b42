//! Fixture builders shared by the integration tests.
//!
//! Every builder produces the exact little-endian byte layout the decoders
//! expect, so tests can write small synthetic files with `tempfile`.

#![allow(dead_code)]

use beadchip::formats::primitives::write_string;
use std::io::Write;
use tempfile::NamedTempFile;

/// Route `log` output through the test harness (`RUST_LOG=debug`).
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Write bytes to a fresh temporary file.
pub fn temp_file(data: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(data).expect("Failed to write temp file");
    file.flush().expect("Failed to flush temp file");
    file
}

/// Write bytes to a temporary file with a given suffix (e.g. `.gtc`).
pub fn temp_file_with_suffix(data: &[u8], suffix: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("Failed to create temp file");
    file.write_all(data).expect("Failed to write temp file");
    file.flush().expect("Failed to flush temp file");
    file
}

/// Gzip-compress a buffer.
pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder =
        flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).expect("Failed to compress");
    encoder.finish().expect("Failed to finish gzip stream")
}

fn put_string(data: &mut Vec<u8>, value: &str) {
    write_string(data, value).expect("Writing to a Vec cannot fail");
}

// BPM -----------------------------------------------------------------------

/// One synthetic manifest locus.
#[derive(Debug, Clone)]
pub struct TestLocus {
    pub name: String,
    pub normalization_id: u8,
    pub chrom: String,
    pub map_info: String,
    pub address_a: i32,
    pub address_b: i32,
    pub entry_version: i32,
}

impl TestLocus {
    pub fn new(name: &str, normalization_id: u8, chrom: &str, map_info: i32) -> Self {
        Self {
            name: name.to_string(),
            normalization_id,
            chrom: chrom.to_string(),
            map_info: map_info.to_string(),
            address_a: 10_000 + i32::from(normalization_id),
            address_b: 0,
            entry_version: 8,
        }
    }
}

/// Serialize one locus entry in the version 8 layout.
pub fn locus_entry_bytes(locus: &TestLocus) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&locus.entry_version.to_le_bytes());
    put_string(&mut data, &format!("{}-131_T_F_2", locus.name));
    put_string(&mut data, &locus.name);
    for _ in 0..3 {
        put_string(&mut data, "");
    }
    data.extend_from_slice(&1i32.to_le_bytes());
    put_string(&mut data, "");
    put_string(&mut data, "TOP");
    put_string(&mut data, "[A/G]");
    put_string(&mut data, &locus.chrom);
    put_string(&mut data, "diploid");
    put_string(&mut data, "Homo sapiens");
    put_string(&mut data, &locus.map_info);
    put_string(&mut data, "");
    put_string(&mut data, "TOP");
    data.extend_from_slice(&locus.address_a.to_le_bytes());
    data.extend_from_slice(&locus.address_b.to_le_bytes());
    put_string(&mut data, "");
    put_string(&mut data, "");
    put_string(&mut data, "37");
    put_string(&mut data, "dbSNP");
    put_string(&mut data, "151");
    put_string(&mut data, "TOP");
    put_string(&mut data, "");
    data.extend_from_slice(&[0, 0, 0]);
    data.push(0);
    data.extend_from_slice(&[0u8; 16]);
    put_string(&mut data, "+");
    data
}

/// Serialize a complete manifest.
pub fn manifest_bytes(version: i32, name: &str, loci: &[TestLocus]) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(b"BPM");
    data.push(1);
    data.extend_from_slice(&version.to_le_bytes());
    put_string(&mut data, name);
    if version > 1 && version & 0x1000 == 0 {
        put_string(&mut data, "control config");
    }
    data.extend_from_slice(&(loci.len() as i32).to_le_bytes());
    for (i, _) in loci.iter().enumerate() {
        data.extend_from_slice(&(i as i32).to_le_bytes());
    }
    for locus in loci {
        put_string(&mut data, &locus.name);
    }
    for locus in loci {
        data.push(locus.normalization_id);
    }
    for locus in loci {
        data.extend_from_slice(&locus_entry_bytes(locus));
    }
    data
}

// EGT -----------------------------------------------------------------------

/// One synthetic cluster record: probe name and AA/AB/BB sample counts.
#[derive(Debug, Clone)]
pub struct TestCluster {
    pub name: String,
    pub counts: [i32; 3],
    pub address: i32,
}

impl TestCluster {
    pub fn new(name: &str, counts: [i32; 3], address: i32) -> Self {
        Self {
            name: name.to_string(),
            counts,
            address,
        }
    }
}

/// Serialize a complete cluster file.
///
/// Record `i` gets float values derived from `i` so tests can check them:
/// AA r_dev = i, AA r_mean = i + 0.5, intensity threshold = 0.25,
/// total score = 0.75, edited = odd `i`.
pub fn cluster_file_bytes(data_block_version: i32, clusters: &[TestCluster]) -> Vec<u8> {
    let trailing: Vec<[i32; 3]> = clusters.iter().map(|c| c.counts).collect();
    cluster_file_bytes_with_counts(data_block_version, clusters, &trailing)
}

/// Serialize a cluster file whose trailing count block is given explicitly.
pub fn cluster_file_bytes_with_counts(
    data_block_version: i32,
    clusters: &[TestCluster],
    trailing: &[[i32; 3]],
) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&3i32.to_le_bytes());
    for s in ["1.0.0", "3.0.0", "2.0.0", "1.1.0", "1/1/2020 10:00 AM"] {
        put_string(&mut data, s);
    }
    data.push(1);
    put_string(&mut data, "Test-24v1-0_A1.bpm");
    data.extend_from_slice(&data_block_version.to_le_bytes());
    put_string(&mut data, "cluster.egt");
    data.extend_from_slice(&(clusters.len() as i32).to_le_bytes());

    for (i, cluster) in clusters.iter().enumerate() {
        for n in cluster.counts {
            data.extend_from_slice(&n.to_le_bytes());
        }
        let base = i as f32;
        // R dev, R mean, theta dev, theta mean (AA, AB, BB each), threshold
        let floats = [
            base, 1.0, 2.0,
            base + 0.5, 1.5, 2.5,
            0.01, 0.02, 0.03,
            0.05, 0.5, 0.95,
            0.25,
        ];
        for v in floats {
            data.extend_from_slice(&v.to_le_bytes());
        }
        data.extend_from_slice(&[0u8; 14 * 4]);
    }

    for (i, _) in clusters.iter().enumerate() {
        data.extend_from_slice(&0.6f32.to_le_bytes());
        data.extend_from_slice(&0.75f32.to_le_bytes());
        data.extend_from_slice(&0.7f32.to_le_bytes());
        data.push((i % 2) as u8);
    }

    for _ in clusters {
        put_string(&mut data, "AB");
    }
    for cluster in clusters {
        put_string(&mut data, &cluster.name);
    }
    for cluster in clusters {
        data.extend_from_slice(&cluster.address.to_le_bytes());
    }
    for counts in trailing {
        for n in counts {
            data.extend_from_slice(&n.to_le_bytes());
        }
    }
    data
}

// GTC -----------------------------------------------------------------------

/// Assemble a GTC file from TOC values and field bodies.
///
/// Offsets are computed from the header size (`3 + 1 + 4 + 6 * entries`)
/// and the body lengths, in the order bodies were added.
#[derive(Debug, Default)]
pub struct GtcBuilder {
    version: u8,
    values: Vec<(i16, i32)>,
    fields: Vec<(i16, Vec<u8>)>,
}

impl GtcBuilder {
    pub fn new(version: u8) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }

    /// TOC entry whose value is the data itself (ids 1, 2, 3).
    pub fn value(mut self, id: i16, value: i32) -> Self {
        self.values.push((id, value));
        self
    }

    /// Field body stored after the TOC.
    pub fn field(mut self, id: i16, body: Vec<u8>) -> Self {
        self.fields.push((id, body));
        self
    }

    pub fn string(self, id: i16, value: &str) -> Self {
        let mut body = Vec::new();
        put_string(&mut body, value);
        self.field(id, body)
    }

    pub fn float(self, id: i16, value: f32) -> Self {
        self.field(id, value.to_le_bytes().to_vec())
    }

    pub fn f32_array(self, id: i16, values: &[f32]) -> Self {
        let mut body = (values.len() as i32).to_le_bytes().to_vec();
        for v in values {
            body.extend_from_slice(&v.to_le_bytes());
        }
        self.field(id, body)
    }

    pub fn i16_array(self, id: i16, values: &[i16]) -> Self {
        let mut body = (values.len() as i32).to_le_bytes().to_vec();
        for v in values {
            body.extend_from_slice(&v.to_le_bytes());
        }
        self.field(id, body)
    }

    pub fn u16_array(self, id: i16, values: &[u16]) -> Self {
        let mut body = (values.len() as i32).to_le_bytes().to_vec();
        for v in values {
            body.extend_from_slice(&v.to_le_bytes());
        }
        self.field(id, body)
    }

    pub fn byte_array(self, id: i16, values: &[u8]) -> Self {
        let mut body = (values.len() as i32).to_le_bytes().to_vec();
        body.extend_from_slice(values);
        self.field(id, body)
    }

    /// Base calls: count followed by two letters per locus.
    pub fn base_calls(self, pairs: &[[u8; 2]]) -> Self {
        let mut body = (pairs.len() as i32).to_le_bytes().to_vec();
        for pair in pairs {
            body.extend_from_slice(pair);
        }
        self.field(1003, body)
    }

    /// GC50 score followed by the call counters.
    pub fn gc50(self, gc50: f32, calls: i32, no_calls: i32, intensity_only: i32) -> Self {
        let mut body = gc50.to_le_bytes().to_vec();
        for n in [calls, no_calls, intensity_only] {
            body.extend_from_slice(&n.to_le_bytes());
        }
        self.field(1011, body)
    }

    /// Normalization transforms as 52-byte blocks.
    pub fn transforms(self, transforms: &[[f32; 6]]) -> Self {
        let mut body = (transforms.len() as i32).to_le_bytes().to_vec();
        for t in transforms {
            let mut block = 1i32.to_le_bytes().to_vec();
            for v in t {
                block.extend_from_slice(&v.to_le_bytes());
            }
            block.resize(52, 0);
            body.extend_from_slice(&block);
        }
        self.field(400, body)
    }

    pub fn build(&self) -> Vec<u8> {
        let entries = self.values.len() + self.fields.len();
        let mut data = Vec::new();
        data.extend_from_slice(b"gtc");
        data.push(self.version);
        data.extend_from_slice(&(entries as i32).to_le_bytes());

        for (id, value) in &self.values {
            data.extend_from_slice(&id.to_le_bytes());
            data.extend_from_slice(&value.to_le_bytes());
        }

        let mut offset = 3 + 1 + 4 + 6 * entries;
        for (id, body) in &self.fields {
            data.extend_from_slice(&id.to_le_bytes());
            data.extend_from_slice(&(offset as i32).to_le_bytes());
            offset += body.len();
        }

        for (_, body) in &self.fields {
            data.extend_from_slice(body);
        }
        data
    }
}
