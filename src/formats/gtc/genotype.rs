//! Genotype codes and base-call decoding.
//!
//! A GTC file stores one genotype code per locus. The code indexes a fixed
//! table of allele compositions: `NC` (no call), the diploid calls `AA`,
//! `AB`, `BB`, `NULL`, the haploid calls `A` and `B`, then every
//! composition of 3 to 8 alleles ordered by the number of `B` alleles.

use crate::error::{BeadchipError, Result};

/// Allele composition for each genotype code.
pub static GENOTYPE_CODES: [&str; 46] = [
    "NC", "AA", "AB", "BB", "NULL", "A", "B",
    "AAA", "AAB", "ABB", "BBB",
    "AAAA", "AAAB", "AABB", "ABBB", "BBBB",
    "AAAAA", "AAAAB", "AAABB", "AABBB", "ABBBB", "BBBBB",
    "AAAAAA", "AAAAAB", "AAAABB", "AAABBB", "AABBBB", "ABBBBB", "BBBBBB",
    "AAAAAAA", "AAAAAAB", "AAAAABB", "AAAABBB", "AAABBBB", "AABBBBB", "ABBBBBB", "BBBBBBB",
    "AAAAAAAA", "AAAAAAAB", "AAAAAABB", "AAAAABBB", "AAAABBBB", "AAABBBBB", "AABBBBBB",
    "ABBBBBBB", "BBBBBBBB",
];

/// Composition of the no-call code.
pub const NO_CALL: &str = "NC";

/// Composition of the null code.
pub const NULL_CALL: &str = "NULL";

/// Base call emitted for no-call and null genotypes.
pub const MISSING_BASE_CALL: &str = "-";

/// Ploidy type whose base calls are stored verbatim.
pub const HAPLOID_VERBATIM_PLOIDY_TYPE: i32 = 1;

/// Allele composition for a genotype code, if the code is known.
///
/// ```
/// use beadchip::formats::gtc::genotype_composition;
///
/// assert_eq!(genotype_composition(2), Some("AB"));
/// assert_eq!(genotype_composition(46), None);
/// ```
pub fn genotype_composition(code: u8) -> Option<&'static str> {
    GENOTYPE_CODES.get(usize::from(code)).copied()
}

/// Build the top-strand call for one locus from its genotype code and raw
/// allele letters. `A` in the composition maps to `allele_a`, `B` to
/// `allele_b`; no-call and null codes yield `-`.
pub fn top_strand_call(code: u8, allele_a: u8, allele_b: u8) -> Result<String> {
    let composition = genotype_composition(code)
        .ok_or_else(|| BeadchipError::format(format!("unknown genotype code {}", code)))?;

    if composition == NO_CALL || composition == NULL_CALL {
        return Ok(MISSING_BASE_CALL.to_string());
    }

    Ok(composition
        .bytes()
        .map(|allele| {
            if allele == b'A' {
                char::from(allele_a)
            } else {
                char::from(allele_b)
            }
        })
        .collect())
}

/// Decode base calls from raw allele-letter pairs.
///
/// `pairs` holds two bytes per locus. For ploidy type 1 the pair is copied
/// verbatim; otherwise each locus is rebuilt from its genotype code.
pub fn base_calls(ploidy_type: i32, genotypes: &[u8], pairs: &[u8]) -> Result<Vec<String>> {
    pairs
        .chunks_exact(2)
        .enumerate()
        .map(|(locus, pair)| {
            if ploidy_type == HAPLOID_VERBATIM_PLOIDY_TYPE {
                return Ok(pair.iter().map(|&b| char::from(b)).collect());
            }
            let code = genotypes.get(locus).copied().ok_or_else(|| {
                BeadchipError::format(format!("no genotype code for locus {}", locus))
            })?;
            top_strand_call(code, pair[0], pair[1])
        })
        .collect()
}
