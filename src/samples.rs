//! Sample index alignment between the variant file and the tract file
//!
//! The variant file lists samples once; the tract file lists two haplotype
//! columns per sample (`<sample>.0`, `<sample>.1`) in its own order. Both are
//! mapped onto one ascending-by-name sample order so that position `i` in
//! every aligned vector refers to the same sample.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised while aligning sample orders.
#[derive(Debug, Error)]
pub enum SampleError {
    /// Subset file could not be read.
    #[error("failed to read subset file {path}: {source}")]
    SubsetIo {
        /// Subset file path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A retained sample has no haplotype column in the tract file.
    #[error("sample '{sample}' has no '{sample}.{suffix}' haplotype column in the tract file")]
    MissingHaplotype {
        /// Sample name.
        sample: String,
        /// Missing haplotype suffix (0 or 1).
        suffix: char,
    },

    /// Nothing left after subsetting.
    #[error("no samples retained after applying the sample subset")]
    NoSamples,
}

/// Read a subset file: the first whitespace-delimited token of each line.
///
/// Blank lines and lines starting with `#` are ignored.
pub fn read_subset(path: &Path) -> Result<HashSet<String>, SampleError> {
    let io_err = |source| SampleError::SubsetIo {
        path: path.display().to_string(),
        source,
    };
    let reader = BufReader::new(File::open(path).map_err(io_err)?);
    parse_subset(reader).map_err(io_err)
}

/// Parse subset names from any buffered reader.
pub fn parse_subset<R: BufRead>(reader: R) -> std::io::Result<HashSet<String>> {
    let mut names = HashSet::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim_start().starts_with('#') {
            continue;
        }
        if let Some(first) = line.split_whitespace().next() {
            names.insert(first.to_string());
        }
    }
    Ok(names)
}

/// Split a haplotype column name into base sample name and suffix.
///
/// Splits on the last `.` so sample names may themselves contain dots.
pub fn split_haplotype(name: &str) -> Option<(&str, char)> {
    let (base, suffix) = name.rsplit_once('.')?;
    match suffix {
        "0" => Some((base, '0')),
        "1" => Some((base, '1')),
        _ => None,
    }
}

/// Positional mapping shared by the variant source and the tract cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleAlignment {
    names: Vec<String>,
    variant_index: Vec<usize>,
    haplotype_a: Vec<usize>,
    haplotype_b: Vec<usize>,
}

impl SampleAlignment {
    /// Build the mapping.
    ///
    /// `variant_samples` is the variant file's sample order, `haplotypes`
    /// the tract file's haplotype header, and `subset` an optional set of
    /// names to keep (default: every variant-file sample). Subset names not
    /// present in the variant file are dropped with a warning.
    pub fn build(
        variant_samples: &[String],
        haplotypes: &[String],
        subset: Option<&HashSet<String>>,
    ) -> Result<Self, SampleError> {
        if let Some(subset) = subset {
            let known: HashSet<&str> = variant_samples.iter().map(String::as_str).collect();
            let dropped: BTreeSet<&str> = subset
                .iter()
                .map(String::as_str)
                .filter(|name| !known.contains(name))
                .collect();
            if !dropped.is_empty() {
                warn!(
                    count = dropped.len(),
                    first = dropped.iter().next().copied().unwrap_or_default(),
                    "subset names absent from the variant file were dropped"
                );
            }
        }

        let mut variant_order: Vec<usize> = (0..variant_samples.len())
            .filter(|&i| subset.map_or(true, |keep| keep.contains(&variant_samples[i])))
            .collect();
        variant_order.sort_by(|&a, &b| variant_samples[a].cmp(&variant_samples[b]));
        variant_order.dedup_by(|a, b| variant_samples[*a] == variant_samples[*b]);

        if variant_order.is_empty() {
            return Err(SampleError::NoSamples);
        }

        let mut columns: HashMap<(&str, char), usize> = HashMap::with_capacity(haplotypes.len());
        for (column, name) in haplotypes.iter().enumerate() {
            if let Some(key) = split_haplotype(name) {
                columns.entry(key).or_insert(column);
            }
        }

        let lookup = |sample: &str, suffix: char| {
            columns
                .get(&(sample, suffix))
                .copied()
                .ok_or_else(|| SampleError::MissingHaplotype {
                    sample: sample.to_string(),
                    suffix,
                })
        };

        let mut names = Vec::with_capacity(variant_order.len());
        let mut haplotype_a = Vec::with_capacity(variant_order.len());
        let mut haplotype_b = Vec::with_capacity(variant_order.len());
        for &index in &variant_order {
            let sample = variant_samples[index].as_str();
            haplotype_a.push(lookup(sample, '0')?);
            haplotype_b.push(lookup(sample, '1')?);
            names.push(sample.to_string());
        }

        debug!(
            samples = names.len(),
            variant_samples = variant_samples.len(),
            haplotype_columns = haplotypes.len(),
            "aligned sample orders"
        );

        Ok(Self {
            names,
            variant_index: variant_order,
            haplotype_a,
            haplotype_b,
        })
    }

    /// Number of retained samples.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no samples are retained (never true for a built alignment).
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Retained sample names, ascending.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Variant-file sample index for each aligned position.
    pub fn variant_index(&self) -> &[usize] {
        &self.variant_index
    }

    /// Tract-file column of the `.0` haplotype for each aligned position.
    pub fn haplotype_a(&self) -> &[usize] {
        &self.haplotype_a
    }

    /// Tract-file column of the `.1` haplotype for each aligned position.
    pub fn haplotype_b(&self) -> &[usize] {
        &self.haplotype_b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn aligns_both_sources_by_sample_name() {
        let variant_samples = strings(&["s3", "s1", "s2"]);
        let haplotypes = strings(&["s2.0", "s2.1", "s3.0", "s3.1", "s1.0", "s1.1"]);

        let alignment = SampleAlignment::build(&variant_samples, &haplotypes, None).unwrap();
        assert_eq!(alignment.names(), &strings(&["s1", "s2", "s3"])[..]);
        assert_eq!(alignment.variant_index(), &[1, 2, 0]);
        assert_eq!(alignment.haplotype_a(), &[4, 0, 2]);
        assert_eq!(alignment.haplotype_b(), &[5, 1, 3]);
    }

    #[test]
    fn subset_restricts_and_drops_unknown_names() {
        let variant_samples = strings(&["b", "a", "c"]);
        let haplotypes = strings(&["a.0", "a.1", "b.0", "b.1", "c.0", "c.1"]);
        let subset: HashSet<String> = strings(&["c", "a", "ghost"]).into_iter().collect();

        let alignment =
            SampleAlignment::build(&variant_samples, &haplotypes, Some(&subset)).unwrap();
        assert_eq!(alignment.names(), &strings(&["a", "c"])[..]);
        assert_eq!(alignment.variant_index(), &[1, 2]);
        assert_eq!(alignment.haplotype_a(), &[0, 4]);
    }

    #[test]
    fn names_with_separators_keep_cross_source_order() {
        // "A-1.0" sorts before "A.0" as raw strings while "A" sorts before "A-1".
        let variant_samples = strings(&["A-1", "A"]);
        let haplotypes = strings(&["A-1.0", "A-1.1", "A.0", "A.1"]);

        let alignment = SampleAlignment::build(&variant_samples, &haplotypes, None).unwrap();
        assert_eq!(alignment.names(), &strings(&["A", "A-1"])[..]);
        assert_eq!(alignment.haplotype_a(), &[2, 0]);
        assert_eq!(alignment.haplotype_b(), &[3, 1]);
    }

    #[test]
    fn missing_haplotype_column_is_fatal() {
        let variant_samples = strings(&["x", "y"]);
        let haplotypes = strings(&["x.0", "x.1", "y.0"]);
        match SampleAlignment::build(&variant_samples, &haplotypes, None) {
            Err(SampleError::MissingHaplotype { sample, suffix }) => {
                assert_eq!(sample, "y");
                assert_eq!(suffix, '1');
            }
            other => panic!("expected missing haplotype error, got {other:?}"),
        }
    }

    #[test]
    fn empty_subset_intersection_is_fatal() {
        let variant_samples = strings(&["x"]);
        let haplotypes = strings(&["x.0", "x.1"]);
        let subset: HashSet<String> = strings(&["nobody"]).into_iter().collect();
        assert!(matches!(
            SampleAlignment::build(&variant_samples, &haplotypes, Some(&subset)),
            Err(SampleError::NoSamples)
        ));
    }

    #[test]
    fn subset_parser_takes_first_token() {
        let text = "# header\nsampleA extra columns\n\n  sampleB\n";
        let names = parse_subset(text.as_bytes()).unwrap();
        assert_eq!(names.len(), 2);
        assert!(names.contains("sampleA"));
        assert!(names.contains("sampleB"));
    }

    #[test]
    fn haplotype_names_split_on_last_dot() {
        assert_eq!(split_haplotype("NA.12878.1"), Some(("NA.12878", '1')));
        assert_eq!(split_haplotype("HG00096.0"), Some(("HG00096", '0')));
        assert_eq!(split_haplotype("HG00096.2"), None);
        assert_eq!(split_haplotype("HG00096"), None);
    }
}
