//! Phased variant input.
//!
//! The statistics engine only needs positional fields and one
//! `(haplotype .0, haplotype .1)` value pair per sample, so variant files sit
//! behind the [`VariantSource`] trait. [`HtslibVariantSource`] reads indexed
//! VCF/BCF regions; [`MemoryVariantSource`] serves records held in memory.

mod htslib;

pub use htslib::HtslibVariantSource;

use thiserror::Error;

/// Errors raised while reading variant records.
#[derive(Debug, Error)]
pub enum VariantSourceError {
    /// Failure reported by htslib.
    #[error("htslib error: {0}")]
    Htslib(#[from] rust_htslib::errors::Error),

    /// Region chromosome is not in the file header.
    #[error("contig '{0}' is not present in the variant file header")]
    UnknownContig(String),

    /// A sample's genotype or dosage could not be used.
    #[error("{chrom}:{pos} sample '{sample}': {reason}")]
    InvalidGenotype {
        /// Chromosome of the record.
        chrom: String,
        /// 1-based position of the record.
        pos: u64,
        /// Sample name.
        sample: String,
        /// What was wrong.
        reason: String,
    },
}

/// Which per-sample field supplies haplotype values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaplotypeField {
    /// `GT` hard calls (0 or 1 per haplotype).
    Genotype,
    /// `HDS` haplotype dosages in `[0, 1]`.
    Dosage,
}

/// One variant with per-sample haplotype values in source sample order.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantRecord {
    /// Chromosome name.
    pub chrom: String,
    /// 1-based position.
    pub pos: u64,
    /// Identifier, `.` when missing.
    pub id: String,
    /// Reference allele.
    pub reference: String,
    /// Alternate alleles (may be empty).
    pub alternates: Vec<String>,
    /// `(haplotype .0, haplotype .1)` per sample. `NaN` marks a missing
    /// allele or dosage, or a genotype that is not diploid.
    pub haplotypes: Vec<[f64; 2]>,
}

impl VariantRecord {
    /// First alternate allele, or `.` when there is none.
    pub fn alternate(&self) -> &str {
        self.alternates.first().map_or(".", String::as_str)
    }

    /// More than one alternate allele.
    pub fn is_multiallelic(&self) -> bool {
        self.alternates.len() > 1
    }
}

/// Sorted stream of variant records over one queried region.
pub trait VariantSource {
    /// Sample names in the order used by [`VariantRecord::haplotypes`].
    fn samples(&self) -> &[String];

    /// Contig names declared by the source, in header order.
    fn contigs(&self) -> Vec<String>;

    /// Next record, or `None` at the end of the region.
    fn next_record(&mut self) -> Option<Result<VariantRecord, VariantSourceError>>;
}

/// Records held in memory, served in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryVariantSource {
    samples: Vec<String>,
    contigs: Vec<String>,
    records: std::collections::VecDeque<VariantRecord>,
}

impl MemoryVariantSource {
    /// Source over `records` for `samples`.
    pub fn new(samples: Vec<String>, records: Vec<VariantRecord>) -> Self {
        Self {
            samples,
            contigs: Vec::new(),
            records: records.into(),
        }
    }

    /// Declare contigs reported through [`VariantSource::contigs`].
    pub fn with_contigs(mut self, contigs: Vec<String>) -> Self {
        self.contigs = contigs;
        self
    }
}

impl VariantSource for MemoryVariantSource {
    fn samples(&self) -> &[String] {
        &self.samples
    }

    fn contigs(&self) -> Vec<String> {
        self.contigs.clone()
    }

    fn next_record(&mut self) -> Option<Result<VariantRecord, VariantSourceError>> {
        self.records.pop_front().map(Ok)
    }
}
