//! # tractdose: local-ancestry tract extraction
//!
//! Merges an RFMix `.msp.tsv` tract file with a phased VCF/BCF and reports,
//! for every variant inside the tracts, allele frequencies and haplotype
//! counts split by ancestry component.
//!
//! ## Pipeline
//!
//! 1. **Tract header**: components, haplotype columns and the covered span
//! 2. **Sample alignment**: VCF samples matched to their `.0`/`.1` columns
//! 3. **Merge**: each variant pulls a forward-only tract cursor to the
//!    interval covering it
//! 4. **Site statistics**: dosage, hapcount, AF, fraction and optional R²
//!    per component, with an allele flip toward the minor allele
//! 5. **Outputs**: annotated sites VCF plus PLINK-style dosage and
//!    covariate matrices
//!
//! ## Usage Example
//!
//! ```ignore
//! use tractdose::{ExtractConfig, Extractor, Region};
//!
//! let region = Region::parse("chr22")?;
//! let config = ExtractConfig::new("cohort.msp.tsv", "cohort.bcf", "out/cohort", region);
//! let summary = Extractor::new(config).run()?;
//! println!("{} sites written", summary.sites_written);
//! ```

#![warn(missing_docs, missing_debug_implementations)]

pub mod config; // Paths, region, modes, compression
pub mod output; // Sites VCF and matrix writers
pub mod pipeline; // Two-stream merge loop
pub mod samples; // Subset file and sample/haplotype alignment
pub mod stats; // Per-site ancestry statistics
pub mod tracts; // RFMix tract file and cursor
pub mod variants; // Variant record source

pub use config::{Codec, Compression, ConfigError, ExtractConfig, OutputModes, Region};
pub use output::{OutputSink, SiteFormatter};
pub use pipeline::{extract, RunSummary};
pub use samples::{SampleAlignment, SampleError};
pub use stats::{SiteStatistics, StatsOptions};
pub use tracts::{TractCursor, TractError, TractFile, TractHeader};
pub use variants::{
    HaplotypeField, MemoryVariantSource, VariantRecord, VariantSource, VariantSourceError,
};

use thiserror::Error;
use tracing::info;

use variants::HtslibVariantSource;

/// Errors that can end an extraction run.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Subset file or sample alignment failure
    #[error(transparent)]
    Samples(#[from] SampleError),

    /// Malformed or unsorted tract file
    #[error(transparent)]
    Tracts(#[from] TractError),

    /// Variant file failure
    #[error(transparent)]
    Variants(#[from] VariantSourceError),

    /// Output write failure
    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),

    /// A record carries fewer samples than its header declared
    #[error("{chrom}:{pos}: record has {found} samples, fewer than the header declares")]
    SampleCountMismatch {
        /// Record chromosome
        chrom: String,
        /// Record position
        pos: u64,
        /// Samples found on the record
        found: usize,
    },
}

/// File-backed extraction run.
///
/// Opens the tract file, queries the indexed variant file over the configured
/// region, writes all outputs under the configured prefix and returns the
/// run counters.
#[derive(Debug)]
pub struct Extractor {
    config: ExtractConfig,
}

impl Extractor {
    /// Create a new run from `config`.
    pub fn new(config: ExtractConfig) -> Self {
        Self { config }
    }

    /// Configuration this run uses.
    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Run the extraction to completion.
    pub fn run(&self) -> Result<RunSummary, ExtractError> {
        let config = &self.config;
        config.validate()?;

        let tracts = TractFile::open(&config.tract_path)?;
        let header = tracts.header();
        info!(
            components = %header.component_names().join(","),
            haplotypes = header.haplotypes().len(),
            start = header.bounds().start,
            end = header.bounds().end,
            "read tract header"
        );

        let field = if config.modes.use_dosage {
            HaplotypeField::Dosage
        } else {
            HaplotypeField::Genotype
        };
        let mut source = HtslibVariantSource::query(&config.variant_path, &config.region, field)?;

        let subset = config
            .subset_path
            .as_deref()
            .map(samples::read_subset)
            .transpose()?;
        let alignment = SampleAlignment::build(source.samples(), header.haplotypes(), subset.as_ref())?;
        info!(samples = alignment.len(), region = %config.region, "aligned samples");

        let mut cursor = tracts.cursor(&alignment)?;
        let components = header
            .component_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let mut sink = OutputSink::create(config, components)?;

        let options = StatsOptions {
            r2: config.modes.use_dosage,
            allow_flip: !config.modes.frequency_only,
        };
        let summary = extract(&mut source, header, &mut cursor, &alignment, &mut sink, options)?;
        sink.close()?;

        info!(sites = %config.sites_path().display(), "outputs closed");
        Ok(summary)
    }
}
