//! The two-stream merge: variants pull the tract cursor forward on demand and
//! each covered site is summarized and written.

use std::io::BufRead;

use tracing::{debug, info, warn};

use crate::output::{Finish, OutputSink};
use crate::samples::SampleAlignment;
use crate::stats::{SiteStatistics, StatsOptions};
use crate::tracts::{TractCursor, TractHeader};
use crate::variants::{VariantRecord, VariantSource, VariantSourceError};
use crate::ExtractError;

/// Counters collected over one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RunSummary {
    /// Aligned samples.
    pub samples: usize,
    /// Ancestry components.
    pub components: usize,
    /// Records returned by the variant source.
    pub records_seen: usize,
    /// Records written to the outputs.
    pub sites_written: usize,
    /// Records outside `[starting_pos, ending_pos)` of the tract file.
    pub skipped_out_of_bounds: usize,
    /// In-bounds records that no interval covers.
    pub skipped_uncovered: usize,
    /// Records with more than one ALT allele.
    pub skipped_multiallelic: usize,
    /// Interval records read from the tract stream.
    pub intervals_read: usize,
}

/// Reorder a record's haplotype values into aligned sample order.
///
/// Only aligned samples are checked for missing values, so excluded samples
/// and skipped records may carry them.
pub fn align_haplotypes(
    record: &VariantRecord,
    alignment: &SampleAlignment,
) -> Result<Vec<[f64; 2]>, ExtractError> {
    alignment
        .variant_index()
        .iter()
        .zip(alignment.names())
        .map(|(&index, name)| -> Result<[f64; 2], ExtractError> {
            let pair = record.haplotypes.get(index).copied().ok_or_else(|| {
                ExtractError::SampleCountMismatch {
                    chrom: record.chrom.clone(),
                    pos: record.pos,
                    found: record.haplotypes.len(),
                }
            })?;
            if pair.iter().any(|value| value.is_nan()) {
                return Err(ExtractError::Variants(VariantSourceError::InvalidGenotype {
                    chrom: record.chrom.clone(),
                    pos: record.pos,
                    sample: name.clone(),
                    reason: "missing or non-diploid haplotype value".to_string(),
                }));
            }
            Ok(pair)
        })
        .collect()
}

/// Run the merge from the first to the last record of `source`.
///
/// Writes the sites header first; the caller closes `sink`.
pub fn extract<S, R, W>(
    source: &mut S,
    header: &TractHeader,
    cursor: &mut TractCursor<R>,
    alignment: &SampleAlignment,
    sink: &mut OutputSink<W>,
    options: StatsOptions,
) -> Result<RunSummary, ExtractError>
where
    S: VariantSource,
    R: BufRead,
    W: Finish,
{
    let mut contigs = source.contigs();
    if contigs.is_empty() {
        contigs = crate::output::default_contigs();
    }
    sink.write_header(&contigs, alignment.names())?;

    let bounds = header.bounds();
    let mut summary = RunSummary {
        samples: alignment.len(),
        components: header.num_components(),
        ..RunSummary::default()
    };

    while let Some(record) = source.next_record() {
        let record = record?;
        summary.records_seen += 1;

        if !bounds.contains(record.pos) {
            summary.skipped_out_of_bounds += 1;
            continue;
        }
        if record.is_multiallelic() {
            debug!(chrom = %record.chrom, pos = record.pos, "skipping multiallelic record");
            summary.skipped_multiallelic += 1;
            continue;
        }

        let Some(covered) = cursor.advance_until_covers(&record.chrom, record.pos)? else {
            debug!(chrom = %record.chrom, pos = record.pos, "no tract interval covers record");
            summary.skipped_uncovered += 1;
            continue;
        };

        let haplotypes = align_haplotypes(&record, alignment)?;
        let stats = SiteStatistics::compute(&haplotypes, covered.a, covered.b, options);
        sink.write_site(&record, &stats)?;
        summary.sites_written += 1;
    }

    summary.intervals_read = cursor.intervals_read();

    if summary.skipped_uncovered > 0 {
        warn!(
            count = summary.skipped_uncovered,
            "records inside the tract bounds had no covering interval and were skipped"
        );
    }
    if summary.skipped_multiallelic > 0 {
        warn!(
            count = summary.skipped_multiallelic,
            "multiallelic records were skipped; split them first (bcftools norm -m-)"
        );
    }
    info!(
        written = summary.sites_written,
        seen = summary.records_seen,
        out_of_bounds = summary.skipped_out_of_bounds,
        intervals = summary.intervals_read,
        "finished local ancestry extraction"
    );

    Ok(summary)
}
