//! PLINK-style dosage and local-ancestry covariate rows.

use std::fmt::Write as _;

use crate::stats::format::format_matrix;
use crate::stats::SiteStatistics;
use crate::variants::VariantRecord;

/// `chrom, pos, id, A1, A2, dosage(component 0) per sample`.
///
/// The counted allele goes first: ALT normally, REF when the site was
/// flipped.
pub fn dosage_row(record: &VariantRecord, stats: &SiteStatistics) -> String {
    let (counted, other) = if stats.flipped() {
        (record.reference.as_str(), record.alternate())
    } else {
        (record.alternate(), record.reference.as_str())
    };

    let mut out = String::with_capacity(32 + stats.samples() * 4);
    let _ = write!(
        out,
        "{}\t{}\t{}\t{}\t{}",
        record.chrom, record.pos, record.id, counted, other
    );
    for &value in stats.dosage(0) {
        out.push('\t');
        out.push_str(&format_matrix(value));
    }
    out.push('\n');
    out
}

/// Per sample, `dosage(1..K)` followed by `hapcount(0..K-1)`; 2(K−1) values
/// per sample with no identifying columns. Component 0 dosage and component
/// K−1 hapcount are left out as reference levels.
pub fn covariate_row(stats: &SiteStatistics) -> String {
    let components = stats.components();
    let mut values: Vec<String> =
        Vec::with_capacity(2 * components.saturating_sub(1) * stats.samples());
    for s in 0..stats.samples() {
        for k in 1..components {
            values.push(format_matrix(stats.dosage(k)[s]));
        }
        for k in 0..components.saturating_sub(1) {
            values.push(stats.hapcount(k)[s].to_string());
        }
    }
    let mut out = values.join("\t");
    out.push('\n');
    out
}
