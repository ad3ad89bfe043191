use std::fmt::Write as _;

use crate::config::OutputModes;
use crate::stats::format::format_info;
use crate::stats::SiteStatistics;
use crate::variants::VariantRecord;

/// Contigs declared when the variant source reports none.
pub fn default_contigs() -> Vec<String> {
    (1..=22)
        .map(|i| format!("chr{i}"))
        .chain(std::iter::once("chrX".to_string()))
        .collect()
}

/// Renders the annotated sites VCF: one INFO block of local-ancestry
/// frequencies per variant, optional per-sample `HC_x` haplotype counts.
#[derive(Debug, Clone)]
pub struct SiteFormatter {
    components: Vec<String>,
    modes: OutputModes,
}

impl SiteFormatter {
    /// Formatter for components labelled `components` (declaration order).
    pub fn new(components: Vec<String>, modes: OutputModes) -> Self {
        Self { components, modes }
    }

    /// Header block, ending with the `#CHROM` column line.
    pub fn header(&self, contigs: &[String], samples: &[String]) -> String {
        let mut out = String::new();
        out.push_str("##fileformat=VCFv4.3\n");
        out.push_str("##source=tractdose\n");
        out.push_str("##FILTER=<ID=PASS,Description=\"All filters passed\">\n");
        for contig in contigs {
            let _ = writeln!(out, "##contig=<ID={contig}>");
        }

        out.push_str(
            "##INFO=<ID=AF,Number=1,Type=Float,Description=\"Allele frequency (overall)\">\n",
        );
        if self.modes.use_dosage {
            out.push_str("##INFO=<ID=R2,Number=1,Type=Float,Description=\"Imputation R-squared (overall)\">\n");
        }
        for name in &self.components {
            let _ = writeln!(
                out,
                "##INFO=<ID=AF_{name},Number=1,Type=Float,Description=\"Allele frequency of the {name} tract\">"
            );
            if self.modes.use_dosage {
                let _ = writeln!(
                    out,
                    "##INFO=<ID=R2_{name},Number=1,Type=Float,Description=\"Imputation R-squared of the {name} tract\">"
                );
            }
            let _ = writeln!(
                out,
                "##INFO=<ID=F_{name},Number=1,Type=Float,Description=\"Fraction of {name} haplotypes\">"
            );
        }
        if !self.modes.frequency_only {
            out.push_str("##INFO=<ID=FLIPPED,Number=0,Type=Flag,Description=\"REF and ALT alleles flipped in PLINK formatted dosage/hapcount files\">\n");
        }
        if self.modes.hapcount_block {
            for name in &self.components {
                let _ = writeln!(
                    out,
                    "##FORMAT=<ID=HC_{name},Number=1,Type=Integer,Description=\"Haplotype count of the {name} tract\">"
                );
            }
        }

        out.push_str("#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO");
        if self.modes.hapcount_block {
            out.push_str("\tFORMAT");
            for sample in samples {
                out.push('\t');
                out.push_str(sample);
            }
        }
        out.push('\n');
        out
    }

    /// One data line for `record`.
    pub fn line(&self, record: &VariantRecord, stats: &SiteStatistics) -> String {
        let mut out = String::with_capacity(128);
        let _ = write!(
            out,
            "{}\t{}\t{}\t{}\t{}\t.\t.\t",
            record.chrom,
            record.pos,
            record.id,
            record.reference,
            record.alternate()
        );

        let _ = write!(out, "AF={}", format_info(Some(stats.overall_frequency())));
        for (name, freq) in self.components.iter().zip(stats.frequency()) {
            let _ = write!(out, ";AF_{name}={}", format_info(*freq));
        }
        if let Some(r2) = stats.r2() {
            let _ = write!(out, ";R2={}", format_info(stats.overall_r2()));
            for (name, value) in self.components.iter().zip(r2) {
                let _ = write!(out, ";R2_{name}={}", format_info(*value));
            }
        }
        for (name, fraction) in self.components.iter().zip(stats.fraction()) {
            let _ = write!(out, ";F_{name}={}", format_info(Some(*fraction)));
        }
        if !self.modes.frequency_only && stats.flipped() {
            out.push_str(";FLIPPED");
        }

        if self.modes.hapcount_block {
            out.push('\t');
            let keys: Vec<String> = self.components.iter().map(|n| format!("HC_{n}")).collect();
            out.push_str(&keys.join(":"));
            for s in 0..stats.samples() {
                out.push('\t');
                for k in 0..stats.components() {
                    if k > 0 {
                        out.push(':');
                    }
                    let _ = write!(out, "{}", stats.hapcount(k)[s]);
                }
            }
        }
        out.push('\n');
        out
    }
}
