use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tractdose::{Codec, Compression, ExtractConfig, Extractor, OutputModes, Region};

#[derive(Parser, Debug)]
#[command(
    name = "tractdose",
    version,
    about = "Extract local-ancestry allele frequencies and dosages from RFMix tracts and a phased VCF"
)]
struct Cli {
    /// RFMix `.msp.tsv` tract file (plain or gzip).
    #[arg(long)]
    msp: PathBuf,
    /// Indexed, phased VCF/BCF.
    #[arg(long)]
    vcf: PathBuf,
    /// Output path prefix.
    #[arg(long)]
    prefix: PathBuf,
    /// Region to process, e.g. `chr22` or `chr22:16,000,000-17,000,000`.
    #[arg(long)]
    region: Region,
    /// File with one sample name per line to keep.
    #[arg(long)]
    keep: Option<PathBuf>,
    /// Use `HDS` haplotype dosages and report R².
    #[arg(long)]
    hds: bool,
    /// Write only the sites VCF.
    #[arg(long)]
    freq_only: bool,
    /// Add per-sample `HC_x` haplotype counts to the sites VCF.
    #[arg(long)]
    hapcount_vcf: bool,
    /// Compression codec for the matrices (zstd, gzip or none).
    #[arg(long, default_value = "zstd")]
    compression: Codec,
    /// Compression level override for both matrices.
    #[arg(long)]
    level: Option<i32>,
    /// Compression worker threads.
    #[arg(long, default_value_t = 1)]
    threads: u32,
    /// Debug logging (overridden by `RUST_LOG`).
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = ExtractConfig::new(&cli.msp, &cli.vcf, &cli.prefix, cli.region.clone())
        .with_modes(OutputModes {
            use_dosage: cli.hds,
            frequency_only: cli.freq_only,
            hapcount_block: cli.hapcount_vcf,
        })
        .with_compression(Compression {
            codec: cli.compression,
            threads: cli.threads,
            level: cli.level,
        });
    if let Some(keep) = &cli.keep {
        config = config.with_subset(keep);
    }

    let summary = Extractor::new(config)
        .run()
        .with_context(|| format!("extraction failed for {}", cli.msp.display()))?;

    eprintln!(
        "{} of {} records written ({} outside tracts, {} uncovered, {} multiallelic)",
        summary.sites_written,
        summary.records_seen,
        summary.skipped_out_of_bounds,
        summary.skipped_uncovered,
        summary.skipped_multiallelic
    );

    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
