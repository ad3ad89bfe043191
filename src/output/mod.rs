//! Output streams: the annotated sites VCF plus the optional dosage and
//! covariate matrices.
//!
//! All three are opened once before the first variant and closed once after
//! the last, in a fixed order (sites, dosage, covariates).

mod compress;
pub mod matrix;
mod sites;

pub use compress::{FileStream, Finish};
pub use sites::{default_contigs, SiteFormatter};

use std::io::{self, Write};

use tracing::debug;

use crate::config::ExtractConfig;
use crate::stats::SiteStatistics;
use crate::variants::VariantRecord;

/// Finalized outputs returned by [`OutputSink::close`].
#[derive(Debug)]
pub struct ClosedStreams<T> {
    /// Sites VCF.
    pub sites: T,
    /// Dosage matrix, when written.
    pub dosage: Option<T>,
    /// Covariate matrix, when written.
    pub covariates: Option<T>,
}

/// Append-only writer for every output of a run.
#[derive(Debug)]
pub struct OutputSink<W: Finish> {
    formatter: SiteFormatter,
    sites: W,
    dosage: Option<W>,
    covariates: Option<W>,
    hapcount_block: bool,
}

impl OutputSink<FileStream> {
    /// Create the files named by `config`. Matrices are skipped in
    /// frequency-only mode.
    pub fn create(config: &ExtractConfig, components: Vec<String>) -> io::Result<Self> {
        let sites = FileStream::plain(&config.sites_path())?;
        let (dosage, covariates) = if config.modes.writes_matrices() {
            let compression = config.compression;
            let dosage = FileStream::create(
                &config.dosage_path(),
                compression.codec,
                compression.dosage_level(),
                compression.threads,
            )?;
            let covariates = FileStream::create(
                &config.covariate_path(),
                compression.codec,
                compression.covariate_level(),
                compression.threads,
            )?;
            (Some(dosage), Some(covariates))
        } else {
            (None, None)
        };
        debug!(sites = %config.sites_path().display(), matrices = dosage.is_some(), "opened outputs");

        Ok(Self::from_streams(
            SiteFormatter::new(components, config.modes),
            sites,
            dosage,
            covariates,
            config.modes.hapcount_block,
        ))
    }
}

impl<W: Finish> OutputSink<W> {
    /// Assemble a sink from already-open streams.
    pub fn from_streams(
        formatter: SiteFormatter,
        sites: W,
        dosage: Option<W>,
        covariates: Option<W>,
        hapcount_block: bool,
    ) -> Self {
        Self {
            formatter,
            sites,
            dosage,
            covariates,
            hapcount_block,
        }
    }

    /// Write the sites VCF header.
    pub fn write_header(&mut self, contigs: &[String], samples: &[String]) -> io::Result<()> {
        let samples: &[String] = if self.hapcount_block { samples } else { &[] };
        self.sites
            .write_all(self.formatter.header(contigs, samples).as_bytes())
    }

    /// Write every output line for one variant.
    pub fn write_site(&mut self, record: &VariantRecord, stats: &SiteStatistics) -> io::Result<()> {
        if let Some(dosage) = self.dosage.as_mut() {
            dosage.write_all(matrix::dosage_row(record, stats).as_bytes())?;
        }
        if let Some(covariates) = self.covariates.as_mut() {
            covariates.write_all(matrix::covariate_row(stats).as_bytes())?;
        }
        self.sites
            .write_all(self.formatter.line(record, stats).as_bytes())
    }

    /// Finalize all streams, sites first.
    pub fn close(self) -> io::Result<ClosedStreams<W::Output>> {
        let sites = self.sites.finish()?;
        let dosage = self.dosage.map(Finish::finish).transpose()?;
        let covariates = self.covariates.map(Finish::finish).transpose()?;
        Ok(ClosedStreams {
            sites,
            dosage,
            covariates,
        })
    }
}

/// In-memory sink; handy for tests and callers that post-process output.
pub fn memory_sink(
    formatter: SiteFormatter,
    matrices: bool,
    hapcount_block: bool,
) -> OutputSink<Vec<u8>> {
    let (dosage, covariates) = if matrices {
        (Some(Vec::new()), Some(Vec::new()))
    } else {
        (None, None)
    };
    OutputSink::from_streams(formatter, Vec::new(), dosage, covariates, hapcount_block)
}
