//! RFMix local-ancestry tract files.
//!
//! A tract file is scanned once up front for its header and covered region
//! ([`TractHeader`]), then streamed a second time through a forward-only
//! [`TractCursor`] while variants are processed.

mod cursor;
mod header;

pub use cursor::{CoveredInterval, IndicatorMatrix, IntervalReader, TractCursor, TractInterval};
pub use header::{AncestryComponent, CodeTable, TractBounds, TractHeader, FIXED_COLUMNS};

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;
use thiserror::Error;

use crate::samples::SampleAlignment;

/// Errors raised while reading a tract file.
#[derive(Debug, Error)]
pub enum TractError {
    /// Underlying read failure.
    #[error("tract file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The component line, haplotype header or data section is missing.
    #[error("tract file header: {0}")]
    MissingHeader(String),

    /// A data line could not be parsed.
    #[error("tract file line {line}: {reason}")]
    Malformed {
        /// 1-based line number.
        line: usize,
        /// What was wrong.
        reason: String,
    },

    /// A call column used a code absent from the component declaration.
    #[error("tract file line {line}: ancestry code {code} is not declared in the header")]
    UnknownCode {
        /// 1-based line number.
        line: usize,
        /// Offending code.
        code: u32,
    },

    /// Queries went backwards on a chromosome.
    #[error("variants out of order on {chrom}: position {pos} after {previous}")]
    Unsorted {
        /// Chromosome of the query.
        chrom: String,
        /// Offending position.
        pos: u64,
        /// Position of the previous query.
        previous: u64,
    },
}

/// A tract file on disk with its scanned header.
#[derive(Debug, Clone)]
pub struct TractFile {
    path: PathBuf,
    header: TractHeader,
}

impl TractFile {
    /// Open and scan `path`. Paths ending in `gz` are decompressed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TractError> {
        let path = path.as_ref().to_path_buf();
        let header = TractHeader::read(open_reader(&path)?)?;
        Ok(Self { path, header })
    }

    /// Scanned header.
    pub fn header(&self) -> &TractHeader {
        &self.header
    }

    /// Fresh cursor over the file's intervals.
    pub fn cursor(
        &self,
        alignment: &SampleAlignment,
    ) -> Result<TractCursor<Box<dyn BufRead>>, TractError> {
        Ok(TractCursor::new(
            open_reader(&self.path)?,
            &self.header,
            alignment,
        ))
    }
}

fn open_reader(path: &Path) -> Result<Box<dyn BufRead>, TractError> {
    let file = File::open(path)?;
    let compressed = path.to_string_lossy().ends_with("gz");
    Ok(if compressed {
        Box::new(BufReader::new(MultiGzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    })
}
