use std::io::{BufRead, Lines};

use tracing::debug;

use super::header::{CodeTable, TractHeader, FIXED_COLUMNS};
use super::TractError;
use crate::samples::SampleAlignment;

/// One run-length-encoded ancestry interval.
///
/// `calls` holds, per haplotype column, the index of the assigned
/// component (already resolved from the file's integer codes).
#[derive(Debug, Clone, PartialEq)]
pub struct TractInterval {
    /// Chromosome name.
    pub chrom: String,
    /// First covered position (inclusive).
    pub start: u64,
    /// Position after the last covered one (exclusive).
    pub end: u64,
    /// Genetic position of `start` (cM).
    pub start_gpos: f64,
    /// Genetic position of `end` (cM).
    pub end_gpos: f64,
    /// Number of SNPs RFMix used for the interval.
    pub n_snps: u64,
    /// Component index per haplotype column.
    pub calls: Vec<u16>,
    /// 1-based line number in the tract file.
    pub line: usize,
}

impl TractInterval {
    /// Half-open containment on the same chromosome.
    pub fn covers(&self, chrom: &str, pos: u64) -> bool {
        self.chrom == chrom && self.start <= pos && pos < self.end
    }
}

/// Lazy, finite sequence of intervals read from a tract stream.
///
/// Lines starting with `#` and blank lines are skipped, so the reader can be
/// handed the stream from its first byte.
#[derive(Debug)]
pub struct IntervalReader<R> {
    lines: Lines<R>,
    line_no: usize,
    haplotypes: usize,
    codes: CodeTable,
}

impl<R: BufRead> IntervalReader<R> {
    /// Wrap a tract stream described by `header`.
    pub fn new(reader: R, header: &TractHeader) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
            haplotypes: header.haplotypes().len(),
            codes: header.code_table(),
        }
    }

    fn parse(&self, line: &str) -> Result<TractInterval, TractError> {
        let line_no = self.line_no;
        let malformed = |reason: String| TractError::Malformed {
            line: line_no,
            reason,
        };

        let fields: Vec<&str> = line.trim_end_matches('\r').split('\t').collect();
        let expected = FIXED_COLUMNS + self.haplotypes;
        if fields.len() != expected {
            return Err(malformed(format!(
                "expected {expected} columns, found {}",
                fields.len()
            )));
        }

        let start: u64 = fields[1]
            .parse()
            .map_err(|_| malformed(format!("invalid spos '{}'", fields[1])))?;
        let end: u64 = fields[2]
            .parse()
            .map_err(|_| malformed(format!("invalid epos '{}'", fields[2])))?;
        if start >= end {
            return Err(malformed(format!("empty interval [{start}, {end})")));
        }
        let start_gpos: f64 = fields[3]
            .parse()
            .map_err(|_| malformed(format!("invalid sgpos '{}'", fields[3])))?;
        let end_gpos: f64 = fields[4]
            .parse()
            .map_err(|_| malformed(format!("invalid egpos '{}'", fields[4])))?;
        let n_snps: u64 = fields[5]
            .parse()
            .map_err(|_| malformed(format!("invalid n snps '{}'", fields[5])))?;

        let calls = fields[FIXED_COLUMNS..]
            .iter()
            .map(|raw| {
                let code: u32 = raw
                    .parse()
                    .map_err(|_| malformed(format!("invalid ancestry call '{raw}'")))?;
                self.codes
                    .index_of(code)
                    .ok_or(TractError::UnknownCode { line: line_no, code })
            })
            .collect::<Result<Vec<u16>, TractError>>()?;

        Ok(TractInterval {
            chrom: fields[0].to_string(),
            start,
            end,
            start_gpos,
            end_gpos,
            n_snps,
            calls,
            line: line_no,
        })
    }
}

impl<R: BufRead> Iterator for IntervalReader<R> {
    type Item = Result<TractInterval, TractError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(err) => return Some(Err(err.into())),
            };
            self.line_no += 1;
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }
            return Some(self.parse(&line));
        }
    }
}

/// K × N membership matrix: entry `(k, s)` is set when the haplotype of
/// sample `s` is assigned to component `k`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorMatrix {
    components: usize,
    samples: usize,
    cells: Vec<bool>,
    assignment: Vec<u16>,
}

impl IndicatorMatrix {
    /// Build from the component index of each sample's haplotype.
    pub fn from_assignment(assignment: Vec<u16>, components: usize) -> Self {
        let samples = assignment.len();
        let mut cells = vec![false; components * samples];
        for (sample, &component) in assignment.iter().enumerate() {
            cells[component as usize * samples + sample] = true;
        }
        Self {
            components,
            samples,
            cells,
            assignment,
        }
    }

    /// Number of components (rows).
    pub fn components(&self) -> usize {
        self.components
    }

    /// Number of samples (columns).
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Membership flag for component `k`, sample `s`.
    pub fn get(&self, k: usize, s: usize) -> bool {
        self.cells[k * self.samples + s]
    }

    /// Row of component `k` across samples.
    pub fn row(&self, k: usize) -> &[bool] {
        &self.cells[k * self.samples..(k + 1) * self.samples]
    }

    /// Component index assigned to sample `s`.
    pub fn component_of(&self, s: usize) -> usize {
        self.assignment[s] as usize
    }
}

/// Interval covering the most recent query, with its indicator matrices.
#[derive(Debug, Clone, Copy)]
pub struct CoveredInterval<'a> {
    /// The covering interval.
    pub interval: &'a TractInterval,
    /// Indicators for the `.0` haplotypes, in aligned sample order.
    pub a: &'a IndicatorMatrix,
    /// Indicators for the `.1` haplotypes, in aligned sample order.
    pub b: &'a IndicatorMatrix,
}

enum Step {
    Covered,
    Uncovered,
    Advance,
}

/// Forward-only cursor over the tract stream.
///
/// Holds at most one interval. Queries must arrive in non-decreasing position
/// order within a chromosome; the cursor never rewinds.
#[derive(Debug)]
pub struct TractCursor<R> {
    intervals: IntervalReader<R>,
    components: usize,
    haplotype_a: Vec<usize>,
    haplotype_b: Vec<usize>,
    current: Option<TractInterval>,
    indicators: Option<(IndicatorMatrix, IndicatorMatrix)>,
    last_query: Option<(String, u64)>,
    exhausted: bool,
    intervals_read: usize,
}

impl<R: BufRead> TractCursor<R> {
    /// Create a cursor over `reader`, projecting haplotype columns through
    /// `alignment`. Nothing is read until the first query.
    pub fn new(reader: R, header: &TractHeader, alignment: &SampleAlignment) -> Self {
        Self {
            intervals: IntervalReader::new(reader, header),
            components: header.num_components(),
            haplotype_a: alignment.haplotype_a().to_vec(),
            haplotype_b: alignment.haplotype_b().to_vec(),
            current: None,
            indicators: None,
            last_query: None,
            exhausted: false,
            intervals_read: 0,
        }
    }

    /// Advance until the current interval covers `(chrom, pos)`.
    ///
    /// Returns `None` when no interval covers the position: it falls in a gap
    /// before the next interval (which stays current), or the stream is
    /// exhausted.
    pub fn advance_until_covers(
        &mut self,
        chrom: &str,
        pos: u64,
    ) -> Result<Option<CoveredInterval<'_>>, TractError> {
        self.check_order(chrom, pos)?;

        loop {
            let step = match &self.current {
                Some(current) if current.covers(chrom, pos) => Step::Covered,
                Some(current) if current.chrom == chrom && pos < current.start => Step::Uncovered,
                None if self.exhausted => Step::Uncovered,
                _ => Step::Advance,
            };

            match step {
                Step::Covered => break,
                Step::Uncovered => return Ok(None),
                Step::Advance => match self.intervals.next() {
                    Some(interval) => {
                        let interval = interval?;
                        self.intervals_read += 1;
                        debug!(
                            chrom = %interval.chrom,
                            start = interval.start,
                            end = interval.end,
                            line = interval.line,
                            "read tract interval"
                        );
                        self.current = Some(interval);
                        self.indicators = None;
                    }
                    None => {
                        debug!(intervals = self.intervals_read, "tract stream exhausted");
                        self.exhausted = true;
                        self.current = None;
                        self.indicators = None;
                        return Ok(None);
                    }
                },
            }
        }

        if self.indicators.is_none() {
            self.indicators = self.current.as_ref().map(|interval| {
                (
                    self.project(interval, &self.haplotype_a),
                    self.project(interval, &self.haplotype_b),
                )
            });
        }

        Ok(self.covered())
    }

    /// Interval currently held, if any.
    pub fn current(&self) -> Option<&TractInterval> {
        self.current.as_ref()
    }

    /// Number of interval records read so far.
    pub fn intervals_read(&self) -> usize {
        self.intervals_read
    }

    /// Whether the end of the tract stream has been reached.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    fn covered(&self) -> Option<CoveredInterval<'_>> {
        let interval = self.current.as_ref()?;
        let (a, b) = self.indicators.as_ref()?;
        Some(CoveredInterval { interval, a, b })
    }

    fn project(&self, interval: &TractInterval, columns: &[usize]) -> IndicatorMatrix {
        let assignment = columns.iter().map(|&column| interval.calls[column]).collect();
        IndicatorMatrix::from_assignment(assignment, self.components)
    }

    fn check_order(&mut self, chrom: &str, pos: u64) -> Result<(), TractError> {
        if let Some((last_chrom, last_pos)) = &mut self.last_query {
            if last_chrom.as_str() == chrom {
                if pos < *last_pos {
                    return Err(TractError::Unsorted {
                        chrom: chrom.to_string(),
                        pos,
                        previous: *last_pos,
                    });
                }
                *last_pos = pos;
                return Ok(());
            }
        }
        self.last_query = Some((chrom.to_string(), pos));
        Ok(())
    }
}
