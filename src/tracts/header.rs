use std::io::BufRead;

use super::TractError;

const COMPONENT_PREFIX: &str = "#Subpopulation order/codes:";

/// Number of fixed columns before the per-haplotype calls.
pub const FIXED_COLUMNS: usize = 6;

/// One ancestral population declared in the tract file.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AncestryComponent {
    /// Population label (e.g. `AFR`).
    pub name: String,
    /// Integer code used in the call columns.
    pub code: u32,
}

/// Half-open span `[start, end)` covered by the tract file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TractBounds {
    /// `spos` of the first data line.
    pub start: u64,
    /// `epos` of the last data line.
    pub end: u64,
}

impl TractBounds {
    /// Whether `pos` lies inside the covered span.
    pub fn contains(&self, pos: u64) -> bool {
        self.start <= pos && pos < self.end
    }
}

/// Everything learned from a full scan of the tract file.
#[derive(Debug, Clone, PartialEq)]
pub struct TractHeader {
    components: Vec<AncestryComponent>,
    haplotypes: Vec<String>,
    bounds: TractBounds,
}

impl TractHeader {
    /// Scan a tract stream: component line, haplotype header, then every data
    /// line to find the region bounds.
    pub fn read<R: BufRead>(reader: R) -> Result<Self, TractError> {
        let mut lines = reader.lines();

        let component_line = lines
            .next()
            .transpose()?
            .ok_or_else(|| TractError::MissingHeader("empty tract file".to_string()))?;
        let components = parse_components(&component_line)?;

        let haplotype_line = lines.next().transpose()?.ok_or_else(|| {
            TractError::MissingHeader("missing haplotype header line".to_string())
        })?;
        let haplotypes = parse_haplotypes(&haplotype_line)?;

        let mut first_start: Option<u64> = None;
        let mut last_end: Option<u64> = None;
        let mut line_no = 2;
        for line in lines {
            let line = line?;
            line_no += 1;
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }
            let mut fields = line.split('\t').skip(1);
            let start = parse_coordinate(fields.next(), "spos", line_no)?;
            let end = parse_coordinate(fields.next(), "epos", line_no)?;
            first_start.get_or_insert(start);
            last_end = Some(end);
        }

        let (start, end) = first_start.zip(last_end).ok_or_else(|| {
            TractError::MissingHeader("tract file contains no interval records".to_string())
        })?;

        Ok(Self {
            components,
            haplotypes,
            bounds: TractBounds { start, end },
        })
    }

    /// Declared components, in declaration order.
    pub fn components(&self) -> &[AncestryComponent] {
        &self.components
    }

    /// Component labels, in declaration order.
    pub fn component_names(&self) -> Vec<&str> {
        self.components.iter().map(|c| c.name.as_str()).collect()
    }

    /// Number of components K.
    pub fn num_components(&self) -> usize {
        self.components.len()
    }

    /// Haplotype column names (`<sample>.0` / `<sample>.1`).
    pub fn haplotypes(&self) -> &[String] {
        &self.haplotypes
    }

    /// Region covered by the file.
    pub fn bounds(&self) -> TractBounds {
        self.bounds
    }

    /// Map from ancestry code to component index.
    pub fn code_table(&self) -> CodeTable {
        CodeTable::new(&self.components)
    }
}

/// Lookup from the integer codes in call columns to component indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeTable {
    slots: Vec<Option<u16>>,
}

impl CodeTable {
    fn new(components: &[AncestryComponent]) -> Self {
        let size = components.iter().map(|c| c.code as usize + 1).max().unwrap_or(0);
        let mut slots = vec![None; size];
        for (index, component) in components.iter().enumerate() {
            slots[component.code as usize] = Some(index as u16);
        }
        Self { slots }
    }

    /// Component index for `code`, if declared.
    pub fn index_of(&self, code: u32) -> Option<u16> {
        self.slots.get(code as usize).copied().flatten()
    }
}

fn parse_components(line: &str) -> Result<Vec<AncestryComponent>, TractError> {
    let body = line.strip_prefix(COMPONENT_PREFIX).ok_or_else(|| {
        TractError::MissingHeader(format!(
            "first line must start with '{COMPONENT_PREFIX}', found '{}'",
            truncate(line)
        ))
    })?;

    let mut components = Vec::new();
    for (position, token) in body.split_whitespace().enumerate() {
        let component = match token.split_once('=') {
            Some((name, code)) => AncestryComponent {
                name: name.to_string(),
                code: code.parse().map_err(|_| {
                    TractError::MissingHeader(format!("invalid ancestry code in '{token}'"))
                })?,
            },
            None => AncestryComponent {
                name: token.to_string(),
                code: position as u32,
            },
        };
        if component.code > u16::MAX as u32 {
            return Err(TractError::MissingHeader(format!(
                "ancestry code out of range in '{token}'"
            )));
        }
        if components
            .iter()
            .any(|c: &AncestryComponent| c.code == component.code || c.name == component.name)
        {
            return Err(TractError::MissingHeader(format!(
                "duplicate ancestry component '{token}'"
            )));
        }
        components.push(component);
    }

    if components.is_empty() {
        return Err(TractError::MissingHeader(
            "no ancestry components declared".to_string(),
        ));
    }
    Ok(components)
}

fn parse_haplotypes(line: &str) -> Result<Vec<String>, TractError> {
    if !line.starts_with('#') {
        return Err(TractError::MissingHeader(format!(
            "second line must be the '#chm' column header, found '{}'",
            truncate(line)
        )));
    }
    let columns: Vec<&str> = line.trim_end_matches(['\r', '\n']).split('\t').collect();
    if columns.len() <= FIXED_COLUMNS {
        return Err(TractError::MissingHeader(
            "column header lists no haplotypes".to_string(),
        ));
    }
    Ok(columns[FIXED_COLUMNS..].iter().map(|s| s.to_string()).collect())
}

fn parse_coordinate(field: Option<&str>, name: &'static str, line: usize) -> Result<u64, TractError> {
    let value = field.ok_or(TractError::Malformed {
        line,
        reason: format!("missing {name} column"),
    })?;
    value.trim().parse().map_err(|_| TractError::Malformed {
        line,
        reason: format!("invalid {name} '{value}'"),
    })
}

fn truncate(line: &str) -> &str {
    match line.char_indices().nth(60) {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}
