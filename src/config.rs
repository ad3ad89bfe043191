//! Run configuration
//!
//! Paths, the queried genomic region, output mode flags and compression
//! settings. Built with `with_*` methods and checked once by
//! [`ExtractConfig::validate`] before any file is opened.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

/// Errors raised while validating user-supplied configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Region string could not be parsed.
    #[error("invalid region '{region}': {reason}")]
    InvalidRegion {
        /// Region string as supplied.
        region: String,
        /// What was wrong with it.
        reason: String,
    },

    /// An input file does not exist.
    #[error("{what} not found: {}", path.display())]
    MissingInput {
        /// Which input (tract file, variant file, subset file).
        what: &'static str,
        /// Path that was checked.
        path: PathBuf,
    },

    /// Output prefix is empty.
    #[error("output prefix must not be empty")]
    EmptyPrefix,

    /// Compression thread count of zero.
    #[error("compression thread count must be > 0")]
    ZeroThreads,

    /// Unknown compression codec name.
    #[error("unknown compression codec '{0}' (expected zstd, gzip or none)")]
    UnknownCodec(String),
}

/// Genomic region queried from the variant file.
///
/// Coordinates are 1-based and inclusive, as written on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Region {
    /// Chromosome/contig name.
    pub chrom: String,
    /// First position (1-based, inclusive); `None` means start of contig.
    pub start: Option<u64>,
    /// Last position (1-based, inclusive); `None` means end of contig.
    pub end: Option<u64>,
}

impl Region {
    /// Parse `chrom`, `chrom:pos` or `chrom:start-end`.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidRegion {
            region: text.to_string(),
            reason: reason.to_string(),
        };

        let text_trimmed = text.trim();
        if text_trimmed.is_empty() {
            return Err(invalid("empty region"));
        }

        let (chrom, span) = match text_trimmed.rsplit_once(':') {
            Some((chrom, span)) => (chrom, Some(span)),
            None => (text_trimmed, None),
        };
        if chrom.is_empty() {
            return Err(invalid("missing chromosome"));
        }

        let parse_pos = |value: &str| -> Result<u64, ConfigError> {
            let cleaned: String = value.chars().filter(|c| *c != ',').collect();
            let pos: u64 = cleaned
                .parse()
                .map_err(|_| invalid(&format!("'{value}' is not a position")))?;
            if pos == 0 {
                return Err(invalid("positions are 1-based"));
            }
            Ok(pos)
        };

        let (start, end) = match span {
            None => (None, None),
            Some(span) => match span.split_once('-') {
                Some((start, "")) => (Some(parse_pos(start)?), None),
                Some((start, end)) => (Some(parse_pos(start)?), Some(parse_pos(end)?)),
                None => {
                    let pos = parse_pos(span)?;
                    (Some(pos), Some(pos))
                }
            },
        };

        if let (Some(start), Some(end)) = (start, end) {
            if end < start {
                return Err(invalid("end precedes start"));
            }
        }

        Ok(Self {
            chrom: chrom.to_string(),
            start,
            end,
        })
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start, self.end) {
            (None, _) => write!(f, "{}", self.chrom),
            (Some(start), None) => write!(f, "{}:{}-", self.chrom, start),
            (Some(start), Some(end)) => write!(f, "{}:{}-{}", self.chrom, start, end),
        }
    }
}

impl FromStr for Region {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Compression codec for the dosage and covariate matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Codec {
    /// Zstandard, multithreaded.
    #[default]
    Zstd,
    /// gzip via flate2.
    Gzip,
    /// Uncompressed text.
    None,
}

impl Codec {
    /// File name suffix appended to matrix outputs.
    pub fn extension(self) -> &'static str {
        match self {
            Codec::Zstd => ".zst",
            Codec::Gzip => ".gz",
            Codec::None => "",
        }
    }
}

impl FromStr for Codec {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "zstd" | "zst" => Ok(Codec::Zstd),
            "gzip" | "gz" => Ok(Codec::Gzip),
            "none" | "plain" => Ok(Codec::None),
            other => Err(ConfigError::UnknownCodec(other.to_string())),
        }
    }
}

/// Compression settings shared by both matrix outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Compression {
    /// Codec used for both matrices.
    pub codec: Codec,
    /// Worker threads handed to the compressor (zstd only).
    pub threads: u32,
    /// Level override; `None` uses the per-stream defaults.
    pub level: Option<i32>,
}

impl Default for Compression {
    fn default() -> Self {
        Self {
            codec: Codec::Zstd,
            threads: 1,
            level: None,
        }
    }
}

impl Compression {
    /// Level for the dosage matrix.
    pub fn dosage_level(&self) -> i32 {
        self.level.unwrap_or(match self.codec {
            Codec::Zstd => 3,
            Codec::Gzip => 6,
            Codec::None => 0,
        })
    }

    /// Level for the covariate matrix, which is larger and compressed harder.
    pub fn covariate_level(&self) -> i32 {
        self.level.unwrap_or(match self.codec {
            Codec::Zstd => 22,
            Codec::Gzip => 9,
            Codec::None => 0,
        })
    }
}

/// Mode flags that change what is computed and written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct OutputModes {
    /// Read `HDS` haplotype dosages instead of `GT` hard calls, and report R².
    pub use_dosage: bool,
    /// Write only the sites VCF; no flip, no matrices.
    pub frequency_only: bool,
    /// Add per-sample `HC_x` haplotype-count FORMAT fields to the sites VCF.
    pub hapcount_block: bool,
}

impl OutputModes {
    /// Whether the dosage and covariate matrices are written.
    pub fn writes_matrices(&self) -> bool {
        !self.frequency_only
    }
}

/// Complete configuration for one extraction run.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ExtractConfig {
    /// RFMix `.msp.tsv` tract file (optionally gzip-compressed).
    pub tract_path: PathBuf,
    /// Indexed VCF/BCF with phased genotypes.
    pub variant_path: PathBuf,
    /// Output path prefix.
    pub prefix: PathBuf,
    /// Optional subset file with sample names to keep.
    pub subset_path: Option<PathBuf>,
    /// Region queried from the variant file.
    pub region: Region,
    /// Output mode flags.
    pub modes: OutputModes,
    /// Matrix compression settings.
    pub compression: Compression,
}

impl ExtractConfig {
    /// Configuration with default modes and zstd compression on one thread.
    pub fn new(
        tract_path: impl Into<PathBuf>,
        variant_path: impl Into<PathBuf>,
        prefix: impl Into<PathBuf>,
        region: Region,
    ) -> Self {
        Self {
            tract_path: tract_path.into(),
            variant_path: variant_path.into(),
            prefix: prefix.into(),
            subset_path: None,
            region,
            modes: OutputModes::default(),
            compression: Compression::default(),
        }
    }

    /// Restrict the run to samples listed in `path`.
    pub fn with_subset(mut self, path: impl Into<PathBuf>) -> Self {
        self.subset_path = Some(path.into());
        self
    }

    /// Replace the output mode flags.
    pub fn with_modes(mut self, modes: OutputModes) -> Self {
        self.modes = modes;
        self
    }

    /// Replace the compression settings.
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Path of the annotated sites VCF.
    pub fn sites_path(&self) -> PathBuf {
        with_suffix(&self.prefix, ".local_anc.sites.vcf")
    }

    /// Path of the component-0 dosage matrix.
    pub fn dosage_path(&self) -> PathBuf {
        with_suffix(
            &self.prefix,
            &format!(".anc0.dosage.txt{}", self.compression.codec.extension()),
        )
    }

    /// Path of the interleaved dosage/hapcount covariate matrix.
    pub fn covariate_path(&self) -> PathBuf {
        with_suffix(
            &self.prefix,
            &format!(".local_covar.txt{}", self.compression.codec.extension()),
        )
    }

    /// Check paths and numeric settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prefix.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPrefix);
        }
        if self.compression.threads == 0 {
            return Err(ConfigError::ZeroThreads);
        }
        require_file("tract file", &self.tract_path)?;
        require_file("variant file", &self.variant_path)?;
        if let Some(subset) = &self.subset_path {
            require_file("subset file", subset)?;
        }
        Ok(())
    }
}

fn require_file(what: &'static str, path: &Path) -> Result<(), ConfigError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ConfigError::MissingInput {
            what,
            path: path.to_path_buf(),
        })
    }
}

fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = prefix.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}
