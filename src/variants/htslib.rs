use std::fmt;
use std::path::Path;

use rust_htslib::bcf::record::Numeric;
use rust_htslib::bcf::{self, Read};
use tracing::debug;

use super::{HaplotypeField, VariantRecord, VariantSource, VariantSourceError};
use crate::config::Region;

/// Region query over an indexed VCF/BCF (tabix or CSI).
pub struct HtslibVariantSource {
    reader: bcf::IndexedReader,
    record: bcf::Record,
    samples: Vec<String>,
    contigs: Vec<String>,
    chrom: String,
    end: Option<u64>,
    field: HaplotypeField,
    finished: bool,
}

impl fmt::Debug for HtslibVariantSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HtslibVariantSource")
            .field("samples", &self.samples.len())
            .field("chrom", &self.chrom)
            .field("end", &self.end)
            .field("field", &self.field)
            .field("finished", &self.finished)
            .finish()
    }
}

impl HtslibVariantSource {
    /// Open `path` and position it at `region`.
    pub fn query(
        path: impl AsRef<Path>,
        region: &Region,
        field: HaplotypeField,
    ) -> Result<Self, VariantSourceError> {
        let mut reader = bcf::IndexedReader::from_path(path.as_ref())?;

        let header = reader.header();
        let samples: Vec<String> = header
            .samples()
            .iter()
            .map(|s| String::from_utf8_lossy(s).into_owned())
            .collect();
        let contigs: Vec<String> = (0..header.contig_count())
            .filter_map(|rid| header.rid2name(rid).ok())
            .map(|name| String::from_utf8_lossy(name).into_owned())
            .collect();
        let rid = header
            .name2rid(region.chrom.as_bytes())
            .map_err(|_| VariantSourceError::UnknownContig(region.chrom.clone()))?;

        // htslib takes a 0-based start; records past `region.end` are cut in `next_record`.
        let start = region.start.map_or(0, |start| start - 1);
        reader.fetch(rid, start, region.end)?;
        debug!(region = %region, samples = samples.len(), "opened variant region");

        let record = reader.empty_record();
        Ok(Self {
            reader,
            record,
            samples,
            contigs,
            chrom: region.chrom.clone(),
            end: region.end,
            field,
            finished: false,
        })
    }

    fn convert(&self) -> Result<VariantRecord, VariantSourceError> {
        let pos = self.record.pos() as u64 + 1;
        let alleles = self.record.alleles();
        let reference = alleles
            .first()
            .map(|a| String::from_utf8_lossy(a).into_owned())
            .unwrap_or_else(|| "N".to_string());
        let alternates = alleles
            .iter()
            .skip(1)
            .map(|a| String::from_utf8_lossy(a).into_owned())
            .collect();

        let mut haplotypes = Vec::with_capacity(self.samples.len());
        match self.field {
            HaplotypeField::Genotype => {
                let genotypes = self.record.genotypes()?;
                for sample in 0..self.samples.len() {
                    let genotype = genotypes.get(sample);
                    let mut pair = [f64::NAN; 2];
                    if genotype.len() == 2 {
                        for (slot, allele) in pair.iter_mut().zip(genotype.iter()) {
                            if let Some(index) = allele.index() {
                                *slot = index as f64;
                            }
                        }
                    }
                    haplotypes.push(pair);
                }
            }
            HaplotypeField::Dosage => match self.record.format(b"HDS").float() {
                Ok(dosages) => {
                    for values in dosages.iter().take(self.samples.len()) {
                        let mut pair = [f64::NAN; 2];
                        for (slot, value) in pair.iter_mut().zip(values.iter()) {
                            if !value.is_missing() {
                                *slot = *value as f64;
                            }
                        }
                        haplotypes.push(pair);
                    }
                }
                Err(rust_htslib::errors::Error::BcfMissingTag { .. }) => {}
                Err(err) => return Err(err.into()),
            },
        }
        haplotypes.resize(self.samples.len(), [f64::NAN; 2]);

        Ok(VariantRecord {
            chrom: self.chrom.clone(),
            pos,
            id: String::from_utf8_lossy(&self.record.id()).into_owned(),
            reference,
            alternates,
            haplotypes,
        })
    }
}

impl VariantSource for HtslibVariantSource {
    fn samples(&self) -> &[String] {
        &self.samples
    }

    fn contigs(&self) -> Vec<String> {
        self.contigs.clone()
    }

    fn next_record(&mut self) -> Option<Result<VariantRecord, VariantSourceError>> {
        if self.finished {
            return None;
        }
        match self.reader.read(&mut self.record) {
            None => {
                self.finished = true;
                None
            }
            Some(Err(err)) => Some(Err(err.into())),
            Some(Ok(())) => {
                let pos = self.record.pos() as u64 + 1;
                if self.end.map_or(false, |end| pos > end) {
                    self.finished = true;
                    return None;
                }
                Some(self.convert())
            }
        }
    }
}
