#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use rust_htslib::bcf::{self, record::GenotypeAllele};
use tractdose::output::memory_sink;
use tractdose::{
    extract, MemoryVariantSource, OutputModes, RunSummary, SampleAlignment, SiteFormatter,
    StatsOptions, TractCursor, TractHeader, VariantRecord,
};

fn snapshot_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("snapshots")
}

pub fn assert_snapshot(name: &str, actual: &str) {
    let path = snapshot_root().join(name);
    if std::env::var("TRACTDOSE_UPDATE_SNAPSHOTS").is_ok() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create snapshot directory");
        }
        fs::write(&path, actual).expect("write snapshot");
        return;
    }

    let expected =
        fs::read_to_string(&path).unwrap_or_else(|_| panic!("snapshot {:?} not found", path));
    if normalize(&expected) != normalize(actual) {
        panic!(
            "Snapshot mismatch for {:?}. Set TRACTDOSE_UPDATE_SNAPSHOTS=1 to regenerate.\nExpected:\n{}\nActual:\n{}",
            path,
            expected,
            actual
        );
    }
}

fn normalize(input: &str) -> String {
    input.replace("\r\n", "\n")
}

/// Two components, two samples, two adjacent intervals on chr1 spanning
/// [100, 300).
pub const TWO_WAY_MSP: &str = "#Subpopulation order/codes: AFR=0\tEUR=1\n\
#chm\tspos\tepos\tsgpos\tegpos\tn snps\ts1.0\ts1.1\ts2.0\ts2.1\n\
chr1\t100\t200\t0.1\t0.2\t5\t0\t1\t1\t1\n\
chr1\t200\t300\t0.2\t0.3\t5\t0\t0\t0\t0\n";

pub fn biallelic(pos: u64, id: &str, reference: &str, alternate: &str, haplotypes: Vec<[f64; 2]>) -> VariantRecord {
    VariantRecord {
        chrom: "chr1".to_string(),
        pos,
        id: id.to_string(),
        reference: reference.to_string(),
        alternates: vec![alternate.to_string()],
        haplotypes,
    }
}

/// Records used by the golden and determinism tests: one before the tracts,
/// one per interval, one at the exclusive end.
pub fn two_way_records() -> Vec<VariantRecord> {
    vec![
        biallelic(50, "rs0", "G", "A", vec![[1.0, 1.0], [1.0, 1.0]]),
        biallelic(150, "rs1", "A", "G", vec![[1.0, 0.0], [0.5, 1.0]]),
        biallelic(250, "rs2", "C", "T", vec![[0.0, 0.0], [0.0, 1.0]]),
        biallelic(300, "rs3", "T", "C", vec![[0.0, 1.0], [1.0, 0.0]]),
    ]
}

#[derive(Debug)]
pub struct MemoryRun {
    pub summary: RunSummary,
    pub sites: String,
    pub dosage: String,
    pub covariates: String,
}

/// Run the merge entirely in memory.
pub fn run_in_memory(
    msp: &str,
    samples: &[&str],
    records: Vec<VariantRecord>,
    modes: OutputModes,
) -> MemoryRun {
    let header = TractHeader::read(msp.as_bytes()).expect("tract header parses");
    let samples: Vec<String> = samples.iter().map(|s| s.to_string()).collect();
    let alignment =
        SampleAlignment::build(&samples, header.haplotypes(), None).expect("samples align");
    let mut cursor = TractCursor::new(msp.as_bytes(), &header, &alignment);
    let mut source =
        MemoryVariantSource::new(samples, records).with_contigs(vec!["chr1".to_string()]);

    let components = header
        .component_names()
        .into_iter()
        .map(str::to_string)
        .collect();
    let mut sink = memory_sink(
        SiteFormatter::new(components, modes),
        modes.writes_matrices(),
        modes.hapcount_block,
    );
    let options = StatsOptions {
        r2: modes.use_dosage,
        allow_flip: !modes.frequency_only,
    };
    let summary = extract(&mut source, &header, &mut cursor, &alignment, &mut sink, options)
        .expect("extraction succeeds");
    let closed = sink.close().expect("sink closes");

    let text = |bytes: Vec<u8>| String::from_utf8(bytes).expect("utf-8 output");
    MemoryRun {
        summary,
        sites: text(closed.sites),
        dosage: text(closed.dosage.unwrap_or_default()),
        covariates: text(closed.covariates.unwrap_or_default()),
    }
}

/// One record for [`write_indexed_bcf`]. `genotypes` are phased allele
/// indices per sample, negative for a missing allele; `hds` optional
/// haplotype dosages.
pub struct Site {
    pub pos: u64,
    pub id: &'static str,
    pub alleles: &'static [&'static [u8]],
    pub genotypes: Vec<[i32; 2]>,
    pub hds: Option<Vec<[f32; 2]>>,
}

impl Site {
    pub fn new(pos: u64, id: &'static str, genotypes: Vec<[i32; 2]>) -> Self {
        Self {
            pos,
            id,
            alleles: &[b"A", b"C"],
            genotypes,
            hds: None,
        }
    }

    pub fn with_hds(mut self, hds: Vec<[f32; 2]>) -> Self {
        self.hds = Some(hds);
        self
    }

    pub fn with_alleles(mut self, alleles: &'static [&'static [u8]]) -> Self {
        self.alleles = alleles;
        self
    }
}

/// Write a BGZF-compressed BCF on `chrom` and build its CSI index.
pub fn write_indexed_bcf(path: &Path, chrom: &str, samples: &[&str], sites: &[Site]) {
    let mut header = bcf::Header::new();
    header.push_record(format!("##contig=<ID={chrom},length=1000000>").as_bytes());
    header.push_record(br#"##FORMAT=<ID=GT,Number=1,Type=String,Description="Genotype">"#);
    header.push_record(
        br#"##FORMAT=<ID=HDS,Number=2,Type=Float,Description="Estimated haploid alternate allele dosage">"#,
    );
    for sample in samples {
        header.push_sample(sample.as_bytes());
    }

    {
        let mut writer =
            bcf::Writer::from_path(path, &header, false, bcf::Format::Bcf).expect("open bcf writer");
        let rid = writer
            .header()
            .name2rid(chrom.as_bytes())
            .expect("contig declared");
        for site in sites {
            let mut record = writer.empty_record();
            record.set_rid(Some(rid));
            record.set_pos(site.pos as i64 - 1);
            record.set_id(site.id.as_bytes()).expect("set id");
            record.set_alleles(site.alleles).expect("set alleles");
            let genotypes: Vec<GenotypeAllele> = site
                .genotypes
                .iter()
                .flat_map(|&[a, b]| {
                    let first = if a < 0 {
                        GenotypeAllele::UnphasedMissing
                    } else {
                        GenotypeAllele::Unphased(a)
                    };
                    let second = if b < 0 {
                        GenotypeAllele::PhasedMissing
                    } else {
                        GenotypeAllele::Phased(b)
                    };
                    [first, second]
                })
                .collect();
            record.push_genotypes(&genotypes).expect("push genotypes");
            if let Some(hds) = &site.hds {
                let flat: Vec<f32> = hds.iter().flatten().copied().collect();
                record.push_format_float(b"HDS", &flat).expect("push HDS");
            }
            writer.write(&record).expect("write record");
        }
    }

    assert!(
        bcf::index::build(path, None, 1, bcf::index::Type::Csi(14)).is_ok(),
        "index build failed for {}",
        path.display()
    );
}

/// Write `text` to `path`, gzip-compressed when the name ends in `gz`.
pub fn write_msp(path: &Path, text: &str) {
    let file = fs::File::create(path).expect("create tract file");
    if path.to_string_lossy().ends_with("gz") {
        let mut encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        encoder.write_all(text.as_bytes()).expect("write tract file");
        encoder.finish().expect("finish gzip");
    } else {
        let mut file = file;
        file.write_all(text.as_bytes()).expect("write tract file");
    }
}
