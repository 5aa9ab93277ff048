use crate::{
    cli::FULL_VERSION,
    core::{genotype::Genotype, matrix::JointRow},
    utils::util::Result,
};
use rust_htslib::bcf::{self, record::GenotypeAllele};
use std::{env, iter, path::Path};

pub const GT_FORMAT_LINE: &[u8] =
    br#"##FORMAT=<ID=GT,Number=1,Type=String,Description="Genotype">"#;

/// Header for a freshly assembled single-contig VCF.
pub fn create_output_header(
    contig: &str,
    reference_length: u64,
    samples: &[String],
    no_version: bool,
) -> bcf::Header {
    let mut header = bcf::Header::new();
    let contig_line = format!("##contig=<ID={contig},length={reference_length}>");
    header.push_record(contig_line.as_bytes());
    header.push_record(GT_FORMAT_LINE);
    if !no_version {
        add_version_info(&mut header);
    }
    for sample in samples {
        header.push_sample(sample.as_bytes());
    }
    header
}

pub fn add_version_info(header: &mut bcf::Header) {
    let version_line = format!("##{}Version={}", env!("CARGO_PKG_NAME"), *FULL_VERSION);
    header.push_record(version_line.as_bytes());

    let command_line = env::args().collect::<Vec<String>>().join(" ");
    let command_line = format!("##{}Command={}", env!("CARGO_PKG_NAME"), command_line);
    header.push_record(command_line.as_bytes());
}

pub fn genotype_alleles(genotype: &Genotype) -> Vec<GenotypeAllele> {
    genotype
        .alleles
        .iter()
        .enumerate()
        .map(|(i, allele)| {
            // The phase flag lives on every allele after the first
            let phased = genotype.phased && i > 0;
            match (allele, phased) {
                (Some(idx), false) => GenotypeAllele::Unphased(*idx as i32),
                (Some(idx), true) => GenotypeAllele::Phased(*idx as i32),
                (None, false) => GenotypeAllele::UnphasedMissing,
                (None, true) => GenotypeAllele::PhasedMissing,
            }
        })
        .collect()
}

/// Pushes one GT per sample, padding shorter genotypes with missing alleles up to the
/// largest ploidy in the record.
pub fn push_genotypes(record: &mut bcf::Record, genotypes: &[Genotype]) -> Result<()> {
    let max_ploidy = genotypes
        .iter()
        .map(|gt| gt.alleles.len())
        .max()
        .unwrap_or(2)
        .max(1);
    let mut flattened = Vec::with_capacity(max_ploidy * genotypes.len());
    for genotype in genotypes {
        let alleles = genotype_alleles(genotype);
        let padding = max_ploidy - alleles.len();
        flattened.extend(alleles);
        flattened.extend(iter::repeat_n(GenotypeAllele::UnphasedMissing, padding));
    }
    record.push_genotypes(&flattened)?;
    Ok(())
}

pub struct VcfWriter {
    pub writer: bcf::Writer,
    pub dummy_record: bcf::Record,
    rows_written: u64,
}

impl VcfWriter {
    /// Uncompressed VCF to `output`, or to standard output when `None`.
    pub fn new(header: &bcf::Header, output: Option<&Path>) -> Result<Self> {
        let writer = match output {
            Some(path) => bcf::Writer::from_path(path, header, true, bcf::Format::Vcf),
            None => bcf::Writer::from_stdout(header, true, bcf::Format::Vcf),
        }
        .map_err(|e| crate::wga_error!("Failed to create writer: {}", e))?;

        let dummy_record = writer.empty_record();
        Ok(VcfWriter {
            writer,
            dummy_record,
            rows_written: 0,
        })
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn contig_rid(&self, contig: &str) -> Result<u32> {
        self.writer
            .header()
            .name2rid(contig.as_bytes())
            .map_err(|e| crate::wga_error!("Contig {} missing from output header: {}", contig, e))
    }

    pub fn write_row(&mut self, rid: u32, row: &JointRow) -> Result<()> {
        let out_rec = &mut self.dummy_record;
        out_rec.clear();
        out_rec.set_rid(Some(rid));
        out_rec.set_pos(i64::try_from(row.position)? - 1);

        let mut alleles: Vec<&[u8]> = Vec::with_capacity(row.alt_alleles.len() + 1);
        alleles.push(row.ref_allele.as_bytes());
        alleles.extend(row.alt_alleles.iter().map(|alt| alt.as_bytes()));
        out_rec.set_alleles(&alleles)?;
        out_rec.push_filter("PASS".as_bytes())?;
        push_genotypes(out_rec, &row.genotypes)?;

        self.writer.write(out_rec)?;
        self.rows_written += 1;
        Ok(())
    }

    /// Writes a record read from another file that shares this writer's header layout.
    pub fn write_record(&mut self, record: &mut bcf::Record) -> Result<()> {
        self.writer.translate(record);
        self.writer.write(record)?;
        self.rows_written += 1;
        Ok(())
    }
}
