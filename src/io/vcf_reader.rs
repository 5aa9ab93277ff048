use crate::{core::genotype::Genotype, utils::util::Result};
use rust_htslib::{
    bcf::{self, record::GenotypeAllele, Read},
    errors::Error as HtslibError,
};
use std::path::{Path, PathBuf};

/// Sequential reader over a plain or BGZF-compressed VCF/BCF.
pub struct VcfReader {
    pub reader: bcf::Reader,
    pub current_record: bcf::Record,
    pub sample_n: usize,
    path: Option<PathBuf>,
}

impl VcfReader {
    /// Reads `input`, or standard input when `None`.
    pub fn new(input: Option<&Path>) -> Result<Self> {
        let reader = match input {
            Some(path) => {
                log::trace!("Opening VCF {}", path.display());
                bcf::Reader::from_path(path).map_err(|e| {
                    crate::wga_error!("Failed to open VCF file {}: {}", path.display(), e)
                })?
            }
            None => bcf::Reader::from_stdin()
                .map_err(|e| crate::wga_error!("Failed to read VCF from stdin: {}", e))?,
        };
        let sample_n = reader.header().sample_count() as usize;
        let current_record = reader.empty_record();
        Ok(VcfReader {
            reader,
            current_record,
            sample_n,
            path: input.map(Path::to_path_buf),
        })
    }

    fn source(&self) -> String {
        self.path
            .as_ref()
            .map_or_else(|| "stdin".to_string(), |p| p.display().to_string())
    }

    pub fn advance(&mut self) -> Result<bool> {
        match self.reader.read(&mut self.current_record) {
            Some(Ok(())) => Ok(true),
            Some(Err(e)) => Err(crate::wga_error!(
                "Error reading record from {}: {e}",
                self.source()
            )),
            None => Ok(false),
        }
    }
}

fn is_phased(allele: &GenotypeAllele) -> bool {
    matches!(
        allele,
        GenotypeAllele::Phased(_) | GenotypeAllele::PhasedMissing
    )
}

/// Reads the GT of every sample in `record`.
///
/// Returns `None` for sites-only input and for records that carry no GT field at all.
/// A sample without a GT value inside a GT-bearing record is fully missing.
pub fn record_genotypes(record: &bcf::Record, sample_n: usize) -> Result<Option<Vec<Genotype>>> {
    if sample_n == 0 {
        return Ok(None);
    }
    let genotypes = match record.genotypes() {
        Ok(genotypes) => genotypes,
        Err(HtslibError::BcfUndefinedTag { .. } | HtslibError::BcfMissingTag { .. }) => {
            return Ok(None)
        }
        Err(e) => return Err(e.into()),
    };
    let mut out = Vec::with_capacity(sample_n);
    for sample_idx in 0..sample_n {
        let gt = genotypes.get(sample_idx);
        let alleles = gt.iter().map(|allele| allele.index()).collect();
        let phased = gt.iter().skip(1).any(is_phased);
        out.push(Genotype::new(alleles, phased));
    }
    Ok(Some(out))
}

/// ALT alleles of `record` as strings.
pub fn record_alts(record: &bcf::Record) -> Result<Vec<String>> {
    record
        .alleles()
        .iter()
        .skip(1)
        .map(|allele| -> Result<String> { Ok(std::str::from_utf8(allele)?.to_string()) })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::matrix::JointRow,
        io::vcf_writer::{create_output_header, VcfWriter},
    };
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn vcf_reader_round_trips_genotypes_and_alleles() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("in.vcf");
        let samples = vec!["a".to_string(), "b".to_string()];
        let header = create_output_header("chr", 10, &samples, true);
        {
            let mut writer = VcfWriter::new(&header, Some(&path)).unwrap();
            let rid = writer.contig_rid("chr").unwrap();
            writer
                .write_row(
                    rid,
                    &JointRow {
                        position: 3,
                        ref_allele: "G".to_string(),
                        alt_alleles: vec!["A".to_string(), "N".to_string()],
                        genotypes: vec![
                            Genotype::new(vec![Some(0), Some(2)], true),
                            Genotype::missing(2),
                        ],
                    },
                )
                .unwrap();
        }

        let mut reader = VcfReader::new(Some(&path)).unwrap();
        assert_eq!(reader.sample_n, 2);
        assert!(reader.advance().unwrap());
        let record = &reader.current_record;
        assert_eq!(record.pos(), 2);
        assert_eq!(record_alts(record).unwrap(), vec!["A", "N"]);
        let genotypes = record_genotypes(record, reader.sample_n).unwrap().unwrap();
        assert_eq!(genotypes[0].to_string(), "0|2");
        assert_eq!(genotypes[1].to_string(), "./.");
        assert!(!reader.advance().unwrap());
    }

    #[test]
    fn record_genotypes_is_none_without_a_gt_field() {
        let dir = tempdir().unwrap();
        let sites_only = dir.path().join("sites.vcf");
        fs::write(
            &sites_only,
            "##fileformat=VCFv4.2\n\
##contig=<ID=chr,length=10>\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n\
chr\t2\t.\tC\tT,N\t.\tPASS\t.\n",
        )
        .unwrap();
        let mut reader = VcfReader::new(Some(&sites_only)).unwrap();
        assert!(reader.advance().unwrap());
        assert_eq!(
            record_genotypes(&reader.current_record, reader.sample_n).unwrap(),
            None
        );

        let no_gt = dir.path().join("no_gt.vcf");
        fs::write(
            &no_gt,
            "##fileformat=VCFv4.2\n\
##contig=<ID=chr,length=10>\n\
##FORMAT=<ID=DP,Number=1,Type=Integer,Description=\"Depth\">\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\ta\n\
chr\t2\t.\tC\tT\t.\tPASS\t.\tDP\t7\n",
        )
        .unwrap();
        let mut reader = VcfReader::new(Some(&no_gt)).unwrap();
        assert!(reader.advance().unwrap());
        assert_eq!(
            record_genotypes(&reader.current_record, reader.sample_n).unwrap(),
            None
        );
    }

    #[test]
    fn vcf_reader_reports_missing_file() {
        let dir = tempdir().unwrap();
        let err = VcfReader::new(Some(&dir.path().join("absent.vcf")))
            .err()
            .unwrap();
        assert!(err.to_string().contains("absent.vcf"));
    }
}
