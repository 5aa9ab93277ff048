use crate::{
    cli::CleanArgs,
    core::allele_cleaner::{AlleleCleaner, CleanStats, RecordAction},
    io::{
        vcf_reader::{record_alts, record_genotypes, VcfReader},
        vcf_writer::{add_version_info, push_genotypes, VcfWriter},
    },
    utils::util::{format_number_with_commas, Result},
};
use rust_htslib::bcf::{
    self,
    header::{HeaderRecord, HeaderView},
    Read,
};
use std::path::Path;

fn log_clean_stats(stats: &CleanStats, rows_written: u64) {
    log::info!(
        "Records: {} read, {} written, {} dropped",
        format_number_with_commas(stats.records_seen),
        format_number_with_commas(rows_written),
        format_number_with_commas(stats.records_dropped)
    );
    log::info!(
        "Removed {} no-data alleles from {} records, {} genotypes remapped, {} set to missing",
        format_number_with_commas(stats.n_alleles_removed),
        format_number_with_commas(stats.records_remapped),
        format_number_with_commas(stats.genotypes_changed),
        format_number_with_commas(stats.genotypes_set_missing)
    );
    if stats.inconsistent_alleles > 0 {
        log::warn!(
            "Genotype allele indexes out of range: {}",
            format_number_with_commas(stats.inconsistent_alleles)
        );
    }
}

/// INFO and FORMAT fields holding one value per ALT (`Number=A`) or per allele (`Number=R`).
fn allele_indexed_fields(header: &HeaderView) -> Vec<String> {
    header
        .header_records()
        .into_iter()
        .filter_map(|record| match record {
            HeaderRecord::Info { values, .. } => Some(("INFO", values)),
            HeaderRecord::Format { values, .. } => Some(("FORMAT", values)),
            _ => None,
        })
        .filter(|(_, values)| matches!(values.get("Number").map(String::as_str), Some("A" | "R")))
        .filter_map(|(kind, values)| values.get("ID").map(|id| format!("{kind}/{id}")))
        .collect()
}

/// Strips the "N" pseudo-allele from an existing VCF, one record at a time.
pub fn clean(args: CleanArgs) -> Result<()> {
    let mut reader = VcfReader::new(args.vcf.as_deref())?;
    let mut header = bcf::Header::from_template(reader.reader.header());
    if !args.no_version {
        add_version_info(&mut header);
    }
    let per_allele = allele_indexed_fields(reader.reader.header());
    if !per_allele.is_empty() {
        log::warn!(
            "Per-allele fields are not rewritten when ALT alleles are removed: {}",
            per_allele.join(", ")
        );
    }
    let mut writer = VcfWriter::new(&header, args.output.as_deref().map(Path::new))?;
    let mut cleaner = AlleleCleaner::new();

    while reader.advance()? {
        let record = &mut reader.current_record;
        let position = u64::try_from(record.pos())? + 1;
        let alts = record_alts(record)?;
        let mut genotypes = record_genotypes(record, reader.sample_n)?;

        let action =
            cleaner.clean_record(position, &alts, genotypes.as_deref_mut().unwrap_or_default());
        match action {
            RecordAction::Keep => {}
            RecordAction::Rewrite(kept) => {
                let ref_allele = record
                    .alleles()
                    .first()
                    .map(|allele| allele.to_vec())
                    .ok_or_else(|| crate::wga_error!("Record at {position} has no REF allele"))?;
                let mut alleles: Vec<&[u8]> = Vec::with_capacity(kept.len() + 1);
                alleles.push(&ref_allele);
                alleles.extend(kept.iter().map(|alt| alt.as_bytes()));
                record.set_alleles(&alleles)?;
                if let Some(genotypes) = &genotypes {
                    push_genotypes(record, genotypes)?;
                }
            }
            RecordAction::Drop => continue,
        }
        writer.write_record(record)?;
    }

    log_clean_stats(&cleaner.stats(), writer.rows_written());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cli::{Cli, Command},
        utils::util::init_logger,
    };
    use clap::Parser;
    use std::fs;
    use tempfile::tempdir;

    const INPUT: &str = "##fileformat=VCFv4.2\n\
##contig=<ID=chr,length=10>\n\
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\ta\tb\tc\n\
chr\t2\t.\tC\tT,N\t.\tPASS\t.\tGT\t1/1\t2/2\t0/0\n\
chr\t4\t.\tT\tN\t.\tPASS\t.\tGT\t1/1\t0/0\t0/0\n\
chr\t5\t.\tA\tG\t.\tPASS\t.\tGT\t0/1\t1/1\t0/0\n\
chr\t6\t.\tG\tN,A\t.\tPASS\t.\tGT\t1|2\t0/0\t./.\n";

    fn parse_clean_args(args: &[&str]) -> CleanArgs {
        init_logger();
        let parsed = Cli::try_parse_from(args).expect("CLI parse should succeed");
        let Command::Clean(args) = parsed.command else {
            panic!("expected the clean subcommand");
        };
        args
    }

    fn body_lines(path: &Path) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .filter(|line| !line.starts_with('#'))
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn clean_removes_no_data_alleles_and_drops_empty_records() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.vcf");
        let output = dir.path().join("out.vcf");
        fs::write(&input, INPUT).unwrap();

        let input_str = input.display().to_string();
        let output_str = output.display().to_string();
        clean(parse_clean_args(&[
            "wgavcf",
            "clean",
            "--vcf",
            input_str.as_str(),
            "-o",
            output_str.as_str(),
        ]))
        .unwrap();

        assert_eq!(
            body_lines(&output),
            vec![
                "chr\t2\t.\tC\tT\t.\tPASS\t.\tGT\t1/1\t./.\t0/0",
                "chr\t5\t.\tA\tG\t.\tPASS\t.\tGT\t0/1\t1/1\t0/0",
                "chr\t6\t.\tG\tA\t.\tPASS\t.\tGT\t.|1\t0/0\t./.",
            ]
        );
        let text = fs::read_to_string(&output).unwrap();
        assert!(text.contains("##wgavcfVersion="));
        assert!(text.contains("#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\ta\tb\tc"));
    }

    #[test]
    fn clean_handles_sites_only_input() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.vcf");
        let output = dir.path().join("out.vcf");
        fs::write(
            &input,
            "##fileformat=VCFv4.2\n\
##contig=<ID=chr,length=10>\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n\
chr\t2\t.\tC\tT,N\t.\tPASS\t.\n\
chr\t4\t.\tT\tN\t.\tPASS\t.\n",
        )
        .unwrap();

        let input_str = input.display().to_string();
        let output_str = output.display().to_string();
        clean(parse_clean_args(&[
            "wgavcf",
            "clean",
            "--vcf",
            input_str.as_str(),
            "-o",
            output_str.as_str(),
            "--no-version",
        ]))
        .unwrap();

        assert_eq!(body_lines(&output), vec!["chr\t2\t.\tC\tT\t.\tPASS\t."]);
    }

    #[test]
    fn allele_indexed_fields_lists_number_a_and_r_declarations() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.vcf");
        fs::write(
            &input,
            "##fileformat=VCFv4.2\n\
##contig=<ID=chr,length=10>\n\
##INFO=<ID=AF,Number=A,Type=Float,Description=\"Allele frequency\">\n\
##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Depth\">\n\
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n\
##FORMAT=<ID=AD,Number=R,Type=Integer,Description=\"Allele depths\">\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\ta\n",
        )
        .unwrap();

        let reader = VcfReader::new(Some(&input)).unwrap();
        assert_eq!(
            allele_indexed_fields(reader.reader.header()),
            vec!["INFO/AF", "FORMAT/AD"]
        );

        fs::write(&input, INPUT).unwrap();
        let reader = VcfReader::new(Some(&input)).unwrap();
        assert!(allele_indexed_fields(reader.reader.header()).is_empty());
    }

    #[test]
    fn clean_keeps_files_without_no_data_alleles_unchanged() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.vcf");
        let output = dir.path().join("out.vcf");
        fs::write(
            &input,
            "##fileformat=VCFv4.2\n\
##contig=<ID=chr,length=10>\n\
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\ta\n\
chr\t3\t.\tG\tA,C\t.\tPASS\t.\tGT\t1/2\n",
        )
        .unwrap();

        let input_str = input.display().to_string();
        let output_str = output.display().to_string();
        clean(parse_clean_args(&[
            "wgavcf",
            "clean",
            "--vcf",
            input_str.as_str(),
            "-o",
            output_str.as_str(),
            "--no-version",
        ]))
        .unwrap();

        assert_eq!(
            body_lines(&output),
            vec!["chr\t3\t.\tG\tA,C\t.\tPASS\t.\tGT\t1/2"]
        );
        assert!(!fs::read_to_string(&output).unwrap().contains("Version="));
    }
}
