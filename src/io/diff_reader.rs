//! Reader for the aligner's per-base difference table.
//!
//! Lines before the `[P1]` header row are preamble. After it, every line is a
//! whitespace-delimited row of at least 12 fields: P1, SUB_REF, SUB_ALT, P2,
//! BUFF, DIST, LEN_R, LEN_Q, FRM_ref, FRM_qry, REF_TAG, QRY_TAG.

use super::readers::open_table_reader;
use crate::{
    constants::{DIFF_HEADER_COLUMNS, DIFF_HEADER_MARKER, DIFF_MIN_FIELDS, INDEL_PLACEHOLDER},
    core::{call::AlignmentStats, normalize::DiffRecord},
    error::WgaError,
    utils::util::Result,
};
use std::{io::BufRead, path::Path};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffTable {
    pub records: Vec<DiffRecord>,
    /// Rows skipped for too few fields or unparsable numbers.
    pub malformed: usize,
    /// Rows with no bases on either side.
    pub empty: usize,
}

/// Splits a header row into its bracketed column names, collapsing inner whitespace.
fn header_columns(line: &str) -> Vec<String> {
    line.split(']')
        .filter_map(|chunk| {
            let start = chunk.find('[')?;
            let name = chunk[start + 1..].split_whitespace().collect::<Vec<_>>().join(" ");
            Some(format!("[{name}]"))
        })
        .collect()
}

fn validate_header(path: &Path, line: &str) -> Result<()> {
    let columns = header_columns(line);
    let expected = DIFF_HEADER_COLUMNS.len();
    if columns.len() < expected {
        return Err(WgaError::SchemaMismatch {
            path: path.to_path_buf(),
            detail: format!("expected {expected} columns, found {}", columns.len()),
        });
    }
    for (idx, (found, wanted)) in columns.iter().zip(DIFF_HEADER_COLUMNS).enumerate() {
        if found != wanted {
            return Err(WgaError::SchemaMismatch {
                path: path.to_path_buf(),
                detail: format!("column {} is {found}, expected {wanted}", idx + 1),
            });
        }
    }
    Ok(())
}

fn parse_row(fields: &[&str]) -> std::result::Result<DiffRecord, String> {
    if fields.len() < DIFF_MIN_FIELDS {
        return Err(format!(
            "expected at least {DIFF_MIN_FIELDS} fields, found {}",
            fields.len()
        ));
    }
    let int = |idx: usize| -> std::result::Result<i64, String> {
        fields[idx]
            .parse::<i64>()
            .map_err(|e| format!("field {} '{}': {e}", idx + 1, fields[idx]))
    };
    let ref_pos = fields[0]
        .parse::<u64>()
        .map_err(|e| format!("position '{}': {e}", fields[0]))?;
    if ref_pos == 0 {
        return Err("position 0 is outside the 1-based reference".to_string());
    }

    Ok(DiffRecord {
        ref_pos,
        sub_ref: fields[1].to_string(),
        sub_alt: fields[2].to_string(),
        stats: AlignmentStats {
            query_pos: int(3)?,
            buff: int(4)?,
            dist: int(5)?,
            ref_len: int(6)?,
            query_len: int(7)?,
            ref_frame: int(8)?,
            query_frame: int(9)?,
        },
        ref_tag: fields[10].to_string(),
        query_tag: fields[11].to_string(),
    })
}

pub fn read_diff_table(path: &Path) -> Result<DiffTable> {
    log::trace!("Reading diff table {}", path.display());
    let reader = open_table_reader(path)?;
    let mut lines = reader.lines().enumerate();

    let mut found_header = false;
    for (_, line) in lines.by_ref() {
        let line = line?;
        let trimmed = line.trim_start();
        if trimmed.starts_with(DIFF_HEADER_MARKER) {
            validate_header(path, trimmed)?;
            found_header = true;
            break;
        }
    }
    if !found_header {
        return Err(WgaError::MissingHeader {
            path: path.to_path_buf(),
            marker: DIFF_HEADER_MARKER.to_string(),
        });
    }

    let mut table = DiffTable::default();
    for (line_idx, line) in lines {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('[') || trimmed.starts_with('/') {
            continue;
        }
        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        match parse_row(&fields) {
            Ok(record) => {
                if record.sub_ref == INDEL_PLACEHOLDER && record.sub_alt == INDEL_PLACEHOLDER {
                    log::debug!(
                        "{}: line {} has no bases on either side, skipping",
                        path.display(),
                        line_idx + 1
                    );
                    table.empty += 1;
                    continue;
                }
                table.records.push(record);
            }
            Err(detail) => {
                let err = WgaError::MalformedRecord {
                    line: line_idx + 1,
                    detail,
                };
                log::warn!("{}: {err}, skipping", path.display());
                table.malformed += 1;
            }
        }
    }

    log::debug!(
        "{}: {} diff rows ({} malformed, {} empty)",
        path.display(),
        table.records.len(),
        table.malformed,
        table.empty
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const PREAMBLE: &str = "/data/ref.fa /data/s1.fa\nNUCMER\n\n";
    const HEADER: &str =
        "[P1]\t[SUB]\t[SUB]\t[P2]\t[BUFF]\t[DIST]\t[LEN R]\t[LEN Q]\t[FRM]\t[TAGS]\n";

    fn write_diff(header: &str, body: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("s1_vs_ref.snps.tsv");
        fs::write(&path, format!("{PREAMBLE}{header}{body}")).unwrap();
        (dir, path)
    }

    #[test]
    fn test_reads_rows_after_header() {
        let (_dir, path) = write_diff(
            HEADER,
            "101\tA\t.\t99\t3\t3\t1000\t998\t1\t1\tchr\tq1\n\
             50\t.\tG\t50\t0\t50\t1000\t1001\t1\t1\tchr\tq1\n",
        );
        let table = read_diff_table(&path).unwrap();
        assert_eq!(table.records.len(), 2);
        let first = &table.records[0];
        assert_eq!(first.ref_pos, 101);
        assert_eq!(first.sub_ref, "A");
        assert_eq!(first.sub_alt, ".");
        assert_eq!(first.stats.query_pos, 99);
        assert_eq!(first.stats.query_len, 998);
        assert_eq!(first.ref_tag, "chr");
        assert_eq!(first.query_tag, "q1");
    }

    #[test]
    fn test_short_and_unparsable_rows_are_counted() {
        let (_dir, path) = write_diff(
            HEADER,
            "101\tA\tC\t99\n\
             x\tA\tC\t99\t3\t3\t1000\t998\t1\t1\tchr\tq1\n\
             102\tA\tC\t99\t3\t3\t1000\t998\t1\t-1\tchr\tq1\n",
        );
        let table = read_diff_table(&path).unwrap();
        assert_eq!(table.records.len(), 1);
        assert_eq!(table.records[0].stats.query_frame, -1);
        assert_eq!(table.malformed, 2);
    }

    #[test]
    fn test_bracket_and_slash_lines_are_skipped() {
        let (_dir, path) = write_diff(
            HEADER,
            "[P1]\t[SUB]\n/some/path\n7\tG\tT\t7\t1\t1\t10\t10\t1\t1\tchr\tq1\n",
        );
        let table = read_diff_table(&path).unwrap();
        assert_eq!(table.records.len(), 1);
        assert_eq!(table.malformed, 0);
    }

    #[test]
    fn test_rows_without_bases_are_skipped() {
        let (_dir, path) = write_diff(HEADER, "7\t.\t.\t7\t1\t1\t10\t10\t1\t1\tchr\tq1\n");
        let table = read_diff_table(&path).unwrap();
        assert!(table.records.is_empty());
        assert_eq!(table.empty, 1);
    }

    #[test]
    fn test_header_spacing_is_normalized() {
        let header = "[P1]  [SUB]  [SUB]  [P2]  [BUFF]  [DIST]  [LEN  R]  [LEN Q]  [FRM]  [TAGS]\n";
        let (_dir, path) = write_diff(header, "");
        assert!(read_diff_table(&path).unwrap().records.is_empty());
    }

    #[test]
    fn test_unexpected_header_columns_are_rejected() {
        let header = "[P1]\t[SUB]\t[SUB]\t[P2]\t[LEN R]\t[LEN Q]\t[FRM]\t[TAGS]\n";
        let (_dir, path) = write_diff(header, "");
        assert!(matches!(
            read_diff_table(&path),
            Err(WgaError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_missing_header_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("s1_vs_ref.snps.tsv");
        fs::write(&path, "7\tG\tT\t7\t1\t1\t10\t10\t1\t1\tchr\tq1\n").unwrap();
        assert!(matches!(
            read_diff_table(&path),
            Err(WgaError::MissingHeader { .. })
        ));
    }

    #[test]
    fn test_header_columns_are_extracted() {
        assert_eq!(
            header_columns("[P1]\t[LEN  R]\t[TAGS]"),
            vec!["[P1]", "[LEN R]", "[TAGS]"]
        );
    }
}
