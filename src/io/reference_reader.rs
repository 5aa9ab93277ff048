use super::readers::{open_fasta_reader, open_table_reader};
use crate::{core::reference::ReferenceTable, error::WgaError, utils::util::Result};
use serde::Deserialize;
use std::{
    io::{BufRead, Read},
    path::Path,
};

const FASTA_EXTENSIONS: [&str; 5] = [".fa", ".fasta", ".fna", ".fa.gz", ".fasta.gz"];

#[derive(Debug, Deserialize)]
struct BaseRow {
    pos: u64,
    base: String,
}

fn is_fasta(path: &Path) -> bool {
    let path_str = path.to_string_lossy().to_lowercase();
    FASTA_EXTENSIONS.iter().any(|ext| path_str.ends_with(ext))
}

fn table_name(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    file_name
        .split('.')
        .next()
        .filter(|stem| !stem.is_empty())
        .unwrap_or("reference")
        .to_string()
}

/// Loads reference bases from an indexed FASTA or from a position/base table.
pub fn load_reference(path: &Path, sequence: Option<&str>) -> Result<ReferenceTable> {
    let reference = if is_fasta(path) {
        load_fasta(path, sequence)?
    } else {
        if sequence.is_some() {
            log::warn!(
                "Sequence name is ignored for reference table {}",
                path.display()
            );
        }
        load_base_table(path)?
    };
    if reference.is_empty() {
        return Err(crate::wga_error!(
            "Reference {} contains no bases",
            path.display()
        ));
    }
    log::debug!(
        "Loaded reference {} ({} bases) from {}",
        reference.name(),
        reference.len(),
        path.display()
    );
    Ok(reference)
}

fn load_fasta(path: &Path, sequence: Option<&str>) -> Result<ReferenceTable> {
    let reader = open_fasta_reader(path)?;
    let name = match sequence {
        Some(name) => name.to_string(),
        None => {
            if reader.n_seqs() > 1 {
                log::warn!(
                    "{} holds {} sequences, using the first one",
                    path.display(),
                    reader.n_seqs()
                );
            }
            reader.seq_name(0)?
        }
    };
    let len = reader.fetch_seq_len(&name);
    if len == 0 {
        return Err(crate::wga_error!(
            "Sequence {} not found in {}",
            name,
            path.display()
        ));
    }
    let end = usize::try_from(len - 1)?;
    let bases = reader.fetch_seq_string(&name, 0, end)?.into_bytes();
    Ok(ReferenceTable::new(name, bases))
}

/// Reads a two-column `pos,base` table. The delimiter is a comma when the first line has one,
/// a tab otherwise; a first row whose position is not numeric is a header.
fn load_base_table(path: &Path) -> Result<ReferenceTable> {
    let mut reader = open_table_reader(path)?;
    let mut first_line = String::new();
    reader.read_line(&mut first_line)?;
    let delimiter = if first_line.contains(',') { b',' } else { b'\t' };
    let has_header = first_line
        .split(delimiter as char)
        .next()
        .map(|field| field.trim().parse::<u64>().is_err())
        .unwrap_or(false);

    let chained = std::io::Cursor::new(first_line.into_bytes()).chain(reader);
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_reader(chained);

    // Columns are positional, whatever the header calls them
    let mut rows: Vec<(u64, u8)> = Vec::new();
    for (idx, result) in csv_reader
        .deserialize::<BaseRow>()
        .enumerate()
        .skip(usize::from(has_header))
    {
        let line = idx + 1;
        let row = result?;
        let base = match row.base.as_bytes() {
            [b] if b.is_ascii_alphabetic() => *b,
            _ => {
                return Err(WgaError::MalformedRecord {
                    line,
                    detail: format!("'{}' is not a single base", row.base),
                })
            }
        };
        rows.push((row.pos, base));
    }

    rows.sort_by_key(|&(pos, _)| pos);
    for (idx, &(pos, _)) in rows.iter().enumerate() {
        let expected = idx as u64 + 1;
        if pos != expected {
            let problem = if pos < expected { "duplicate" } else { "gap" };
            return Err(crate::wga_error!(
                "Reference table {} does not cover 1..{} contiguously: {} at position {}",
                path.display(),
                rows.len(),
                problem,
                pos.min(expected)
            ));
        }
    }

    let bases = rows.into_iter().map(|(_, base)| base).collect();
    Ok(ReferenceTable::new(table_name(path), bases))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write(name: &str, contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn test_csv_table_with_header() {
        let (_dir, path) = write("chrM.csv", "pos,base\n1,a\n2,C\n3,G\n4,T\n5,A\n");
        let reference = load_reference(&path, None).unwrap();
        assert_eq!(reference.name(), "chrM");
        assert_eq!(reference.len(), 5);
        assert_eq!(reference.base_at(1).unwrap(), 'A');
        assert_eq!(reference.base_at(4).unwrap(), 'T');
    }

    #[test]
    fn test_tab_table_without_header_in_any_order() {
        let (_dir, path) = write("ref.tsv", "2\tC\n1\tA\n3\tG\n");
        let reference = load_reference(&path, None).unwrap();
        assert_eq!(reference.len(), 3);
        assert_eq!(reference.base_at(2).unwrap(), 'C');
    }

    #[test]
    fn test_gap_in_positions_is_rejected() {
        let (_dir, path) = write("ref.csv", "pos,base\n1,A\n3,G\n");
        let err = load_reference(&path, None).unwrap_err();
        assert!(err.to_string().contains("gap at position 2"));
    }

    #[test]
    fn test_duplicate_position_is_rejected() {
        let (_dir, path) = write("ref.csv", "pos,base\n1,A\n2,C\n2,C\n");
        let err = load_reference(&path, None).unwrap_err();
        assert!(err.to_string().contains("duplicate at position 2"));
    }

    #[test]
    fn test_multi_character_base_is_rejected() {
        let (_dir, path) = write("ref.csv", "pos,base\n1,AC\n");
        assert!(matches!(
            load_reference(&path, None),
            Err(WgaError::MalformedRecord { line: 2, .. })
        ));
    }

    #[test]
    fn test_empty_table_is_rejected() {
        let (_dir, path) = write("ref.csv", "pos,base\n");
        assert!(load_reference(&path, None).is_err());
    }

    #[test]
    fn test_fasta_without_index_is_rejected() {
        let (_dir, path) = write("ref.fa", ">chr\nACGTA\n");
        assert!(matches!(
            load_reference(&path, None),
            Err(WgaError::MissingReferenceIndex { .. })
        ));
    }
}
