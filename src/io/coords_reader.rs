use super::readers::open_table_reader;
use crate::{
    constants::{
        COORDS_END_COLUMN, COORDS_HEADER_MARKER, COORDS_REF_LENGTH_COLUMN, COORDS_START_COLUMN,
    },
    core::coverage::AlignmentBlock,
    error::WgaError,
    utils::util::Result,
};
use std::{io::BufRead, path::Path};

/// Aligned reference blocks of one sample, as listed in its coordinate table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordsTable {
    pub blocks: Vec<AlignmentBlock>,
    pub reference_length: u64,
    pub malformed: usize,
}

#[derive(Debug, Clone, Copy)]
struct CoordsColumns {
    start: usize,
    end: usize,
    ref_length: usize,
}

impl CoordsColumns {
    fn from_header(path: &Path, header: &str) -> Result<Self> {
        let tokens: Vec<&str> = header.split('\t').map(str::trim).collect();
        let find = |name: &str| {
            tokens
                .iter()
                .position(|&t| t == name)
                .ok_or_else(|| WgaError::SchemaMismatch {
                    path: path.to_path_buf(),
                    detail: format!("column {name} not found"),
                })
        };
        Ok(Self {
            start: find(COORDS_START_COLUMN)?,
            end: find(COORDS_END_COLUMN)?,
            ref_length: find(COORDS_REF_LENGTH_COLUMN)?,
        })
    }

    fn parse(&self, fields: &[&str]) -> std::result::Result<(u64, u64, u64), String> {
        let get = |idx: usize, name: &str| -> std::result::Result<u64, String> {
            let value = fields
                .get(idx)
                .ok_or_else(|| format!("{name} missing ({} fields)", fields.len()))?;
            value
                .trim()
                .parse::<u64>()
                .map_err(|e| format!("{name} value '{value}': {e}"))
        };
        Ok((
            get(self.start, COORDS_START_COLUMN)?,
            get(self.end, COORDS_END_COLUMN)?,
            get(self.ref_length, COORDS_REF_LENGTH_COLUMN)?,
        ))
    }
}

pub fn read_coords(path: &Path) -> Result<CoordsTable> {
    log::trace!("Reading coordinate table {}", path.display());
    let reader = open_table_reader(path)?;
    let mut lines = reader.lines().enumerate();

    let mut columns = None;
    for (_, line) in lines.by_ref() {
        let line = line?;
        if line.starts_with(COORDS_HEADER_MARKER) {
            columns = Some(CoordsColumns::from_header(path, &line)?);
            break;
        }
    }
    let Some(columns) = columns else {
        return Err(WgaError::MissingHeader {
            path: path.to_path_buf(),
            marker: COORDS_HEADER_MARKER.to_string(),
        });
    };

    let mut blocks = Vec::new();
    let mut reference_length = None;
    let mut malformed = 0usize;
    for (line_idx, line) in lines {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('[') {
            continue;
        }
        let fields: Vec<&str> = trimmed.split('\t').collect();
        match columns.parse(&fields) {
            Ok((start, end, ref_length)) => {
                blocks.push(AlignmentBlock::new(start, end));
                match reference_length {
                    None => reference_length = Some(ref_length),
                    Some(len) if len != ref_length => log::debug!(
                        "{}: line {} reports reference length {ref_length}, keeping {len}",
                        path.display(),
                        line_idx + 1
                    ),
                    Some(_) => {}
                }
            }
            Err(detail) => {
                let err = WgaError::MalformedRecord {
                    line: line_idx + 1,
                    detail,
                };
                log::warn!("{}: {err}, skipping", path.display());
                malformed += 1;
            }
        }
    }

    let reference_length = reference_length.ok_or_else(|| WgaError::MissingReferenceLength {
        path: path.to_path_buf(),
    })?;
    log::debug!(
        "{}: {} alignment blocks, reference length {}",
        path.display(),
        blocks.len(),
        reference_length
    );

    Ok(CoordsTable {
        blocks,
        reference_length,
        malformed,
    })
}
