use std::{
    num::{ParseIntError, TryFromIntError},
    path::PathBuf,
    str::Utf8Error,
};
use thiserror::Error;

pub type WgaResult<T> = std::result::Result<T, WgaError>;

#[derive(Debug, Error)]
pub enum WgaError {
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Htslib(#[from] rust_htslib::errors::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Utf8(#[from] Utf8Error),
    #[error(transparent)]
    ParseInt(#[from] ParseIntError),
    #[error(transparent)]
    TryFromInt(#[from] TryFromIntError),
    #[error("Header row starting with '{marker}' not found in {}", path.display())]
    MissingHeader { path: PathBuf, marker: String },
    #[error("Header of {} does not match the expected layout: {detail}", path.display())]
    SchemaMismatch { path: PathBuf, detail: String },
    #[error("Malformed record at line {line}: {detail}")]
    MalformedRecord { line: usize, detail: String },
    #[error("Reference length could not be determined from {}", path.display())]
    MissingReferenceLength { path: PathBuf },
    #[error(
        "Reference length {observed} in {} differs from the reference table length {expected}",
        path.display()
    )]
    ReferenceLengthMismatch {
        path: PathBuf,
        observed: u64,
        expected: u64,
    },
    #[error("No reference base found for position {position}")]
    UnresolvedAnchor { position: u64 },
    #[error("Genotype allele index {index} exceeds the {n_alleles} alleles of the record at {position}")]
    InconsistentGenotype {
        position: u64,
        index: u32,
        n_alleles: usize,
    },
    #[error(
        "Reference index file not found: {}. Create it using 'samtools faidx {}'",
        fai_path.display(),
        reference_path.display()
    )]
    MissingReferenceIndex {
        fai_path: PathBuf,
        reference_path: PathBuf,
    },
    #[error("Invalid gzip header: {}", path.display())]
    InvalidGzipHeader { path: PathBuf },
}

impl WgaError {
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

#[macro_export]
macro_rules! wga_error {
    ($($arg:tt)*) => {
        $crate::error::WgaError::message(format!($($arg)*))
    };
}
