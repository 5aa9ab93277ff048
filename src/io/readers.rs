use crate::{error::WgaError, utils::util::Result};
use flate2::read::MultiGzDecoder;
use rust_htslib::faidx;
use std::{
    fs::File,
    io::{BufReader, Read as ioRead},
    path::{Path, PathBuf},
};

pub fn is_gzipped(path: &Path) -> bool {
    let path_str = path.to_string_lossy().to_lowercase();
    path_str.ends_with(".gz") || path_str.ends_with(".gzip")
}

/// Opens a plain or gzip-compressed text table.
pub fn open_table_reader(path: &Path) -> Result<BufReader<Box<dyn ioRead>>> {
    let file = File::open(path)
        .map_err(|error| crate::wga_error!("Failed to open file {}: {error}", path.display()))?;
    if is_gzipped(path) {
        let gz_decoder = MultiGzDecoder::new(file);
        if gz_decoder.header().is_some() {
            Ok(BufReader::new(Box::new(gz_decoder)))
        } else {
            Err(WgaError::InvalidGzipHeader {
                path: path.to_path_buf(),
            })
        }
    } else {
        Ok(BufReader::new(Box::new(file)))
    }
}

pub fn open_fasta_reader(path: &Path) -> Result<faidx::Reader> {
    let fai_path = {
        let mut fai_path = path.as_os_str().to_os_string();
        fai_path.push(".fai");
        PathBuf::from(fai_path)
    };
    if !fai_path.exists() {
        return Err(WgaError::MissingReferenceIndex {
            fai_path,
            reference_path: path.to_path_buf(),
        });
    }
    faidx::Reader::from_path(path).map_err(|e| e.into())
}
