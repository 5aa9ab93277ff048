pub mod cli;
pub mod error;

pub mod commands {
    pub mod call;
    pub mod clean;

    pub use call::call;
    pub use clean::clean;
}

pub mod core {
    pub mod allele_cleaner;
    pub mod call;
    pub mod coverage;
    pub mod gap_fill;
    pub mod genotype;
    pub mod matrix;
    pub mod normalize;
    pub mod reference;
}

pub mod io {
    pub mod coords_reader;
    pub mod diff_reader;
    pub mod readers;
    pub mod reference_reader;
    pub mod vcf_reader;
    pub mod vcf_writer;
}

pub mod utils {
    pub mod util;
}

pub mod constants;

pub use constants::*;
