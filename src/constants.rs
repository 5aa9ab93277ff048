pub const DEFAULT_THREADS: usize = 1;
pub const DEFAULT_CLEAN: bool = true;
pub const DEFAULT_NO_VERSION: bool = false;

/// Pseudo-allele marking a position without alignment coverage.
pub const NO_DATA_ALLELE: &str = "N";
/// Placeholder used by the aligner for the missing side of an indel.
pub const INDEL_PLACEHOLDER: &str = ".";
/// Value pinned onto the numeric fields of synthesized no-data calls.
pub const GAP_FILL_SENTINEL: i64 = 1;

pub const COORDS_HEADER_MARKER: &str = "[S1]";
pub const COORDS_START_COLUMN: &str = "[S1]";
pub const COORDS_END_COLUMN: &str = "[E1]";
pub const COORDS_REF_LENGTH_COLUMN: &str = "[LEN R]";

pub const DIFF_HEADER_MARKER: &str = "[P1]";
/// Leading bracketed columns of the diff table header, in order.
pub const DIFF_HEADER_COLUMNS: [&str; 10] = [
    "[P1]", "[SUB]", "[SUB]", "[P2]", "[BUFF]", "[DIST]", "[LEN R]", "[LEN Q]", "[FRM]", "[TAGS]",
];
pub const DIFF_MIN_FIELDS: usize = 12;

/// File name suffix the aligner wrapper puts on per-sample diff tables.
pub const DIFF_FILE_SUFFIX: &str = "_vs_ref.snps.tsv";
