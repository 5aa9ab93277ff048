use crate::constants::*;
use anyhow::{anyhow, Result};
use clap::{ArgAction, ArgGroup, Parser, Subcommand};
use env_logger::fmt::Color;
use log::{Level, LevelFilter};
use once_cell::sync::Lazy;
use std::{
    fs::File,
    io::{BufRead, BufReader, Write},
    path::{Path, PathBuf},
};

/// Full version string including the crate version and git description.
///
/// # Examples
/// * `0.1.0-1ba958a-dirty` - while on a dirty branch
/// * `0.1.0-1ba958a` - with a fresh commit
/// * `0.1.0` - built outside a git checkout
pub static FULL_VERSION: Lazy<String> = Lazy::new(|| {
    let git_describe = option_env!("VERGEN_GIT_DESCRIBE").unwrap_or_default();
    if git_describe.is_empty() {
        env!("CARGO_PKG_VERSION").to_string()
    } else {
        format!("{}-{}", env!("CARGO_PKG_VERSION"), git_describe)
    }
});

#[derive(Parser, Debug)]
#[command(name="wgavcf",
          version=&**FULL_VERSION,
          about="Whole-genome alignment differences to multi-sample VCF",
          long_about = None,
          help_template = "{name} {version}\n{about-section}\n{usage-heading}\n    {usage}\n\n{all-args}{after-help}",
          )]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Specify multiple times to increase verbosity level (e.g., -vv for more verbosity)
    #[arg(
        short = 'v',
        long = "verbose",
        action = ArgAction::Count,
        global = true
    )]
    pub verbosity: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build a joint VCF from per-sample alignment tables
    Call(CallArgs),
    /// Remove "N" no-data alleles from an assembled VCF
    Clean(CleanArgs),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Call(_) => "call",
            Command::Clean(_) => "clean",
        }
    }
}

/// One sample's aligner output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleSpec {
    pub name: String,
    pub coords: PathBuf,
    pub snps: PathBuf,
}

impl SampleSpec {
    /// An empty `name` is derived from the diff table file name.
    pub fn new(name: &str, coords: PathBuf, snps: PathBuf) -> Self {
        let name = if name.is_empty() {
            sample_name_from_diff_path(&snps)
        } else {
            name.to_string()
        };
        Self {
            name,
            coords,
            snps,
        }
    }
}

/// `s1_vs_ref.snps.tsv` -> `s1`; other names fall back to the file stem.
pub fn sample_name_from_diff_path(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    if let Some(stripped) = file_name.strip_suffix(DIFF_FILE_SUFFIX) {
        if !stripped.is_empty() {
            return stripped.to_string();
        }
    }
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or(file_name)
}

#[derive(Parser, Debug, Clone)]
#[command(group(
    ArgGroup::new("input")
        .required(true)
        .args(["samples", "sample_list"]),
))]
#[command(arg_required_else_help(true))]
pub struct CallArgs {
    /// Sample as NAME:COORDS:SNPS (NAME may be empty to derive it from SNPS)
    #[arg(
        long = "sample",
        value_name = "NAME:COORDS:SNPS",
        num_args = 1..,
        value_parser = parse_sample_spec
    )]
    pub samples: Option<Vec<SampleSpec>>,

    /// Tab-separated file with one "name coords snps" line per sample
    #[arg(
        long = "sample-list",
        value_name = "SAMPLE_LIST",
        value_parser = check_file_exists
    )]
    pub sample_list: Option<PathBuf>,

    /// Reference bases: pos/base table (CSV or TSV, optionally gzipped) or indexed FASTA
    #[arg(
        short = 'r',
        long = "reference",
        value_name = "REFERENCE",
        required = true,
        value_parser = check_file_exists
    )]
    pub reference: PathBuf,

    /// FASTA sequence to use [default: first sequence]
    #[arg(long = "sequence", value_name = "NAME")]
    pub sequence: Option<String>,

    /// Write output to a file [default: standard output]
    #[arg(
        short = 'o',
        long = "output",
        value_name = "FILE",
        value_parser = check_prefix_path
    )]
    pub output: Option<String>,

    /// Number of threads to use
    #[arg(
        short = '@',
        long = "threads",
        value_name = "THREADS",
        default_value_t = DEFAULT_THREADS,
        value_parser = threads_in_range
    )]
    pub num_threads: usize,

    /// Keep "N" no-data alleles in the output
    #[arg(
        long = "no-clean",
        action = ArgAction::SetFalse,
        default_value_t = DEFAULT_CLEAN
    )]
    pub clean: bool,

    /// Output contig name [default: reference tag of the diff tables]
    #[arg(long = "contig", value_name = "CONTIG", help_heading = "Advanced")]
    pub contig: Option<String>,

    /// Do not append version and command line to the header
    #[arg(
        long = "no-version",
        default_value_t = DEFAULT_NO_VERSION,
        help_heading = "Advanced"
    )]
    pub no_version: bool,

    /// Show the progress bar even when it would be disabled
    #[arg(long = "progress", conflicts_with = "no_progress", help_heading = "Advanced")]
    pub progress: bool,

    /// Never show the progress bar
    #[arg(long = "no-progress", help_heading = "Advanced")]
    pub no_progress: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct CleanArgs {
    /// VCF to clean [default: standard input]
    #[arg(
        long = "vcf",
        value_name = "VCF",
        value_parser = check_file_exists
    )]
    pub vcf: Option<PathBuf>,

    /// Write output to a file [default: standard output]
    #[arg(
        short = 'o',
        long = "output",
        value_name = "FILE",
        value_parser = check_prefix_path
    )]
    pub output: Option<String>,

    /// Do not append version and command line to the header
    #[arg(
        long = "no-version",
        default_value_t = DEFAULT_NO_VERSION,
        help_heading = "Advanced"
    )]
    pub no_version: bool,
}

/// Initializes the verbosity level for logging based on the command-line arguments.
///
/// `-v` enables debug output, `-vv` and above enable trace output.
pub fn init_verbose(args: &Cli) {
    let filter_level: LevelFilter = match args.verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            let level = record.level();
            let mut style = buf.style();
            match record.level() {
                Level::Error => style.set_color(Color::Red),
                Level::Warn => style.set_color(Color::Yellow),
                Level::Info => style.set_color(Color::Green),
                Level::Debug => style.set_color(Color::Blue),
                Level::Trace => style.set_color(Color::Cyan),
            };

            writeln!(
                buf,
                "{} [{}] {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                style.value(level),
                record.module_path().unwrap_or("unknown_module"),
                record.args()
            )
        })
        .filter_level(filter_level)
        .init();
}

/// Validates that the provided string is a non-zero thread count.
fn threads_in_range(s: &str) -> Result<usize> {
    let thread: usize = s
        .parse::<usize>()
        .map_err(|_| anyhow!("`{}` is not a valid thread number", s))?;
    if thread == 0 {
        return Err(anyhow!("Number of threads must be >= 1"));
    }
    Ok(thread)
}

/// Checks if the provided file path exists.
fn check_file_exists(s: &str) -> Result<PathBuf> {
    let path = Path::new(s);
    if !path.exists() {
        return Err(anyhow!("File does not exist: {}", path.display()));
    }
    Ok(path.to_path_buf())
}

fn check_prefix_path(s: &str) -> Result<String> {
    let path = Path::new(s);
    if let Some(parent_dir) = path.parent() {
        if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
            return Err(anyhow!("Path does not exist: {}", parent_dir.display()));
        }
    }
    Ok(s.to_string())
}

fn parse_sample_spec(s: &str) -> Result<SampleSpec> {
    let mut parts = s.splitn(3, ':');
    let (Some(name), Some(coords), Some(snps)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(anyhow!(
            "Invalid sample `{}`, expected NAME:COORDS:SNPS",
            s
        ));
    };
    let coords = check_file_exists(coords)?;
    let snps = check_file_exists(snps)?;
    Ok(SampleSpec::new(name.trim(), coords, snps))
}

impl CallArgs {
    pub fn process_samples(&self) -> Result<Vec<SampleSpec>> {
        match (&self.samples, &self.sample_list) {
            (Some(samples), None) => Ok(samples.clone()),
            (None, Some(list_path)) => Self::read_samples_from_file(list_path),
            _ => unreachable!("Either --sample or --sample-list is provided, never both"),
        }
    }

    fn read_samples_from_file(path: &Path) -> Result<Vec<SampleSpec>> {
        let file = File::open(path)
            .map_err(|e| anyhow!("Failed to open sample list {}: {}", path.display(), e))?;
        let reader = BufReader::new(file);

        let mut samples = Vec::new();
        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| anyhow!("Error reading line {}: {}", line_num + 1, e))?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = trimmed.split('\t').map(str::trim).collect();
            let [name, coords, snps] = fields.as_slice() else {
                return Err(anyhow!(
                    "Line {} of {} must have 3 tab-separated fields (name, coords, snps), found {}",
                    line_num + 1,
                    path.display(),
                    fields.len()
                ));
            };
            let coords = PathBuf::from(coords);
            let snps = PathBuf::from(snps);
            for input in [&coords, &snps] {
                if !input.exists() {
                    Err(anyhow!("Sample input does not exist: {}", input.display()))?;
                }
            }
            samples.push(SampleSpec::new(name, coords, snps));
        }

        if samples.is_empty() {
            Err(anyhow!("No samples found in {}", path.display()))?;
        }

        Ok(samples)
    }
}
