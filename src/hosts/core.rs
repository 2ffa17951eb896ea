use std::collections::TryReserveError;
use std::io::{self, Write};
use std::path::Path;

use thiserror::Error;

use super::merge::{DEFAULT_MAX_HOSTS_PER_LINE, sort_and_dedup, write_hosts};
use super::parse::{HostRecord, parse_hosts};
use crate::common::io::{FileData, OutputFile, open_input, read_file, read_stdin};
use crate::common::{TOOL_NAME, io_error_msg};

/// Exit status for every fatal error.
pub const EXIT_FAILURE: i32 = 1;

/// Path meaning standard input (as INPUT) or standard output (as OUTPUT).
pub const STDIO_PATH: &str = "-";

/// Configuration for a hostpress run.
#[derive(Debug, Clone)]
pub struct HostpressConfig {
    /// Hostnames per output line; 0 means one line per IP.
    pub max_hosts_per_line: usize,
    /// Suppress progress messages.
    pub quiet: bool,
}

impl Default for HostpressConfig {
    fn default() -> Self {
        Self {
            max_hosts_per_line: DEFAULT_MAX_HOSTS_PER_LINE,
            quiet: false,
        }
    }
}

/// Errors that abort a run. All of them are fatal.
#[derive(Debug, Error)]
pub enum HostpressError {
    /// Bad command line; the clap message already carries the usage text.
    #[error(transparent)]
    Usage(#[from] clap::Error),
    /// The input file could not be opened.
    #[error("cannot open input '{path}': {}", io_error_msg(.source))]
    InputOpen { path: String, source: io::Error },
    /// The input was opened but reading it failed.
    #[error("error reading '{path}': {}", io_error_msg(.source))]
    Read { path: String, source: io::Error },
    /// The output file could not be created.
    #[error("cannot create output '{path}': {}", io_error_msg(.source))]
    OutputOpen { path: String, source: io::Error },
    /// Writing or flushing the output failed.
    #[error("error writing '{path}': {}", io_error_msg(.source))]
    Write { path: String, source: io::Error },
    /// The record collection or input buffer could not grow.
    #[error("memory exhausted")]
    Allocation,
}

impl From<TryReserveError> for HostpressError {
    fn from(_: TryReserveError) -> Self {
        HostpressError::Allocation
    }
}

impl HostpressError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        EXIT_FAILURE
    }

    /// True when the reader of our output went away; not worth a diagnostic.
    /// Only reachable where SIGPIPE is not reset to its default action
    /// (non-unix targets); on unix the signal ends the process first.
    pub fn is_broken_pipe(&self) -> bool {
        matches!(
            self,
            HostpressError::Write { source, .. } if source.kind() == io::ErrorKind::BrokenPipe
        )
    }
}

/// Counters reported as progress by the command-line tool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompressStats {
    /// Records parsed from the input, duplicates included.
    pub records: usize,
    /// Exact duplicates removed.
    pub duplicates: usize,
    /// Output lines written.
    pub lines: u64,
}

impl CompressStats {
    pub fn unique(&self) -> usize {
        self.records - self.duplicates
    }
}

/// Load the whole input into memory. `-` reads standard input.
pub fn load_input(path: &str) -> Result<FileData, HostpressError> {
    let read_err = |source: io::Error| {
        if source.kind() == io::ErrorKind::OutOfMemory {
            HostpressError::Allocation
        } else {
            HostpressError::Read {
                path: path.to_string(),
                source,
            }
        }
    };

    if path == STDIO_PATH {
        return read_stdin().map_err(read_err);
    }
    let file = open_input(Path::new(path)).map_err(|source| HostpressError::InputOpen {
        path: path.to_string(),
        source,
    })?;
    read_file(file).map_err(read_err)
}

/// Open the output. `-` writes standard output; a regular file is only
/// replaced when the returned `OutputFile` is committed.
pub fn create_output(path: &str) -> Result<OutputFile, HostpressError> {
    if path == STDIO_PATH {
        return Ok(OutputFile::stdout());
    }
    OutputFile::create(Path::new(path)).map_err(|source| HostpressError::OutputOpen {
        path: path.to_string(),
        source,
    })
}

/// Parsed, sorted and deduplicated records, ready to be written.
#[derive(Debug)]
pub struct HostTable<'a> {
    records: Vec<HostRecord<'a>>,
    parsed: usize,
    duplicates: usize,
}

impl<'a> HostTable<'a> {
    /// Parse `data`, sort the records and drop exact duplicates.
    pub fn build(data: &'a [u8]) -> Result<Self, TryReserveError> {
        let mut records = parse_hosts(data)?;
        let parsed = records.len();
        let duplicates = sort_and_dedup(&mut records);
        Ok(Self {
            records,
            parsed,
            duplicates,
        })
    }

    pub fn records(&self) -> &[HostRecord<'a>] {
        &self.records
    }

    /// Records parsed from the input, duplicates included.
    pub fn parsed(&self) -> usize {
        self.parsed
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    /// Write the grouped lines to `out`, returning the counters of the run.
    /// The caller flushes or commits `out`.
    pub fn write_to(
        &self,
        out: &mut impl Write,
        config: &HostpressConfig,
    ) -> io::Result<CompressStats> {
        let lines = write_hosts(&self.records, out, config.max_hosts_per_line)?;
        Ok(CompressStats {
            records: self.parsed,
            duplicates: self.duplicates,
            lines,
        })
    }
}

/// Run the whole pipeline over an in-memory hosts file: parse, sort,
/// deduplicate, and write the grouped result to `output`.
///
/// I/O errors are returned as `HostpressError::Write` against `output_name`.
pub fn compress_hosts<W: Write>(
    data: &[u8],
    mut output: W,
    config: &HostpressConfig,
    output_name: &str,
) -> Result<CompressStats, HostpressError> {
    let table = HostTable::build(data)?;
    let write_err = |source| HostpressError::Write {
        path: output_name.to_string(),
        source,
    };
    let stats = table.write_to(&mut output, config).map_err(write_err)?;
    output.flush().map_err(write_err)?;
    Ok(stats)
}

/// Compress the hosts file at `input_path` into `output_path`.
///
/// The input is fully parsed before the output is opened, and a regular
/// output file is replaced only once everything is written, so a failed run
/// leaves the output untouched. Input and output may be the same file.
/// Progress goes to stdout unless `config.quiet` is set or the output
/// itself is stdout.
pub fn run_files(
    input_path: &str,
    output_path: &str,
    config: &HostpressConfig,
) -> Result<CompressStats, HostpressError> {
    let progress = !config.quiet && output_path != STDIO_PATH;

    if progress {
        println!("{}: reading {}", TOOL_NAME, input_path);
    }
    let data = load_input(input_path)?;
    let table = HostTable::build(&data)?;
    if progress {
        println!("{}: found {} host entries", TOOL_NAME, table.parsed());
        println!(
            "{}: sorted, {} duplicates removed",
            TOOL_NAME,
            table.duplicates()
        );
    }

    let mut output = create_output(output_path)?;
    let write_err = |source| HostpressError::Write {
        path: output_path.to_string(),
        source,
    };
    let stats = table.write_to(&mut output, config).map_err(write_err)?;
    output.commit().map_err(write_err)?;

    if progress {
        println!(
            "{}: wrote {} entries on {} lines to {}",
            TOOL_NAME,
            stats.unique(),
            stats.lines,
            output_path
        );
    }
    Ok(stats)
}
