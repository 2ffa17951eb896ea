use std::process;

use clap::Parser;
use clap::error::ErrorKind;

use hostpress::common::{TOOL_NAME, reset_sigpipe};
use hostpress::hosts::{DEFAULT_MAX_HOSTS_PER_LINE, HostpressConfig, HostpressError, run_files};

#[derive(Parser)]
#[command(
    name = "hostpress",
    version,
    about = "Sort, deduplicate and compact a hosts file",
    after_help = "Hostnames sharing an IP are merged onto one line, split every N \
                  hostnames. Lines are sorted by IP, hostnames by name; exact \
                  duplicates are dropped. Use '-' for standard input or output."
)]
struct Cli {
    /// Hostnames per output line (0 = no limit)
    #[arg(
        short = 'n',
        long = "max-hosts",
        value_name = "N",
        default_value_t = DEFAULT_MAX_HOSTS_PER_LINE
    )]
    max_hosts: usize,

    /// Do not print progress messages
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,

    /// Hosts file to read
    input: String,

    /// File to write the compacted hosts file to
    output: String,
}

fn main() {
    reset_sigpipe();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let err = HostpressError::from(e);
            eprint!("{}", err);
            process::exit(err.exit_code());
        }
    };

    let config = HostpressConfig {
        max_hosts_per_line: cli.max_hosts,
        quiet: cli.quiet,
    };

    if let Err(e) = run_files(&cli.input, &cli.output, &config) {
        if e.is_broken_pipe() {
            return;
        }
        eprintln!("{}: {}", TOOL_NAME, e);
        process::exit(e.exit_code());
    }
}
