use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Tony Kan, Ted Yu, William A. Goddard III, Victor Wai Tak Kam",
    version,
    about = "sicdock CLI - Score rigid-body docking poses of two fragments and manage the loop libraries used by the linker score.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Score and rank candidate poses of two fragments.
    Score(ScoreArgs),
    /// Manage loop hash libraries used by the linker score.
    Library(LibraryArgs),
}

/// Arguments for the `score` subcommand.
#[derive(Args, Debug)]
pub struct ScoreArgs {
    // --- Core Arguments ---
    /// Path to the first fragment (TOML).
    #[arg(long = "fragment1", required = true, value_name = "PATH")]
    pub fragment1: PathBuf,

    /// Path to the second fragment (TOML).
    #[arg(long = "fragment2", required = true, value_name = "PATH")]
    pub fragment2: PathBuf,

    /// Path to the score configuration file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// CSV file of candidate poses: id, then translation and rotation vector for each fragment.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub poses: PathBuf,

    /// Path for the ranked score table (CSV).
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    // --- Overrides ---
    /// Override the loop library directory from the config file.
    #[arg(long, value_name = "DIR")]
    pub loop_db: Option<PathBuf>,

    /// Dump linker examples for the best poses, prefixing every file with this string.
    #[arg(long, value_name = "PREFIX")]
    pub dump_prefix: Option<String>,

    /// Number of top-ranked poses to dump linkers for.
    #[arg(long, value_name = "INT")]
    pub dump_top: Option<usize>,

    /// Number of ranked poses to print to the console.
    #[arg(long, value_name = "INT", default_value_t = 10)]
    pub show_top: usize,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S dump.top=5
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `library` subcommand.
#[derive(Args, Debug)]
pub struct LibraryArgs {
    #[command(subcommand)]
    pub command: LibraryCommands,
}

/// Available commands for loop library management.
#[derive(Subcommand, Debug)]
pub enum LibraryCommands {
    /// Harvest loop segments from structures and save them as a loop library.
    Build(LibraryBuildArgs),
}

#[derive(Args, Debug)]
pub struct LibraryBuildArgs {
    /// Fragment files (TOML) to harvest loops from.
    #[arg(short, long = "input", required = true, num_args(1..), value_name = "PATH")]
    pub inputs: Vec<PathBuf>,

    /// Longest loop to store; every length from 3 up to this one is harvested.
    #[arg(short = 'L', long, required = true, value_name = "INT")]
    pub max_loop_length: usize,

    /// Directory to write the loop tables to.
    #[arg(short, long, required = true, value_name = "DIR")]
    pub output: PathBuf,

    /// Hash bin width for translations, in Angstroms.
    #[arg(long, value_name = "FLOAT")]
    pub cart_resolution: Option<f64>,

    /// Hash bin width for rotations, in degrees.
    #[arg(long, value_name = "FLOAT")]
    pub angle_resolution: Option<f64>,
}
