use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::path::PathBuf;

use dialoguer::Confirm;
use dialoguer::theme::ColorfulTheme;
use indicatif::{ProgressBar, ProgressStyle};
use num_format::{Locale, ToFormattedString};

#[derive(Debug)]
pub enum CliError {
    MissingInputArg(String),
    InvalidArg(String, String),
    FileNotFound(String),
    FileIsDirectory(String),
    FileExists(String),
    IO(String, std::io::Error),
}

impl std::error::Error for CliError {}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self {
            CliError::MissingInputArg(arg) => write!(f, "Missing input argument: {}.", arg),
            CliError::InvalidArg(arg, reason) => write!(f, "Invalid value for {}: {}.", arg, reason),
            CliError::FileNotFound(arg) => write!(f, "Could not find file \"{}\".", arg),
            CliError::FileIsDirectory(arg) => write!(f, "Provided file \"{}\" is a directory.", arg),
            CliError::FileExists(arg) => write!(f, "File \"{}\" already exists.", arg),
            CliError::IO(arg, err) => write!(f, "I/O error for {}: {}.", arg, err),
        }
    }
}

/// Open an output file, asking before truncating an existing one (unless `force`).
pub fn parse_output_file(input: &str, force: bool) -> Result<File, CliError> {
    let path = PathBuf::from(input);

    if path.is_dir() {
        Err(CliError::FileIsDirectory(input.to_string()))
    } else if path.exists() {
        let overwrite = force || matches!(
            Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt(format!("File \"{}\" exists, overwrite?", input))
                .default(false).wait_for_newline(true).interact_opt(),
            Ok(Some(true))
        );

        if !overwrite {
            return Err(CliError::FileExists(input.to_string()));
        }
        match OpenOptions::new().write(true).truncate(true).open(&path) {
            Ok(file) => Ok(file),
            Err(io_err) => Err(CliError::IO(input.to_string(), io_err))
        }
    } else {
        match File::create(path) {
            Ok(file) => Ok(file),
            Err(io_err) => Err(CliError::IO(input.to_string(), io_err))
        }
    }
}

/// Read an upload into memory.
pub fn read_input_file(input: &str) -> Result<Vec<u8>, CliError> {
    let path = PathBuf::from(input);

    if !path.exists() {
        Err(CliError::FileNotFound(input.to_string()))
    } else if path.is_dir() {
        Err(CliError::FileIsDirectory(input.to_string()))
    } else {
        fs::read(path).map_err(|io_err| CliError::IO(input.to_string(), io_err))
    }
}

/// Progress bar on stderr, or nothing when running quietly.
pub fn make_progress_bar(len: u64, quiet: bool) -> Option<ProgressBar> {
    if quiet {
        return None;
    }

    let pb = ProgressBar::new(len);
    pb.set_style(ProgressStyle::default_bar()
        .template("       {spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({eta})")
        .progress_chars("=> "));
    Some(pb)
}

/// Thousands-separated count for console summaries.
pub fn format_count(n: usize) -> String {
    n.to_formatted_string(&Locale::en)
}

pub fn print_output(msg: String, quiet: bool) {
    if !quiet {
        eprint!("{}", msg);
    }
}

/// Route `log` output to stderr. `RUST_LOG` takes precedence over the verbosity flag.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

pub fn exit_with_error(e: Box<dyn std::error::Error>) -> ! {
    eprintln!("Error: {}", e);
    std::process::exit(1)
}
