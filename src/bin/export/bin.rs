#[macro_use]
extern crate clap;

use std::io::Write;

use clap::App;

use traffic_triage::SchemaName;
use traffic_triage::cli::{self, CliError};
use traffic_triage::config::PipelineConfig;
use traffic_triage::results::ResultStore;

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let yml = load_yaml!("cli_args.yaml");
    let m = App::from_yaml(yml).get_matches();

    cli::init_logging(false);

    let mode = m.value_of("mode").unwrap_or("network").parse::<SchemaName>()
        .map_err(|e| CliError::InvalidArg("mode".into(), e.to_string()))?;
    let out_path = m.value_of("out_file").ok_or_else(|| CliError::MissingInputArg("OUT".into()))?;

    let config = PipelineConfig::from_args(None, m.value_of("results"), None);
    let store = ResultStore::new(&config.result_dir);

    // Fails before touching the destination when no result exists
    let contents = store.read(mode)?;

    let mut out = cli::parse_output_file(out_path, m.is_present("force"))?;
    out.write_all(&contents).map_err(|e| CliError::IO(out_path.to_string(), e))?;

    eprintln!("Exported {} ({} bytes) to {}", store.path(mode).display(), cli::format_count(contents.len()), out_path);
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        cli::exit_with_error(e);
    }
}
