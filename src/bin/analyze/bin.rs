#[macro_use]
extern crate clap;

use std::time::Instant;

use clap::App;
use counter::Counter;
use dialoguer::console::{Emoji, style};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use traffic_triage::{AnalysisResult, Pipeline, PipelineError, SchemaName};
use traffic_triage::cli::{self, CliError};
use traffic_triage::config::PipelineConfig;

static LOADING: Emoji<'_, '_> = Emoji("⏳ ", "");
static WORKING: Emoji<'_, '_> = Emoji("🛠️ ", "");
static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "");

#[derive(Debug)]
struct Opts {
    config: PipelineConfig,
    mode: SchemaName,
    inputs: Vec<String>,
    quiet: bool,
}

fn parse_opts() -> Result<Opts, CliError> {
    let yml = load_yaml!("cli_args.yaml");
    let m = App::from_yaml(yml).get_matches();

    cli::init_logging(m.is_present("verbose"));

    let mode = m.value_of("mode").unwrap_or("network");
    let mode = mode.parse::<SchemaName>().map_err(|e| CliError::InvalidArg("mode".into(), e.to_string()))?;

    let preview_rows = match m.value_of("preview_rows") {
        None => None,
        Some(raw) => Some(raw.parse::<usize>().map_err(|e| CliError::InvalidArg("preview-rows".into(), e.to_string()))?),
    };

    let inputs: Vec<String> = match m.values_of("inputs") {
        None => return Err(CliError::MissingInputArg("CSV".into())),
        Some(values) => values.map(String::from).collect(),
    };

    Ok(Opts {
        config: PipelineConfig::from_args(m.value_of("models"), m.value_of("results"), preview_rows),
        mode,
        inputs,
        quiet: m.is_present("quiet"),
    })
}

/// Single upload: either a result or the error message of whichever stage failed.
fn run_one(pipeline: &Pipeline, input: &str, mode: SchemaName) -> Result<AnalysisResult, String> {
    let bytes = cli::read_input_file(input).map_err(|e| e.to_string())?;
    pipeline.analyze(&bytes, mode).map_err(|e: PipelineError| format!("[{:?}] {}", e.kind(), e))
}

/// Successful uploads per effective schema. Uploads sharing a schema overwrite each other's
/// result file.
fn uploads_per_schema<'a, I>(outcomes: I) -> Counter<SchemaName>
    where I: IntoIterator<Item = &'a Result<AnalysisResult, String>>
{
    outcomes.into_iter()
        .filter_map(|outcome| outcome.as_ref().ok().map(|r| r.schema))
        .collect()
}

fn report(input: &str, result: &AnalysisResult, shared: bool) -> String {
    let mut out = format!("\n{} {}\n", style(input).bold(), style(result.schema.module_title()).dim());

    if let Some(notice) = &result.notice {
        out.push_str(&format!("        {}\n", style(notice).yellow()));
    }

    out.push_str(&format!("        Rows: {}  Attacks: {}  Benign: {}\n",
                          cli::format_count(result.total_rows),
                          style(cli::format_count(result.total_attacks)).red(),
                          style(cli::format_count(result.total_benign)).green()));

    if let Some(accuracy) = &result.accuracy {
        out.push_str(&format!("        Accuracy: {}\n", accuracy));
        for entry in result.label_breakdown.iter() {
            out.push_str(&format!("          {:<20} {:>10} rows  {}\n",
                                  entry.label, cli::format_count(entry.count), entry.accuracy()));
        }
    }

    let tally: Vec<String> = result.raw_prediction_tally.iter()
        .map(|(label, n)| format!("{}={}", label, cli::format_count(*n)))
        .collect();
    out.push_str(&format!("        Predictions: {}\n", tally.join(", ")));

    if let Some(truncation) = &result.truncation_notice {
        out.push_str(&format!("        {}\n", truncation));
    }
    if shared {
        out.push_str(&format!("        Saved to {} {}\n", result.result_file,
                              style("(shared with other uploads in this batch, only one survives)").yellow()));
    } else {
        out.push_str(&format!("        Saved to {}\n", result.result_file));
    }
    out
}

fn main() {
    let opts = match parse_opts() {
        Ok(opts) => opts,
        Err(e) => cli::exit_with_error(Box::new(e)),
    };

    let start = Instant::now();

    cli::print_output(format!("\n{}   {}Loading model artifacts...\n", style("[1/2]").bold().dim(), LOADING), opts.quiet);
    let pipeline = match Pipeline::load(&opts.config) {
        Ok(pipeline) => pipeline,
        Err(e) => cli::exit_with_error(Box::new(e)),
    };

    cli::print_output(format!("\n{}   {}Analysing {} file(s)...\n", style("[2/2]").bold().dim(), WORKING, opts.inputs.len()), opts.quiet);
    let pb = cli::make_progress_bar(opts.inputs.len() as u64, opts.quiet);

    // Each upload is an independent request over the shared artifacts
    let outcomes: Vec<(&String, Result<AnalysisResult, String>)> = opts.inputs.par_iter()
        .map(|input| {
            let outcome = run_one(&pipeline, input, opts.mode);
            if let Some(pb) = &pb { pb.inc(1); }
            (input, outcome)
        })
        .collect();

    if let Some(pb) = &pb { pb.finish(); }

    let per_schema = uploads_per_schema(outcomes.iter().map(|(_, outcome)| outcome));

    let mut failures = 0;
    for (input, outcome) in outcomes.iter() {
        match outcome {
            Ok(result) => cli::print_output(report(input, result, per_schema[&result.schema] > 1), opts.quiet),
            Err(msg) => {
                failures += 1;
                eprintln!("\n{} {}: {}", style("Failed").red().bold(), input, msg);
            }
        }
    }

    for (schema, n) in per_schema.iter().filter(|(_, n)| **n > 1) {
        log::warn!("{} uploads were analysed under {}; the result file keeps only the last one written",
                   n, schema.module_title());
    }

    cli::print_output(format!("\n        {}Finished in {:.1?}\n", SPARKLE, start.elapsed()), opts.quiet);

    if failures > 0 {
        std::process::exit(1);
    }
}
