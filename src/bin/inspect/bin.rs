#[macro_use]
extern crate clap;

use clap::App;
use dialoguer::console::style;

use traffic_triage::SchemaName;
use traffic_triage::cli;
use traffic_triage::config::PipelineConfig;
use traffic_triage::model::Artifacts;

fn describe(artifacts: &Artifacts, schema: SchemaName) -> String {
    let mut out = format!("\n{} ({})\n", style(schema.module_title()).bold(), schema);

    let loaded = match artifacts.get(schema) {
        Some(loaded) => loaded,
        None => {
            out.push_str("        not loaded\n");
            return out;
        }
    };

    let expected = schema.schema().n_features();
    let n_features = loaded.classifier.n_features();
    out.push_str(&format!("        Features: {} (schema defines {}){}\n", n_features, expected,
                          if n_features == expected { String::new() } else { style(" MISMATCH").red().to_string() }));

    let classes: Vec<String> = loaded.classifier.classes().iter().map(|c| c.to_string()).collect();
    out.push_str(&format!("        Classes:  {}\n", classes.join(", ")));

    for (column, encoder) in loaded.encoders.iter() {
        out.push_str(&format!("        {:<18} {} categories: {}\n",
                              column, encoder.classes().len(), encoder.classes().join(", ")));
    }
    out
}

fn main() {
    let yml = load_yaml!("cli_args.yaml");
    let m = App::from_yaml(yml).get_matches();

    cli::init_logging(m.is_present("verbose"));

    let config = PipelineConfig::from_args(m.value_of("models"), None, None);
    let artifacts = match Artifacts::load(&config.model_dir) {
        Ok(artifacts) => artifacts,
        Err(e) => cli::exit_with_error(Box::new(e)),
    };

    for schema in SchemaName::ALL.iter() {
        print!("{}", describe(&artifacts, *schema));
    }
}
