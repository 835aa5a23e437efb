// No unsafe here!
#![forbid(unsafe_code)]

#[macro_use]
extern crate lazy_static;
extern crate serde;

// Static configuration
pub mod schema;
pub mod config;
pub mod cli;

// Ingestion
pub mod dataset;
pub mod validate;
pub mod encode;

// Inference
pub mod model;
pub mod scoring;
pub mod results;

// Entry point
pub mod pipeline;

pub use pipeline::{ErrorKind, Pipeline, PipelineError};
pub use results::AnalysisResult;
pub use schema::SchemaName;
