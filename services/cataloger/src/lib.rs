//! HEC-RAS model cataloger service.
//!
//! The binary parses arguments and sets up logging; everything after that
//! lives here so it can run against in-memory collaborators in tests.

pub mod run;

pub use run::{metadata_opener, output_dir, prepare_output, run, RunOptions, RunSummary, UnavailableOpener};
