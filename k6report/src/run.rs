//! Reading every configured results file into a [`Report`].
//!
//! Sources are processed strictly one at a time, in input order. A source
//! that is missing, unreadable or not a record stream is skipped with a
//! warning; only an empty input list aborts the run.

use std::{fs, path::Path};

use k6report_results::{
    aggregate::{self, SourceSummary},
    naming,
    reduce::{Report, Sources},
    threshold::Thresholds,
};
use tracing::{info, warn};

use crate::config::Config;

/// Errors produced by [`build_report`]
#[derive(thiserror::Error, Debug, Clone, Copy)]
pub enum Error {
    /// No results files were given at all.
    #[error("No result files were provided")]
    NoInputs,
}

fn load_source(path: &Path, thresholds: &mut Thresholds) -> Option<SourceSummary> {
    if !path.exists() {
        warn!("Results file {} was not found, skipping", path.display());
        return None;
    }
    info!("Processing results from {}", path.display());

    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            warn!("Failed to read {}: {err}, skipping", path.display());
            return None;
        }
    };
    match aggregate::aggregate(&contents, thresholds) {
        Ok(summary) => Some(summary),
        Err(err) => {
            warn!(
                "Failed to parse {}, the file may be malformed: {err}, skipping",
                path.display()
            );
            None
        }
    }
}

/// Aggregate every input of `config` and reduce the results.
///
/// # Errors
///
/// Returns [`Error::NoInputs`] if `config` lists no inputs. Unusable inputs
/// are not errors.
pub fn build_report(config: &Config) -> Result<Report, Error> {
    if config.inputs.is_empty() {
        return Err(Error::NoInputs);
    }

    let mut thresholds = Thresholds::new();
    let mut sources = Sources::new();
    let mut origins: Vec<(String, &Path)> = Vec::with_capacity(config.inputs.len());

    for path in &config.inputs {
        let Some(summary) = load_source(path, &mut thresholds) else {
            continue;
        };
        let name = naming::display_name(path, &config.name_prefix);
        if sources.insert(name.clone(), summary).is_some() {
            let previous = origins
                .iter()
                .rev()
                .find(|(origin, _)| *origin == name)
                .map_or_else(String::new, |(_, origin)| origin.display().to_string());
            warn!(
                "{} and {previous} are both named \"{name}\", keeping {}",
                path.display(),
                path.display()
            );
        }
        origins.push((name, path.as_path()));
    }

    info!(
        sources = sources.len(),
        thresholds = thresholds.len(),
        "All sources processed"
    );
    Ok(Report::build(sources, &thresholds))
}
