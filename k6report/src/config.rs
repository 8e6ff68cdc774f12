//! This module controls configuration parsing from the end user, providing a
//! convenience mechanism for the rest of the program. Every field is
//! optional; command line flags override what the file says.
use std::{
    fs, io,
    path::{Path, PathBuf},
};

use k6report_results::naming::DEFAULT_PREFIX;
use serde::Deserialize;

/// Errors produced by [`Config`]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Error for a serde [`serde_yaml`].
    #[error("Failed to deserialize yaml: {0}")]
    SerdeYaml(#[from] serde_yaml::Error),
    /// Error getting metadata for config path
    #[error("Failed to get metadata for config path {path:?}: {source}")]
    Metadata {
        /// Config path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: Box<io::Error>,
    },
    /// Error when the config path is not a regular file
    #[error("Config path {0:?} is not a file")]
    NotAFile(PathBuf),
    /// Error reading config file
    #[error("Failed to read config file {path:?}: {source}")]
    ReadFile {
        /// File path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: Box<io::Error>,
    },
}

fn default_output() -> PathBuf {
    PathBuf::from("report.html")
}

fn default_title() -> String {
    "Load Test Report".to_string()
}

fn default_name_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

/// Main configuration struct for this program
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// k6 results files to read, in order
    #[serde(default)]
    pub inputs: Vec<PathBuf>,
    /// Where the HTML report is written
    #[serde(default = "default_output")]
    pub output: PathBuf,
    /// Heading of the HTML report
    #[serde(default = "default_title")]
    pub title: String,
    /// Token removed from file names when deriving display names
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,
    /// Where the computed report is additionally written as JSON, if at all
    #[serde(default)]
    pub json_output: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            output: default_output(),
            title: default_title(),
            name_prefix: default_name_prefix(),
            json_output: None,
        }
    }
}

/// Load configuration from a YAML file on disk.
///
/// # Errors
///
/// Returns an error if:
///
/// * Path does not exist or cannot be read
/// * Path is not a regular file
/// * The file contains invalid YAML or unknown fields
pub fn load_config_from_path(path: &Path) -> Result<Config, Error> {
    let metadata = fs::metadata(path).map_err(|source| Error::Metadata {
        path: path.to_path_buf(),
        source: Box::new(source),
    })?;
    if !metadata.is_file() {
        return Err(Error::NotAFile(path.to_path_buf()));
    }

    let contents = fs::read_to_string(path).map_err(|source| Error::ReadFile {
        path: path.to_path_buf(),
        source: Box::new(source),
    })?;
    // An empty file is an empty mapping, not a missing document.
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_yaml::from_str(&contents).map_err(Error::from)
}
