use config::{Config as ConfigBuilder, File};
use serde::{Deserialize, Serialize};
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::errors::{FindError, FindResult};

/// Settings for path lookups.
///
/// # Configuration Locations
///
/// Loaded from these files, later ones overriding earlier ones:
/// 1. Global `$HOME/.config/pathscout/config.yaml`
/// 2. Local `.pathscout.yaml` in the current directory
/// 3. Custom config file specified via `--config`
///
/// # Configuration Format
///
/// ```yaml
/// # Directories searched for files; "**" descends, ";" adds stop dirs
/// path: ".,/usr/include,,"
///
/// # Directories searched by `cd`
/// cdpath: ","
///
/// # Tags files, searched upward when written as "./tags;"
/// tags: "./tags;,tags"
///
/// # Tried in order when the bare name does not exist
/// suffixes: [".rs", ".c"]
///
/// max_level: 100
/// ignore_case: false
/// thread_count: 4
/// log_level: "info"
/// ```
///
/// Command-line values are merged on top with [`FinderConfig::merge_with_cli`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinderConfig {
    /// Search path option for files
    pub path: String,

    /// Search path option for directories
    pub cdpath: String,

    /// Tags file option
    pub tags: String,

    /// Alternate suffixes for file lookups
    pub suffixes: Vec<String>,

    /// Maximum descent depth of one search
    pub max_level: i32,

    /// Case-insensitive wildcard matching
    pub ignore_case: bool,

    /// Number of threads used when resolving several names at once
    pub thread_count: NonZeroUsize,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

fn default_thread_count() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN)
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            path: ".,,".to_string(),
            cdpath: ",".to_string(),
            tags: "./tags,tags".to_string(),
            suffixes: Vec::new(),
            max_level: 100,
            ignore_case: false,
            thread_count: default_thread_count(),
            log_level: default_log_level(),
        }
    }
}

/// Command-line overrides; `None` leaves the file value alone.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub path: Option<String>,
    pub cdpath: Option<String>,
    pub tags: Option<String>,
    pub suffixes: Vec<String>,
    pub max_level: Option<i32>,
    pub ignore_case: bool,
    pub thread_count: Option<NonZeroUsize>,
    pub log_level: Option<String>,
}

impl FinderConfig {
    /// Loads configuration from the default locations
    pub fn load() -> FindResult<Self> {
        Self::load_from(None)
    }

    /// Loads configuration from the default locations plus a specific file
    pub fn load_from(config_path: Option<&Path>) -> FindResult<Self> {
        if let Some(path) = config_path {
            if !path.exists() {
                return Err(FindError::config_error(format!(
                    "config file {} not found",
                    path.display()
                )));
            }
        }

        let mut builder = ConfigBuilder::builder();

        let config_files = [
            dirs::config_dir().map(|p| p.join("pathscout/config.yaml")),
            Some(PathBuf::from(".pathscout.yaml")),
            config_path.map(PathBuf::from),
        ];

        for path in config_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| FindError::config_error(e.to_string()))
    }

    /// Writes the configuration as YAML.
    pub fn save(&self, path: &Path) -> FindResult<()> {
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml)?;
        Ok(())
    }

    /// Applies command-line values over configuration file values
    pub fn merge_with_cli(mut self, cli: CliOverrides) -> Self {
        if let Some(path) = cli.path {
            self.path = path;
        }
        if let Some(cdpath) = cli.cdpath {
            self.cdpath = cdpath;
        }
        if let Some(tags) = cli.tags {
            self.tags = tags;
        }
        if !cli.suffixes.is_empty() {
            self.suffixes = cli.suffixes;
        }
        if let Some(max_level) = cli.max_level {
            self.max_level = max_level;
        }
        if cli.ignore_case {
            self.ignore_case = true;
        }
        if let Some(thread_count) = cli.thread_count {
            self.thread_count = thread_count;
        }
        if let Some(log_level) = cli.log_level {
            self.log_level = log_level;
        }
        self
    }
}
