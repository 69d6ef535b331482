//! Run settings read from the environment.
//!
//! Every setting has a `SECTEST_` variable. Unset variables keep their
//! defaults, malformed values are reported as [`ConfigError`].

use std::{env, fs::File, path::PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::{
    context::{ConsistencyCheck, SuiteEnv},
    error::ConfigError,
    filter::DefaultFilter,
    formatter::common::color::ColorSetting,
    runner::SmartRunner,
    source::SourceLookup,
};

/// Which formatter [`run`](crate::run) writes with.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatKind {
    #[default]
    Pretty,
    Terse,
    Json,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    /// Only suites carrying one of these categories run. Empty runs all.
    pub categories: Vec<String>,
    pub single_threaded: bool,
    /// Skip reading sources for assertion operands.
    pub no_source: bool,
    /// Directory that assertion file paths are relative to.
    pub source_root: PathBuf,
    pub source_size_limit: usize,
    pub consistency: ConsistencyCheck,
    pub format: FormatKind,
    pub color: ColorSetting,
    /// Write formatter output to this file instead of stdout.
    pub output: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            categories: Vec::new(),
            single_threaded: false,
            no_source: false,
            source_root: PathBuf::from("."),
            source_size_limit: SourceLookup::DEFAULT_SIZE_LIMIT,
            consistency: ConsistencyCheck::default(),
            format: FormatKind::default(),
            color: ColorSetting::default(),
            output: None,
        }
    }
}

const CATEGORIES: &str = "SECTEST_CATEGORIES";
const SINGLE_THREADED: &str = "SECTEST_SINGLE_THREADED";
const NO_SOURCE: &str = "SECTEST_NO_SOURCE";
const SOURCE: &str = "SECTEST_SOURCE";
const SOURCE_SIZE_LIMIT: &str = "SECTEST_SOURCE_SIZE_LIMIT";
const CONSISTENCY: &str = "SECTEST_CONSISTENCY";
const FORMAT: &str = "SECTEST_FORMAT";
const COLOR: &str = "SECTEST_COLOR";
const OUTPUT: &str = "SECTEST_OUTPUT";

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Build a config from any variable source.
    pub fn from_lookup<L>(lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(categories) = lookup(CATEGORIES) {
            config.categories = categories
                .split(',')
                .map(str::trim)
                .filter(|category| !category.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(value) = lookup(SINGLE_THREADED) {
            config.single_threaded = parse_bool(SINGLE_THREADED, &value)?;
        }
        if let Some(value) = lookup(NO_SOURCE) {
            config.no_source = parse_bool(NO_SOURCE, &value)?;
        }
        if let Some(value) = lookup(SOURCE) {
            config.source_root = PathBuf::from(value);
        }
        if let Some(value) = lookup(SOURCE_SIZE_LIMIT) {
            config.source_size_limit = value
                .trim()
                .parse()
                .map_err(|_| invalid(SOURCE_SIZE_LIMIT, &value, "a non-negative integer"))?;
        }
        if let Some(value) = lookup(CONSISTENCY) {
            config.consistency = match value.trim().to_ascii_lowercase().as_str() {
                "off" => ConsistencyCheck::Off,
                "reachable" => ConsistencyCheck::Reachable,
                "strict" => ConsistencyCheck::Strict,
                _ => return Err(invalid(CONSISTENCY, &value, "off, reachable or strict")),
            };
        }
        if let Some(value) = lookup(FORMAT) {
            config.format = match value.trim().to_ascii_lowercase().as_str() {
                "pretty" => FormatKind::Pretty,
                "terse" => FormatKind::Terse,
                "json" => FormatKind::Json,
                "none" => FormatKind::None,
                _ => return Err(invalid(FORMAT, &value, "pretty, terse, json or none")),
            };
        }
        if let Some(value) = lookup(COLOR) {
            config.color = match value.trim().to_ascii_lowercase().as_str() {
                "auto" => ColorSetting::Automatic,
                "always" => ColorSetting::Always,
                "never" => ColorSetting::Never,
                _ => return Err(invalid(COLOR, &value, "auto, always or never")),
            };
        }

        if let Some(value) = lookup(OUTPUT) {
            let value = value.trim();
            config.output = (!value.is_empty()).then(|| PathBuf::from(value));
        }

        debug!(?config, "loaded configuration");
        Ok(config)
    }

    pub fn suite_env(&self) -> SuiteEnv {
        let env = SuiteEnv::new().with_consistency(self.consistency);
        match self.no_source {
            true => env.without_source(),
            false => env.with_source(
                SourceLookup::new(self.source_root.clone()).with_size_limit(self.source_size_limit),
            ),
        }
    }

    pub fn filter(&self) -> DefaultFilter {
        DefaultFilter::new().with_categories(self.categories.iter().cloned())
    }

    pub fn runner(&self) -> SmartRunner {
        SmartRunner::new().with_single_threaded(self.single_threaded)
    }

    /// Create the output file, `None` means stdout.
    ///
    /// An existing file is truncated.
    pub fn open_output(&self) -> Result<Option<File>, ConfigError> {
        let Some(path) = &self.output else {
            return Ok(None);
        };

        debug!(path = %path.display(), "writing output to file");
        File::create(path).map(Some).map_err(|source| ConfigError::Output {
            path: path.clone(),
            source,
        })
    }
}

fn parse_bool(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        _ => Err(invalid(var, value, "1, 0, true, false, yes or no")),
    }
}

fn invalid(var: &str, value: &str, expected: &'static str) -> ConfigError {
    ConfigError::InvalidValue {
        var: var.to_string(),
        value: value.to_string(),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Config::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn nothing_set_gives_defaults() {
        assert_eq!(config(&[]).unwrap(), Config::default());
    }

    #[test]
    fn every_variable_is_read() {
        let config = config(&[
            ("SECTEST_CATEGORIES", "fast, io,,"),
            ("SECTEST_SINGLE_THREADED", "yes"),
            ("SECTEST_NO_SOURCE", "1"),
            ("SECTEST_SOURCE", "/tmp/project"),
            ("SECTEST_SOURCE_SIZE_LIMIT", "20"),
            ("SECTEST_CONSISTENCY", "Strict"),
            ("SECTEST_FORMAT", "json"),
            ("SECTEST_COLOR", "never"),
            ("SECTEST_OUTPUT", "report.json"),
        ])
        .unwrap();

        assert_eq!(config.categories, ["fast", "io"]);
        assert!(config.single_threaded);
        assert!(config.no_source);
        assert_eq!(config.source_root, PathBuf::from("/tmp/project"));
        assert_eq!(config.source_size_limit, 20);
        assert_eq!(config.consistency, ConsistencyCheck::Strict);
        assert_eq!(config.format, FormatKind::Json);
        assert_eq!(config.color, ColorSetting::Never);
        assert_eq!(config.output, Some(PathBuf::from("report.json")));
    }

    #[test]
    fn malformed_values_name_the_variable() {
        let err = config(&[("SECTEST_SINGLE_THREADED", "maybe")]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid value \"maybe\" for SECTEST_SINGLE_THREADED, expected 1, 0, true, false, yes or no"
        );

        assert!(config(&[("SECTEST_SOURCE_SIZE_LIMIT", "-3")]).is_err());
        assert!(config(&[("SECTEST_FORMAT", "xml")]).is_err());
    }

    #[test]
    fn suite_env_follows_the_source_switch() {
        let with_source = config(&[]).unwrap().suite_env();
        assert!(with_source.source().is_some());

        let without = config(&[("SECTEST_NO_SOURCE", "true")]).unwrap().suite_env();
        assert!(without.source().is_none());
        assert_eq!(without.consistency(), ConsistencyCheck::Reachable);
    }

    #[test]
    fn empty_output_means_stdout() {
        let config = config(&[("SECTEST_OUTPUT", "  ")]).unwrap();
        assert_eq!(config.output, None);
        assert!(config.open_output().unwrap().is_none());
    }

    #[test]
    fn unwritable_output_is_reported() {
        let config = Config {
            output: Some(env::temp_dir().join("sectest-missing-dir").join("out.txt")),
            ..Config::default()
        };

        let err = config.open_output().unwrap_err();
        assert!(matches!(err, ConfigError::Output { .. }));
        assert!(err.to_string().starts_with("could not create output file"));
    }
}
