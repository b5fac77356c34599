//! Layered configuration: built-in defaults, an optional TOML file, then
//! `CLINICAL_RESEARCH__*` environment variables, then CLI overrides.

use crate::{Error, Result};
use config::{Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use url::Url;

const ENV_PREFIX: &str = "CLINICAL_RESEARCH";
const ENV_SEPARATOR: &str = "__";
const ENV_LIST_SEPARATOR: &str = ";";

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub literature: LiteratureConfig,
    pub trials: TrialRegistryConfig,
    pub engine: EngineConfig,
    pub logging: LoggingConfig,
}

/// Literature index (NCBI E-utilities) settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiteratureConfig {
    /// Base URL that `esearch.fcgi` and `esummary.fcgi` hang off
    pub base_url: String,
    /// NCBI API key, raises the upstream rate limit when present
    pub api_key: Option<String>,
    /// Tool name reported to NCBI
    pub tool: Option<String>,
    /// Contact email reported to NCBI
    pub email: Option<String>,
    pub timeout_secs: u64,
    pub default_limit: u32,
    pub max_limit: u32,
}

impl Default for LiteratureConfig {
    fn default() -> Self {
        Self {
            base_url: "https://eutils.ncbi.nlm.nih.gov/entrez/eutils".to_string(),
            api_key: None,
            tool: Some("clinical-research-engine".to_string()),
            email: None,
            timeout_secs: 10,
            default_limit: 10,
            max_limit: 100,
        }
    }
}

/// Clinical trial registry settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrialRegistryConfig {
    /// Study-fields query endpoint
    pub base_url: String,
    pub timeout_secs: u64,
    pub default_limit: u32,
    pub max_limit: u32,
    /// Recruitment statuses included in every query
    pub statuses: Vec<String>,
    /// Field projection requested from the registry
    pub fields: Vec<String>,
}

impl Default for TrialRegistryConfig {
    fn default() -> Self {
        Self {
            base_url: "https://clinicaltrials.gov/api/query/study_fields".to_string(),
            timeout_secs: 10,
            default_limit: 10,
            max_limit: 100,
            statuses: vec![
                "Recruiting".to_string(),
                "Active, not recruiting".to_string(),
                "Completed".to_string(),
            ],
            fields: [
                "NCTId",
                "BriefTitle",
                "Condition",
                "Phase",
                "OverallStatus",
                "StartDate",
                "CompletionDate",
                "StudyType",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
        }
    }
}

/// Orchestration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Deadline for each branch of a comprehensive request
    pub branch_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            branch_timeout_secs: 15,
            user_agent: format!(
                "clinical-research-engine/{} (Clinical Research Tool)",
                env!("CARGO_PKG_VERSION")
            ),
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub const fn branch_timeout(&self) -> Duration {
        Duration::from_secs(self.branch_timeout_secs)
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(Error::InvalidInput {
                field: "logging.format".to_string(),
                reason: format!("unknown log format '{other}', expected 'pretty' or 'json'"),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Values supplied on the command line, applied after every other layer
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub branch_timeout_secs: Option<u64>,
    pub literature_api_key: Option<String>,
}

impl Config {
    /// Load configuration from defaults, the config file and the environment.
    ///
    /// An explicit `path` must exist; otherwise the per-user default file is
    /// read when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Like [`Config::load`], reading environment variables from `env`
    /// instead of the process environment when provided.
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self> {
        let mut builder = config::Config::builder();

        match path {
            Some(path) => {
                debug!("Loading configuration from {}", path.display());
                builder = builder.add_source(File::from(path).format(FileFormat::Toml));
            }
            None => {
                if let Some(default_path) = Self::default_path().filter(|p| p.exists()) {
                    debug!("Loading configuration from {}", default_path.display());
                    builder = builder.add_source(
                        File::from(default_path)
                            .format(FileFormat::Toml)
                            .required(false),
                    );
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator(ENV_SEPARATOR)
                .list_separator(ENV_LIST_SEPARATOR)
                .with_list_parse_key("trials.statuses")
                .with_list_parse_key("trials.fields")
                .try_parsing(true)
                .source(env),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Per-user configuration file location
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("clinical-research").join("config.toml"))
    }

    /// Apply command-line overrides on top of the loaded configuration
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(level) = &overrides.log_level {
            self.logging.level.clone_from(level);
        }
        if let Some(format) = overrides.log_format {
            self.logging.format = format;
        }
        if let Some(secs) = overrides.branch_timeout_secs {
            self.engine.branch_timeout_secs = secs;
        }
        if let Some(key) = &overrides.literature_api_key {
            self.literature.api_key = Some(key.clone());
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        validate_url("literature.base_url", &self.literature.base_url)?;
        validate_url("trials.base_url", &self.trials.base_url)?;

        for (field, value) in [
            ("literature.timeout_secs", self.literature.timeout_secs),
            ("trials.timeout_secs", self.trials.timeout_secs),
            ("engine.branch_timeout_secs", self.engine.branch_timeout_secs),
        ] {
            if value == 0 {
                return Err(invalid(field, "must be greater than 0"));
            }
        }

        validate_limits(
            "literature",
            self.literature.default_limit,
            self.literature.max_limit,
        )?;
        validate_limits("trials", self.trials.default_limit, self.trials.max_limit)?;

        if self.trials.statuses.iter().all(|s| s.trim().is_empty()) {
            return Err(invalid("trials.statuses", "at least one status is required"));
        }
        if self.trials.fields.iter().all(|f| f.trim().is_empty()) {
            return Err(invalid("trials.fields", "field projection cannot be empty"));
        }
        if self.logging.level.trim().is_empty() {
            return Err(invalid("logging.level", "cannot be empty"));
        }

        Ok(())
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Internal(format!("TOML encoding failed: {e}")))
    }
}

fn invalid(field: &str, reason: &str) -> Error {
    Error::InvalidInput {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_url(field: &str, value: &str) -> Result<()> {
    let url = Url::parse(value).map_err(|e| invalid(field, &format!("invalid URL: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(field, "URL scheme must be http or https"));
    }
    Ok(())
}

fn validate_limits(section: &str, default_limit: u32, max_limit: u32) -> Result<()> {
    if default_limit == 0 {
        return Err(invalid(
            &format!("{section}.default_limit"),
            "must be greater than 0",
        ));
    }
    if default_limit > max_limit {
        return Err(invalid(
            &format!("{section}.default_limit"),
            "cannot exceed max_limit",
        ));
    }
    Ok(())
}
