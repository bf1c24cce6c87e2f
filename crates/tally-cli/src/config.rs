use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tally_calculator::{DescriptionFormat, SplitLimits};
use tally_types::{TallyError, TallyResult};
use tracing::{info, warn};

pub const DEFAULT_CONFIG_PATH: &str = "tally.toml";

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub env_type: String,
}

impl Default for Environment {
    fn default() -> Self {
        Self { env_type: "default".to_string() }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct LimitsConfig {
    #[serde(default = "default_min_components")]
    pub min_components: usize,
    #[serde(default = "default_max_components")]
    pub max_components: usize,
    /// Upper bound on `--weight` arguments to `tally allocate`
    #[serde(default = "default_max_weights")]
    pub max_weights: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            min_components: default_min_components(),
            max_components: default_max_components(),
            max_weights: default_max_weights(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FormattingConfig {
    #[serde(default = "default_description_prefix")]
    pub description_prefix: String,
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
}

impl Default for FormattingConfig {
    fn default() -> Self {
        Self {
            description_prefix: default_description_prefix(),
            currency_symbol: default_currency_symbol(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: default_log_filter(), json: false }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct TallyConfig {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub formatting: FormattingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the effective configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// The file was not found and built-in defaults were used
    Defaults(PathBuf),
}

impl ConfigSource {
    /// Logs the source; called once tracing is up
    pub fn log(&self, config: &TallyConfig) {
        match self {
            Self::File(path) => info!(
                path = %path.display(),
                env_type = %config.environment.env_type,
                "Loaded configuration"
            ),
            Self::Defaults(path) => warn!(
                "Configuration file '{}' not found. Using default configuration.",
                path.display()
            ),
        }
    }
}

impl TallyConfig {
    /// Load from `path`, else `TALLY_CONFIG_PATH`, else `tally.toml`, then
    /// apply environment overrides and validate.
    ///
    /// A missing file is not an error; an unreadable or malformed one is.
    pub fn load(path: Option<&Path>) -> TallyResult<(Self, ConfigSource)> {
        Self::load_with(path, |name| std::env::var(name).ok())
    }

    /// [`TallyConfig::load`] with variables resolved through `lookup`
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> TallyResult<(Self, ConfigSource)>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config_path = path.map(Path::to_path_buf).unwrap_or_else(|| {
            lookup("TALLY_CONFIG_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
        });

        let (config, source) = match fs::read_to_string(&config_path) {
            Ok(contents) => (Self::from_toml_str(&contents)?, ConfigSource::File(config_path)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                (Self::default(), ConfigSource::Defaults(config_path))
            }
            Err(err) => return Err(err.into()),
        };

        let config = config.apply_overrides(&lookup)?;
        config.validate()?;
        Ok((config, source))
    }

    pub fn from_toml_str(contents: &str) -> TallyResult<Self> {
        toml::from_str(contents)
            .map_err(|err| TallyError::serialization("toml", format!("invalid configuration: {err}")))
    }

    pub fn to_toml(&self) -> TallyResult<String> {
        toml::to_string_pretty(self).map_err(|err| TallyError::serialization("toml", err.to_string()))
    }

    /// Apply `TALLY_*` overrides resolved through `lookup`
    pub fn apply_overrides<F>(mut self, lookup: F) -> TallyResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("TALLY_MIN_COMPONENTS") {
            self.limits.min_components = parse_override("TALLY_MIN_COMPONENTS", &value)?;
        }
        if let Some(value) = lookup("TALLY_MAX_COMPONENTS") {
            self.limits.max_components = parse_override("TALLY_MAX_COMPONENTS", &value)?;
        }
        if let Some(value) = lookup("TALLY_MAX_WEIGHTS") {
            self.limits.max_weights = parse_override("TALLY_MAX_WEIGHTS", &value)?;
        }
        if let Some(prefix) = lookup("TALLY_DESCRIPTION_PREFIX") {
            self.formatting.description_prefix = prefix;
        }
        if let Some(symbol) = lookup("TALLY_CURRENCY_SYMBOL") {
            self.formatting.currency_symbol = symbol;
        }
        if let Some(filter) = lookup("TALLY_LOG_FILTER") {
            self.logging.filter = filter;
        }
        if let Some(value) = lookup("TALLY_LOG_JSON") {
            self.logging.json = parse_override("TALLY_LOG_JSON", &value)?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> TallyResult<()> {
        if self.limits.min_components == 0 {
            return Err(TallyError::configuration(
                "limits.min_components",
                "min_components must be at least 1",
            ));
        }
        if self.limits.max_components < self.limits.min_components {
            return Err(TallyError::configuration(
                "limits.max_components",
                format!(
                    "max_components ({}) must not be below min_components ({})",
                    self.limits.max_components, self.limits.min_components
                ),
            ));
        }
        if self.limits.max_weights == 0 {
            return Err(TallyError::configuration("limits.max_weights", "max_weights must be at least 1"));
        }
        Ok(())
    }

    pub fn split_limits(&self) -> SplitLimits {
        SplitLimits {
            min_components: self.limits.min_components,
            max_components: self.limits.max_components,
        }
    }

    pub fn description_format(&self) -> DescriptionFormat {
        DescriptionFormat {
            prefix: self.formatting.description_prefix.clone(),
            currency_symbol: self.formatting.currency_symbol.clone(),
        }
    }
}

fn parse_override<T: std::str::FromStr>(name: &str, value: &str) -> TallyResult<T> {
    value.trim().parse().map_err(|_| {
        TallyError::configuration(name, format!("could not parse {name}='{value}'"))
    })
}

fn default_min_components() -> usize {
    tally_calculator::manufacturing::DEFAULT_MIN_COMPONENTS
}
fn default_max_components() -> usize {
    tally_calculator::manufacturing::DEFAULT_MAX_COMPONENTS
}
fn default_max_weights() -> usize {
    10_000
}
fn default_description_prefix() -> String {
    DescriptionFormat::default().prefix
}
fn default_currency_symbol() -> String {
    DescriptionFormat::default().currency_symbol
}
fn default_log_filter() -> String {
    "tally_cli=info,tally_calculator=info".to_string()
}
