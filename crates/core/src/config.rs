use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use crate::costing::{CostingConfig, RoundingMode};

/// Engine-wide configuration. Always passed explicitly into constructors;
/// there is no package-level mutable state.
///
/// Precedence: built-in defaults, then the optional TOML file, then
/// `PRINTQUOTE_*` environment variables, then explicit overrides.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    pub costing: CostingConfig,
    pub default_page_size: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { costing: CostingConfig::default(), default_page_size: 20 }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub waste_per_change_grams: Option<Decimal>,
    pub rounding: Option<RoundingMode>,
    pub default_page_size: Option<u32>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl FromStr for RoundingMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "floor" => Ok(Self::Floor),
            "half_up" => Ok(Self::HalfUp),
            other => Err(ConfigError::Validation(format!(
                "unsupported rounding mode `{other}` (expected floor|half_up)"
            ))),
        }
    }
}

impl EngineConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("printquote.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(costing) = patch.costing {
            if let Some(grams) = costing.waste_per_change_grams {
                self.costing.waste_per_change_grams = grams;
            }
            if let Some(rounding) = costing.rounding {
                self.costing.rounding = rounding;
            }
        }
        if let Some(paging) = patch.paging {
            if let Some(page_size) = paging.default_page_size {
                self.default_page_size = page_size;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("PRINTQUOTE_WASTE_PER_CHANGE_GRAMS") {
            self.costing.waste_per_change_grams =
                parse_decimal("PRINTQUOTE_WASTE_PER_CHANGE_GRAMS", &value)?;
        }
        if let Some(value) = read_env("PRINTQUOTE_ROUNDING") {
            self.costing.rounding = value.parse()?;
        }
        if let Some(value) = read_env("PRINTQUOTE_DEFAULT_PAGE_SIZE") {
            self.default_page_size = parse_u32("PRINTQUOTE_DEFAULT_PAGE_SIZE", &value)?;
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(grams) = overrides.waste_per_change_grams {
            self.costing.waste_per_change_grams = grams;
        }
        if let Some(rounding) = overrides.rounding {
            self.costing.rounding = rounding;
        }
        if let Some(page_size) = overrides.default_page_size {
            self.default_page_size = page_size;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.costing.waste_per_change_grams < Decimal::ZERO {
            return Err(ConfigError::Validation(
                "costing.waste_per_change_grams must not be negative".to_string(),
            ));
        }
        if self.default_page_size == 0 || self.default_page_size > 200 {
            return Err(ConfigError::Validation(
                "paging.default_page_size must be in range 1..=200".to_string(),
            ));
        }
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("printquote.toml"), PathBuf::from("config/printquote.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    Decimal::from_str(value.trim()).map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    costing: Option<CostingPatch>,
    paging: Option<PagingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct CostingPatch {
    waste_per_change_grams: Option<Decimal>,
    rounding: Option<RoundingMode>,
}

#[derive(Debug, Default, Deserialize)]
struct PagingPatch {
    default_page_size: Option<u32>,
}
