use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub dataset: DatasetConfig,
    pub llm: LlmConfig,
    pub executor: ExecutorConfig,
    pub guards: GuardSettings,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatasetConfig {
    pub path: PathBuf,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub max_output_tokens_extractor: u32,
    pub max_output_tokens_planner: u32,
    pub max_output_tokens_answer: u32,
}

#[derive(Clone, Debug)]
pub struct ExecutorConfig {
    pub deadline_ms: u64,
    pub max_ops: u64,
}

#[derive(Clone, Debug)]
pub struct GuardSettings {
    pub gibberish_wordlike_ratio: f64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
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
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

const DEFAULT_CONFIG_PATH: &str = "atrium.toml";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4.1-mini";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    dataset: FileDataset,
    llm: FileLlm,
    executor: FileExecutor,
    guards: FileGuards,
    logging: FileLogging,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileDataset {
    path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileLlm {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    timeout_secs: Option<u64>,
    max_output_tokens_extractor: Option<u32>,
    max_output_tokens_planner: Option<u32>,
    max_output_tokens_answer: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileExecutor {
    deadline_ms: Option<u64>,
    max_ops: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileGuards {
    gibberish_wordlike_ratio: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileLogging {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl AppConfig {
    /// Load from TOML with `${VAR}` interpolation, then apply environment
    /// overrides. A missing file is fine unless `require_file` is set; a
    /// missing API key is fine until the first model call.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let path =
            options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        let file = match fs::read_to_string(&path) {
            Ok(raw) => {
                let interpolated = interpolate_env(&raw)?;
                toml::from_str::<FileConfig>(&interpolated)
                    .map_err(|source| ConfigError::ParseFile { path: path.clone(), source })?
            }
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                if options.require_file {
                    return Err(ConfigError::MissingConfigFile(path));
                }
                FileConfig::default()
            }
            Err(source) => return Err(ConfigError::ReadFile { path, source }),
        };

        let api_key = env::var("ATRIUM_API_KEY")
            .ok()
            .or_else(|| env::var("OPENAI_API_KEY").ok())
            .or(file.llm.api_key)
            .filter(|key| !key.trim().is_empty())
            .map(SecretString::from);

        let config = Self {
            dataset: DatasetConfig {
                path: env::var("ATRIUM_DATASET_PATH")
                    .ok()
                    .or(file.dataset.path)
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("data/ledger.csv")),
            },
            llm: LlmConfig {
                api_key,
                base_url: env::var("ATRIUM_LLM_BASE_URL")
                    .ok()
                    .or(file.llm.base_url)
                    .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                model: env::var("ATRIUM_LLM_MODEL")
                    .ok()
                    .or(file.llm.model)
                    .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                temperature: file.llm.temperature.unwrap_or(0.0),
                timeout_secs: file.llm.timeout_secs.unwrap_or(60),
                max_output_tokens_extractor: file.llm.max_output_tokens_extractor.unwrap_or(320),
                max_output_tokens_planner: file.llm.max_output_tokens_planner.unwrap_or(700),
                max_output_tokens_answer: file.llm.max_output_tokens_answer.unwrap_or(220),
            },
            executor: ExecutorConfig {
                deadline_ms: file.executor.deadline_ms.unwrap_or(2_000),
                max_ops: file.executor.max_ops.unwrap_or(2_000_000),
            },
            guards: GuardSettings {
                gibberish_wordlike_ratio: file.guards.gibberish_wordlike_ratio.unwrap_or(0.30),
            },
            logging: LoggingConfig {
                level: env::var("ATRIUM_LOG_LEVEL")
                    .ok()
                    .or(file.logging.level)
                    .unwrap_or_else(|| "info".to_string()),
                format: file.logging.format.unwrap_or(LogFormat::Compact),
            },
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::Validation(format!(
                "llm.temperature must be within 0.0..=2.0, got {}",
                self.llm.temperature
            )));
        }
        if self.llm.timeout_secs == 0 {
            return Err(ConfigError::Validation("llm.timeout_secs must be positive".to_string()));
        }
        if !(0.0..=1.0).contains(&self.guards.gibberish_wordlike_ratio) {
            return Err(ConfigError::Validation(format!(
                "guards.gibberish_wordlike_ratio must be within 0.0..=1.0, got {}",
                self.guards.gibberish_wordlike_ratio
            )));
        }
        Ok(())
    }
}

/// Replace `${VAR}` occurrences with environment values before TOML
/// parsing, so secrets never need to live in the file itself.
fn interpolate_env(raw: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            return Err(ConfigError::UnterminatedInterpolation);
        };
        let var = &after[..end];
        let value = env::var(var)
            .map_err(|_| ConfigError::MissingEnvInterpolation { var: var.to_string() })?;
        output.push_str(&value);
        rest = &after[end + 1..];
    }
    output.push_str(rest);
    Ok(output)
}

/// Convenience for code that wants the effective config path shown in
/// diagnostics without loading anything.
pub fn default_config_path() -> &'static Path {
    Path::new(DEFAULT_CONFIG_PATH)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::{interpolate_env, AppConfig, ConfigError, LoadOptions, LogFormat};

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write config");
        file
    }

    #[test]
    fn defaults_apply_without_a_config_file() {
        let config = AppConfig::load(LoadOptions {
            config_path: Some("definitely-missing-atrium.toml".into()),
            require_file: false,
        })
        .expect("defaults load");

        assert_eq!(config.llm.model, "gpt-4.1-mini");
        assert_eq!(config.llm.timeout_secs, 60);
        assert_eq!(config.executor.deadline_ms, 2_000);
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn missing_file_is_an_error_when_required() {
        let error = AppConfig::load(LoadOptions {
            config_path: Some("definitely-missing-atrium.toml".into()),
            require_file: true,
        })
        .expect_err("must fail");
        assert!(matches!(error, ConfigError::MissingConfigFile(_)));
    }

    #[test]
    fn file_values_override_defaults() {
        let file = write_config(
            "[dataset]\npath = \"fixtures/ledger.csv\"\n\n\
             [llm]\nmodel = \"gpt-4.1\"\ntemperature = 0.2\n\n\
             [logging]\nlevel = \"debug\"\nformat = \"json\"\n",
        );
        let config = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            require_file: true,
        })
        .expect("config loads");

        assert_eq!(config.dataset.path.to_string_lossy(), "fixtures/ledger.csv");
        assert_eq!(config.llm.model, "gpt-4.1");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn invalid_temperature_fails_validation() {
        let file = write_config("[llm]\ntemperature = 3.5\n");
        let error = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            require_file: true,
        })
        .expect_err("must fail validation");
        assert!(matches!(error, ConfigError::Validation(_)));
    }

    #[test]
    fn interpolation_substitutes_and_reports_missing_vars() {
        std::env::set_var("ATRIUM_TEST_INTERP", "value-123");
        assert_eq!(
            interpolate_env("key = \"${ATRIUM_TEST_INTERP}\"").expect("interpolates"),
            "key = \"value-123\""
        );
        std::env::remove_var("ATRIUM_TEST_INTERP");

        let error = interpolate_env("key = \"${ATRIUM_TEST_MISSING_VAR}\"").expect_err("missing");
        assert!(matches!(error, ConfigError::MissingEnvInterpolation { .. }));

        let error = interpolate_env("key = \"${UNTERMINATED").expect_err("unterminated");
        assert!(matches!(error, ConfigError::UnterminatedInterpolation));
    }
}
