//! Application configuration for reportgen.
//!
//! User config lives at `~/.reportgen/reportgen.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};
use crate::types::{ExportFormat, ReportKind};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "reportgen.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".reportgen";

// ---------------------------------------------------------------------------
// Config structs (matching reportgen.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Per-run defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Text generation backend.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Generation client tuning.
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Per-stage limits.
    #[serde(default)]
    pub stages: StagesConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Directory reports and charts are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Report kind used when none is given.
    #[serde(default)]
    pub report_kind: ReportKind,

    /// Export formats used when none are given.
    #[serde(default = "default_formats")]
    pub formats: Vec<ExportFormat>,

    #[serde(default = "default_true")]
    pub enable_polish: bool,

    #[serde(default = "default_true")]
    pub enable_charts: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            report_kind: ReportKind::default(),
            formats: default_formats(),
            enable_polish: true,
            enable_charts: true,
        }
    }
}

fn default_output_dir() -> String {
    "output".into()
}
fn default_formats() -> Vec<ExportFormat> {
    vec![ExportFormat::Markdown, ExportFormat::RichText]
}
fn default_true() -> bool {
    true
}

/// `[backend]` section: which text generation service to talk to.
///
/// Each variant carries only the fields that backend needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    /// OpenAI (or any OpenAI-compatible hosted endpoint).
    #[serde(rename = "openai")]
    OpenAi {
        #[serde(default = "default_openai_model")]
        model: String,
        #[serde(default = "default_openai_base_url")]
        base_url: String,
        /// Name of the env var holding the API key (never store the key itself).
        #[serde(default = "default_api_key_env")]
        api_key_env: String,
    },
    /// Self-hosted vLLM server exposing the OpenAI chat API.
    Vllm {
        #[serde(default = "default_vllm_model")]
        model: String,
        #[serde(default = "default_vllm_base_url")]
        base_url: String,
    },
    /// Offline canned replies.
    Demo,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::Demo
    }
}

impl BackendConfig {
    /// Short name for logs and status output.
    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenAi { .. } => "openai",
            Self::Vllm { .. } => "vllm",
            Self::Demo => "demo",
        }
    }

    /// Model identifier, or `"demo"` for the offline backend.
    pub fn model(&self) -> &str {
        match self {
            Self::OpenAi { model, .. } | Self::Vllm { model, .. } => model,
            Self::Demo => "demo",
        }
    }
}

fn default_openai_model() -> String {
    "gpt-3.5-turbo".into()
}
fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_vllm_model() -> String {
    "Qwen/Qwen2-7B-Instruct".into()
}
fn default_vllm_base_url() -> String {
    "http://localhost:8000/v1".into()
}

/// `[generation]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Per-request HTTP timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries after the first attempt for retryable failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay for exponential backoff between retries.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// System message sent with every chat request.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            system_prompt: default_system_prompt(),
        }
    }
}

fn default_temperature() -> f32 {
    0.7
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_max_retries() -> u32 {
    2
}
fn default_retry_base_delay_ms() -> u64 {
    1_000
}
fn default_system_prompt() -> String {
    "You are a professional report writing assistant. Produce detailed, accurate, \
     well-structured content for the user's request."
        .into()
}

/// `[stages]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagesConfig {
    #[serde(default = "default_outline_max_tokens")]
    pub outline_max_tokens: u32,

    #[serde(default = "default_content_max_tokens")]
    pub content_max_tokens: u32,

    #[serde(default = "default_polish_max_tokens")]
    pub polish_max_tokens: u32,

    #[serde(default = "default_chart_max_tokens")]
    pub chart_max_tokens: u32,

    /// Target section length in characters; sections far off it are logged.
    #[serde(default = "default_target_section_length")]
    pub target_section_length: usize,

    /// Upper bound on chart requests kept per report.
    #[serde(default = "default_max_charts")]
    pub max_charts: usize,
}

impl Default for StagesConfig {
    fn default() -> Self {
        Self {
            outline_max_tokens: default_outline_max_tokens(),
            content_max_tokens: default_content_max_tokens(),
            polish_max_tokens: default_polish_max_tokens(),
            chart_max_tokens: default_chart_max_tokens(),
            target_section_length: default_target_section_length(),
            max_charts: default_max_charts(),
        }
    }
}

fn default_outline_max_tokens() -> u32 {
    800
}
fn default_content_max_tokens() -> u32 {
    1_200
}
fn default_polish_max_tokens() -> u32 {
    1_500
}
fn default_chart_max_tokens() -> u32 {
    800
}
fn default_target_section_length() -> usize {
    500
}
fn default_max_charts() -> usize {
    5
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.reportgen/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ReportError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.reportgen/reportgen.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ReportError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| ReportError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ReportError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ReportError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ReportError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the backend's API key env var is set and non-empty.
///
/// Backends without a key (vLLM, demo) always pass.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    let BackendConfig::OpenAi { api_key_env, .. } = &config.backend else {
        return Ok(());
    };

    match std::env::var(api_key_env) {
        Ok(val) if !val.is_empty() => Ok(()),
        _ => Err(ReportError::config(format!(
            "OpenAI API key not found. Set the {api_key_env} environment variable, \
             or switch [backend] to kind = \"demo\" for offline runs."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("output_dir"));
        assert!(toml_str.contains("kind = \"demo\""));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.stages.max_charts, 5);
        assert_eq!(parsed.generation.max_retries, 2);
        assert_eq!(parsed.backend, BackendConfig::Demo);
        assert_eq!(
            parsed.defaults.formats,
            vec![ExportFormat::Markdown, ExportFormat::RichText]
        );
    }

    #[test]
    fn openai_backend_fills_defaults() {
        let toml_str = r#"
[backend]
kind = "openai"
model = "gpt-4o-mini"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        match config.backend {
            BackendConfig::OpenAi {
                model,
                base_url,
                api_key_env,
            } => {
                assert_eq!(model, "gpt-4o-mini");
                assert_eq!(base_url, "https://api.openai.com/v1");
                assert_eq!(api_key_env, "OPENAI_API_KEY");
            }
            other => panic!("expected openai backend, got {other:?}"),
        }
    }

    #[test]
    fn vllm_backend_parses() {
        let toml_str = r#"
[defaults]
report_kind = "technical"
formats = ["json"]

[backend]
kind = "vllm"
base_url = "http://gpu-box:8000/v1"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.report_kind, ReportKind::Technical);
        assert_eq!(config.defaults.formats, vec![ExportFormat::Json]);
        assert_eq!(config.backend.name(), "vllm");
        assert_eq!(config.backend.model(), "Qwen/Qwen2-7B-Instruct");
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let toml_str = r#"
[backend]
kind = "carrier-pigeon"
"#;
        assert!(toml::from_str::<AppConfig>(toml_str).is_err());
    }

    #[test]
    fn api_key_validation() {
        let mut config = AppConfig::default();
        assert!(validate_api_key(&config).is_ok());

        // Use a unique env var name to avoid interfering with other tests
        config.backend = BackendConfig::OpenAi {
            model: "gpt-3.5-turbo".into(),
            base_url: "https://api.openai.com/v1".into(),
            api_key_env: "RG_TEST_NONEXISTENT_KEY_12345".into(),
        };
        let result = validate_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
