//! Configuration loading for Rhesus.
//! Reads rhesus.toml from the current directory or the path in RHESUS_CONFIG.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rhesus_bioapi::{EbiConfig, PollConfig};
use secrecy::SecretString;
use serde::Deserialize;

/// Log filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub ebi: EbiConfig,
    pub polling: PollingConfig,
    pub uniprot: UniProtConfig,
    pub structure: StructureConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Address the UI is reached at; share links are built on it.
    #[serde(default = "default_public_url")]
    pub public_url: String,
    /// Directory with the browser client, served for every non-API path.
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: default_bind(), public_url: default_public_url(), static_dir: None }
    }
}

fn default_bind()       -> String { "0.0.0.0:8080".to_string() }
fn default_public_url() -> String { "http://localhost:8080/".to_string() }

#[derive(Debug, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_backend")]
    pub default_backend: String,
    pub fallback_backend: Option<String>,
    pub gemini: Option<GeminiConfig>,
    pub openai_compatible: Option<OpenAiCompatibleConfig>,
    pub ollama: Option<OllamaConfig>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            default_backend: default_llm_backend(),
            fallback_backend: None,
            gemini: None,
            openai_compatible: None,
            ollama: None,
        }
    }
}

fn default_llm_backend() -> String { "gemini".to_string() }

#[derive(Debug, Deserialize)]
pub struct GeminiConfig {
    /// Falls back to RHESUS_GEMINI_API_KEY, then GEMINI_API_KEY.
    pub api_key: Option<SecretString>,
    #[serde(default = "default_gemini_model")]
    pub model: String,
    pub base_url: Option<String>,
}

fn default_gemini_model() -> String { rhesus_llm::backend::DEFAULT_GEMINI_MODEL.to_string() }

#[derive(Debug, Deserialize)]
pub struct OpenAiCompatibleConfig {
    pub base_url: String,
    pub model: String,
    /// Falls back to RHESUS_OPENAI_API_KEY.
    pub api_key: Option<SecretString>,
}

#[derive(Debug, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
    #[serde(default = "default_ollama_model")]
    pub model: String,
}

fn default_ollama_url()   -> String { "http://localhost:11434".to_string() }
fn default_ollama_model() -> String { "llama3:8b".to_string() }

#[derive(Debug, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_poll_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_poll_timeout")]
    pub timeout_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self { interval_secs: default_poll_interval(), timeout_secs: default_poll_timeout() }
    }
}

fn default_poll_interval() -> u64 { 5 }
fn default_poll_timeout()  -> u64 { 300 }

impl PollingConfig {
    pub fn to_poll_config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_secs(self.interval_secs.max(1)),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UniProtConfig {
    #[serde(default = "default_uniprot_url")]
    pub base_url: String,
}

impl Default for UniProtConfig {
    fn default() -> Self {
        Self { base_url: default_uniprot_url() }
    }
}

fn default_uniprot_url() -> String { rhesus_bioapi::uniprot::UNIPROT_BASE_URL.to_string() }

#[derive(Debug, Deserialize)]
pub struct StructureConfig {
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    #[serde(default = "default_rcsb_url")]
    pub rcsb_base_url: String,
    #[serde(default = "default_alphafold_url")]
    pub alphafold_base_url: String,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            rcsb_base_url: default_rcsb_url(),
            alphafold_base_url: default_alphafold_url(),
        }
    }
}

fn default_cache_dir()     -> PathBuf { PathBuf::from("./data/structures") }
fn default_rcsb_url()      -> String  { rhesus_bioapi::structure::RCSB_BASE_URL.to_string() }
fn default_alphafold_url() -> String  { rhesus_bioapi::structure::ALPHAFOLD_BASE_URL.to_string() }

#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { data_dir: default_data_dir() }
    }
}

fn default_data_dir() -> PathBuf { PathBuf::from("./data/store") }


impl Config {
    /// Load configuration from rhesus.toml.
    /// Checks RHESUS_CONFIG first, then the current directory. A missing file
    /// yields the defaults so a bare `GEMINI_API_KEY` is enough to start.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("RHESUS_CONFIG")
            .unwrap_or_else(|_| "rhesus.toml".to_string());

        if !Path::new(&path).exists() {
            tracing::warn!(
                "Config file not found: {path}. Using defaults; copy rhesus.example.toml to rhesus.toml to customise."
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        Self::from_toml(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config file {path}: {e}"))
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
