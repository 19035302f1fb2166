//! Carga y gestión de configuración de la aplicación (servidor + LLM).

use std::{env, path::PathBuf, time::Duration};

use anyhow::{anyhow, Context, Result};
use url::Url;

const DEFAULT_HF_MODEL: &str = "mistralai/Mistral-7B-Instruct-v0.2";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Formato de cable del endpoint de inferencia alojado.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LlmProvider {
    HuggingFace,
    OpenAI,
}

impl LlmProvider {
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "huggingface" | "hf" => Ok(Self::HuggingFace),
            "openai" => Ok(Self::OpenAI),
            other => Err(anyhow!("Proveedor LLM no soportado: {other}")),
        }
    }

    fn default_model(&self) -> &'static str {
        match self {
            Self::HuggingFace => DEFAULT_HF_MODEL,
            Self::OpenAI => DEFAULT_OPENAI_MODEL,
        }
    }

    fn default_endpoint(&self, model: &str) -> String {
        match self {
            Self::HuggingFace => format!("https://api-inference.huggingface.co/models/{model}"),
            Self::OpenAI => "https://api.openai.com/v1/chat/completions".to_string(),
        }
    }

    /// Variable de entorno específica del proveedor para la credencial.
    fn key_var(&self) -> &'static str {
        match self {
            Self::HuggingFace => "HF_API_KEY",
            Self::OpenAI => "OPENAI_API_KEY",
        }
    }
}

/// Configuración completa de la aplicación.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_addr: String,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,

    pub llm_provider: LlmProvider,
    pub llm_model: String,
    pub llm_endpoint: Url,
    /// Puede faltar: el servidor arranca igual y las consultas devuelven un
    /// error de configuración sin salir a la red.
    pub llm_api_key: Option<String>,
    pub llm_timeout: Duration,
    pub llm_max_new_tokens: u32,
}

impl AppConfig {
    /// Carga la configuración desde variables de entorno (usando .env si existe).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Construye la configuración a partir de una función de búsqueda de claves.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server_addr = lookup("SERVER_ADDR").unwrap_or_else(|| "127.0.0.1:8000".to_string());
        let upload_dir =
            PathBuf::from(lookup("UPLOAD_DIR").unwrap_or_else(|| "uploaded_data".to_string()));

        let max_upload_mb: usize = parse_or(&lookup, "MAX_UPLOAD_MB", 512)?;
        let max_upload_bytes = max_upload_mb
            .checked_mul(1024 * 1024)
            .ok_or_else(|| anyhow!("MAX_UPLOAD_MB demasiado grande: {max_upload_mb}"))?;

        let llm_provider_str = lookup("LLM_PROVIDER").unwrap_or_else(|| "huggingface".to_string());
        let llm_provider = LlmProvider::from_str(&llm_provider_str)?;

        let llm_model = lookup("LLM_MODEL")
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| llm_provider.default_model().to_string());

        let endpoint_str = lookup("LLM_API_URL")
            .unwrap_or_else(|| llm_provider.default_endpoint(&llm_model));
        let llm_endpoint = Url::parse(&endpoint_str)
            .with_context(|| format!("LLM_API_URL no es una URL válida: {endpoint_str}"))?;

        let non_blank = |key: &str| lookup(key).filter(|k| !k.trim().is_empty());
        let llm_api_key = non_blank("LLM_API_KEY").or_else(|| non_blank(llm_provider.key_var()));

        let timeout_secs: u64 = parse_or(&lookup, "LLM_TIMEOUT_SECS", 30)?;
        let llm_max_new_tokens: u32 = parse_or(&lookup, "LLM_MAX_NEW_TOKENS", 512)?;

        Ok(Self {
            server_addr,
            upload_dir,
            max_upload_bytes,
            llm_provider,
            llm_model,
            llm_endpoint,
            llm_api_key,
            llm_timeout: Duration::from_secs(timeout_secs),
            llm_max_new_tokens,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("Valor inválido para {key} ('{raw}'): {e}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let cfg = config_from(&[]).unwrap();
        assert_eq!(cfg.server_addr, "127.0.0.1:8000");
        assert_eq!(cfg.upload_dir, PathBuf::from("uploaded_data"));
        assert_eq!(cfg.llm_provider, LlmProvider::HuggingFace);
        assert_eq!(cfg.llm_model, DEFAULT_HF_MODEL);
        assert_eq!(
            cfg.llm_endpoint.as_str(),
            "https://api-inference.huggingface.co/models/mistralai/Mistral-7B-Instruct-v0.2"
        );
        assert!(cfg.llm_api_key.is_none());
        assert_eq!(cfg.llm_timeout, Duration::from_secs(30));
        assert_eq!(cfg.max_upload_bytes, 512 * 1024 * 1024);
    }

    #[test]
    fn provider_specific_key_is_used_as_fallback() {
        let cfg = config_from(&[("LLM_PROVIDER", "openai"), ("OPENAI_API_KEY", "sk-test")]).unwrap();
        assert_eq!(cfg.llm_provider, LlmProvider::OpenAI);
        assert_eq!(cfg.llm_model, DEFAULT_OPENAI_MODEL);
        assert_eq!(cfg.llm_api_key.as_deref(), Some("sk-test"));

        let cfg = config_from(&[("LLM_API_KEY", "generic"), ("HF_API_KEY", "hf-key")]).unwrap();
        assert_eq!(cfg.llm_api_key.as_deref(), Some("generic"));
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let cfg = config_from(&[("HF_API_KEY", "   ")]).unwrap();
        assert!(cfg.llm_api_key.is_none());
    }

    #[test]
    fn blank_generic_key_falls_back_to_provider_key() {
        let cfg = config_from(&[("LLM_API_KEY", ""), ("HF_API_KEY", "hf")]).unwrap();
        assert_eq!(cfg.llm_api_key.as_deref(), Some("hf"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(config_from(&[("LLM_PROVIDER", "gemini")]).is_err());
        assert!(config_from(&[("LLM_TIMEOUT_SECS", "soon")]).is_err());
        assert!(config_from(&[("LLM_API_URL", "not a url")]).is_err());
        assert!(config_from(&[("MAX_UPLOAD_MB", "18446744073709551615")]).is_err());
    }
}
