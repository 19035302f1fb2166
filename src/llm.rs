//! Pasarela hacia el endpoint de inferencia alojado (Hugging Face u OpenAI).
//!
//! Nunca devuelve un error al llamador: los fallos se convierten en una
//! respuesta de texto con su `AnswerSource` para distinguir una mala
//! configuración de una caída del proveedor.

use crate::config::{AppConfig, LlmProvider};
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use url::Url;

/// Origen del texto devuelto por `LlmManager::answer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    /// Campo de respuesta extraído del JSON del proveedor.
    Model,
    /// El cuerpo no tenía el campo esperado; se devuelve tal cual.
    RawResponse,
    TransportError,
    ConfigurationError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answer {
    pub text: String,
    pub source: AnswerSource,
}

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Error de configuración: no hay credencial para el proveedor de inferencia (defina LLM_API_KEY o {0})")]
    MissingCredential(&'static str),

    #[error("Error consultando la API de inferencia: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("La API de inferencia respondió con estado {status}: {body}")]
    Status { status: u16, body: String },

    #[error("La respuesta de inferencia no contiene el campo esperado")]
    MalformedResponse { raw: String },
}

impl From<InferenceError> for Answer {
    fn from(err: InferenceError) -> Self {
        let source = match &err {
            InferenceError::MissingCredential(_) => AnswerSource::ConfigurationError,
            InferenceError::Transport(_) | InferenceError::Status { .. } => {
                AnswerSource::TransportError
            }
            InferenceError::MalformedResponse { .. } => AnswerSource::RawResponse,
        };
        let text = match err {
            InferenceError::MalformedResponse { raw } => raw,
            other => other.to_string(),
        };
        Answer { text, source }
    }
}

/// Gestor del LLM remoto.
#[derive(Debug, Clone)]
pub struct LlmManager {
    client: Client,
    pub provider: LlmProvider,
    pub model: String,
    pub endpoint: Url,
    api_key: Option<String>,
    max_new_tokens: u32,
}

impl LlmManager {
    /// Construye el manager a partir de la configuración.
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(cfg.llm_timeout)
            .build()
            .context("No se pudo crear el cliente HTTP de inferencia")?;

        Ok(Self {
            client,
            provider: cfg.llm_provider.clone(),
            model: cfg.llm_model.clone(),
            endpoint: cfg.llm_endpoint.clone(),
            api_key: cfg.llm_api_key.clone(),
            max_new_tokens: cfg.llm_max_new_tokens,
        })
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    /// Envía el prompt y devuelve siempre un texto de respuesta.
    pub async fn answer(&self, prompt: &str) -> Answer {
        match self.complete(prompt).await {
            Ok(text) => {
                info!("Respuesta del modelo '{}' recibida ({} caracteres).", self.model, text.len());
                Answer {
                    text,
                    source: AnswerSource::Model,
                }
            }
            Err(err) => {
                match &err {
                    InferenceError::MalformedResponse { .. } => {
                        warn!("Respuesta de inferencia sin el campo esperado; se devuelve el cuerpo crudo.")
                    }
                    other => warn!("Fallo en la inferencia: {}", other),
                }
                err.into()
            }
        }
    }

    async fn complete(&self, prompt: &str) -> Result<String, InferenceError> {
        let api_key = self.api_key.as_deref().ok_or(InferenceError::MissingCredential(
            match self.provider {
                LlmProvider::HuggingFace => "HF_API_KEY",
                LlmProvider::OpenAI => "OPENAI_API_KEY",
            },
        ))?;

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(api_key)
            .json(&self.request_body(prompt))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(InferenceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        match serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|value| self.extract_answer(&value))
        {
            Some(text) => Ok(text),
            None => Err(InferenceError::MalformedResponse { raw: body }),
        }
    }

    fn request_body(&self, prompt: &str) -> Value {
        match self.provider {
            LlmProvider::HuggingFace => json!({
                "inputs": prompt,
                "parameters": {
                    "max_new_tokens": self.max_new_tokens,
                    "return_full_text": false,
                },
            }),
            LlmProvider::OpenAI => json!({
                "model": self.model,
                "messages": [{ "role": "user", "content": prompt }],
                "max_tokens": self.max_new_tokens,
            }),
        }
    }

    fn extract_answer(&self, value: &Value) -> Option<String> {
        let text = match self.provider {
            // El endpoint de text-generation devuelve una lista; algunos
            // despliegues devuelven el objeto suelto.
            LlmProvider::HuggingFace => value
                .get(0)
                .unwrap_or(value)
                .get("generated_text")?
                .as_str()?,
            LlmProvider::OpenAI => value
                .get("choices")?
                .get(0)?
                .get("message")?
                .get("content")?
                .as_str()?,
        };
        Some(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use std::collections::HashMap;

    fn manager(provider: &str, url: &str, key: Option<&str>) -> LlmManager {
        let mut vars = HashMap::from([
            ("LLM_PROVIDER".to_string(), provider.to_string()),
            ("LLM_API_URL".to_string(), url.to_string()),
            ("LLM_MODEL".to_string(), "test-model".to_string()),
            ("LLM_TIMEOUT_SECS".to_string(), "5".to_string()),
        ]);
        if let Some(key) = key {
            vars.insert("LLM_API_KEY".to_string(), key.to_string());
        }
        let cfg = AppConfig::from_lookup(|k| vars.get(k).cloned()).unwrap();
        LlmManager::from_config(&cfg).unwrap()
    }

    #[tokio::test]
    async fn extracts_generated_text_from_huggingface_list() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/test-model")
            .match_header("authorization", "Bearer hf-secret")
            .match_body(Matcher::PartialJson(json!({
                "inputs": "hello",
                "parameters": { "return_full_text": false }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"generated_text": "  There are 42 images. "}]"#)
            .create_async()
            .await;

        let llm = manager("huggingface", &format!("{}/models/test-model", server.url()), Some("hf-secret"));
        let answer = llm.answer("hello").await;

        mock.assert_async().await;
        assert_eq!(answer.source, AnswerSource::Model);
        assert_eq!(answer.text, "There are 42 images.");
    }

    #[tokio::test]
    async fn extracts_content_from_openai_choices() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_body(Matcher::PartialJson(json!({ "model": "test-model" })))
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"3 classes"}}]}"#)
            .create_async()
            .await;

        let llm = manager("openai", &format!("{}/v1/chat/completions", server.url()), Some("sk"));
        let answer = llm.answer("how many classes?").await;

        mock.assert_async().await;
        assert_eq!(answer.source, AnswerSource::Model);
        assert_eq!(answer.text, "3 classes");
    }

    #[tokio::test]
    async fn body_without_answer_field_is_returned_raw() {
        let mut server = mockito::Server::new_async().await;
        let body = r#"{"estimated_time": 20.0}"#;
        server
            .mock("POST", "/models/test-model")
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let llm = manager("huggingface", &format!("{}/models/test-model", server.url()), Some("k"));
        let answer = llm.answer("q").await;

        assert_eq!(answer.source, AnswerSource::RawResponse);
        assert_eq!(answer.text, body);
    }

    #[tokio::test]
    async fn non_json_body_is_returned_raw() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/models/test-model")
            .with_status(200)
            .with_body("plain text answer")
            .create_async()
            .await;

        let llm = manager("huggingface", &format!("{}/models/test-model", server.url()), Some("k"));
        let answer = llm.answer("q").await;

        assert_eq!(answer.source, AnswerSource::RawResponse);
        assert_eq!(answer.text, "plain text answer");
    }

    #[tokio::test]
    async fn error_status_becomes_transport_error_text() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/models/test-model")
            .with_status(503)
            .with_body("Model is loading")
            .create_async()
            .await;

        let llm = manager("huggingface", &format!("{}/models/test-model", server.url()), Some("k"));
        let answer = llm.answer("q").await;

        assert_eq!(answer.source, AnswerSource::TransportError);
        assert!(answer.text.contains("503"));
        assert!(answer.text.contains("Model is loading"));
    }

    #[tokio::test]
    async fn missing_credential_skips_network_call() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let llm = manager("huggingface", &format!("{}/models/test-model", server.url()), None);
        assert!(!llm.has_credential());
        let answer = llm.answer("q").await;

        mock.assert_async().await;
        assert_eq!(answer.source, AnswerSource::ConfigurationError);
        assert!(answer.text.contains("HF_API_KEY"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_becomes_transport_error_text() {
        // Puerto 9 (discard) en loopback: conexión rechazada.
        let llm = manager("huggingface", "http://127.0.0.1:9/models/x", Some("k"));
        let answer = llm.answer("q").await;

        assert_eq!(answer.source, AnswerSource::TransportError);
        assert!(answer.text.starts_with("Error consultando la API de inferencia"));
    }
}
