use std::sync::Arc;

use crate::{config::AppConfig, llm::LlmManager};

/// Estado compartido entre handlers. La configuración se construye una sola
/// vez al arrancar; el único estado mutable es el sistema de ficheros.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub llm_manager: LlmManager,
}

impl AppState {
    pub fn new(config: AppConfig, llm_manager: LlmManager) -> Self {
        Self {
            config: Arc::new(config),
            llm_manager,
        }
    }
}
