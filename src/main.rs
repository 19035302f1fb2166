// Módulos de la aplicación
mod api;
mod app_state;
mod config;
mod error;
mod ingest;
mod llm;
mod models;
mod prompt;
mod scan;
mod ui;

use crate::app_state::AppState;
use anyhow::{Context, Result};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Cargar .env e inicializar logging
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dataset_qa_webapp=info,tower_http=info".into()),
        )
        .init();

    // 2. Cargar configuración
    let cfg = config::AppConfig::from_env().context("Error al cargar la configuración")?;

    // 3. Asegurar el directorio de datos
    std::fs::create_dir_all(&cfg.upload_dir).with_context(|| {
        format!(
            "No se pudo crear el directorio de datos {}",
            cfg.upload_dir.display()
        )
    })?;

    // 4. Inicializar gestor del LLM
    let llm_manager =
        llm::LlmManager::from_config(&cfg).context("Error inicializando LLM Manager")?;
    if llm_manager.has_credential() {
        info!(
            "LLM: proveedor {:?}, modelo '{}', endpoint {}",
            llm_manager.provider, llm_manager.model, llm_manager.endpoint
        );
    } else {
        warn!("No hay credencial para el LLM: las consultas devolverán un error de configuración.");
    }

    // 5. Crear estado compartido y router
    let app_state = AppState::new(cfg, llm_manager);
    let server_addr = app_state.config.server_addr.clone();

    let app = api::create_router(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    // 6. Iniciar el servidor
    let listener = tokio::net::TcpListener::bind(&server_addr)
        .await
        .with_context(|| format!("No se pudo escuchar en {server_addr}"))?;
    info!("🚀 Servidor escuchando en http://{}", server_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Señal de apagado recibida, iniciando cierre del servidor.");
        })
        .await
        .context("Error en el servidor")?;

    info!("✅ Servidor cerrado correctamente.");
    Ok(())
}
