// Módulos de la aplicación
mod api;
mod app_state;
mod config;
mod doi;
mod error;
mod keywords;
mod llm;
mod metadata;
mod models;
mod pdf;
mod pdf_metadata;
mod pipeline;
mod readability;
mod scoring;
mod store;
mod summarizer;
mod wordcloud;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tokio::sync::oneshot;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{app_state::AppState, summarizer::Summarizer};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Cargar .env e inicializar logging
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Cargar configuración
    let cfg = config::AppConfig::from_env().context("Error al cargar la configuración")?;

    // 3. Preparar directorios de trabajo
    for dir in [&cfg.upload_dir, &cfg.wordcloud_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("No se pudo crear el directorio {}", dir.display()))?;
    }

    // 4. Inicializar gestor de LLMs y resumidor
    let llm_manager = llm::LlmManager::from_config(&cfg).context("Error inicializando LLM Manager")?;
    let summarizer = Summarizer::new(
        llm_manager,
        cfg.summary_max_length,
        cfg.summary_min_length,
        cfg.summary_timeout,
    );

    // 5. Crear estado compartido de la aplicación
    let app_state = AppState::new(cfg.clone(), Arc::new(summarizer))
        .context("Error creando el estado de la aplicación")?;

    // Crear canal para la señal de apagado.
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    if let Ok(mut sender) = app_state.shutdown_sender.lock() {
        *sender = Some(shutdown_tx);
    }

    // 6. Configurar el router de la API y el servicio de ficheros estáticos
    let app = Router::new()
        .merge(api::create_router(app_state))
        .fallback_service(ServeDir::new("frontend"))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    // 7. Iniciar el servidor
    let listener = tokio::net::TcpListener::bind(&cfg.server_addr)
        .await
        .with_context(|| format!("No se pudo escuchar en {}", cfg.server_addr))?;
    let server_url = format!("http://{}", cfg.server_addr);
    info!("🚀 Servidor escuchando en {}", &server_url);

    // Abrir el frontend en el navegador por defecto
    if cfg.open_browser && webbrowser::open(&server_url).is_err() {
        info!("No se pudo abrir el navegador. Por favor, accede a {} manualmente.", server_url);
    }

    // Configurar el apagado ordenado.
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_rx.await.ok();
            info!("Señal de apagado recibida, iniciando cierre del servidor.");
        })
        .await
        .context("Error en el servidor HTTP")?;

    info!("✅ Servidor cerrado correctamente.");
    Ok(())
}
