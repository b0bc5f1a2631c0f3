use clap::Parser;
use std::sync::Arc;
use tracing::info;

use detection_relay::adapters::{
    http::{router, state::HttpState},
    onnx::{model_catalog::OnnxModelCatalog, worker::InferenceWorker},
};
use detection_relay::application::{
    registry::ConnectionRegistry,
    services::{FrameService, ModelService},
    tracker::{spawn_sweeper, IdentityTable},
};
use detection_relay::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Inicializar logs (RUST_LOG=info por defecto)
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let config = Arc::new(Config::parse());
    info!("🔧 Inicializando el relay de detección...");

    // 2. Instanciar adaptadores (capa de infraestructura)
    // Usamos Arc porque serán compartidos entre servicios y el servidor HTTP.
    let worker = Arc::new(InferenceWorker::spawn(config.inference_timeout()));
    let catalog = Arc::new(OnnxModelCatalog::new());
    let identities = Arc::new(IdentityTable::new());
    let registry = Arc::new(ConnectionRegistry::new());

    // 3. Instanciar servicios (capa de aplicación)
    let models = Arc::new(ModelService::new(catalog, worker.clone(), config.inference_config()));
    let frames = Arc::new(FrameService::new(
        worker,
        identities.clone(),
        registry.clone(),
        config.frame_settings(),
    ));

    // Sin modelo el servidor sigue arriba: los frames reciben "Model not loaded" hasta un reload.
    models.load_or_warn().await;
    spawn_sweeper(identities.clone(), config.sweep_interval(), config.track_max_age());

    // 4. Configurar el router de Axum y lanzar el servidor
    let state = HttpState { frames, models, registry, identities, config: config.clone() };
    let app = router(state);

    let addr = config.bind_addr();
    info!("🚀 Relay de detección escuchando en ws://{}/ws", addr);
    info!(
        "Preset: {:?}, política: {:?}, dimensión máxima de frame: {}",
        config.preset, config.policy, config.frame_max_dim
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Servidor detenido");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("No se pudo escuchar ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
}
