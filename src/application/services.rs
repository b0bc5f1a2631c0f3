use std::sync::{Arc, Mutex};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::{
    application::{
        decoder::{decode, decode_payload},
        emitter::ResponseEmitter,
        ports::{InferencePort, ModelCatalogPort},
        preprocess::normalize,
        reducer::reduce,
        registry::ConnectionRegistry,
        tracker::IdentityTable,
    },
    domain::{
        detection::{summarize_detections, DetectionStats, ReducePolicy},
        errors::{DomainResult, FrameError},
        frame::{FramePayload, FrameSize},
        model::{InferenceConfig, YoloParams},
        stream::DetectionsResponse,
    },
};

/// Parámetros por frame, fijados al arrancar.
#[derive(Debug, Clone)]
pub struct FrameSettings {
    pub params: YoloParams,
    pub max_dim: u32,
    pub policy: ReducePolicy,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct FrameCounters {
    pub frames_processed: u64,
    pub frames_failed: u64,
    pub frames_dropped: u64,
    pub last_frame: DetectionStats,
}

/// Orquestador del pipeline por frame (decodificar → normalizar → inferir → reducir).
/// Es el único punto donde un frame fallido se convierte en un evento `error`.
pub struct FrameService {
    inference: Arc<dyn InferencePort>,
    identities: Arc<IdentityTable>,
    registry: Arc<ConnectionRegistry>,
    emitter: ResponseEmitter,
    settings: FrameSettings,
    counters: Mutex<FrameCounters>,
}

impl FrameService {
    pub fn new(
        inference: Arc<dyn InferencePort>,
        identities: Arc<IdentityTable>,
        registry: Arc<ConnectionRegistry>,
        settings: FrameSettings,
    ) -> Self {
        let emitter = ResponseEmitter::new(registry.clone());
        Self { inference, identities, registry, emitter, settings, counters: Mutex::default() }
    }

    pub fn emitter(&self) -> &ResponseEmitter {
        &self.emitter
    }

    /// Reserva el hueco en vuelo de la conexión. Un frame que llega mientras otro
    /// se está procesando se descarta.
    pub fn admit(&self, connection_id: &str) -> bool {
        let admitted = self.registry.try_begin_frame(connection_id);
        if !admitted {
            self.counters().frames_dropped += 1;
        }
        admitted
    }

    /// Procesa un frame admitido, responde a la conexión y libera su hueco.
    pub async fn handle_frame(&self, connection_id: &str, payload: FramePayload) {
        let result = self.process_for(Some(connection_id), payload).await;
        self.registry.end_frame(connection_id);

        match result {
            Ok(response) => {
                debug!(
                    connection_id,
                    count = response.count,
                    "detecciones: [{}]",
                    summarize_detections(&response.detections)
                );
                self.emitter.emit_detections(connection_id, response);
            }
            Err(e) => {
                warn!(connection_id, "Frame fallido: {}", e);
                self.emitter.emit_error(connection_id, e.to_string());
            }
        }
    }

    pub async fn process(&self, payload: FramePayload) -> Result<DetectionsResponse, FrameError> {
        self.process_for(None, payload).await
    }

    async fn process_for(
        &self,
        connection_id: Option<&str>,
        payload: FramePayload,
    ) -> Result<DetectionsResponse, FrameError> {
        let result = self.run_pipeline(connection_id, payload).await;

        let mut counters = self.counters();
        match &result {
            Ok(resp) => {
                counters.frames_processed += 1;
                counters.last_frame = DetectionStats::from_detections(&resp.detections);
            }
            Err(_) => counters.frames_failed += 1,
        }
        result
    }

    async fn run_pipeline(
        &self,
        connection_id: Option<&str>,
        payload: FramePayload,
    ) -> Result<DetectionsResponse, FrameError> {
        let bytes = decode_payload(&payload.image)?;
        if let Some(id) = connection_id {
            self.registry.classify_from_payload(id, bytes.len());
        }

        let image = decode(&bytes, payload.format, payload.width, payload.height)?;
        let (image, transform) = normalize(image, self.settings.max_dim, payload.force_rgb);
        let frame_size = FrameSize { width: image.width(), height: image.height() };

        let raw = self.inference.infer(image, &self.settings.params).await?;
        let detections = reduce(raw, self.settings.policy, &self.identities, Instant::now());

        Ok(DetectionsResponse::new(detections, frame_size, transform))
    }

    pub fn counters_snapshot(&self) -> FrameCounters {
        self.counters().clone()
    }

    fn counters(&self) -> std::sync::MutexGuard<'_, FrameCounters> {
        self.counters.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Servicio encargado de cargar el modelo configurado en el worker de inferencia.
#[derive(Clone)]
pub struct ModelService {
    catalog: Arc<dyn ModelCatalogPort>,
    inference: Arc<dyn InferencePort>,
    config: InferenceConfig,
}

impl ModelService {
    pub fn new(
        catalog: Arc<dyn ModelCatalogPort>,
        inference: Arc<dyn InferencePort>,
        config: InferenceConfig,
    ) -> Self {
        Self { catalog, inference, config }
    }

    pub async fn load(&self) -> DomainResult<()> {
        let model = &self.config.model;
        info!("Cargando modelo {} desde {}", model.name, model.onnx_path);

        // Si la validación falla, el modelo actual sigue instalado.
        self.catalog.validate_model(model).await?;
        let detector = self.catalog.load_model(model, &self.config.params).await?;
        self.inference.install(detector).await?;

        let p = &self.config.params;
        info!(
            "✅ Modelo cargado: conf={:.2} iou={:.2} max_det={} imgsz={} device={}",
            p.conf_threshold, p.iou_threshold, p.max_detections, p.input_size, p.device
        );
        Ok(())
    }

    /// Carga de arranque: el fallo se registra y el servidor sigue sin modelo.
    pub async fn load_or_warn(&self) -> bool {
        match self.load().await {
            Ok(()) => true,
            Err(e) => {
                error!("Error cargando el modelo: {}", e);
                warn!("Arrancando sin modelo; los frames se responderán con 'Model not loaded'");
                false
            }
        }
    }

    pub async fn reload(&self) -> DomainResult<()> {
        self.load().await
    }

    pub fn is_loaded(&self) -> bool {
        self.inference.is_loaded()
    }

    pub fn model_name(&self) -> Option<String> {
        self.inference.model_name()
    }
}
