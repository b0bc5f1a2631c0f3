use async_trait::async_trait;
use std::path::Path;

use crate::adapters::onnx::yolo_engine::{OnnxYoloEngine, COCO_CLASSES};
use crate::application::ports::{Detector, ModelCatalogPort};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::model::{ModelId, YoloParams};

pub struct OnnxModelCatalog;

impl OnnxModelCatalog {
    pub fn new() -> Self { Self }
}

/// One label per line; blank lines are skipped.
pub fn read_labels(path: Option<&str>) -> DomainResult<Vec<String>> {
    let Some(path) = path else {
        return Ok(COCO_CLASSES.iter().map(|s| s.to_string()).collect());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| DomainError::NotFound(format!("labels file {path}: {e}")))?;
    let labels: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect();
    if labels.is_empty() {
        return Err(DomainError::InvalidInput(format!("labels file {path} is empty")));
    }
    Ok(labels)
}

#[async_trait]
impl ModelCatalogPort for OnnxModelCatalog {
    async fn validate_model(&self, model: &ModelId) -> DomainResult<()> {
        if model.onnx_path.trim().is_empty() {
            return Err(DomainError::InvalidInput("onnx_path empty".into()));
        }
        if !Path::new(&model.onnx_path).exists() {
            return Err(DomainError::NotFound(format!("model file not found: {}", model.onnx_path)));
        }
        if let Some(labels) = &model.labels_path {
            if !Path::new(labels).exists() {
                return Err(DomainError::NotFound(format!("labels file not found: {labels}")));
            }
        }
        Ok(())
    }

    async fn load_model(&self, model: &ModelId, params: &YoloParams) -> DomainResult<Box<dyn Detector>> {
        let model = model.clone();
        let params = params.clone();

        // Crear la sesión parsea el grafo completo; fuera de los workers de Tokio.
        tokio::task::spawn_blocking(move || -> DomainResult<Box<dyn Detector>> {
            let labels = read_labels(model.labels_path.as_deref())?;
            let engine = OnnxYoloEngine::load(&model.name, &model.onnx_path, labels, &params)
                .map_err(|e| DomainError::OperationFailed(format!("loading {}: {e}", model.onnx_path)))?;
            Ok(Box::new(engine))
        })
        .await
        .map_err(|e| DomainError::OperationFailed(format!("model loader task failed: {e}")))?
    }
}
