use async_trait::async_trait;
use image::RgbImage;

use crate::domain::{
    detection::RawDetection,
    errors::{DomainResult, InferenceError},
    model::{ModelId, YoloParams},
};

/// Modelo de detección cargado. Lo posee un único hilo a la vez; las etiquetas las
/// resuelve la misma instancia que produjo los ids de clase.
pub trait Detector: Send {
    fn name(&self) -> &str;
    fn detect(&mut self, image: &RgbImage, params: &YoloParams) -> anyhow::Result<Vec<RawDetection>>;
}

#[async_trait]
pub trait InferencePort: Send + Sync {
    async fn infer(&self, image: RgbImage, params: &YoloParams) -> Result<Vec<RawDetection>, InferenceError>;
    async fn install(&self, detector: Box<dyn Detector>) -> DomainResult<()>;
    fn is_loaded(&self) -> bool;
    fn model_name(&self) -> Option<String>;
}

#[async_trait]
pub trait ModelCatalogPort: Send + Sync {
    async fn validate_model(&self, model: &ModelId) -> DomainResult<()>;
    async fn load_model(&self, model: &ModelId, params: &YoloParams) -> DomainResult<Box<dyn Detector>>;
}
