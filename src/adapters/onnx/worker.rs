use async_trait::async_trait;
use image::RgbImage;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{mpsc, Arc, RwLock};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, error, info};

use crate::application::ports::{Detector, InferencePort};
use crate::domain::{
    detection::RawDetection,
    errors::{DomainError, DomainResult, InferenceError},
    model::YoloParams,
};

type InferReply = oneshot::Sender<Result<Vec<RawDetection>, InferenceError>>;

enum Job {
    Infer { image: RgbImage, params: YoloParams, reply: InferReply },
    Install { detector: Box<dyn Detector>, reply: oneshot::Sender<()> },
}

/// Hilo dedicado que posee el detector. Los llamadores async encolan trabajos y esperan
/// la respuesta, así el runtime sigue atendiendo sockets mientras un frame está en el modelo.
pub struct InferenceWorker {
    tx: mpsc::Sender<Job>,
    loaded: Arc<RwLock<Option<String>>>,
    timeout: Duration,
}

impl InferenceWorker {
    pub fn spawn(timeout: Duration) -> Self {
        let (tx, rx) = mpsc::channel::<Job>();
        let loaded = Arc::new(RwLock::new(None));

        let shared = loaded.clone();
        std::thread::spawn(move || run(rx, shared));

        Self { tx, loaded, timeout }
    }
}

/// `loaded` refleja el detector instalado y solo se escribe desde este hilo.
fn run(rx: mpsc::Receiver<Job>, loaded: Arc<RwLock<Option<String>>>) {
    let mut detector: Option<Box<dyn Detector>> = None;
    info!("Worker de inferencia iniciado.");

    while let Ok(job) = rx.recv() {
        match job {
            Job::Infer { image, params, reply } => {
                if reply.is_closed() {
                    debug!("Frame omitido: el llamador ya no espera");
                    continue;
                }
                let result = match detector.as_mut() {
                    None => Err(InferenceError::ModelUnavailable),
                    Some(det) => match catch_unwind(AssertUnwindSafe(|| det.detect(&image, &params))) {
                        Ok(Ok(dets)) => Ok(dets),
                        Ok(Err(e)) => Err(InferenceError::Failed(e.to_string())),
                        Err(_) => {
                            error!("Pánico en el detector; se descarta");
                            detector = None;
                            set_loaded(&loaded, None);
                            Err(InferenceError::Failed("detector panicked".into()))
                        }
                    },
                };
                // El llamador puede haberse ido por timeout.
                let _ = reply.send(result);
            }
            Job::Install { detector: new, reply } => {
                info!("Worker de inferencia: instalando modelo {}", new.name());
                set_loaded(&loaded, Some(new.name().to_string()));
                detector = Some(new);
                let _ = reply.send(());
            }
        }
    }
    set_loaded(&loaded, None);
    info!("Worker de inferencia detenido.");
}

fn set_loaded(loaded: &RwLock<Option<String>>, name: Option<String>) {
    *loaded.write().unwrap_or_else(|p| p.into_inner()) = name;
}

#[async_trait]
impl InferencePort for InferenceWorker {
    async fn infer(&self, image: RgbImage, params: &YoloParams) -> Result<Vec<RawDetection>, InferenceError> {
        if !self.is_loaded() {
            return Err(InferenceError::ModelUnavailable);
        }

        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Job::Infer { image, params: params.clone(), reply })
            .map_err(|_| InferenceError::WorkerGone)?;

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(InferenceError::WorkerGone),
            Err(_) => Err(InferenceError::Timeout(self.timeout.as_millis() as u64)),
        }
    }

    async fn install(&self, detector: Box<dyn Detector>) -> DomainResult<()> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Job::Install { detector, reply })
            .map_err(|_| DomainError::OperationFailed("el worker de inferencia no está en ejecución".into()))?;
        rx.await
            .map_err(|_| DomainError::OperationFailed("el worker de inferencia no está en ejecución".into()))?;
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.model_name().is_some()
    }

    fn model_name(&self) -> Option<String> {
        self.loaded.read().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::fakes::ScriptedDetector;
    use std::sync::atomic::Ordering;

    fn det(conf: f32) -> RawDetection {
        RawDetection { bbox: [0.0, 0.0, 4.0, 4.0].into(), confidence: conf, class_id: 0, class_name: "person".into() }
    }

    #[tokio::test]
    async fn refuses_before_a_model_is_installed() {
        let worker = InferenceWorker::spawn(Duration::from_secs(1));
        let scripted = ScriptedDetector::returning(vec![det(0.9)]);
        let calls = scripted.calls.clone();

        let err = worker.infer(RgbImage::new(8, 8), &YoloParams::default()).await.unwrap_err();
        assert_eq!(err, InferenceError::ModelUnavailable);

        worker.install(Box::new(scripted)).await.unwrap();
        assert_eq!(worker.model_name().as_deref(), Some("scripted"));
        let out = worker.infer(RgbImage::new(8, 8), &YoloParams::default()).await.unwrap();
        assert_eq!(out, vec![det(0.9)]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn timed_out_frames_are_not_run_later() {
        let worker = InferenceWorker::spawn(Duration::from_millis(50));
        let scripted = ScriptedDetector { delay: Some(Duration::from_millis(300)), ..Default::default() };
        let calls = scripted.calls.clone();
        worker.install(Box::new(scripted)).await.unwrap();

        for _ in 0..4 {
            let err = worker.infer(RgbImage::new(8, 8), &YoloParams::default()).await.unwrap_err();
            assert_eq!(err, InferenceError::Timeout(50));
        }

        // Solo el primer trabajo llega al modelo; los otros tres quedaron en cola detrás
        // y sus llamadores ya se habían ido cuando el worker llegó a ellos.
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn panicking_detector_is_unloaded() {
        let worker = InferenceWorker::spawn(Duration::from_secs(1));
        let scripted = ScriptedDetector { panic: true, ..Default::default() };
        worker.install(Box::new(scripted)).await.unwrap();
        assert!(worker.is_loaded());

        let err = worker.infer(RgbImage::new(8, 8), &YoloParams::default()).await.unwrap_err();
        assert_eq!(err, InferenceError::Failed("detector panicked".into()));
        assert!(!worker.is_loaded());
        assert_eq!(worker.model_name(), None);

        let err = worker.infer(RgbImage::new(8, 8), &YoloParams::default()).await.unwrap_err();
        assert_eq!(err, InferenceError::ModelUnavailable);
    }

    #[tokio::test]
    async fn detector_errors_are_reported() {
        let worker = InferenceWorker::spawn(Duration::from_secs(1));
        let scripted = ScriptedDetector { fail: Some("bad tensor".into()), ..Default::default() };
        worker.install(Box::new(scripted)).await.unwrap();

        let err = worker.infer(RgbImage::new(8, 8), &YoloParams::default()).await.unwrap_err();
        assert_eq!(err, InferenceError::Failed("bad tensor".into()));
    }
}
