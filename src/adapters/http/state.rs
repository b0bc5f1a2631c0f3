use std::sync::Arc;

use crate::application::{
    registry::ConnectionRegistry,
    services::{FrameService, ModelService},
    tracker::IdentityTable,
};
use crate::config::Config;

/// Estado compartido para los manejadores HTTP de Axum.
/// Contiene los servicios (casos de uso) y las dos tablas compartidas que modifican.
#[derive(Clone)]
pub struct HttpState {
    /// Pipeline por frame y emisor de eventos.
    pub frames: Arc<FrameService>,
    /// Carga y recarga del modelo.
    pub models: Arc<ModelService>,
    pub registry: Arc<ConnectionRegistry>,
    pub identities: Arc<IdentityTable>,
    pub config: Arc<Config>,
}
