pub mod backend;
pub mod document;
pub mod memory;
pub mod qdrant;
pub mod store;

use std::sync::Arc;

use crate::core::config::settings::{VectorBackendKind, VectorStoreSettings};
use crate::core::errors::ApiError;

pub use backend::{CollectionInfo, VectorBackend, VectorParams, VectorsConfig};
pub use document::{DocumentInput, DocumentRecord, SourceType};
pub use memory::MemoryBackend;
pub use qdrant::QdrantBackend;
pub use store::{CollectionStats, DeleteOutcome, KnowledgeStore};

pub fn create_backend(settings: &VectorStoreSettings) -> Result<Arc<dyn VectorBackend>, ApiError> {
    match settings.backend {
        VectorBackendKind::Qdrant => Ok(Arc::new(QdrantBackend::new(settings)?)),
        VectorBackendKind::Memory => Ok(Arc::new(MemoryBackend::new())),
    }
}
