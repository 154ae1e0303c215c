use std::sync::Arc;

use {
    async_trait::async_trait,
    imbridge_config::ReaderConfig,
    imbridge_service_traits::{ReadApi, Row, RowQuery, ServiceError, ServiceResult},
    tokio::sync::Semaphore,
    tracing::trace,
};

/// Bounds the number of concurrent reads against a [`ReadApi`].
#[derive(Clone)]
pub struct ReaderPool {
    api: Arc<dyn ReadApi>,
    permits: Arc<Semaphore>,
    size: usize,
}

impl ReaderPool {
    pub fn new(api: Arc<dyn ReadApi>, max_concurrent_reads: usize) -> Self {
        let size = max_concurrent_reads.max(1);
        Self {
            api,
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn from_config(api: Arc<dyn ReadApi>, config: &ReaderConfig) -> Self {
        Self::new(api, config.permits())
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Readers currently free.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

#[async_trait]
impl ReadApi for ReaderPool {
    async fn read_rows(&self, query: &RowQuery) -> ServiceResult<Vec<Row>> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| ServiceError::external("reader pool closed", e))?;
        trace!(query = query.kind(), available = self.available(), "reading rows");
        self.api.read_rows(query).await
    }
}
