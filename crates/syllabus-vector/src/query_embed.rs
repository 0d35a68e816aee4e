use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use syllabus_core::error::{Error, Result};
use syllabus_core::traits::Embedder;

pub const DEFAULT_MAX_IN_FLIGHT: usize = 4;

/// Embeds query text on the blocking pool under a deadline. Every failure
/// (model error, timeout, panic, wrong shape) surfaces as
/// `RetrievalUnavailable` so the caller can fall back to sparse-only.
///
/// A timed-out call cannot cancel the blocking task it started; the task
/// keeps its permit until the embedder actually returns. At most
/// `max_in_flight` embeds run at once, so a hung model pins that many
/// blocking threads and later queries time out waiting for a permit.
#[derive(Clone)]
pub struct QueryEmbedder {
    embedder: Arc<dyn Embedder>,
    timeout: Duration,
    in_flight: Arc<Semaphore>,
}

impl QueryEmbedder {
    pub fn new(embedder: Arc<dyn Embedder>, timeout: Duration) -> Self {
        Self { embedder, timeout, in_flight: Arc::new(Semaphore::new(DEFAULT_MAX_IN_FLIGHT)) }
    }

    pub fn with_max_in_flight(mut self, max: usize) -> Self {
        self.in_flight = Arc::new(Semaphore::new(max.max(1)));
        self
    }

    pub fn embedder_id(&self) -> &str { self.embedder.embedder_id() }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embedder = Arc::clone(&self.embedder);
        let permits = Arc::clone(&self.in_flight);
        let input = vec![text.to_string()];
        let work = async move {
            let permit = permits
                .acquire_owned()
                .await
                .map_err(|_| Error::RetrievalUnavailable("query embedder is shut down".into()))?;
            tokio::task::spawn_blocking(move || {
                let _permit = permit;
                embedder.embed_batch(&input)
            })
            .await
            .map_err(|e| Error::RetrievalUnavailable(format!("embedding task failed: {e}")))
        };
        let joined = tokio::time::timeout(self.timeout, work)
            .await
            .map_err(|_| Error::RetrievalUnavailable(format!("query embedding timed out after {} ms", self.timeout.as_millis())))?;
        let batch = joined?.map_err(|e| Error::RetrievalUnavailable(format!("embedder error: {e:#}")))?;
        let vector = batch
            .into_iter()
            .next()
            .ok_or_else(|| Error::RetrievalUnavailable("embedder returned no vector".into()))?;
        if vector.len() != self.embedder.dim() {
            return Err(Error::RetrievalUnavailable(format!("embedder returned {} dims, expected {}", vector.len(), self.embedder.dim())));
        }
        Ok(vector)
    }
}
