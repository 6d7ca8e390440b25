//! Holder of the single live [`SemanticIndex`].
//!
//! Starts with no index. The ingestion pipeline clears it before touching the
//! working directory and installs the new index, in one assignment, once a
//! build succeeds. Readers get an `Arc` snapshot and never hold the lock
//! while answering.

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::index::SemanticIndex;

#[derive(Debug, Default)]
pub struct SessionState {
    current: RwLock<Option<Arc<SemanticIndex>>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn current(&self) -> Option<Arc<SemanticIndex>> {
        self.current.read().await.clone()
    }

    pub async fn has_index(&self) -> bool {
        self.current.read().await.is_some()
    }

    /// Drops the current index. Returns whether one was present.
    pub async fn invalidate(&self) -> bool {
        self.current.write().await.take().is_some()
    }

    pub async fn install(&self, index: SemanticIndex) -> Arc<SemanticIndex> {
        let index = Arc::new(index);
        *self.current.write().await = Some(Arc::clone(&index));
        index
    }
}
