//! Query resolution against the current index.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{PipelineError, Result};
use crate::models::Answer;
use crate::session::SessionState;

pub struct QueryResolver {
    session: Arc<SessionState>,
    timeout: Duration,
}

impl QueryResolver {
    pub fn new(session: Arc<SessionState>, timeout: Duration) -> Self {
        Self { session, timeout }
    }

    /// Answers `text` with the index installed at call time.
    ///
    /// Fails with [`PipelineError::NoIndex`] before the first successful
    /// ingestion (or while one is in flight) and with [`PipelineError::Query`]
    /// for blank questions, backend errors, and timeouts. An empty answer is
    /// [`Answer::NoRelevantResult`].
    pub async fn query(&self, text: &str) -> Result<Answer> {
        let question = text.trim();
        if question.is_empty() {
            return Err(PipelineError::query("query text must not be empty"));
        }

        let index = self.session.current().await.ok_or(PipelineError::NoIndex)?;

        let answer = tokio::time::timeout(self.timeout, index.answer(question))
            .await
            .map_err(|_| {
                PipelineError::query(format!("timed out after {}s", self.timeout.as_secs()))
            })?
            .map_err(|e| PipelineError::query(format!("{:#}", e)))?;

        let answer = answer.trim();
        if answer.is_empty() {
            tracing::info!(build_id = index.build_id(), "no relevant result");
            return Ok(Answer::NoRelevantResult);
        }
        Ok(Answer::Text(answer.to_string()))
    }
}
