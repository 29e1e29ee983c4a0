use std::sync::Arc;

use crate::domain::CounterKind;
use crate::error::{AppError, AppResult};
use crate::metrics::COUNTER_INCREMENTS_TOTAL;
use crate::repository::UserDirectory;

/// Like and view counters for reels.
///
/// Each increment updates the post and its owner's aggregate in one step.
#[derive(Clone)]
pub struct CounterService {
    directory: Arc<dyn UserDirectory>,
}

impl CounterService {
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self { directory }
    }

    /// Increment like count; returns the post's new like count
    pub async fn increment_like(&self, file: &str) -> AppResult<i64> {
        self.increment(file, CounterKind::Like).await
    }

    /// Increment view count; returns the post's new view count
    pub async fn increment_view(&self, file: &str) -> AppResult<i64> {
        self.increment(file, CounterKind::View).await
    }

    async fn increment(&self, file: &str, kind: CounterKind) -> AppResult<i64> {
        let file = file.trim();
        if file.is_empty() {
            return Err(AppError::Validation("File reference is required".into()));
        }
        let value = self.directory.increment_post_counter(file, kind).await?;
        COUNTER_INCREMENTS_TOTAL
            .with_label_values(&[kind.as_str()])
            .inc();
        Ok(value)
    }
}
