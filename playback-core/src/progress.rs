//! Watch-progress tracking per (user, video).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::streaming::{IdentifierError, validate_identifier};

/// Latest known progress of one user through one video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchProgress {
    pub user_id: String,
    pub video_id: String,
    pub watched_seconds: u64,
    pub total_seconds: u64,
    /// Derived: `watched_seconds >= total_seconds`.
    pub completed: bool,
    pub updated_at: DateTime<Utc>,
}

/// Errors from progress operations.
#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("invalid {field}: {source}")]
    InvalidIdentifier {
        field: &'static str,
        #[source]
        source: IdentifierError,
    },

    #[error("total seconds must be positive")]
    InvalidTotal,

    #[error("no progress recorded for user {user_id} on video {video_id}")]
    NotFound { user_id: String, video_id: String },
}

/// Persistence seam for progress records, keyed by `(user_id, video_id)`.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn upsert(&self, progress: WatchProgress);

    async fn find(&self, user_id: &str, video_id: &str) -> Option<WatchProgress>;
}

/// Process-local progress store.
#[derive(Debug, Default)]
pub struct InMemoryProgressStore {
    records: RwLock<HashMap<(String, String), WatchProgress>>,
}

impl InMemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgressStore for InMemoryProgressStore {
    async fn upsert(&self, progress: WatchProgress) {
        let key = (progress.user_id.clone(), progress.video_id.clone());
        self.records.write().insert(key, progress);
    }

    async fn find(&self, user_id: &str, video_id: &str) -> Option<WatchProgress> {
        self.records
            .read()
            .get(&(user_id.to_string(), video_id.to_string()))
            .cloned()
    }
}

/// Records watch progress; repeated updates overwrite the previous record.
#[derive(Clone)]
pub struct ProgressTracker {
    store: Arc<dyn ProgressStore>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl ProgressTracker {
    pub fn new(store: Arc<dyn ProgressStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryProgressStore::new()))
    }

    /// Upserts progress for `(user_id, video_id)`.
    ///
    /// # Errors
    ///
    /// - `ProgressError::InvalidIdentifier` - `user_id` or `video_id` failed validation
    /// - `ProgressError::InvalidTotal` - `total_seconds` is zero
    pub async fn update(
        &self,
        user_id: &str,
        video_id: &str,
        watched_seconds: u64,
        total_seconds: u64,
    ) -> Result<WatchProgress, ProgressError> {
        check("userId", user_id)?;
        check("videoId", video_id)?;
        if total_seconds == 0 {
            return Err(ProgressError::InvalidTotal);
        }

        let progress = WatchProgress {
            user_id: user_id.to_string(),
            video_id: video_id.to_string(),
            watched_seconds,
            total_seconds,
            completed: watched_seconds >= total_seconds,
            updated_at: Utc::now(),
        };
        self.store.upsert(progress.clone()).await;

        debug!(
            user_id,
            video_id,
            watched_seconds,
            total_seconds,
            completed = progress.completed,
            "Watch progress updated"
        );
        Ok(progress)
    }

    /// Returns the stored progress for `(user_id, video_id)`.
    ///
    /// # Errors
    ///
    /// - `ProgressError::NotFound` - Nothing recorded yet
    pub async fn get(
        &self,
        user_id: &str,
        video_id: &str,
    ) -> Result<WatchProgress, ProgressError> {
        self.store
            .find(user_id, video_id)
            .await
            .ok_or_else(|| ProgressError::NotFound {
                user_id: user_id.to_string(),
                video_id: video_id.to_string(),
            })
    }
}

fn check(field: &'static str, value: &str) -> Result<(), ProgressError> {
    validate_identifier(value)
        .map_err(|source| ProgressError::InvalidIdentifier { field, source })
}
