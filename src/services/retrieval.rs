use std::sync::Arc;
use std::time::Duration;

use crate::db::BookCatalog;
use crate::error::{AppError, AppResult};
use crate::models::Book;
use crate::services::filter::{LadderTier, Predicate};

/// Candidates requested per final-page slot on the scored tiers, so the
/// scorer has a pool to differentiate.
pub const CANDIDATE_MULTIPLIER: usize = 3;

/// Fetches candidate books for one predicate under a time budget.
///
/// A timeout maps to its own error variant rather than a storage fault:
/// for every tier but the last it is recoverable, and the orchestrator
/// needs to tell the two apart.
pub struct CandidateRetriever {
    catalog: Arc<dyn BookCatalog>,
    budget: Duration,
}

impl CandidateRetriever {
    pub fn new(catalog: Arc<dyn BookCatalog>, budget: Duration) -> Self {
        Self { catalog, budget }
    }

    /// Pool size for a tier. The last-resort tier takes the page as-is.
    pub fn pool_size(tier: LadderTier, page_size: usize) -> usize {
        if tier.is_final() {
            page_size
        } else {
            page_size * CANDIDATE_MULTIPLIER
        }
    }

    /// Runs the catalog query, racing it against the deadline. Losing the
    /// race discards the pending call; nothing is partially committed.
    pub async fn retrieve(&self, predicate: &Predicate, limit: usize) -> AppResult<Vec<Book>> {
        match tokio::time::timeout(self.budget, self.catalog.find_books(predicate, limit as u32))
            .await
        {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    tier = ?predicate.tier,
                    budget_ms = self.budget.as_millis() as u64,
                    "catalog retrieval timed out"
                );
                Err(AppError::RetrievalTimeout)
            }
        }
    }
}
