use std::collections::HashSet;

use crate::error::{AppError, AppResult};
use crate::models::RecommendationResponse;
use crate::services::filter::predicate_ladder;
use crate::services::preferences::PreferenceExtractor;
use crate::services::retrieval::CandidateRetriever;
use crate::services::scoring;

/// End-to-end recommendation pipeline: extract preferences, build the
/// filter ladder, retrieve, score, select.
///
/// This type owns sequencing and failure translation only. Matching lives
/// in the filter module, scoring in the scoring module.
pub struct Recommender {
    extractor: PreferenceExtractor,
    retriever: CandidateRetriever,
    page_size: usize,
}

impl Recommender {
    pub fn new(
        extractor: PreferenceExtractor,
        retriever: CandidateRetriever,
        page_size: usize,
    ) -> Self {
        Self {
            extractor,
            retriever,
            page_size,
        }
    }

    /// The sole entry point for recommendations.
    ///
    /// Walks the predicate ladder strictest-first and answers from the
    /// first tier that yields candidates. A retrieval timeout advances the
    /// ladder like an empty result, except on the final tier, where it
    /// surfaces. An exhausted ladder is the no-matches outcome, not a
    /// fault.
    pub async fn recommend(
        &self,
        message: &str,
        exclusions: &HashSet<String>,
    ) -> AppResult<RecommendationResponse> {
        if message.trim().is_empty() {
            return Err(AppError::InvalidInput("message must not be empty".to_string()));
        }

        let profile = self.extractor.extract(message).await;
        let ladder = predicate_ladder(&profile, exclusions);

        for predicate in &ladder {
            let limit = CandidateRetriever::pool_size(predicate.tier, self.page_size);

            let candidates = match self.retriever.retrieve(predicate, limit).await {
                Ok(candidates) => candidates,
                Err(AppError::RetrievalTimeout) if !predicate.tier.is_final() => {
                    tracing::warn!(tier = ?predicate.tier, "retrieval timed out, relaxing filters");
                    continue;
                }
                Err(error) => return Err(error),
            };

            if candidates.is_empty() {
                tracing::debug!(tier = ?predicate.tier, "no candidates, relaxing filters");
                continue;
            }

            tracing::info!(
                tier = ?predicate.tier,
                candidates = candidates.len(),
                "scoring retrieved candidates"
            );

            let result = scoring::select_top(candidates, &profile, exclusions, self.page_size);

            // The selector can drop every candidate (stale reads, warning
            // gate); that counts as an empty tier, not an answer.
            if result.books.is_empty() {
                tracing::debug!(tier = ?predicate.tier, "all candidates filtered out, relaxing filters");
                continue;
            }

            return Ok(result);
        }

        Err(AppError::NoBooksFound)
    }
}
