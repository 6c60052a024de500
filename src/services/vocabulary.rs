use std::sync::Arc;

use crate::db::{BookCatalog, Cache, CacheKey};
use crate::models::Vocabulary;

/// Seconds a cached vocabulary stays fresh.
const VOCABULARY_TTL: u64 = 300;

/// Most-frequent labels kept per list. Bounds both the cache entry and the
/// prompt the preference extractor builds from it.
const VOCABULARY_CAPACITY: u32 = 50;

/// Serves the catalog's known tag and content-warning labels.
///
/// Cache-first with graceful degradation: cache trouble falls back to a
/// direct catalog read, catalog trouble yields empty lists. A
/// recommendation never fails because vocabulary metadata was unavailable.
pub struct VocabularyService {
    catalog: Arc<dyn BookCatalog>,
    cache: Cache,
}

impl VocabularyService {
    pub fn new(catalog: Arc<dyn BookCatalog>, cache: Cache) -> Self {
        Self { catalog, cache }
    }

    /// The current vocabulary, most frequent labels first.
    pub async fn get(&self) -> Vocabulary {
        let tags = self.labels(CacheKey::TagVocabulary).await;
        let warnings = self.labels(CacheKey::WarningVocabulary).await;
        Vocabulary { tags, warnings }
    }

    async fn labels(&self, key: CacheKey) -> Vec<String> {
        match self.cache.get::<Vec<String>>(&key).await {
            Ok(Some(cached)) => return cached,
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "vocabulary cache read failed, querying catalog")
            }
        }

        let fetched = match key {
            CacheKey::TagVocabulary => self.catalog.tag_names(VOCABULARY_CAPACITY).await,
            CacheKey::WarningVocabulary => self.catalog.warning_names(VOCABULARY_CAPACITY).await,
        };

        match fetched {
            Ok(names) => {
                self.cache.put_in_background(&key, &names, VOCABULARY_TTL);
                names
            }
            Err(e) => {
                tracing::error!(key = %key, error = %e, "vocabulary fetch failed, continuing without it");
                Vec::new()
            }
        }
    }
}
