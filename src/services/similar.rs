use std::sync::Arc;

use crate::db::BookCatalog;
use crate::error::{AppError, AppResult};
use crate::models::{Book, RecommendationResponse};
use crate::services::filter::Predicate;

/// Candidate pool fetched when looking for neighbors of one book.
const SIMILAR_POOL: u32 = 60;

/// Neighbors returned per call.
const SIMILAR_PAGE: usize = 5;

/// Books resembling a target book: shared spice level, tags and warnings,
/// weighted by rating.
pub async fn similar_books(
    catalog: &Arc<dyn BookCatalog>,
    book_id: &str,
) -> AppResult<RecommendationResponse> {
    let target = catalog
        .find_by_id(book_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("book {book_id} not found")))?;

    let predicate = Predicate::unconstrained(vec![target.id.clone()]);
    let candidates = catalog.find_books(&predicate, SIMILAR_POOL).await?;
    let total = candidates.len();

    let mut scored: Vec<(Book, f64)> = candidates
        .into_iter()
        .map(|candidate| {
            let score = similarity(&target, &candidate);
            (candidate, score)
        })
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let has_more = total > SIMILAR_PAGE;
    let books = scored
        .into_iter()
        .take(SIMILAR_PAGE)
        .map(|(book, _)| book)
        .collect();

    Ok(RecommendationResponse {
        books,
        total,
        has_more,
    })
}

fn similarity(target: &Book, candidate: &Book) -> f64 {
    let mut score = 0.0;

    if candidate.spice_level.is_some() && candidate.spice_level == target.spice_level {
        score += 2.0;
    }

    score += candidate
        .tags
        .iter()
        .filter(|tag| target.tags.iter().any(|t| t.name == tag.name))
        .count() as f64;

    score += candidate
        .content_warnings
        .iter()
        .filter(|cw| target.content_warnings.iter().any(|w| w.name == cw.name))
        .count() as f64;

    score += candidate.average_rating;

    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MockBookCatalog;
    use crate::models::{LabelCount, SpiceLevel};

    fn book(id: &str, rating: f64, spice: Option<SpiceLevel>, tags: &[&str]) -> Book {
        Book {
            id: id.to_string(),
            title: format!("Book {id}"),
            author: "Author".to_string(),
            url: format!("https://example.com/{id}"),
            average_rating: rating,
            ratings_count: 100,
            spice_level: spice,
            summary: String::new(),
            tags: tags
                .iter()
                .map(|name| LabelCount {
                    name: name.to_string(),
                    count: 5,
                })
                .collect(),
            content_warnings: vec![],
            series: None,
            series_number: None,
            page_count: None,
            published_date: None,
            scraped_status: None,
        }
    }

    #[test]
    fn test_similarity_rewards_shared_tags_and_spice() {
        let target = book("t", 4.0, Some(SpiceLevel::Hot), &["small town", "slow burn"]);
        let close = book("a", 4.0, Some(SpiceLevel::Hot), &["small town", "slow burn"]);
        let far = book("b", 4.0, Some(SpiceLevel::Sweet), &["vampires"]);

        assert!(similarity(&target, &close) > similarity(&target, &far));
        // 2 shared tags + spice match: a gap of 4 before ratings even differ.
        assert!((similarity(&target, &close) - similarity(&target, &far) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_similarity_no_spice_bonus_for_unknown() {
        let target = book("t", 4.0, None, &[]);
        let unknown = book("a", 4.0, None, &[]);
        assert!((similarity(&target, &unknown) - 4.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_unknown_book_is_not_found() {
        let mut catalog = MockBookCatalog::new();
        catalog.expect_find_by_id().returning(|_| Ok(None));

        let catalog: Arc<dyn BookCatalog> = Arc::new(catalog);
        let result = similar_books(&catalog, "missing").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_neighbors_ranked_by_similarity() {
        let target = book("t", 4.0, Some(SpiceLevel::Hot), &["small town"]);
        let twin = book("twin", 4.0, Some(SpiceLevel::Hot), &["small town"]);
        let stranger = book("stranger", 4.0, Some(SpiceLevel::Sweet), &["vampires"]);

        let mut catalog = MockBookCatalog::new();
        let target_clone = target.clone();
        catalog
            .expect_find_by_id()
            .returning(move |_| Ok(Some(target_clone.clone())));
        let pool = vec![stranger.clone(), twin.clone()];
        catalog
            .expect_find_books()
            .withf(|p: &Predicate, _| p.excluded_ids == vec!["t".to_string()])
            .returning(move |_, _| Ok(pool.clone()));

        let catalog: Arc<dyn BookCatalog> = Arc::new(catalog);
        let result = similar_books(&catalog, "t").await.unwrap();

        assert_eq!(result.books[0].id, "twin");
        assert_eq!(result.total, 2);
        assert!(!result.has_more);
    }
}
