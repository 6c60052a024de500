use std::collections::HashSet;

use rand::Rng;

use crate::models::{Book, PreferenceProfile, RecommendationResponse};
use crate::services::filter::tokens_match;

/// Weight of the genre-overlap signal, the largest single contribution:
/// a full genre match outranks every other signal combined.
const GENRE_WEIGHT: f64 = 4.0;

/// Ratings near this value score best; both ends of the scale are treated
/// as outliers.
const RATING_MIDPOINT: f64 = 4.0;
const RATING_SPREAD: f64 = 1.5;

/// Rating counts at or above this saturate the popularity signal, so a few
/// mega-popular titles cannot own every response.
const POPULARITY_CEILING: f64 = 1000.0;

const SPICE_BONUS: f64 = 0.5;

/// Books carrying an excluded warning also get hard-dropped in the
/// selector; the penalty keeps raw scores honest for any other caller.
const EXCLUDED_WARNING_PENALTY: f64 = -10.0;

/// Upper bound (exclusive) of the random tie-breaking jitter. Small enough
/// that any genre or rating difference worth a quarter point still wins.
const JITTER_SPAN: f64 = 0.5;

/// A candidate book paired with its relevance score.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub book: Book,
    pub score: f64,
}

/// Deterministic part of the relevance score: a sum of independent,
/// individually bounded signals.
pub fn score_book(book: &Book, profile: &PreferenceProfile) -> f64 {
    let mut score = 0.0;

    if !profile.genres.is_empty() {
        let matching = book
            .tags
            .iter()
            .filter(|tag| profile.genres.iter().any(|genre| tokens_match(genre, &tag.name)))
            .count();
        score += matching as f64 / profile.genres.len() as f64 * GENRE_WEIGHT;
    }

    score += 1.0 - (book.average_rating - RATING_MIDPOINT).abs() / RATING_SPREAD;
    score += (book.ratings_count as f64 / POPULARITY_CEILING).min(1.0);

    if let (Some(level), Some(requested)) = (book.spice_level, profile.spice_level) {
        if level <= requested {
            score += SPICE_BONUS;
        }
    }

    if carries_excluded_warning(book, profile) {
        score += EXCLUDED_WARNING_PENALTY;
    }

    if score.is_finite() {
        score
    } else {
        0.0
    }
}

/// True when the book carries any warning the profile excludes.
pub fn carries_excluded_warning(book: &Book, profile: &PreferenceProfile) -> bool {
    profile
        .excluded_warnings
        .iter()
        .any(|excluded| book.content_warnings.iter().any(|cw| tokens_match(excluded, &cw.name)))
}

/// Scores, ranks and truncates a candidate pool into one response page.
///
/// Exclusion-set IDs and excluded-warning books are dropped here again even
/// though the predicate already removed them; a stale catalog read must
/// never resurface one.
pub fn select_top(
    candidates: Vec<Book>,
    profile: &PreferenceProfile,
    exclusions: &HashSet<String>,
    page_size: usize,
) -> RecommendationResponse {
    let mut rng = rand::thread_rng();

    let mut scored: Vec<ScoredCandidate> = candidates
        .into_iter()
        .filter(|book| !exclusions.contains(&book.id))
        .filter(|book| !carries_excluded_warning(book, profile))
        .map(|book| {
            let score = score_book(&book, profile) + rng.gen_range(0.0..JITTER_SPAN);
            ScoredCandidate { book, score }
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let total = scored.len();
    let has_more = total > page_size;
    let books = scored
        .into_iter()
        .take(page_size)
        .map(|candidate| candidate.book)
        .collect();

    RecommendationResponse {
        books,
        total,
        has_more,
    }
}
