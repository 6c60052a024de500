use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::Book;

/// Inbound recommendation request.
///
/// The three ID lists arrive separately because the UI tracks them
/// separately; the core only ever sees their union.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRequest {
    pub message: String,
    #[serde(default)]
    pub read_books: Vec<String>,
    #[serde(default)]
    pub not_interested_books: Vec<String>,
    #[serde(default)]
    pub previously_seen_books: Vec<String>,
}

impl RecommendationRequest {
    /// Merges read, not-interested and previously-seen IDs into one
    /// exclusion set. Duplicates collapse; order is irrelevant.
    pub fn exclusion_set(&self) -> HashSet<String> {
        self.read_books
            .iter()
            .chain(self.not_interested_books.iter())
            .chain(self.previously_seen_books.iter())
            .cloned()
            .collect()
    }
}

/// One page of recommendations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationResponse {
    pub books: Vec<Book>,
    /// Scored candidates before truncation, not a grand catalog total.
    pub total: usize,
    /// True when more candidates existed than fit the page. There is no
    /// cursor: "more" means a repeat call with a grown exclusion set will
    /// likely surface different books.
    pub has_more: bool,
}

impl RecommendationResponse {
    pub fn empty() -> Self {
        Self {
            books: Vec::new(),
            total: 0,
            has_more: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarBooksRequest {
    pub book_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclusion_set_merges_and_dedupes() {
        let request = RecommendationRequest {
            message: "anything".to_string(),
            read_books: vec!["a".to_string(), "b".to_string()],
            not_interested_books: vec!["b".to_string(), "c".to_string()],
            previously_seen_books: vec!["c".to_string(), "d".to_string()],
        };

        let exclusions = request.exclusion_set();
        assert_eq!(exclusions.len(), 4);
        for id in ["a", "b", "c", "d"] {
            assert!(exclusions.contains(id));
        }
    }

    #[test]
    fn test_request_id_lists_default_empty() {
        let request: RecommendationRequest =
            serde_json::from_str(r#"{"message":"a sweet regency romance"}"#).unwrap();
        assert!(request.exclusion_set().is_empty());
    }

    #[test]
    fn test_response_serializes_camel_case() {
        let value = serde_json::to_value(RecommendationResponse::empty()).unwrap();
        assert_eq!(value["total"], 0);
        assert_eq!(value["hasMore"], false);
        assert_eq!(value["books"], serde_json::json!([]));
    }
}
