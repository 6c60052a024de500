use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Ordinal scale for sexual-content intensity.
///
/// The derived ordering is load-bearing: a request for a given level accepts
/// any book at or below that level, never above it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SpiceLevel {
    Sweet,
    Mild,
    Medium,
    Hot,
    Scorching,
    Inferno,
}

impl SpiceLevel {
    /// All levels, tamest first.
    pub const ALL: [SpiceLevel; 6] = [
        SpiceLevel::Sweet,
        SpiceLevel::Mild,
        SpiceLevel::Medium,
        SpiceLevel::Hot,
        SpiceLevel::Scorching,
        SpiceLevel::Inferno,
    ];

    /// Every level at or below `self`, tamest first.
    pub fn band_through(self) -> Vec<SpiceLevel> {
        Self::ALL.iter().copied().filter(|level| *level <= self).collect()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SpiceLevel::Sweet => "Sweet",
            SpiceLevel::Mild => "Mild",
            SpiceLevel::Medium => "Medium",
            SpiceLevel::Hot => "Hot",
            SpiceLevel::Scorching => "Scorching",
            SpiceLevel::Inferno => "Inferno",
        }
    }

    /// Parses the catalog's string form. Unknown values yield `None`, not an
    /// error: catalog rows can predate vocabulary cleanups.
    pub fn parse_lenient(raw: &str) -> Option<SpiceLevel> {
        match raw.trim().to_lowercase().as_str() {
            "sweet" => Some(SpiceLevel::Sweet),
            "mild" => Some(SpiceLevel::Mild),
            "medium" => Some(SpiceLevel::Medium),
            "hot" => Some(SpiceLevel::Hot),
            "scorching" => Some(SpiceLevel::Scorching),
            "inferno" => Some(SpiceLevel::Inferno),
            _ => None,
        }
    }
}

impl Display for SpiceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A tag or content-warning label with its occurrence count on a book.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabelCount {
    pub name: String,
    pub count: i64,
}

/// A catalog record as returned to the client.
///
/// Books are created and updated by the ingestion pipeline only; within a
/// request they are immutable read-only input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: String,
    pub url: String,
    /// Average reader rating, 0.0 to 5.0.
    pub average_rating: f64,
    pub ratings_count: i64,
    pub spice_level: Option<SpiceLevel>,
    pub summary: String,
    pub tags: Vec<LabelCount>,
    pub content_warnings: Vec<LabelCount>,
    pub series: Option<String>,
    pub series_number: Option<i32>,
    pub page_count: Option<i32>,
    pub published_date: Option<NaiveDate>,
    pub scraped_status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_through_is_inclusive_downward() {
        assert_eq!(SpiceLevel::Sweet.band_through(), vec![SpiceLevel::Sweet]);
        assert_eq!(
            SpiceLevel::Hot.band_through(),
            vec![
                SpiceLevel::Sweet,
                SpiceLevel::Mild,
                SpiceLevel::Medium,
                SpiceLevel::Hot
            ]
        );
        assert_eq!(SpiceLevel::Inferno.band_through().len(), 6);
    }

    #[test]
    fn test_ordinal_ordering() {
        assert!(SpiceLevel::Sweet < SpiceLevel::Mild);
        assert!(SpiceLevel::Hot < SpiceLevel::Scorching);
        assert!(SpiceLevel::Scorching < SpiceLevel::Inferno);
    }

    #[test]
    fn test_parse_lenient_case_insensitive() {
        assert_eq!(SpiceLevel::parse_lenient("hot"), Some(SpiceLevel::Hot));
        assert_eq!(SpiceLevel::parse_lenient(" Sweet "), Some(SpiceLevel::Sweet));
        assert_eq!(SpiceLevel::parse_lenient("SCORCHING"), Some(SpiceLevel::Scorching));
    }

    #[test]
    fn test_parse_lenient_unknown_is_none() {
        assert_eq!(SpiceLevel::parse_lenient("volcanic"), None);
        assert_eq!(SpiceLevel::parse_lenient(""), None);
    }

    #[test]
    fn test_spice_level_serde() {
        let json = serde_json::to_string(&SpiceLevel::Medium).unwrap();
        assert_eq!(json, "\"Medium\"");

        let parsed: SpiceLevel = serde_json::from_str("\"Inferno\"").unwrap();
        assert_eq!(parsed, SpiceLevel::Inferno);
    }

    #[test]
    fn test_book_serializes_camel_case() {
        let book = Book {
            id: "b1".to_string(),
            title: "The Hating Game".to_string(),
            author: "Sally Thorne".to_string(),
            url: "https://example.com/b1".to_string(),
            average_rating: 4.1,
            ratings_count: 1200,
            spice_level: Some(SpiceLevel::Hot),
            summary: "Office rivals.".to_string(),
            tags: vec![LabelCount {
                name: "enemies to lovers".to_string(),
                count: 311,
            }],
            content_warnings: vec![],
            series: None,
            series_number: None,
            page_count: Some(384),
            published_date: None,
            scraped_status: Some("complete".to_string()),
        };

        let value = serde_json::to_value(&book).unwrap();
        assert_eq!(value["averageRating"], 4.1);
        assert_eq!(value["ratingsCount"], 1200);
        assert_eq!(value["spiceLevel"], "Hot");
        assert_eq!(value["contentWarnings"], serde_json::json!([]));
        assert_eq!(value["tags"][0]["name"], "enemies to lovers");
    }
}
