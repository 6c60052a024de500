use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    error::AppResult,
    models::{Book, LabelCount, SpiceLevel},
    services::filter::{MatchMode, Predicate},
};

/// Read-only access to the book catalog.
///
/// The catalog is owned by the ingestion pipeline; this crate only ever
/// filters and reads it. Implementations must be thread-safe so one
/// instance can serve concurrent requests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookCatalog: Send + Sync {
    /// Books matching `predicate`, popularity-ordered, at most `limit`.
    ///
    /// The popularity ordering is only a pre-score bias; final ranking is
    /// the scorer's job.
    async fn find_books(&self, predicate: &Predicate, limit: u32) -> AppResult<Vec<Book>>;

    /// A single book by its identifier.
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Book>>;

    /// The most frequent tag labels, at most `limit`.
    async fn tag_names(&self, limit: u32) -> AppResult<Vec<String>>;

    /// The most frequent content-warning labels, at most `limit`.
    async fn warning_names(&self, limit: u32) -> AppResult<Vec<String>>;
}

/// PostgreSQL-backed catalog.
#[derive(Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct BookRow {
    id: String,
    title: String,
    author: String,
    url: String,
    average_rating: f64,
    ratings_count: i64,
    spice_level: Option<String>,
    summary: String,
    series: Option<String>,
    series_number: Option<i32>,
    page_count: Option<i32>,
    published_date: Option<chrono::NaiveDate>,
    scraped_status: Option<String>,
}

#[derive(sqlx::FromRow)]
struct LabelRow {
    book_id: String,
    name: String,
    count: i64,
}

const BOOK_COLUMNS: &str = "b.id, b.title, b.author, b.url, b.average_rating, b.ratings_count, \
     b.spice_level, b.summary, b.series, b.series_number, b.page_count, \
     b.published_date, b.scraped_status";

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Translates a predicate into WHERE conditions on an open builder.
    ///
    /// The builder arrives with "SELECT ... FROM books b" already pushed.
    fn push_conditions(qb: &mut QueryBuilder<'_, Postgres>, predicate: &Predicate) {
        qb.push(" WHERE b.average_rating >= ");
        qb.push_bind(predicate.min_rating);
        qb.push(" AND b.average_rating <= ");
        qb.push_bind(predicate.max_rating);

        if let Some(levels) = &predicate.spice_levels {
            let names: Vec<String> = levels.iter().map(|level| level.to_string()).collect();
            // Unknown spice is not "above the ceiling": NULL rows stay eligible.
            qb.push(" AND (b.spice_level IS NULL OR b.spice_level = ANY(");
            qb.push_bind(names);
            qb.push("))");
        }

        Self::push_label_clause(
            qb,
            predicate.genre_mode,
            &predicate.genres,
            "book_tags",
            "tags",
            "tag_id",
            false,
        );
        Self::push_label_clause(
            qb,
            predicate.warning_mode,
            &predicate.warnings,
            "book_content_warnings",
            "content_warnings",
            "warning_id",
            false,
        );

        if !predicate.excluded_warnings.is_empty() {
            Self::push_label_clause(
                qb,
                MatchMode::Any,
                &predicate.excluded_warnings,
                "book_content_warnings",
                "content_warnings",
                "warning_id",
                true,
            );
        }

        if !predicate.excluded_ids.is_empty() {
            qb.push(" AND b.id <> ALL(");
            qb.push_bind(predicate.excluded_ids.clone());
            qb.push(")");
        }
    }

    /// EXISTS subqueries for a label match clause.
    ///
    /// `All` emits one EXISTS per token; `Any` emits a single EXISTS with an
    /// OR'd token list; `negated` turns the clause into NOT EXISTS.
    fn push_label_clause(
        qb: &mut QueryBuilder<'_, Postgres>,
        mode: MatchMode,
        tokens: &[String],
        join_table: &str,
        label_table: &str,
        label_fk: &str,
        negated: bool,
    ) {
        if tokens.is_empty() || mode == MatchMode::None {
            return;
        }

        let exists = if negated { " AND NOT EXISTS " } else { " AND EXISTS " };
        let subquery = format!(
            "(SELECT 1 FROM {join_table} j JOIN {label_table} l ON l.id = j.{label_fk} \
             WHERE j.book_id = b.id AND ("
        );

        match mode {
            MatchMode::All => {
                for token in tokens {
                    qb.push(exists);
                    qb.push(subquery.as_str());
                    qb.push("l.name ILIKE ");
                    qb.push_bind(like_pattern(token));
                    qb.push("))");
                }
            }
            MatchMode::Any => {
                qb.push(exists);
                qb.push(subquery.as_str());
                for (i, token) in tokens.iter().enumerate() {
                    if i > 0 {
                        qb.push(" OR ");
                    }
                    qb.push("l.name ILIKE ");
                    qb.push_bind(like_pattern(token));
                }
                qb.push("))");
            }
            MatchMode::None => {}
        }
    }

    /// Fetches tags and warnings for a page of rows and assembles books.
    ///
    /// Two follow-up queries instead of a join fan-out keeps the main query
    /// cheap and the row mapping flat.
    async fn attach_labels(&self, rows: Vec<BookRow>) -> AppResult<Vec<Book>> {
        let ids: Vec<String> = rows.iter().map(|row| row.id.clone()).collect();

        let mut tags: HashMap<String, Vec<LabelCount>> = HashMap::new();
        let mut warnings: HashMap<String, Vec<LabelCount>> = HashMap::new();

        if !ids.is_empty() {
            let tag_rows: Vec<LabelRow> = sqlx::query_as(
                "SELECT j.book_id, l.name, l.count FROM book_tags j \
                 JOIN tags l ON l.id = j.tag_id WHERE j.book_id = ANY($1) \
                 ORDER BY l.count DESC",
            )
            .bind(&ids)
            .fetch_all(&self.pool)
            .await?;

            for row in tag_rows {
                tags.entry(row.book_id).or_default().push(LabelCount {
                    name: row.name,
                    count: row.count,
                });
            }

            let warning_rows: Vec<LabelRow> = sqlx::query_as(
                "SELECT j.book_id, l.name, l.count FROM book_content_warnings j \
                 JOIN content_warnings l ON l.id = j.warning_id WHERE j.book_id = ANY($1) \
                 ORDER BY l.count DESC",
            )
            .bind(&ids)
            .fetch_all(&self.pool)
            .await?;

            for row in warning_rows {
                warnings.entry(row.book_id).or_default().push(LabelCount {
                    name: row.name,
                    count: row.count,
                });
            }
        }

        let books = rows
            .into_iter()
            .map(|row| {
                let book_tags = tags.remove(&row.id).unwrap_or_default();
                let book_warnings = warnings.remove(&row.id).unwrap_or_default();
                Book {
                    spice_level: row.spice_level.as_deref().and_then(SpiceLevel::parse_lenient),
                    id: row.id,
                    title: row.title,
                    author: row.author,
                    url: row.url,
                    average_rating: row.average_rating,
                    ratings_count: row.ratings_count,
                    summary: row.summary,
                    tags: book_tags,
                    content_warnings: book_warnings,
                    series: row.series,
                    series_number: row.series_number,
                    page_count: row.page_count,
                    published_date: row.published_date,
                    scraped_status: row.scraped_status,
                }
            })
            .collect();

        Ok(books)
    }
}

fn like_pattern(token: &str) -> String {
    format!("%{}%", token)
}

#[async_trait]
impl BookCatalog for PgCatalog {
    async fn find_books(&self, predicate: &Predicate, limit: u32) -> AppResult<Vec<Book>> {
        let mut qb = QueryBuilder::new(format!("SELECT {BOOK_COLUMNS} FROM books b"));
        Self::push_conditions(&mut qb, predicate);
        qb.push(" ORDER BY b.ratings_count DESC, b.average_rating DESC LIMIT ");
        qb.push_bind(limit as i64);

        let rows: Vec<BookRow> = qb.build_query_as().fetch_all(&self.pool).await?;

        tracing::debug!(
            tier = ?predicate.tier,
            rows = rows.len(),
            limit = limit,
            "catalog query executed"
        );

        self.attach_labels(rows).await
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<Book>> {
        let row: Option<BookRow> =
            sqlx::query_as(&format!("SELECT {BOOK_COLUMNS} FROM books b WHERE b.id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(row) => Ok(self.attach_labels(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn tag_names(&self, limit: u32) -> AppResult<Vec<String>> {
        let names: Vec<String> =
            sqlx::query_scalar("SELECT name FROM tags ORDER BY count DESC, name ASC LIMIT $1")
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await?;
        Ok(names)
    }

    async fn warning_names(&self, limit: u32) -> AppResult<Vec<String>> {
        let names: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM content_warnings ORDER BY count DESC, name ASC LIMIT $1",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PreferenceProfile;
    use crate::services::filter::predicate_ladder;
    use std::collections::HashSet;

    fn strict_predicate() -> Predicate {
        let profile = PreferenceProfile {
            spice_level: Some(SpiceLevel::Hot),
            genres: vec!["small town".to_string(), "regency".to_string()],
            excluded_warnings: vec!["cheating".to_string()],
            ..PreferenceProfile::default()
        };
        let exclusions: HashSet<String> = ["b1".to_string()].into_iter().collect();
        predicate_ladder(&profile, &exclusions).remove(0)
    }

    fn build_sql(predicate: &Predicate) -> String {
        // Select a minimal column here so the literal column list (which
        // includes b.spice_level) does not leak into the asserted WHERE string.
        let mut qb = QueryBuilder::<Postgres>::new("SELECT b.id FROM books b".to_string());
        PgCatalog::push_conditions(&mut qb, predicate);
        qb.into_sql()
    }

    #[test]
    fn test_strict_sql_has_one_exists_per_genre() {
        let sql = build_sql(&strict_predicate());
        assert_eq!(sql.matches(" AND EXISTS ").count(), 2);
        assert!(sql.contains("l.name ILIKE"));
    }

    #[test]
    fn test_strict_sql_excludes_warnings_and_ids() {
        let sql = build_sql(&strict_predicate());
        assert!(sql.contains("NOT EXISTS"));
        assert!(sql.contains("book_content_warnings"));
        assert!(sql.contains("b.id <> ALL"));
    }

    #[test]
    fn test_spice_clause_keeps_null_rows_eligible() {
        let sql = build_sql(&strict_predicate());
        assert!(sql.contains("b.spice_level IS NULL OR b.spice_level = ANY"));
    }

    #[test]
    fn test_relaxed_sql_folds_genres_into_one_exists() {
        let profile = PreferenceProfile {
            genres: vec!["small town".to_string(), "regency".to_string()],
            ..PreferenceProfile::default()
        };
        let relaxed = predicate_ladder(&profile, &HashSet::new()).remove(1);
        let sql = build_sql(&relaxed);
        assert_eq!(sql.matches(" AND EXISTS ").count(), 1);
        assert!(sql.contains(" OR "));
    }

    #[test]
    fn test_lenient_sql_has_no_label_clauses() {
        let profile = PreferenceProfile {
            genres: vec!["small town".to_string()],
            ..PreferenceProfile::default()
        };
        let lenient = predicate_ladder(&profile, &HashSet::new()).remove(2);
        let sql = build_sql(&lenient);
        assert!(!sql.contains("book_tags"));
        assert!(sql.contains("b.average_rating >= "));
    }

    #[test]
    fn test_excluded_warnings_present_even_on_lenient_sql() {
        let profile = PreferenceProfile {
            excluded_warnings: vec!["cheating".to_string()],
            ..PreferenceProfile::default()
        };
        let lenient = predicate_ladder(&profile, &HashSet::new()).remove(2);
        let sql = build_sql(&lenient);
        assert!(sql.contains("NOT EXISTS"));
    }

    #[test]
    fn test_unconstrained_sql_is_rating_band_only() {
        let sql = build_sql(&Predicate::unconstrained(vec![]));
        assert!(!sql.contains("EXISTS"));
        assert!(!sql.contains("spice_level"));
        assert!(!sql.contains("<> ALL"));
    }

    #[test]
    fn test_like_pattern_wraps_token() {
        assert_eq!(like_pattern("small town"), "%small town%");
    }
}
