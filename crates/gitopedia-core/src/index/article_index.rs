//! Read-only query execution against a materialized article index.

use crate::config::QueryConfig;
use crate::{Result, SearchError};
use rusqlite::{params, Connection, OpenFlags, Row};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, warn};

use super::query::{QueryExpression, SearchLimit};
use super::schema::{self, ARTICLES_TABLE, CONTENT_COLUMN, SEARCH_TABLE};

/// Tags of a result, as decoded from the metadata table.
///
/// The build pipeline stores a JSON array of strings. Rows holding anything
/// else are passed through untouched rather than failing the query. That
/// includes valid JSON that is not a list of strings, such as `[1, 2]` or
/// `"space"`: it is returned as the stored text, not re-shaped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArticleTags {
    Decoded(Vec<String>),
    Raw(String),
}

impl ArticleTags {
    /// Decode a stored tags value, falling back to the raw text.
    pub fn from_stored(raw: String) -> Self {
        match decode_tags(&raw) {
            Ok(tags) => ArticleTags::Decoded(tags),
            Err(e) => {
                warn!("Passing through undecodable tags {:?}: {}", raw, e);
                ArticleTags::Raw(raw)
            }
        }
    }
}

fn decode_tags(raw: &str) -> serde_json::Result<Vec<String>> {
    serde_json::from_str(raw)
}

/// One ranked match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleResult {
    pub id: String,
    pub title: String,
    pub path: String,
    pub summary: String,
    pub author: String,
    /// `None` when the stored value is NULL.
    pub tags: Option<ArticleTags>,
    /// Content excerpt with matched terms wrapped in `<b>`/`</b>`.
    pub snippet: String,
}

/// Handle to a local article index file.
///
/// The handle only owns the path. Every query opens its own read-only
/// connection, so one handle can serve any number of concurrent searches.
#[derive(Debug, Clone)]
pub struct ArticleIndex {
    db_path: PathBuf,
}

impl ArticleIndex {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    /// Get the database path.
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn open_connection(&self) -> Result<Connection> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        Connection::open_with_flags(&self.db_path, flags).map_err(|e| SearchError::Query {
            message: format!("Failed to open index {}", self.db_path.display()),
            source: Some(e),
        })
    }

    /// Run `expression` and return at most `limit` results, best match first.
    pub fn search(
        &self,
        expression: &QueryExpression,
        limit: SearchLimit,
    ) -> Result<Vec<ArticleResult>> {
        let start = Instant::now();
        let conn = self.open_connection()?;
        let fts5_query = expression.to_fts5();

        let sql = format!(
            "SELECT a.id, a.title, a.path, a.summary, a.author, a.tags,
                    snippet({search}, {column}, '{open}', '{close}', '{ellipsis}', {tokens})
             FROM {search}
             JOIN {articles} a ON {search}.id = a.id
             WHERE {search} MATCH ?1
             ORDER BY rank
             LIMIT ?2",
            search = SEARCH_TABLE,
            articles = ARTICLES_TABLE,
            column = CONTENT_COLUMN,
            open = QueryConfig::HIGHLIGHT_OPEN,
            close = QueryConfig::HIGHLIGHT_CLOSE,
            ellipsis = QueryConfig::ELLIPSIS,
            tokens = QueryConfig::SNIPPET_TOKENS,
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![fts5_query, limit.get() as i64], Self::row_to_result)?;
        let results = rows.collect::<rusqlite::Result<Vec<_>>>()?;

        debug!(
            "FTS5 query {:?} returned {} results in {:.2}ms",
            fts5_query,
            results.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(results)
    }

    /// Count the articles in the index.
    ///
    /// Fails with a query error when the file does not have the expected
    /// table layout.
    pub fn article_count(&self) -> Result<usize> {
        let conn = self.open_connection()?;
        if !schema::tables_exist(&conn)? {
            return Err(SearchError::Query {
                message: format!(
                    "{} is missing the {} or {} table",
                    self.db_path.display(),
                    ARTICLES_TABLE,
                    SEARCH_TABLE
                ),
                source: None,
            });
        }
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", ARTICLES_TABLE),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn row_to_result(row: &Row) -> rusqlite::Result<ArticleResult> {
        let tags: Option<String> = row.get(5)?;

        Ok(ArticleResult {
            id: row.get(0)?,
            title: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            path: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            summary: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            author: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
            tags: tags.map(ArticleTags::from_stored),
            snippet: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::query::build_query;
    use crate::index::schema::{create_tables, insert_article, NewArticle};
    use tempfile::TempDir;

    fn create_test_index(articles: &[NewArticle<'_>]) -> (ArticleIndex, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("index.sqlite");
        let conn = Connection::open(&db_path).unwrap();
        create_tables(&conn).unwrap();
        for article in articles {
            insert_article(&conn, article).unwrap();
        }
        (ArticleIndex::new(db_path), temp_dir)
    }

    fn sample_articles() -> Vec<NewArticle<'static>> {
        vec![
            NewArticle {
                id: "a1",
                title: "Rockets 101",
                path: "science/rockets-101",
                summary: "An introduction to rockets",
                author: "Ada",
                tags: &["space", "science"],
                content: "rockets use rocket engines",
            },
            NewArticle {
                id: "a2",
                title: "Baking",
                path: "food/baking",
                summary: "Bread basics",
                author: "Bo",
                tags: &["food"],
                content: "bread and rocket salad",
            },
        ]
    }

    #[test]
    fn test_search_with_tag_filter() {
        let (index, _temp) = create_test_index(&sample_articles());
        let query = build_query("rocket", Some("science")).unwrap();

        let results = index.search(&query, SearchLimit::default()).unwrap();
        assert_eq!(results.len(), 1);

        let hit = &results[0];
        assert_eq!(hit.id, "a1");
        assert_eq!(hit.title, "Rockets 101");
        assert_eq!(hit.author, "Ada");
        assert_eq!(
            hit.tags,
            Some(ArticleTags::Decoded(vec![
                "space".to_string(),
                "science".to_string()
            ]))
        );
        assert!(hit.snippet.contains("<b>rocket</b>"), "{}", hit.snippet);
    }

    #[test]
    fn test_search_free_text_matches_both() {
        let (index, _temp) = create_test_index(&sample_articles());
        let query = build_query("rocket", None).unwrap();

        let results = index.search(&query, SearchLimit::default()).unwrap();
        let mut ids: Vec<_> = results.iter().map(|r| r.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["a1", "a2"]);
    }

    #[test]
    fn test_tag_filter_is_exact_phrase() {
        let (index, _temp) = create_test_index(&sample_articles());
        let query = build_query("", Some("food")).unwrap();

        let results = index.search(&query, SearchLimit::default()).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "a2");
    }

    #[test]
    fn test_no_matches_is_empty_not_error() {
        let (index, _temp) = create_test_index(&sample_articles());
        let query = build_query("submarine", None).unwrap();
        assert!(index
            .search(&query, SearchLimit::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_limit_caps_results_in_rank_order() {
        let contents = [
            "engine filler filler filler filler filler",
            "engine engine engine engine filler filler",
            "engine engine filler filler filler filler",
            "engine engine engine filler filler filler",
            "engine filler filler filler filler filler",
        ];
        let ids = ["e1", "e4", "e2", "e3", "e5"];
        let articles: Vec<_> = ids
            .iter()
            .zip(contents.iter())
            .map(|(id, content)| NewArticle {
                id: *id,
                title: "Engines",
                path: "engines",
                content: *content,
                ..Default::default()
            })
            .collect();
        let (index, _temp) = create_test_index(&articles);
        let query = build_query("engine", None).unwrap();

        let results = index.search(&query, SearchLimit::clamped(3)).unwrap();
        let ranked: Vec<_> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ranked, vec!["e4", "e3", "e2"]);
    }

    #[test]
    fn test_snippet_truncates_with_ellipsis() {
        let long_content = format!(
            "{} rocket {}",
            "lead ".repeat(40).trim_end(),
            "tail ".repeat(40).trim_end()
        );
        let articles = [NewArticle {
            id: "long",
            title: "Long",
            path: "long",
            content: &long_content,
            ..Default::default()
        }];
        let (index, _temp) = create_test_index(&articles);
        let query = build_query("rocket", None).unwrap();

        let results = index.search(&query, SearchLimit::default()).unwrap();
        let snippet = &results[0].snippet;
        assert!(snippet.contains("<b>rocket</b>"));
        assert!(snippet.starts_with(" ... ") || snippet.ends_with(" ... "), "{}", snippet);
        assert!(snippet.split_whitespace().count() < 40);
    }

    #[test]
    fn test_malformed_tags_pass_through() {
        let (index, _temp) = create_test_index(&sample_articles());
        {
            let conn = Connection::open(index.db_path()).unwrap();
            conn.execute(
                "UPDATE articles SET tags = 'space, science' WHERE id = 'a1'",
                [],
            )
            .unwrap();
            conn.execute("UPDATE articles SET tags = NULL WHERE id = 'a2'", [])
                .unwrap();
        }

        let query = build_query("rocket", None).unwrap();
        let results = index.search(&query, SearchLimit::default()).unwrap();
        assert_eq!(results.len(), 2);

        let a1 = results.iter().find(|r| r.id == "a1").unwrap();
        assert_eq!(a1.tags, Some(ArticleTags::Raw("space, science".to_string())));
        let a2 = results.iter().find(|r| r.id == "a2").unwrap();
        assert_eq!(a2.tags, None);
    }

    #[test]
    fn test_malformed_query_is_query_error() {
        let (index, _temp) = create_test_index(&sample_articles());
        let query = build_query("\"unterminated", None).unwrap();

        let err = index.search(&query, SearchLimit::default()).unwrap_err();
        assert!(matches!(err, SearchError::Query { .. }));
    }

    #[test]
    fn test_missing_file_is_query_error() {
        let temp = TempDir::new().unwrap();
        let index = ArticleIndex::new(temp.path().join("absent.sqlite"));
        let query = build_query("rocket", None).unwrap();

        let err = index.search(&query, SearchLimit::default()).unwrap_err();
        assert!(matches!(err, SearchError::Query { .. }));
    }

    #[test]
    fn test_corrupt_file_is_query_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("corrupt.sqlite");
        std::fs::write(&path, b"definitely not a sqlite database, just bytes").unwrap();
        let index = ArticleIndex::new(path);
        let query = build_query("rocket", None).unwrap();

        let err = index.search(&query, SearchLimit::default()).unwrap_err();
        assert!(matches!(err, SearchError::Query { .. }));
    }

    #[test]
    fn test_article_count() {
        let (index, _temp) = create_test_index(&sample_articles());
        assert_eq!(index.article_count().unwrap(), 2);
    }

    #[test]
    fn test_article_count_rejects_foreign_layout() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("other.sqlite");
        Connection::open(&path)
            .unwrap()
            .execute("CREATE TABLE models (id TEXT)", [])
            .unwrap();

        let err = ArticleIndex::new(path).article_count().unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_tags_require_string_array() {
        assert_eq!(
            ArticleTags::from_stored(r#"["space","science"]"#.to_string()),
            ArticleTags::Decoded(vec!["space".into(), "science".into()])
        );
        assert_eq!(
            ArticleTags::from_stored("[1,2]".to_string()),
            ArticleTags::Raw("[1,2]".to_string())
        );
        assert_eq!(
            ArticleTags::from_stored(r#""space""#.to_string()),
            ArticleTags::Raw(r#""space""#.to_string())
        );
        assert_eq!(
            serde_json::to_value(ArticleTags::from_stored("[1,2]".to_string())).unwrap(),
            serde_json::json!("[1,2]")
        );
    }

    #[test]
    fn test_tags_serialization_shapes() {
        let decoded = serde_json::to_value(ArticleTags::Decoded(vec!["a".into()])).unwrap();
        assert_eq!(decoded, serde_json::json!(["a"]));
        let raw = serde_json::to_value(ArticleTags::Raw("a;b".into())).unwrap();
        assert_eq!(raw, serde_json::json!("a;b"));
    }
}
