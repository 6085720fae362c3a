//! Layout of the article index artifact.
//!
//! The artifact is produced by the knowledge-base build pipeline:
//!
//! - `articles(id TEXT PRIMARY KEY, title, path, summary, author, tags, metadata)`
//!   where `tags` is a JSON array of strings
//! - `article_index` FTS5 over `(content, title, summary, tags, id UNINDEXED)`
//!   where `tags` is space-joined
//!
//! The two tables join on `id`. The search path only reads; [`create_tables`]
//! and [`insert_article`] exist to build local development indexes and test
//! fixtures with the same layout.

use rusqlite::{params, Connection};
use tracing::debug;

pub const ARTICLES_TABLE: &str = "articles";
pub const SEARCH_TABLE: &str = "article_index";

/// Index of the `content` column in [`SEARCH_TABLE`], the column snippets
/// are cut from.
pub const CONTENT_COLUMN: i32 = 0;

/// An article to write into a locally built index.
#[derive(Debug, Clone, Default)]
pub struct NewArticle<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub path: &'a str,
    pub summary: &'a str,
    pub author: &'a str,
    pub tags: &'a [&'a str],
    pub content: &'a str,
}

/// Check whether both tables of the index layout exist.
pub fn tables_exist(conn: &Connection) -> rusqlite::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN (?1, ?2)",
        params![ARTICLES_TABLE, SEARCH_TABLE],
        |row| row.get(0),
    )?;
    Ok(count == 2)
}

/// Create the metadata table and the FTS5 table.
pub fn create_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {articles} (
             id TEXT PRIMARY KEY,
             title TEXT,
             path TEXT,
             summary TEXT,
             author TEXT,
             tags TEXT,
             metadata TEXT
         );
         CREATE VIRTUAL TABLE IF NOT EXISTS {search} USING fts5(
             content,
             title,
             summary,
             tags,
             id UNINDEXED,
             tokenize='unicode61 remove_diacritics 1'
         );",
        articles = ARTICLES_TABLE,
        search = SEARCH_TABLE,
    ))?;
    debug!("Created article index tables");
    Ok(())
}

/// Insert one article into both tables.
pub fn insert_article(conn: &Connection, article: &NewArticle<'_>) -> rusqlite::Result<()> {
    let tags_json = serde_json::to_string(article.tags)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

    conn.execute(
        &format!(
            "INSERT INTO {} (id, title, path, summary, author, tags, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, '{{}}')",
            ARTICLES_TABLE
        ),
        params![
            article.id,
            article.title,
            article.path,
            article.summary,
            article.author,
            tags_json
        ],
    )?;

    conn.execute(
        &format!(
            "INSERT INTO {} (content, title, summary, tags, id) VALUES (?1, ?2, ?3, ?4, ?5)",
            SEARCH_TABLE
        ),
        params![
            article.content,
            article.title,
            article.summary,
            article.tags.join(" "),
            article.id
        ],
    )?;

    Ok(())
}
