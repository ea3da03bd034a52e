use crate::error::{Error, Result};
use crate::models::{AuthorName, BookSummary, NewAuthor, NewBook};
use chrono::NaiveDate;
use regex::Regex;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

const TITLE_MAX_CHARS: usize = 80;

/// One book of a catalog import file, with its authors and genres inline.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CatalogEntry {
    pub title: String,
    pub language: String,
    pub pub_date: NaiveDate,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub authors: Vec<NewAuthor>,
    #[serde(default)]
    pub genres: Vec<String>,
}

#[derive(Debug, Serialize, Clone, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub added: u64,
    pub unchanged: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PublicationFilter {
    All,
    PublishedBy(NaiveDate),
    AnticipatedAfter(NaiveDate),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SummaryOrder {
    Title,
    OldestFirst,
    NewestFirst,
    MostReviewed,
    BestRated,
}

impl SummaryOrder {
    fn sql(&self) -> &'static str {
        match self {
            Self::Title => "books.title ASC, books.id ASC",
            Self::OldestFirst => "books.pub_date ASC, books.title ASC, books.id ASC",
            Self::NewestFirst => "books.pub_date DESC, books.title ASC, books.id ASC",
            Self::MostReviewed => "num_reviews DESC, books.title ASC, books.id ASC",
            Self::BestRated => "avg_rating DESC, books.title ASC, books.id ASC",
        }
    }
}

pub fn slugify(title: &str) -> String {
    let strip_re = Regex::new(r"[^\w\s-]").expect("valid strip regex");
    let dash_re = Regex::new(r"[-\s]+").expect("valid dash regex");
    let lowered = title.to_lowercase();
    let stripped = strip_re.replace_all(&lowered, "");
    let slug = dash_re
        .replace_all(stripped.trim(), "-")
        .trim_matches(|c: char| c == '-' || c == '_')
        .to_string();
    if slug.is_empty() {
        "book".to_string()
    } else {
        slug
    }
}

/// Inserts the author unless an identical one (same names and birth date)
/// exists, returning the author id either way.
pub fn add_author(conn: &Connection, author: &NewAuthor) -> Result<i64> {
    let first_name = author.first_name.trim();
    let patronymic = author.patronymic.trim();
    let last_name = author.last_name.trim();
    conn.execute(
        "INSERT OR IGNORE INTO authors (first_name, patronymic, last_name, born) VALUES (?1, ?2, ?3, ?4)",
        params![first_name, patronymic, last_name, author.born],
    )?;
    let id = conn.query_row(
        "SELECT id FROM authors WHERE first_name = ?1 AND patronymic = ?2 AND last_name = ?3 AND born = ?4",
        params![first_name, patronymic, last_name, author.born],
        |row| row.get(0),
    )?;
    Ok(id)
}

pub fn add_genre(conn: &Connection, name: &str) -> Result<i64> {
    let name = name.trim();
    conn.execute("INSERT OR IGNORE INTO genres (name) VALUES (?1)", params![name])?;
    let id = conn.query_row("SELECT id FROM genres WHERE name = ?1", params![name], |row| {
        row.get(0)
    })?;
    Ok(id)
}

pub fn add_book(conn: &mut Connection, book: &NewBook) -> Result<String> {
    let tx = conn.transaction()?;
    let id = insert_book(&tx, book)?;
    tx.commit()?;
    log::info!("added book {} ({})", book.title, id);
    Ok(id)
}

fn insert_book(conn: &Connection, book: &NewBook) -> Result<String> {
    let title = book.title.trim();
    if title.is_empty() {
        return Err(Error::InvalidBook("title is empty".to_string()));
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        return Err(Error::InvalidBook(format!(
            "title is longer than {} characters",
            TITLE_MAX_CHARS
        )));
    }

    let id = uuid::Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO books (id, title, slug, language, pub_date, description, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            id,
            title,
            slugify(title),
            book.language.trim(),
            book.pub_date,
            book.description,
            chrono::Utc::now().timestamp_millis()
        ],
    )?;
    for (ord, author_id) in book.author_ids.iter().enumerate() {
        conn.execute(
            "INSERT OR IGNORE INTO book_authors (book_id, author_id, ord) VALUES (?1, ?2, ?3)",
            params![id, author_id, ord as i64],
        )?;
    }
    for genre_id in &book.genre_ids {
        conn.execute(
            "INSERT OR IGNORE INTO book_genres (book_id, genre_id) VALUES (?1, ?2)",
            params![id, genre_id],
        )?;
    }
    Ok(id)
}

pub fn read_catalog_file(path: &Path) -> Result<Vec<CatalogEntry>> {
    let raw = std::fs::read_to_string(path)?;
    let entries: Vec<CatalogEntry> = serde_json::from_str(&raw)?;
    Ok(entries)
}

/// Adds every entry whose (title, date) pair is not in the catalog yet, all
/// in one transaction.
pub fn import_catalog(conn: &mut Connection, entries: &[CatalogEntry]) -> Result<ImportStats> {
    let tx = conn.transaction()?;
    let mut stats = ImportStats::default();

    for entry in entries {
        let existing: Option<String> = tx
            .query_row(
                "SELECT id FROM books WHERE title = ?1 AND pub_date = ?2",
                params![entry.title.trim(), entry.pub_date],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            stats.unchanged += 1;
            continue;
        }

        let mut author_ids = Vec::with_capacity(entry.authors.len());
        for author in &entry.authors {
            author_ids.push(add_author(&tx, author)?);
        }
        let mut genre_ids = Vec::with_capacity(entry.genres.len());
        for genre in &entry.genres {
            genre_ids.push(add_genre(&tx, genre)?);
        }
        let book = NewBook {
            title: entry.title.clone(),
            language: entry.language.clone(),
            pub_date: entry.pub_date,
            description: entry.description.clone(),
            author_ids,
            genre_ids,
        };
        insert_book(&tx, &book)?;
        stats.added += 1;
    }

    tx.commit()?;
    log::info!("catalog import complete: {:?}", stats);
    Ok(stats)
}

/// Every book with its aggregates, ordered by title.
pub fn load_book_summaries(conn: &Connection) -> Result<Vec<BookSummary>> {
    query_summaries(conn, PublicationFilter::All, SummaryOrder::Title)
}

pub fn load_book_summary(conn: &Connection, book_id: &str) -> Result<Option<BookSummary>> {
    let mut summaries = summaries_matching(
        conn,
        "WHERE books.id = ?1",
        vec![Value::Text(book_id.to_string())],
        SummaryOrder::Title,
        Some(book_id),
    )?;
    Ok(summaries.pop())
}

/// Resolves a book by id and slug; a slug that does not belong to the book is
/// treated like a missing book.
pub fn find_book(conn: &Connection, book_id: &str, slug: &str) -> Result<BookSummary> {
    load_book_summary(conn, book_id)?
        .filter(|book| book.slug == slug)
        .ok_or_else(|| Error::not_found(format!("book {}-{}", book_id, slug)))
}

pub(crate) fn query_summaries(
    conn: &Connection,
    filter: PublicationFilter,
    order: SummaryOrder,
) -> Result<Vec<BookSummary>> {
    let (where_clause, values) = match filter {
        PublicationFilter::All => ("", vec![]),
        PublicationFilter::PublishedBy(today) => (
            "WHERE books.pub_date <= ?1",
            vec![Value::Text(today.format("%Y-%m-%d").to_string())],
        ),
        PublicationFilter::AnticipatedAfter(today) => (
            "WHERE books.pub_date > ?1",
            vec![Value::Text(today.format("%Y-%m-%d").to_string())],
        ),
    };
    summaries_matching(conn, where_clause, values, order, None)
}

fn summaries_matching(
    conn: &Connection,
    where_clause: &str,
    values: Vec<Value>,
    order: SummaryOrder,
    only_book: Option<&str>,
) -> Result<Vec<BookSummary>> {
    let sql = format!(
        "SELECT books.id, books.title, books.slug, books.language, books.pub_date, \
         COUNT(reviews.id) as num_reviews, \
         COALESCE(AVG(reviews.rating), 0.0) as avg_rating \
         FROM books \
         LEFT JOIN reviews ON reviews.book_id = books.id \
         {} \
         GROUP BY books.id \
         ORDER BY {}",
        where_clause,
        order.sql()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(values), |row| {
        Ok(BookSummary {
            id: row.get(0)?,
            title: row.get(1)?,
            slug: row.get(2)?,
            language: row.get(3)?,
            pub_date: row.get(4)?,
            authors: vec![],
            genres: vec![],
            review_count: row.get(5)?,
            average_rating: row.get(6)?,
        })
    })?;

    let mut summaries = Vec::new();
    for row in rows {
        summaries.push(row?);
    }

    let mut authors = authors_by_book(conn, only_book)?;
    let mut genres = genres_by_book(conn, only_book)?;
    for summary in &mut summaries {
        summary.authors = authors.remove(&summary.id).unwrap_or_default();
        summary.genres = genres.remove(&summary.id).unwrap_or_default();
    }
    Ok(summaries)
}

fn authors_by_book(
    conn: &Connection,
    only_book: Option<&str>,
) -> Result<HashMap<String, Vec<AuthorName>>> {
    let mut stmt = conn.prepare(
        "SELECT book_authors.book_id, authors.first_name, authors.patronymic, authors.last_name \
         FROM book_authors \
         JOIN authors ON authors.id = book_authors.author_id \
         WHERE ?1 IS NULL OR book_authors.book_id = ?1 \
         ORDER BY book_authors.book_id, book_authors.ord, authors.id",
    )?;
    let rows = stmt.query_map(params![only_book], |row| {
        Ok((
            row.get::<_, String>(0)?,
            AuthorName {
                first_name: row.get(1)?,
                patronymic: row.get(2)?,
                last_name: row.get(3)?,
            },
        ))
    })?;

    let mut map: HashMap<String, Vec<AuthorName>> = HashMap::new();
    for row in rows {
        let (book_id, author) = row?;
        map.entry(book_id).or_default().push(author);
    }
    Ok(map)
}

fn genres_by_book(conn: &Connection, only_book: Option<&str>) -> Result<HashMap<String, Vec<String>>> {
    let mut stmt = conn.prepare(
        "SELECT book_genres.book_id, genres.name \
         FROM book_genres \
         JOIN genres ON genres.id = book_genres.genre_id \
         WHERE ?1 IS NULL OR book_genres.book_id = ?1 \
         ORDER BY book_genres.book_id, genres.name",
    )?;
    let rows = stmt.query_map(params![only_book], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    for row in rows {
        let (book_id, genre) = row?;
        map.entry(book_id).or_default().push(genre);
    }
    Ok(map)
}
