use crate::catalog::find_book;
use crate::error::{Error, Result};
use crate::models::Review;
use crate::pagination::{paginate, Page};
use crate::settings::get_settings;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

const REVIEW_TITLE_MAX_CHARS: usize = 60;
const REVIEW_TEXT_MAX_CHARS: usize = 8192;

const REVIEW_COLUMNS: &str = "id, book_id, owner, title, text, rating, pub_date";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReviewDraft {
    pub rating: i64,
    pub title: String,
    pub text: String,
}

impl ReviewDraft {
    pub fn validate(&self) -> Result<()> {
        if !(1..=5).contains(&self.rating) {
            return Err(Error::InvalidRating(self.rating));
        }
        let title = self.title.trim();
        if title.is_empty() {
            return Err(Error::InvalidReview("title is empty".to_string()));
        }
        if title.chars().count() > REVIEW_TITLE_MAX_CHARS {
            return Err(Error::InvalidReview(format!(
                "title is longer than {} characters",
                REVIEW_TITLE_MAX_CHARS
            )));
        }
        if self.text.chars().count() > REVIEW_TEXT_MAX_CHARS {
            return Err(Error::InvalidReview(format!(
                "text is longer than {} characters",
                REVIEW_TEXT_MAX_CHARS
            )));
        }
        Ok(())
    }
}

fn review_from_row(row: &Row<'_>) -> rusqlite::Result<Review> {
    Ok(Review {
        id: row.get(0)?,
        book_id: row.get(1)?,
        owner: row.get(2)?,
        title: row.get(3)?,
        text: row.get(4)?,
        rating: row.get(5)?,
        pub_date: row.get(6)?,
    })
}

pub fn find_review(conn: &Connection, book_id: &str, owner: &str) -> Result<Option<Review>> {
    let review = conn
        .query_row(
            &format!("SELECT {} FROM reviews WHERE book_id = ?1 AND owner = ?2", REVIEW_COLUMNS),
            params![book_id, owner],
            review_from_row,
        )
        .optional()?;
    Ok(review)
}

fn require_review(conn: &Connection, book_id: &str, owner: &str) -> Result<Review> {
    find_review(conn, book_id, owner)?
        .ok_or_else(|| Error::not_found(format!("review of book {} by {}", book_id, owner)))
}

fn insert_review(conn: &Connection, review: &Review) -> Result<()> {
    let inserted = conn.execute(
        "INSERT INTO reviews (id, book_id, owner, title, text, rating, pub_date, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            review.id,
            review.book_id,
            review.owner,
            review.title,
            review.text,
            review.rating,
            review.pub_date,
            chrono::Utc::now().timestamp_millis()
        ],
    );
    match inserted {
        Ok(_) => Ok(()),
        // A concurrent writer can slip in between the lookup and the insert.
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == ErrorCode::ConstraintViolation
                && err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            Err(Error::AlreadyReviewed {
                book_id: review.book_id.clone(),
                owner: review.owner.clone(),
            })
        }
        Err(err) => Err(err.into()),
    }
}

/// Adds `owner`'s review of a published book. Each owner reviews a book at
/// most once.
pub fn add_review(
    conn: &Connection,
    book_id: &str,
    slug: &str,
    owner: &str,
    draft: &ReviewDraft,
) -> Result<Review> {
    draft.validate()?;
    let book = find_book(conn, book_id, slug)?;
    let today = chrono::Local::now().date_naive();
    if !book.is_published(today) {
        return Err(Error::NotPublished(book_id.to_string()));
    }
    if find_review(conn, book_id, owner)?.is_some() {
        return Err(Error::AlreadyReviewed {
            book_id: book_id.to_string(),
            owner: owner.to_string(),
        });
    }

    let review = Review {
        id: uuid::Uuid::new_v4().to_string(),
        book_id: book_id.to_string(),
        owner: owner.to_string(),
        title: draft.title.trim().to_string(),
        text: draft.text.clone(),
        rating: draft.rating,
        pub_date: today,
    };
    insert_review(conn, &review)?;
    log::info!("review {} added for book {} by {}", review.id, book_id, owner);
    Ok(review)
}

pub fn update_review(
    conn: &Connection,
    book_id: &str,
    slug: &str,
    owner: &str,
    draft: &ReviewDraft,
) -> Result<Review> {
    draft.validate()?;
    find_book(conn, book_id, slug)?;
    let existing = require_review(conn, book_id, owner)?;
    let today = chrono::Local::now().date_naive();
    conn.execute(
        "UPDATE reviews SET title = ?1, text = ?2, rating = ?3, pub_date = ?4, updated_at = ?5 WHERE id = ?6",
        params![
            draft.title.trim(),
            draft.text,
            draft.rating,
            today,
            chrono::Utc::now().timestamp_millis(),
            existing.id
        ],
    )?;
    log::info!("review {} updated for book {} by {}", existing.id, book_id, owner);
    Ok(Review {
        title: draft.title.trim().to_string(),
        text: draft.text.clone(),
        rating: draft.rating,
        pub_date: today,
        ..existing
    })
}

pub fn delete_review(conn: &Connection, book_id: &str, slug: &str, owner: &str) -> Result<()> {
    find_book(conn, book_id, slug)?;
    let existing = require_review(conn, book_id, owner)?;
    conn.execute("DELETE FROM reviews WHERE id = ?1", params![existing.id])?;
    log::info!("review {} deleted for book {} by {}", existing.id, book_id, owner);
    Ok(())
}

/// Reviews of a book, newest first, with `viewer`'s own review moved to the
/// front.
pub fn book_reviews(conn: &Connection, book_id: &str, viewer: Option<&str>) -> Result<Vec<Review>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM reviews WHERE book_id = ?1 ORDER BY pub_date DESC, updated_at DESC, id ASC",
        REVIEW_COLUMNS
    ))?;
    let rows = stmt.query_map(params![book_id], review_from_row)?;

    let mut own = Vec::new();
    let mut others = Vec::new();
    for row in rows {
        let review = row?;
        if viewer.is_some_and(|viewer| viewer == review.owner) {
            own.push(review);
        } else {
            others.push(review);
        }
    }
    own.extend(others);
    Ok(own)
}

pub fn get_my_reviews(conn: &Connection, owner: &str, requested_page: Option<&str>) -> Result<Page<Review>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM reviews WHERE owner = ?1 ORDER BY pub_date DESC, title ASC, id ASC",
        REVIEW_COLUMNS
    ))?;
    let rows = stmt.query_map(params![owner], review_from_row)?;
    let mut reviews = Vec::new();
    for row in rows {
        reviews.push(row?);
    }
    let settings = get_settings(conn)?;
    Ok(paginate(reviews, settings.my_reviews_page_size, requested_page))
}
