use crate::error::{Error, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const DEFAULT_REVIEW_PAGE_SIZE: usize = 2;
pub const DEFAULT_MY_REVIEWS_PAGE_SIZE: usize = 10;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub page_size: usize,
    pub review_page_size: usize,
    pub my_reviews_page_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            review_page_size: DEFAULT_REVIEW_PAGE_SIZE,
            my_reviews_page_size: DEFAULT_MY_REVIEWS_PAGE_SIZE,
        }
    }
}

fn positive(value: Option<i64>, fallback: usize) -> usize {
    match value {
        Some(value) if value > 0 => value as usize,
        _ => fallback,
    }
}

pub fn get_settings(conn: &Connection) -> Result<Settings> {
    let row: Option<(Option<i64>, Option<i64>, Option<i64>)> = conn
        .query_row(
            "SELECT page_size, review_page_size, my_reviews_page_size FROM settings WHERE id = 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;
    let (page_size, review_page_size, my_reviews_page_size) = row.unwrap_or((None, None, None));
    Ok(Settings {
        page_size: positive(page_size, DEFAULT_PAGE_SIZE),
        review_page_size: positive(review_page_size, DEFAULT_REVIEW_PAGE_SIZE),
        my_reviews_page_size: positive(my_reviews_page_size, DEFAULT_MY_REVIEWS_PAGE_SIZE),
    })
}

fn stored(name: &str, value: usize) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| Error::InvalidArgument(format!("{} {} is too large", name, value)))
}

pub fn set_settings(conn: &Connection, settings: Settings) -> Result<()> {
    let page_size = stored("page_size", settings.page_size)?;
    let review_page_size = stored("review_page_size", settings.review_page_size)?;
    let my_reviews_page_size = stored("my_reviews_page_size", settings.my_reviews_page_size)?;
    let now = chrono::Utc::now().timestamp_millis();
    conn.execute(
        "INSERT INTO settings (id, page_size, review_page_size, my_reviews_page_size, updated_at) \
         VALUES (1, ?1, ?2, ?3, ?4) \
         ON CONFLICT(id) DO UPDATE SET page_size = excluded.page_size, \
         review_page_size = excluded.review_page_size, \
         my_reviews_page_size = excluded.my_reviews_page_size, updated_at = excluded.updated_at",
        params![page_size, review_page_size, my_reviews_page_size, now],
    )?;
    log::info!("saved settings: {:?}", settings);
    Ok(())
}
