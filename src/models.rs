use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AuthorName {
    pub first_name: String,
    #[serde(default)]
    pub patronymic: String,
    pub last_name: String,
}

impl AuthorName {
    /// "first patronymic last", with a blank patronymic left out.
    pub fn full_name(&self) -> String {
        let patronymic = self.patronymic.trim();
        if patronymic.is_empty() {
            self.short_name()
        } else {
            format!("{} {} {}", self.first_name, patronymic, self.last_name)
        }
    }

    pub fn short_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl fmt::Display for AuthorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name())
    }
}

/// Read-only projection of a book with its review aggregates, as produced by
/// `catalog::load_book_summaries`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BookSummary {
    pub id: String, // UUID
    pub title: String,
    pub slug: String,
    pub language: String,
    pub pub_date: NaiveDate,
    pub authors: Vec<AuthorName>,
    pub genres: Vec<String>,
    pub average_rating: f64,
    pub review_count: i64,
}

impl BookSummary {
    pub fn year(&self) -> i32 {
        self.pub_date.year()
    }

    pub fn is_published(&self, today: NaiveDate) -> bool {
        self.pub_date <= today
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Review {
    pub id: String, // UUID
    pub book_id: String,
    pub owner: String,
    pub title: String,
    pub text: String,
    pub rating: i64,
    pub pub_date: NaiveDate,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NewAuthor {
    pub first_name: String,
    #[serde(default)]
    pub patronymic: String,
    pub last_name: String,
    pub born: NaiveDate,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NewBook {
    pub title: String,
    pub language: String,
    pub pub_date: NaiveDate,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author_ids: Vec<i64>,
    #[serde(default)]
    pub genre_ids: Vec<i64>,
}
