use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;
use std::str::FromStr;

pub mod catalog;
pub mod db;
pub mod error;
pub mod models;
pub mod pagination;
pub mod reviews;
pub mod search;
pub mod settings;

pub use error::{Error, Result};

use catalog::{find_book, load_book_summaries, query_summaries, PublicationFilter, SummaryOrder};
use models::{BookSummary, Review};
use pagination::{paginate, Page};
use search::SearchCategory;
use settings::get_settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BookListKind {
  Recent,
  Popular,
  BestRated,
}

impl FromStr for BookListKind {
  type Err = Error;

  fn from_str(value: &str) -> Result<Self> {
    match value {
      "recent" => Ok(Self::Recent),
      "popular" => Ok(Self::Popular),
      "best_rated" => Ok(Self::BestRated),
      other => Err(Error::InvalidArgument(format!(
        "unknown book list {:?}, expected recent, popular or best_rated",
        other
      ))),
    }
  }
}

impl BookListKind {
  fn order(&self) -> SummaryOrder {
    match self {
      Self::Recent => SummaryOrder::NewestFirst,
      Self::Popular => SummaryOrder::MostReviewed,
      Self::BestRated => SummaryOrder::BestRated,
    }
  }
}

#[derive(Serialize)]
pub struct BookDetails {
  pub book: BookSummary,
  pub can_review: bool,
  pub reviews: Page<Review>,
}

#[derive(Serialize)]
pub struct SearchPage {
  pub query: String,
  pub category: SearchCategory,
  pub results: Page<BookSummary>,
}

fn today() -> NaiveDate {
  chrono::Local::now().date_naive()
}

/// Books that are not out yet, soonest first.
pub fn get_index(conn: &Connection) -> Result<Vec<BookSummary>> {
  query_summaries(conn, PublicationFilter::AnticipatedAfter(today()), SummaryOrder::OldestFirst)
}

pub fn list_books(conn: &Connection, kind: BookListKind, requested_page: Option<&str>) -> Result<Page<BookSummary>> {
  let books = query_summaries(conn, PublicationFilter::PublishedBy(today()), kind.order())?;
  let settings = get_settings(conn)?;
  Ok(paginate(books, settings.page_size, requested_page))
}

pub fn get_book_details(
  conn: &Connection,
  book_id: &str,
  slug: &str,
  viewer: Option<&str>,
  requested_page: Option<&str>,
) -> Result<BookDetails> {
  let book = find_book(conn, book_id, slug)?;

  let reviews = reviews::book_reviews(conn, book_id, viewer)?;
  let already_reviewed = viewer.is_some_and(|viewer| reviews.iter().any(|review| review.owner == viewer));
  let can_review = viewer.is_some() && book.is_published(today()) && !already_reviewed;

  let settings = get_settings(conn)?;
  Ok(BookDetails {
    book,
    can_review,
    reviews: paginate(reviews, settings.review_page_size, requested_page),
  })
}

/// Runs a search over the whole catalog. A blank query is reported as
/// `Error::EmptyQuery` so callers can render their own empty state.
pub fn search_books(
  conn: &Connection,
  query: Option<&str>,
  category: Option<&str>,
  requested_page: Option<&str>,
) -> Result<SearchPage> {
  let query = query.map(str::trim).unwrap_or_default();
  if query.is_empty() {
    return Err(Error::EmptyQuery);
  }
  let category = SearchCategory::from_token(category);
  let books = load_book_summaries(conn)?;
  let results = search::search(&books, query, category);
  if category == SearchCategory::Invalid {
    log::warn!("search with unknown category, query \"{}\"", query);
  }

  let settings = get_settings(conn)?;
  Ok(SearchPage {
    query: query.to_string(),
    category,
    results: paginate(results, settings.page_size, requested_page),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::catalog::tests::{book_id, entry, seeded};
  use crate::catalog::{import_catalog, slugify};
  use crate::reviews::{add_review, ReviewDraft};
  use crate::settings::{set_settings, Settings};

  fn review(conn: &Connection, title: &str, owner: &str, rating: i64) {
    let id = book_id(conn, title);
    let draft = ReviewDraft {
      rating,
      title: format!("{} on {}", owner, title),
      text: String::new(),
    };
    add_review(conn, &id, &slugify(title), owner, &draft).expect("review");
  }

  fn titles(books: &[BookSummary]) -> Vec<&str> {
    books.iter().map(|book| book.title.as_str()).collect()
  }

  #[test]
  fn list_kind_tokens() {
    assert_eq!("recent".parse::<BookListKind>().expect("kind"), BookListKind::Recent);
    assert_eq!("best_rated".parse::<BookListKind>().expect("kind"), BookListKind::BestRated);
    let err = "oldest".parse::<BookListKind>().expect_err("unknown kind");
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert!(!err.to_string().contains("not found"));
  }

  #[test]
  fn index_lists_anticipated_books_only() {
    let conn = seeded();
    assert_eq!(titles(&get_index(&conn).expect("index")), vec!["The Far Future"]);
  }

  #[test]
  fn book_lists_use_their_ordering() {
    let conn = seeded();
    review(&conn, "Animal Farm", "anna", 3);
    review(&conn, "Animal Farm", "boris", 3);
    review(&conn, "Crime and Punishment", "anna", 5);

    let recent = list_books(&conn, BookListKind::Recent, None).expect("recent");
    assert_eq!(
      titles(&recent.items),
      vec!["Nineteen Eighty-Four", "Animal Farm", "Crime and Punishment"]
    );

    let popular = list_books(&conn, BookListKind::Popular, None).expect("popular");
    assert_eq!(
      titles(&popular.items),
      vec!["Animal Farm", "Crime and Punishment", "Nineteen Eighty-Four"]
    );

    let best = list_books(&conn, BookListKind::BestRated, None).expect("best");
    assert_eq!(
      titles(&best.items),
      vec!["Crime and Punishment", "Animal Farm", "Nineteen Eighty-Four"]
    );
  }

  #[test]
  fn book_lists_respect_page_size_setting() {
    let mut conn = seeded();
    let extra: Vec<_> = (1..=20)
      .map(|n| entry(&format!("Volume {:02}", n), "1990-01-01", &[("Anna", "", "Smith")], &["Essays"]))
      .collect();
    import_catalog(&mut conn, &extra).expect("import");
    set_settings(
      &conn,
      Settings {
        page_size: 3,
        ..Settings::default()
      },
    )
    .expect("settings");

    let page = list_books(&conn, BookListKind::Recent, Some("4")).expect("page");
    assert_eq!(page.count, 23);
    assert_eq!(page.num_pages, 8);
    assert_eq!(page.items.len(), 3);
    assert!(page.window.leading_gap && page.window.trailing_gap);
    assert_eq!(page.window.page_numbers, vec![2, 3, 4, 5, 6]);
  }

  #[test]
  fn details_require_matching_slug() {
    let conn = seeded();
    let id = book_id(&conn, "Animal Farm");
    assert!(get_book_details(&conn, &id, "animal-farm", None, None).is_ok());
    assert!(matches!(
      get_book_details(&conn, &id, "wrong-slug", None, None),
      Err(Error::NotFound(_))
    ));
  }

  #[test]
  fn details_put_viewer_review_first_and_gate_reviewing() {
    let conn = seeded();
    for owner in ["anna", "boris", "clara"] {
      review(&conn, "Animal Farm", owner, 4);
    }
    let id = book_id(&conn, "Animal Farm");

    let details = get_book_details(&conn, &id, "animal-farm", Some("clara"), None).expect("details");
    assert_eq!(details.reviews.items[0].owner, "clara");
    assert_eq!(details.reviews.items.len(), 2);
    assert_eq!(details.reviews.num_pages, 2);
    assert!(!details.can_review);
    assert_eq!(details.book.review_count, 3);

    let newcomer = get_book_details(&conn, &id, "animal-farm", Some("dmitri"), None).expect("details");
    assert!(newcomer.can_review);

    let future = book_id(&conn, "The Far Future");
    let upcoming = get_book_details(&conn, &future, "the-far-future", Some("dmitri"), None).expect("details");
    assert!(!upcoming.can_review);
  }

  #[test]
  fn details_serialize_with_snake_case_keys() {
    let conn = seeded();
    review(&conn, "Animal Farm", "anna", 4);
    let id = book_id(&conn, "Animal Farm");
    let details = get_book_details(&conn, &id, "animal-farm", Some("boris"), None).expect("details");

    let json = serde_json::to_value(&details).expect("json");
    assert_eq!(json["can_review"], true);
    assert_eq!(json["book"]["review_count"], 1);
    assert_eq!(json["reviews"]["has_previous"], false);
    assert!(json.get("canReview").is_none());

    let page = search_books(&conn, Some("orwell"), Some("author"), None).expect("search");
    let json = serde_json::to_value(&page).expect("json");
    assert_eq!(json["category"], "author");
    assert_eq!(json["results"]["num_pages"], 1);
  }

  #[test]
  fn search_requires_a_query() {
    let conn = seeded();
    assert!(matches!(search_books(&conn, None, Some("any"), None), Err(Error::EmptyQuery)));
    assert!(matches!(search_books(&conn, Some("  "), Some("any"), None), Err(Error::EmptyQuery)));
  }

  #[test]
  fn search_ranks_by_current_ratings() {
    let conn = seeded();
    review(&conn, "Nineteen Eighty-Four", "anna", 5);
    review(&conn, "Animal Farm", "anna", 2);

    let page = search_books(&conn, Some(" orwell "), Some("author"), None).expect("search");
    assert_eq!(page.query, "orwell");
    assert_eq!(page.category, SearchCategory::Author);
    assert_eq!(titles(&page.results.items), vec!["Nineteen Eighty-Four", "Animal Farm"]);

    let by_year = search_books(&conn, Some("1945"), Some("year"), None).expect("search");
    assert_eq!(titles(&by_year.results.items), vec!["Animal Farm"]);
  }

  #[test]
  fn unknown_category_yields_empty_page() {
    let conn = seeded();
    let page = search_books(&conn, Some("orwell"), Some("publisher"), None).expect("search");
    assert_eq!(page.category, SearchCategory::Invalid);
    assert!(page.results.items.is_empty());
    assert_eq!(page.results.num_pages, 1);
  }
}
