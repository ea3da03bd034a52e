use crate::models::BookSummary;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

static SEARCH_DEBUG_ENABLED: OnceLock<bool> = OnceLock::new();

pub const SEARCH_CATEGORIES: [&str; 5] = ["book", "author", "genre", "year", "any"];

/// Which fields a query is matched against. Tokens outside
/// [`SEARCH_CATEGORIES`] map to `Invalid`, which matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchCategory {
    Book,
    Author,
    Genre,
    Year,
    Any,
    Invalid,
}

impl SearchCategory {
    pub fn from_token(token: Option<&str>) -> Self {
        match token {
            Some("book") => Self::Book,
            Some("author") => Self::Author,
            Some("genre") => Self::Genre,
            Some("year") => Self::Year,
            Some("any") => Self::Any,
            _ => Self::Invalid,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Book => "book",
            Self::Author => "author",
            Self::Genre => "genre",
            Self::Year => "year",
            Self::Any => "any",
            Self::Invalid => "invalid",
        }
    }

    fn matches(&self, book: &BookSummary, needle: &str) -> bool {
        match self {
            Self::Book => title_matches(book, needle),
            Self::Author => author_matches(book, needle),
            Self::Genre => genre_matches(book, needle),
            Self::Year => year_equals(book, needle),
            Self::Any => {
                title_matches(book, needle)
                    || author_matches(book, needle)
                    || genre_matches(book, needle)
                    || year_contains(book, needle)
            }
            Self::Invalid => false,
        }
    }
}

impl fmt::Display for SearchCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn contains_folded(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

fn title_matches(book: &BookSummary, needle: &str) -> bool {
    contains_folded(&book.title, needle)
}

fn author_matches(book: &BookSummary, needle: &str) -> bool {
    book.authors.iter().any(|author| {
        contains_folded(&author.full_name(), needle) || contains_folded(&author.short_name(), needle)
    })
}

fn genre_matches(book: &BookSummary, needle: &str) -> bool {
    book.genres.iter().any(|genre| contains_folded(genre, needle))
}

fn year_text(book: &BookSummary) -> String {
    format!("{:04}", book.year())
}

// Restrictive on purpose: a "published in 1984" link must not surface titles
// that merely contain "1984".
fn year_equals(book: &BookSummary, needle: &str) -> bool {
    year_text(book) == needle
}

fn year_contains(book: &BookSummary, needle: &str) -> bool {
    year_text(book).contains(needle)
}

/// Returns the books matching `query` in `category`, each book once, ordered
/// by average rating (highest first) and then title.
pub fn search(books: &[BookSummary], query: &str, category: SearchCategory) -> Vec<BookSummary> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() || category == SearchCategory::Invalid {
        return vec![];
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let mut results: Vec<BookSummary> = Vec::new();
    for book in books {
        if category.matches(book, &needle) && seen.insert(book.id.as_str()) {
            results.push(book.clone());
        }
    }

    results.sort_by(|a, b| {
        b.average_rating
            .total_cmp(&a.average_rating)
            .then_with(|| a.title.cmp(&b.title))
    });

    if search_debug_enabled() {
        log::info!(
            "[search-debug] query=\"{}\" category={} scanned={} hits={}",
            query,
            category,
            books.len(),
            results.len()
        );
    }
    results
}

fn search_debug_enabled() -> bool {
    *SEARCH_DEBUG_ENABLED.get_or_init(|| {
        debug_flag_set(std::env::var("BOOK_REVIEW_SEARCH_DEBUG").ok().as_deref())
    })
}

fn debug_flag_set(value: Option<&str>) -> bool {
    value.is_some_and(|value| {
        matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

#[cfg(test)]
mod tests {
    use super::{debug_flag_set, search, SearchCategory, SEARCH_CATEGORIES};
    use crate::models::{AuthorName, BookSummary};
    use chrono::NaiveDate;

    fn author(first: &str, patronymic: &str, last: &str) -> AuthorName {
        AuthorName {
            first_name: first.to_string(),
            patronymic: patronymic.to_string(),
            last_name: last.to_string(),
        }
    }

    fn book(
        id: &str,
        title: &str,
        year: i32,
        authors: Vec<AuthorName>,
        genres: &[&str],
        average_rating: f64,
    ) -> BookSummary {
        BookSummary {
            id: id.to_string(),
            title: title.to_string(),
            slug: title.to_lowercase().replace(' ', "-"),
            language: "English".to_string(),
            pub_date: NaiveDate::from_ymd_opt(year, 6, 1).expect("valid date"),
            authors,
            genres: genres.iter().map(|genre| genre.to_string()).collect(),
            average_rating,
            review_count: if average_rating > 0.0 { 1 } else { 0 },
        }
    }

    fn library() -> Vec<BookSummary> {
        vec![
            book(
                "1",
                "Nineteen Eighty-Four",
                1949,
                vec![author("George", "", "Orwell")],
                &["Dystopia", "Political fiction"],
                4.5,
            ),
            book(
                "2",
                "Crime and Punishment",
                1866,
                vec![author("Fyodor", "Mikhailovich", "Dostoevsky")],
                &["Philosophical fiction"],
                4.8,
            ),
            book(
                "3",
                "Animal Farm",
                1945,
                vec![author("George", "", "Orwell")],
                &["Satire", "Political fiction"],
                4.5,
            ),
            book(
                "4",
                "1984 Revisited",
                2019,
                vec![author("Anna", "", "Smith"), author("George", "", "Lowell")],
                &["Essays"],
                0.0,
            ),
            book(
                "5",
                "The Idiot",
                1869,
                vec![author("Fyodor", "Mikhailovich", "Dostoevsky")],
                &["Philosophical fiction", "Romance"],
                3.0,
            ),
        ]
    }

    fn ids(results: &[BookSummary]) -> Vec<&str> {
        results.iter().map(|book| book.id.as_str()).collect()
    }

    #[test]
    fn category_tokens_round_trip() {
        for token in SEARCH_CATEGORIES {
            assert_eq!(SearchCategory::from_token(Some(token)).as_str(), token);
        }
        assert_eq!(SearchCategory::from_token(Some("Book")), SearchCategory::Invalid);
        assert_eq!(SearchCategory::from_token(None), SearchCategory::Invalid);
    }

    #[test]
    fn book_category_matches_title_case_insensitively() {
        let results = search(&library(), "ANIMAL", SearchCategory::Book);
        assert_eq!(ids(&results), vec!["3"]);
    }

    #[test]
    fn author_category_matches_full_and_short_names() {
        let books = library();
        let by_full = search(&books, "mikhailovich dost", SearchCategory::Author);
        assert_eq!(ids(&by_full), vec!["2", "5"]);

        let by_short = search(&books, "fyodor dostoevsky", SearchCategory::Author);
        assert_eq!(ids(&by_short), vec!["2", "5"]);
    }

    #[test]
    fn author_category_folds_cyrillic_case() {
        let mut books = library();
        books.push(book(
            "6",
            "Бесы",
            1872,
            vec![author("Фёдор", "Михайлович", "Достоевский")],
            &["Роман"],
            4.0,
        ));
        let results = search(&books, "ДОСТОЕВСКИЙ", SearchCategory::Author);
        assert_eq!(ids(&results), vec!["6"]);

        let results = search(&books, "фёдор достоевский", SearchCategory::Any);
        assert_eq!(ids(&results), vec!["6"]);
    }

    #[test]
    fn multiple_matching_authors_yield_one_result() {
        let results = search(&library(), "george", SearchCategory::Author);
        assert_eq!(ids(&results), vec!["3", "1", "4"]);
    }

    #[test]
    fn genre_category_matches_any_genre() {
        let results = search(&library(), "political", SearchCategory::Genre);
        assert_eq!(ids(&results), vec!["3", "1"]);
    }

    #[test]
    fn year_category_is_exact() {
        let books = library();
        assert_eq!(ids(&search(&books, "1949", SearchCategory::Year)), vec!["1"]);
        assert!(search(&books, "194", SearchCategory::Year).is_empty());
        assert!(search(&books, "1984", SearchCategory::Year).is_empty());
    }

    #[test]
    fn any_category_unions_every_matcher() {
        let books = library();
        let any = search(&books, "1984", SearchCategory::Any);
        assert_eq!(ids(&any), vec!["4"]);

        let partial_year = search(&books, "194", SearchCategory::Any);
        assert_eq!(ids(&partial_year), vec!["3", "1"]);

        for query in ["george", "fiction", "the", "18", "o"] {
            let any = search(&books, query, SearchCategory::Any);
            for category in [
                SearchCategory::Book,
                SearchCategory::Author,
                SearchCategory::Genre,
                SearchCategory::Year,
            ] {
                for hit in search(&books, query, category) {
                    assert!(any.iter().any(|book| book.id == hit.id), "{query} {category}");
                }
            }
        }
    }

    #[test]
    fn results_are_ordered_by_rating_then_title() {
        let results = search(&library(), "o", SearchCategory::Any);
        for pair in results.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(
                a.average_rating > b.average_rating
                    || (a.average_rating == b.average_rating && a.title <= b.title)
            );
        }
    }

    #[test]
    fn duplicate_input_rows_are_collapsed() {
        let mut books = library();
        books.push(books[0].clone());
        let results = search(&books, "eighty", SearchCategory::Any);
        assert_eq!(ids(&results), vec!["1"]);
    }

    #[test]
    fn debug_flag_accepts_truthy_values() {
        for value in ["1", "true", "TRUE", " yes ", "on"] {
            assert!(debug_flag_set(Some(value)), "{value}");
        }
        for value in ["", "0", "false", "off", "enabled"] {
            assert!(!debug_flag_set(Some(value)), "{value}");
        }
        assert!(!debug_flag_set(None));
    }

    #[test]
    fn invalid_category_and_blank_query_return_nothing() {
        let books = library();
        assert!(search(&books, "orwell", SearchCategory::Invalid).is_empty());
        assert!(search(&books, "", SearchCategory::Any).is_empty());
        assert!(search(&books, "   ", SearchCategory::Book).is_empty());
    }
}
