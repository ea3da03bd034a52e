use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0} not found")]
    NotFound(String),

    #[error("search query is empty")]
    EmptyQuery,

    #[error("{owner} has already reviewed book {book_id}")]
    AlreadyReviewed { book_id: String, owner: String },

    #[error("book {0} is not published yet")]
    NotPublished(String),

    #[error("rating must be between 1 and 5, got {0}")]
    InvalidRating(i64),

    #[error("invalid review: {0}")]
    InvalidReview(String),

    #[error("invalid book: {0}")]
    InvalidBook(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    pub(crate) fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}
