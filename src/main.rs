//! Command-line front end for the book review catalog. Every command prints
//! its result as pretty JSON.

use anyhow::Result;
use book_review::reviews::{self, ReviewDraft};
use book_review::settings::{self, Settings};
use book_review::{catalog, db, BookListKind};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "book-review", version, about = "Browse, search and review books")]
struct Cli {
    /// Path to the catalog database
    #[arg(long, env = "BOOK_REVIEW_DB", default_value = "book_review.db")]
    db: PathBuf,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import books from a JSON catalog file
    Import { file: PathBuf },
    /// Show books that are not published yet
    Index,
    /// List published books (recent, popular, best_rated)
    List {
        kind: BookListKind,
        #[arg(long)]
        page: Option<String>,
    },
    /// Show a book with its reviews
    Book {
        id: String,
        slug: String,
        /// Reviewer whose own review is listed first
        #[arg(long)]
        viewer: Option<String>,
        #[arg(long)]
        page: Option<String>,
    },
    /// Search books by title, author, genre or year
    Search {
        query: String,
        /// book, author, genre, year or any
        #[arg(short, long, default_value = "any")]
        category: String,
        #[arg(long)]
        page: Option<String>,
    },
    /// Write, edit or delete a review
    Review {
        #[command(subcommand)]
        action: ReviewAction,
    },
    /// List the reviews written by one owner
    MyReviews {
        owner: String,
        #[arg(long)]
        page: Option<String>,
    },
    /// Show or change page sizes
    Settings {
        #[arg(long)]
        page_size: Option<u32>,
        #[arg(long)]
        review_page_size: Option<u32>,
        #[arg(long)]
        my_reviews_page_size: Option<u32>,
    },
}

#[derive(Subcommand)]
enum ReviewAction {
    Add {
        book_id: String,
        slug: String,
        owner: String,
        #[arg(long)]
        rating: i64,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        text: String,
    },
    Edit {
        book_id: String,
        slug: String,
        owner: String,
        #[arg(long)]
        rating: i64,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        text: String,
    },
    Delete {
        book_id: String,
        slug: String,
        owner: String,
    },
}

fn init_logging(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    simple_logger::SimpleLogger::new().with_level(level).init()?;
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let mut conn = db::open_db(&cli.db)?;

    match cli.command {
        Commands::Import { file } => {
            let entries = catalog::read_catalog_file(&file)?;
            print_json(&catalog::import_catalog(&mut conn, &entries)?)?;
        }
        Commands::Index => print_json(&book_review::get_index(&conn)?)?,
        Commands::List { kind, page } => {
            print_json(&book_review::list_books(&conn, kind, page.as_deref())?)?;
        }
        Commands::Book {
            id,
            slug,
            viewer,
            page,
        } => {
            let details = book_review::get_book_details(&conn, &id, &slug, viewer.as_deref(), page.as_deref())?;
            print_json(&details)?;
        }
        Commands::Search {
            query,
            category,
            page,
        } => match book_review::search_books(&conn, Some(&query), Some(&category), page.as_deref()) {
            Ok(results) => print_json(&results)?,
            Err(book_review::Error::EmptyQuery) => eprintln!("Nothing to search for."),
            Err(err) => return Err(err.into()),
        },
        Commands::Review { action } => match action {
            ReviewAction::Add {
                book_id,
                slug,
                owner,
                rating,
                title,
                text,
            } => {
                let draft = ReviewDraft { rating, title, text };
                print_json(&reviews::add_review(&conn, &book_id, &slug, &owner, &draft)?)?;
            }
            ReviewAction::Edit {
                book_id,
                slug,
                owner,
                rating,
                title,
                text,
            } => {
                let draft = ReviewDraft { rating, title, text };
                print_json(&reviews::update_review(&conn, &book_id, &slug, &owner, &draft)?)?;
            }
            ReviewAction::Delete { book_id, slug, owner } => {
                reviews::delete_review(&conn, &book_id, &slug, &owner)?;
            }
        },
        Commands::MyReviews { owner, page } => {
            print_json(&reviews::get_my_reviews(&conn, &owner, page.as_deref())?)?;
        }
        Commands::Settings {
            page_size,
            review_page_size,
            my_reviews_page_size,
        } => {
            let current = settings::get_settings(&conn)?;
            if page_size.is_some() || review_page_size.is_some() || my_reviews_page_size.is_some() {
                let updated = Settings {
                    page_size: page_size.map_or(current.page_size, |size| size as usize),
                    review_page_size: review_page_size.map_or(current.review_page_size, |size| size as usize),
                    my_reviews_page_size: my_reviews_page_size
                        .map_or(current.my_reviews_page_size, |size| size as usize),
                };
                settings::set_settings(&conn, updated)?;
                print_json(&updated)?;
            } else {
                print_json(&current)?;
            }
        }
    }

    Ok(())
}
