use serde::Serialize;

const WINDOW_MIN_PAGES: usize = 7;
const WINDOW_WIDTH: usize = 5;
const WINDOW_OFFSET: usize = 2;

/// Page markers for a pagination control: an optional gap before and after
/// the run of page numbers.
#[derive(Debug, Serialize, Clone, PartialEq, Eq, Default)]
pub struct PageWindow {
    pub leading_gap: bool,
    pub page_numbers: Vec<usize>,
    pub trailing_gap: bool,
}

/// Plans which page numbers to show around `current_page`.
///
/// A `current_page` outside `1..=total_pages` is clamped into that range.
pub fn plan(current_page: usize, total_pages: usize) -> PageWindow {
    if total_pages < WINDOW_MIN_PAGES {
        return PageWindow {
            leading_gap: false,
            page_numbers: (1..=total_pages).collect(),
            trailing_gap: false,
        };
    }

    let current_page = current_page.clamp(1, total_pages);
    if current_page < 4 {
        PageWindow {
            leading_gap: false,
            page_numbers: (1..=WINDOW_WIDTH).collect(),
            trailing_gap: true,
        }
    } else if current_page > total_pages - 3 {
        PageWindow {
            leading_gap: true,
            page_numbers: (total_pages + 1 - WINDOW_WIDTH..=total_pages).collect(),
            trailing_gap: false,
        }
    } else {
        PageWindow {
            leading_gap: true,
            page_numbers: (current_page - WINDOW_OFFSET..=current_page + WINDOW_OFFSET).collect(),
            trailing_gap: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    count: usize,
    per_page: usize,
}

impl Paginator {
    /// `per_page` of zero is treated as one.
    pub fn new(count: usize, per_page: usize) -> Self {
        Self {
            count,
            per_page: per_page.max(1),
        }
    }

    /// An empty result set still has one (empty) page.
    pub fn num_pages(&self) -> usize {
        self.count.div_ceil(self.per_page).max(1)
    }

    /// Resolves a raw page request: missing or non-numeric gives the first
    /// page, anything out of range gives the last.
    pub fn get_page(&self, requested: Option<&str>) -> usize {
        let Some(raw) = requested else {
            return 1;
        };
        let raw = raw.trim();
        match raw.parse::<i64>() {
            Ok(number) if number >= 1 && (number as u64) <= self.num_pages() as u64 => {
                number as usize
            }
            Ok(_) => self.num_pages(),
            // Integers too wide for i64 are still out of range, not garbage.
            Err(_) if is_integer(raw) => self.num_pages(),
            Err(_) => 1,
        }
    }

    fn bounds(&self, number: usize) -> (usize, usize) {
        let start = (number - 1) * self.per_page;
        let end = (start + self.per_page).min(self.count);
        (start.min(self.count), end)
    }
}

fn is_integer(raw: &str) -> bool {
    let digits = raw.strip_prefix(|c: char| c == '+' || c == '-').unwrap_or(raw);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: usize,
    pub num_pages: usize,
    pub count: usize,
    pub has_previous: bool,
    pub has_next: bool,
    pub window: PageWindow,
}

impl<T> Page<T> {
    pub fn previous_page_number(&self) -> Option<usize> {
        self.has_previous.then(|| self.number - 1)
    }

    pub fn next_page_number(&self) -> Option<usize> {
        self.has_next.then(|| self.number + 1)
    }
}

pub fn paginate<T>(items: Vec<T>, per_page: usize, requested: Option<&str>) -> Page<T> {
    let paginator = Paginator::new(items.len(), per_page);
    let number = paginator.get_page(requested);
    let num_pages = paginator.num_pages();
    let (start, end) = paginator.bounds(number);
    let count = items.len();
    let items: Vec<T> = items.into_iter().skip(start).take(end - start).collect();
    Page {
        items,
        number,
        num_pages,
        count,
        has_previous: number > 1,
        has_next: number < num_pages,
        window: plan(number, num_pages),
    }
}
