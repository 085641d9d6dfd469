use serde::Serialize;

/// Posts per listing page
pub const PAGE_SIZE: i64 = 8;

/// A 1-based page position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRequest {
    Number(i64),
    Last,
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest::Number(1)
    }
}

impl PageRequest {
    /// Parse the `?page=` query value. A missing value is page 1; `last` is the
    /// final page; anything else must be an integer.
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        match raw.map(str::trim) {
            None | Some("") => Some(PageRequest::Number(1)),
            Some("last") => Some(PageRequest::Last),
            Some(value) => value.parse::<i64>().ok().map(PageRequest::Number),
        }
    }

    /// Concrete page number once the total row count is known.
    pub fn resolve(self, total: i64) -> i64 {
        match self {
            PageRequest::Number(n) => n,
            PageRequest::Last => num_pages(total),
        }
    }

    pub fn offset(number: i64) -> i64 {
        (number.max(1) - 1) * PAGE_SIZE
    }
}

/// Number of pages for `total` rows; an empty listing still has one page.
pub fn num_pages(total: i64) -> i64 {
    if total <= 0 {
        1
    } else {
        (total + PAGE_SIZE - 1) / PAGE_SIZE
    }
}

/// One page of a listing
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: i64,
    pub num_pages: i64,
    pub total: i64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, number: i64, total: i64) -> Self {
        let num_pages = num_pages(total);
        Self {
            items,
            number,
            num_pages,
            total,
            has_next: number < num_pages,
            has_previous: number > 1,
        }
    }

    /// Whether `number` lies outside `1..=num_pages` for a listing of `total` rows.
    pub fn out_of_range(number: i64, total: i64) -> bool {
        number < 1 || number > num_pages(total)
    }
}
