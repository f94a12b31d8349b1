//! Page model
//!
//! A bounded slice of a result set plus the total number of matching rows.

use serde::{Deserialize, Serialize};

/// Row window for a paged query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub first_result: usize,
    pub max_results: usize,
}

impl Paging {
    /// Window for a 1-based page number
    pub fn for_page(number: usize, size: usize) -> Self {
        Self {
            first_result: number.max(1).saturating_sub(1).saturating_mul(size),
            max_results: size,
        }
    }
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Rows on this page
    pub contents: Vec<T>,

    /// 1-based page number
    pub number: usize,

    /// Requested page size
    pub size: usize,

    /// Total rows matching the query across all pages
    pub total_count: usize,
}

impl<T> Page<T> {
    /// An empty page for a query that matched nothing
    pub fn empty(number: usize, size: usize) -> Self {
        Self {
            contents: Vec::new(),
            number: number.max(1),
            size,
            total_count: 0,
        }
    }

    /// A page with no contents loaded yet
    ///
    /// The number is not clamped to the last page; a number past the end
    /// simply yields no contents.
    pub fn new(total_count: usize, number: usize, size: usize) -> Self {
        Self {
            contents: Vec::new(),
            number: number.max(1),
            size,
            total_count,
        }
    }

    /// Row window this page covers
    pub fn paging(&self) -> Paging {
        Paging::for_page(self.number, self.size)
    }

    /// Number of pages needed for the total count
    pub fn page_count(&self) -> usize {
        if self.size == 0 {
            return 0;
        }
        self.total_count.div_ceil(self.size)
    }

    pub fn has_next(&self) -> bool {
        self.number < self.page_count()
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Convert the contents while keeping the paging information
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            contents: self.contents.into_iter().map(f).collect(),
            number: self.number,
            size: self.size,
            total_count: self.total_count,
        }
    }
}
