//! Pagination types for list operations.

use serde::{Deserialize, Serialize};

use crate::sort::Sort;

/// Default page size.
pub const DEFAULT_PAGE_SIZE: u64 = 20;
/// Maximum page size.
pub const MAX_PAGE_SIZE: u64 = 2000;

/// Request parameters for paginated queries.
///
/// Deserialization goes through [`PageRequest::of`], so the size clamp holds
/// for decoded requests too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawPageRequest")]
pub struct PageRequest {
    /// Page number (0-based).
    page: u64,
    /// Number of items per page.
    size: u64,
    sort: Sort,
}

impl PageRequest {
    /// Unsorted request for page `page` (0-based) of `size` items.
    ///
    /// `size` is clamped to `1..=MAX_PAGE_SIZE`.
    pub fn of(page: u64, size: u64) -> Self {
        Self {
            page,
            size: size.clamp(1, MAX_PAGE_SIZE),
            sort: Sort::unsorted(),
        }
    }

    pub fn sorted(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn sort(&self) -> &Sort {
        &self.sort
    }

    /// Number of elements preceding this page.
    pub fn offset(&self) -> u64 {
        self.page.saturating_mul(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::of(0, DEFAULT_PAGE_SIZE)
    }
}

#[derive(Deserialize)]
struct RawPageRequest {
    #[serde(default)]
    page: u64,
    #[serde(default = "default_page_size")]
    size: u64,
    #[serde(default)]
    sort: Sort,
}

impl From<RawPageRequest> for PageRequest {
    fn from(raw: RawPageRequest) -> Self {
        Self::of(raw.page, raw.size).sorted(raw.sort)
    }
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

/// One window of a larger result set.
///
/// The content is fixed at construction; [`Page::map`] produces a new page
/// with the same window metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    content: Vec<T>,
    number: u64,
    size: u64,
    total_elements: u64,
    sort: Sort,
}

impl<T> Page<T> {
    /// Page for `request` holding `content` out of `total_elements`.
    ///
    /// Content beyond the requested size is dropped.
    pub fn new(mut content: Vec<T>, request: &PageRequest, total_elements: u64) -> Self {
        content.truncate(request.size() as usize);
        let exposed_end = request.offset().saturating_add(content.len() as u64);
        let window_end = request.offset().saturating_add(request.size());
        let total_elements = if !content.is_empty() && window_end > total_elements {
            exposed_end
        } else {
            total_elements
        };
        Self {
            content,
            number: request.page(),
            size: request.size(),
            total_elements,
            sort: request.sort().clone(),
        }
    }

    /// A single page holding everything.
    pub fn unpaged(content: Vec<T>) -> Self {
        let len = content.len() as u64;
        Self {
            content,
            number: 0,
            size: len,
            total_elements: len,
            sort: Sort::unsorted(),
        }
    }

    pub fn content(&self) -> &[T] {
        &self.content
    }

    pub fn into_content(self) -> Vec<T> {
        self.content
    }

    pub fn iter(&self) -> core::slice::Iter<'_, T> {
        self.content.iter()
    }

    /// Current page index (0-based).
    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn total_elements(&self) -> u64 {
        self.total_elements
    }

    /// `ceil(total_elements / size)`, or 1 for a zero-sized page.
    pub fn total_pages(&self) -> u64 {
        if self.size == 0 {
            1
        } else {
            self.total_elements.div_ceil(self.size)
        }
    }

    /// Elements actually present on this page.
    pub fn number_of_elements(&self) -> u64 {
        self.content.len() as u64
    }

    pub fn has_content(&self) -> bool {
        !self.content.is_empty()
    }

    pub fn is_first(&self) -> bool {
        self.number == 0
    }

    pub fn is_last(&self) -> bool {
        self.number.saturating_add(1) >= self.total_pages()
    }

    pub fn sort(&self) -> &Sort {
        &self.sort
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            number: self.number,
            size: self.size,
            total_elements: self.total_elements,
            sort: self.sort,
        }
    }
}

impl<'a, T> IntoIterator for &'a Page<T> {
    type Item = &'a T;
    type IntoIter = core::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.content.iter()
    }
}
