//! # Pagination
//!
//! [`PageRequest`] selects a slice of a search result; [`Page`] carries the
//! slice together with the total hit count so callers can walk the whole
//! result set with [`Page::next_page_request`] until [`Page::is_last`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::MahutaError;

/// Default page size used by the HTTP surface.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SortDirection {
    type Err = MahutaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ASC" => Ok(Self::Asc),
            "DESC" => Ok(Self::Desc),
            other => Err(MahutaError::Validation(format!(
                "invalid sort direction '{other}', expected ASC or DESC"
            ))),
        }
    }
}

/// Page selection: zero-based page number, positive page size, optional sort.
///
/// Deserialization goes through [`PageRequest::sorted`], so a zero size is
/// rejected on the wire as well.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPageRequest")]
pub struct PageRequest {
    page: usize,
    size: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sort: Option<String>,
    #[serde(default)]
    direction: SortDirection,
}

impl PageRequest {
    /// Page `page` of `size` elements, unsorted.
    ///
    /// # Errors
    ///
    /// Returns [`MahutaError::Validation`] when `size` is zero.
    pub fn of(page: usize, size: usize) -> Result<Self, MahutaError> {
        if size == 0 {
            return Err(MahutaError::Validation(
                "page size must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            page,
            size,
            sort: None,
            direction: SortDirection::Asc,
        })
    }

    /// Page `page` of `size` elements, sorted on `sort`.
    pub fn sorted(
        page: usize,
        size: usize,
        sort: impl Into<String>,
        direction: SortDirection,
    ) -> Result<Self, MahutaError> {
        let mut request = Self::of(page, size)?;
        let sort = sort.into();
        request.sort = (!sort.trim().is_empty()).then_some(sort);
        request.direction = direction;
        Ok(request)
    }

    /// The first page holding a single element; used for lookups by content id.
    pub fn single_element() -> Self {
        Self {
            page: 0,
            size: 1,
            sort: None,
            direction: SortDirection::Asc,
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn sort(&self) -> Option<&str> {
        self.sort.as_deref()
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    /// Offset of the first element of this page.
    pub fn offset(&self) -> usize {
        self.page.saturating_mul(self.size)
    }

    /// Same page and sort with another size. A zero size is raised to one.
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size.max(1);
        self
    }

    /// Same size and sort, next page number.
    pub fn next(&self) -> Self {
        Self {
            page: self.page + 1,
            ..self.clone()
        }
    }
}

#[derive(Deserialize)]
struct RawPageRequest {
    page: usize,
    size: usize,
    #[serde(default)]
    sort: Option<String>,
    #[serde(default)]
    direction: SortDirection,
}

impl TryFrom<RawPageRequest> for PageRequest {
    type Error = MahutaError;

    fn try_from(raw: RawPageRequest) -> Result<Self, Self::Error> {
        match raw.sort {
            Some(sort) => Self::sorted(raw.page, raw.size, sort, raw.direction),
            None => {
                let mut request = Self::of(raw.page, raw.size)?;
                request.direction = raw.direction;
                Ok(request)
            }
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            sort: None,
            direction: SortDirection::Asc,
        }
    }
}

/// One page of a result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(flatten)]
    page_request: PageRequest,
    elements: Vec<T>,
    total_elements: u64,
    total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(page_request: PageRequest, elements: Vec<T>, total_elements: u64) -> Self {
        let size = page_request.size.max(1) as u64;
        let total_pages = total_elements.div_ceil(size);
        Self {
            page_request,
            elements,
            total_elements,
            total_pages,
        }
    }

    /// A page with no elements and a zero total.
    pub fn empty(page_request: PageRequest) -> Self {
        Self::new(page_request, Vec::new(), 0)
    }

    pub fn page_request(&self) -> &PageRequest {
        &self.page_request
    }

    pub fn elements(&self) -> &[T] {
        &self.elements
    }

    pub fn into_elements(self) -> Vec<T> {
        self.elements
    }

    pub fn total_elements(&self) -> u64 {
        self.total_elements
    }

    pub fn total_pages(&self) -> u64 {
        self.total_pages
    }

    /// True when the whole result set is empty.
    pub fn is_empty(&self) -> bool {
        self.total_elements == 0
    }

    pub fn is_last(&self) -> bool {
        self.page_request.page as u64 + 1 >= self.total_pages
    }

    pub fn has_next(&self) -> bool {
        !self.is_last()
    }

    pub fn next_page_request(&self) -> PageRequest {
        self.page_request.next()
    }

    /// Transform the elements, keeping pagination information.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            page_request: self.page_request,
            elements: self.elements.into_iter().map(f).collect(),
            total_elements: self.total_elements,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_size_is_rejected() {
        assert!(matches!(PageRequest::of(0, 0), Err(MahutaError::Validation(_))));
    }

    #[test]
    fn default_is_first_page_of_twenty() {
        let req = PageRequest::default();
        assert_eq!(req.page(), 0);
        assert_eq!(req.size(), 20);
        assert_eq!(req.direction(), SortDirection::Asc);
    }

    #[test]
    fn single_element_page() {
        let req = PageRequest::single_element();
        assert_eq!((req.page(), req.size()), (0, 1));
    }

    #[test]
    fn blank_sort_is_dropped() {
        let req = PageRequest::sorted(1, 10, " ", SortDirection::Desc).unwrap();
        assert_eq!(req.sort(), None);
        assert_eq!(req.direction(), SortDirection::Desc);
    }

    #[test]
    fn next_keeps_size_and_sort() {
        let req = PageRequest::sorted(2, 15, "date", SortDirection::Desc).unwrap();
        let next = req.next();
        assert_eq!(next.page(), 3);
        assert_eq!(next.size(), 15);
        assert_eq!(next.sort(), Some("date"));
        assert_eq!(next.direction(), SortDirection::Desc);
        assert_eq!(next.offset(), 45);
    }

    #[test]
    fn direction_parses_case_insensitively() {
        assert_eq!("desc".parse::<SortDirection>().unwrap(), SortDirection::Desc);
        assert_eq!("ASC".parse::<SortDirection>().unwrap(), SortDirection::Asc);
        assert!("up".parse::<SortDirection>().is_err());
    }

    #[test]
    fn empty_result_is_last_page() {
        let page: Page<u8> = Page::empty(PageRequest::default());
        assert!(page.is_empty());
        assert_eq!(page.total_pages(), 0);
        assert!(page.is_last());
        assert!(!page.has_next());
    }

    #[test]
    fn middle_page_has_next() {
        let page = Page::new(PageRequest::of(1, 10).unwrap(), vec![0u8; 10], 35);
        assert_eq!(page.total_pages(), 4);
        assert!(page.has_next());
        assert_eq!(page.next_page_request().page(), 2);
    }

    #[test]
    fn serializes_flat() {
        let page = Page::new(PageRequest::of(0, 2).unwrap(), vec!["a"], 1);
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["page"], 0);
        assert_eq!(json["size"], 2);
        assert_eq!(json["total_pages"], 1);
        assert_eq!(json["elements"], serde_json::json!(["a"]));
    }

    #[test]
    fn deserialized_zero_size_is_rejected() {
        let err = serde_json::from_value::<PageRequest>(serde_json::json!({"page": 0, "size": 0}))
            .unwrap_err();
        assert!(err.to_string().contains("page size must be greater than zero"));

        let page = serde_json::from_value::<Page<u8>>(serde_json::json!({
            "page": 1, "size": 0, "elements": [], "total_elements": 0, "total_pages": 0
        }));
        assert!(page.is_err());
    }

    #[test]
    fn deserializes_sorted_request() {
        let req: PageRequest = serde_json::from_value(serde_json::json!({
            "page": 2, "size": 5, "sort": "date", "direction": "DESC"
        }))
        .unwrap();
        assert_eq!(req, PageRequest::sorted(2, 5, "date", SortDirection::Desc).unwrap());
    }

    proptest! {
        #[test]
        fn total_pages_is_ceiling(total in 0u64..10_000, size in 1usize..500) {
            let page: Page<()> = Page::new(PageRequest::of(0, size).unwrap(), vec![], total);
            let expected = (total + size as u64 - 1) / size as u64;
            prop_assert_eq!(page.total_pages(), expected);
        }
    }
}
