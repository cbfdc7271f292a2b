// src/common/pagination.rs

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

pub const PAGE_SIZE: i64 = 20;

/// `?page=N` (1-based). Valores ausentes ou menores que 1 viram 1.
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams, ToSchema)]
pub struct PageRequest {
    pub page: Option<i64>,
}

impl PageRequest {
    pub fn number(&self) -> i64 {
        self.page.filter(|p| *p >= 1).unwrap_or(1)
    }

    pub fn limit(&self) -> i64 {
        PAGE_SIZE
    }

    pub fn offset(&self) -> i64 {
        // `?page=` vem direto da query; páginas gigantes saturam em vez de estourar
        (self.number() - 1).saturating_mul(PAGE_SIZE)
    }
}

/// Envelope de listagem: total, páginas vizinhas e os itens da página atual.
#[derive(Debug, Serialize, ToSchema)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<i64>,
    pub previous: Option<i64>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(results: Vec<T>, count: i64, request: &PageRequest) -> Self {
        let page = request.number();
        let last_page = if count == 0 { 1 } else { (count + PAGE_SIZE - 1) / PAGE_SIZE };
        Self {
            count,
            next: (page < last_page).then_some(page + 1),
            previous: (page > 1).then(|| (page - 1).min(last_page)),
            results,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_page_number() {
        assert_eq!(PageRequest { page: None }.number(), 1);
        assert_eq!(PageRequest { page: Some(0) }.number(), 1);
        assert_eq!(PageRequest { page: Some(-4) }.offset(), 0);
        assert_eq!(PageRequest { page: Some(3) }.offset(), 40);
    }

    #[test]
    fn huge_page_number_keeps_offset_positive() {
        let request = PageRequest { page: Some(i64::MAX) };
        assert_eq!(request.offset(), i64::MAX);

        let page = Page::<()>::new(vec![], 45, &request);
        assert_eq!(page.next, None);
        assert_eq!(page.previous, Some(3));
    }

    #[test]
    fn links_neighbour_pages() {
        let first = Page::new(vec![(); 20], 45, &PageRequest { page: Some(1) });
        assert_eq!((first.previous, first.next), (None, Some(2)));

        let last = Page::new(vec![(); 5], 45, &PageRequest { page: Some(3) });
        assert_eq!((last.previous, last.next), (Some(2), None));
    }

    #[test]
    fn page_past_the_end_points_back_to_last_page() {
        let page = Page::<()>::new(vec![], 45, &PageRequest { page: Some(9) });
        assert_eq!(page.next, None);
        assert_eq!(page.previous, Some(3));
    }

    #[test]
    fn empty_listing_has_no_links() {
        let page = Page::<()>::new(vec![], 0, &PageRequest::default());
        assert_eq!((page.previous, page.next), (None, None));
    }
}
