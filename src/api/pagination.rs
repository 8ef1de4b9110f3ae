//! Pagination for list endpoints.
//!
//! The feeds served here are in-memory collections (already filtered), so
//! pagination is a plain slice over the full result set.

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Pagination query parameters
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PaginationParams {
    /// Page number (1-indexed)
    pub page: Option<u32>,

    /// Items per page
    pub per_page: Option<u32>,
}

impl PaginationParams {
    /// Maximum allowed items per page
    pub const MAX_PER_PAGE: u32 = 100;

    pub fn per_page(&self) -> u32 {
        self.per_page.unwrap_or(20).clamp(1, Self::MAX_PER_PAGE)
    }

    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    fn offset(&self) -> usize {
        ((self.page() - 1) * self.per_page()) as usize
    }
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PaginationMeta {
    pub fn new(params: &PaginationParams, total_items: u64) -> Self {
        let per_page = params.per_page();
        let page = params.page();
        let total_pages = ((total_items as f64) / (per_page as f64)).ceil() as u32;

        Self {
            page,
            per_page,
            total_items,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

/// Paginated response wrapper
#[derive(Debug, Serialize)]
pub struct Paginated<T: Serialize> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T: Serialize> Paginated<T> {
    /// Slice one page out of a fully materialized result set.
    pub fn from_items(items: Vec<T>, params: &PaginationParams) -> Self {
        let total_items = items.len() as u64;
        let data: Vec<T> = items
            .into_iter()
            .skip(params.offset())
            .take(params.per_page() as usize)
            .collect();
        Self {
            data,
            pagination: PaginationMeta::new(params, total_items),
        }
    }
}

impl<T: Serialize> IntoResponse for Paginated<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn slices_pages_and_reports_meta() {
        let params = PaginationParams {
            page: Some(2),
            per_page: Some(3),
        };
        let page = Paginated::from_items((1..=7).collect::<Vec<i32>>(), &params);

        assert_eq!(page.data, vec![4, 5, 6]);
        assert_eq!(page.pagination.total_items, 7);
        assert_eq!(page.pagination.total_pages, 3);
        assert!(page.pagination.has_next);
        assert!(page.pagination.has_prev);
    }

    #[test]
    fn out_of_range_page_is_empty() {
        let params = PaginationParams {
            page: Some(9),
            per_page: Some(10),
        };
        let page = Paginated::from_items(vec![1, 2, 3], &params);
        assert!(page.data.is_empty());
        assert!(!page.pagination.has_next);
    }
}
