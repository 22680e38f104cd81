//! Offset pagination utilities.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PER_PAGE: u32 = 20;
pub const MAX_PER_PAGE: u32 = 100;

/// Page selection parsed from query strings (`?page=2&perPage=50`).
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PageParams {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
        }
    }

    /// Page number, at least 1.
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(DEFAULT_PAGE).max(1)
    }

    /// Page size clamped to `1..=MAX_PER_PAGE`.
    pub fn per_page(&self) -> u32 {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }

    /// SQL `LIMIT` value.
    pub fn limit(&self) -> i64 {
        self.per_page() as i64
    }

    /// SQL `OFFSET` value.
    pub fn offset(&self) -> i64 {
        (self.page() as i64 - 1) * self.per_page() as i64
    }

    /// Builds the response metadata for a total row count.
    pub fn meta(&self, total: i64) -> PageMeta {
        let per_page = self.per_page() as i64;
        let total = total.max(0);
        PageMeta {
            page: self.page(),
            per_page: self.per_page(),
            total,
            total_pages: ((total + per_page - 1) / per_page) as u32,
        }
    }
}

/// Pagination metadata returned alongside list responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
    pub total_pages: u32,
}
